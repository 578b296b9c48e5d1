//! The scene render pass: one color target, one depth target, both cleared.

/// Background color behind the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor(pub [f64; 4]);

impl ClearColor {
    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.0;
        wgpu::Color { r, g, b, a }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        // Dark grey.
        Self([0.1, 0.1, 0.1, 1.0])
    }
}

/// Begin a pass that clears `color` to `clear` and `depth` to 1.0.
pub fn begin_scene_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    color: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    clear: ClearColor,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("relief scene pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_dark_grey() {
        let c = ClearColor::default().to_wgpu();
        assert_eq!((c.r, c.g, c.b, c.a), (0.1, 0.1, 0.1, 1.0));
    }
}
