//! # Shapes — UV-Sphere Generator
//!
//! The only geometry this renderer draws is a latitude/longitude sphere,
//! generated once at startup. It's cheap enough to build on the CPU that
//! loading it from a file would only add I/O.
//!
//! ## Parameterisation
//!
//! ```text
//!   v = y / H        theta = v·π      (0 at north pole, π at south pole)
//!   u = x / W        phi   = u·2π     (once around the Y axis)
//!
//!   position = ( -r·cos(phi)·sin(theta),  r·cos(theta),  r·sin(phi)·sin(theta) )
//!   normal   = position / r
//!   uv       = ( u, 1 - v )
//! ```
//!
//! V is flipped: the north pole gets `uv.y = 1` and the south pole
//! `uv.y = 0`.
//!
//! ## Seam and Poles
//!
//! Each ring has `W + 1` vertices: the first and last share a position but
//! carry `u = 0` and `u = 1`. Without that duplicate the last column of quads
//! would interpolate U from ~1 back to 0 and smear the whole texture across
//! one strip. At the poles a whole ring collapses to one point, so the pole
//! row of triangles has zero area. They are never rasterised and cost a
//! handful of indices.
//!
//! ## Winding
//!
//! Cell `(y, x)` emits `(first, second, first+1)` and
//! `(second, second+1, first+1)`, counter-clockwise seen from outside, which
//! matches `FrontFace::Ccw` with back-face culling.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use super::mesh::{MAX_U16_VERTICES, Mesh};

/// Number of vertices a `W × H` sphere produces.
pub const fn sphere_vertex_count(width_segments: u32, height_segments: u32) -> usize {
    (width_segments as usize + 1) * (height_segments as usize + 1)
}

/// Generate a UV sphere of the given radius centred at the origin.
///
/// Preconditions (checked in debug builds): `radius > 0`,
/// `width_segments >= 3`, `height_segments >= 2`, and the vertex count fits
/// 16-bit indices. [`ViewerConfig::validate`](crate::config::ViewerConfig::validate)
/// rejects configurations that would break them.
pub fn generate_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Mesh {
    debug_assert!(radius > 0.0, "sphere radius must be positive, got {radius}");
    debug_assert!(width_segments >= 3, "width_segments must be >= 3");
    debug_assert!(height_segments >= 2, "height_segments must be >= 2");
    debug_assert!(
        sphere_vertex_count(width_segments, height_segments) <= MAX_U16_VERTICES,
        "{width_segments}x{height_segments} sphere exceeds the 16-bit index range"
    );

    let vertex_count = sphere_vertex_count(width_segments, height_segments);
    let index_count = (width_segments * height_segments * 6) as usize;
    let mut mesh = Mesh {
        positions: Vec::with_capacity(vertex_count),
        normals: Vec::with_capacity(vertex_count),
        uvs: Vec::with_capacity(vertex_count),
        indices: Vec::with_capacity(index_count),
    };

    for y in 0..=height_segments {
        let v = y as f32 / height_segments as f32;
        let theta = v * PI;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for x in 0..=width_segments {
            let u = x as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let position = Vec3::new(
                -radius * cos_phi * sin_theta,
                radius * cos_theta,
                radius * sin_phi * sin_theta,
            );

            mesh.positions.push(position);
            mesh.normals.push(position / radius);
            mesh.uvs.push(Vec2::new(u, 1.0 - v));
        }
    }

    let row = width_segments + 1;
    for y in 0..height_segments {
        for x in 0..width_segments {
            let first = (y * row + x) as u16;
            let second = first + row as u16;

            mesh.indices.extend_from_slice(&[first, second, first + 1]);
            mesh.indices.extend_from_slice(&[second, second + 1, first + 1]);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_has_correct_counts() {
        for (w, h) in [(3, 2), (4, 2), (8, 4), (32, 16), (128, 64)] {
            let mesh = generate_sphere(1.0, w, h);
            assert_eq!(mesh.vertex_count(), ((w + 1) * (h + 1)) as usize, "{w}x{h} vertices");
            assert_eq!(mesh.index_count(), (6 * w * h) as usize, "{w}x{h} indices");
            assert_eq!(mesh.normals.len(), mesh.vertex_count());
            assert_eq!(mesh.uvs.len(), mesh.vertex_count());
        }
    }

    #[test]
    fn small_sphere_scenario() {
        let mesh = generate_sphere(1.0, 4, 2);
        assert_eq!(mesh.vertex_count(), 15);
        assert_eq!(mesh.index_count(), 24);
        assert_eq!(mesh.triangle_count(), 8);

        assert!(mesh.positions[0].abs_diff_eq(Vec3::Y, 1e-6), "north pole at (0,1,0)");
        assert!(mesh.normals[0].abs_diff_eq(Vec3::Y, 1e-6));
        assert_eq!(mesh.uvs[0], Vec2::new(0.0, 1.0));
    }

    #[test]
    fn sphere_indices_in_range() {
        let mesh = generate_sphere(2.0, 16, 9);
        for &idx in &mesh.indices {
            assert!((idx as usize) < mesh.vertex_count(), "index {idx} out of range");
        }
    }

    #[test]
    fn normals_are_unit_and_match_position() {
        let radius = 2.5;
        let mesh = generate_sphere(radius, 24, 12);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((n.length() - 1.0).abs() < 1e-5, "normal should be unit length, got {}", n.length());
            assert!(n.abs_diff_eq(*p / radius, 1e-6));
        }
    }

    #[test]
    fn uvs_stay_in_unit_square_and_flip_v() {
        let (w, h) = (10, 6);
        let mesh = generate_sphere(1.0, w, h);
        for uv in &mesh.uvs {
            assert!((0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y), "uv {uv} out of range");
        }
        let row = (w + 1) as usize;
        for x in 0..row {
            assert_eq!(mesh.uvs[x].y, 1.0, "top ring maps to v = 1");
            assert_eq!(mesh.uvs[h as usize * row + x].y, 0.0, "bottom ring maps to v = 0");
        }
    }

    #[test]
    fn seam_vertices_share_position_but_not_u() {
        let (w, h) = (12, 6);
        let mesh = generate_sphere(1.0, w, h);
        let row = (w + 1) as usize;
        for y in 0..=h as usize {
            let start = y * row;
            let end = start + w as usize;
            assert!(mesh.positions[start].abs_diff_eq(mesh.positions[end], 1e-5));
            assert_eq!(mesh.uvs[start].x, 0.0);
            assert_eq!(mesh.uvs[end].x, 1.0);
        }
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        let mesh = generate_sphere(1.0, 16, 8);
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.positions[i as usize]);
            let face_normal = (b - a).cross(c - a);
            // Pole triangles are degenerate; skip them.
            if face_normal.length() < 1e-6 {
                continue;
            }
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0, "triangle {tri:?} faces inward");
        }
    }

    #[test]
    fn largest_u16_sphere_indexes_every_vertex() {
        // 255 × 255 → 256² = 65536 vertices, the full u16 range.
        let mesh = generate_sphere(1.0, 255, 255);
        assert_eq!(mesh.vertex_count(), MAX_U16_VERTICES);
        assert_eq!(mesh.indices.iter().copied().max(), Some(u16::MAX));
    }
}
