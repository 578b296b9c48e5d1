//! # Loader — Background Fetch and Decode of Material Sets
//!
//! Fetching and decoding five images can take hundreds of milliseconds, far
//! longer than a frame. The render loop must keep spinning meanwhile, so each
//! request runs on its own worker thread and reports back over a channel.
//!
//! ```text
//!   render thread                         worker thread
//!   ─────────────                         ─────────────
//!   begin_load() → RequestId
//!   spawn(id, descriptor) ──────────────► fetch_set(source, descriptor)
//!        ⋮  frames keep rendering            fetch + decode × 5
//!   poll() ◄────────────── LoadOutcome ─── tx.send(outcome)
//!   finish_load(outcome) → upload + swap
//! ```
//!
//! Polling happens at the start of each frame, before the bind-group
//! staleness check, so a completed load is always visible to the very next
//! draw. GPU uploads stay on the render thread; workers only produce
//! [`PixelBuffer`]s.
//!
//! Nothing is cancelled. A superseded request still runs to completion and
//! its result is discarded by request id in
//! [`MaterialManager::finish_load`](super::material::MaterialManager::finish_load).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use super::material::{ChannelMap, DecodedSet, LoadOutcome, MaterialSetDescriptor, RequestId};
use super::texture::PixelBuffer;
use crate::error::LoadError;

/// Where raw image bytes come from.
pub trait ImageSource: Send + Sync {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError>;
}

/// Reads images from disk, relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The on-disk path a location refers to. Absolute locations are kept.
    pub fn resolve_path(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ImageSource for FsImageSource {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError> {
        std::fs::read(self.resolve_path(location)).map_err(|source| LoadError::Io {
            location: location.to_owned(),
            source,
        })
    }
}

/// Decode PNG or JPEG bytes into tightly packed RGBA8.
pub fn decode_image(location: &str, bytes: &[u8]) -> Result<PixelBuffer, LoadError> {
    let img = image::load_from_memory(bytes)
        .map_err(|source| LoadError::Decode {
            location: location.to_owned(),
            source,
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(PixelBuffer {
        width,
        height,
        rgba: img.into_raw(),
    })
}

/// Fetch and decode all five maps of a set, in channel order.
///
/// Stops at the first failure; a partial set is never returned.
pub fn fetch_set(
    source: &dyn ImageSource,
    descriptor: &MaterialSetDescriptor,
) -> Result<DecodedSet, LoadError> {
    ChannelMap::try_from_fn(|channel| {
        let location = descriptor.location(channel);
        let bytes = source.fetch(location)?;
        decode_image(location, &bytes)
    })
}

/// Runs material loads on worker threads and collects their results.
pub struct MaterialLoader {
    source: Arc<dyn ImageSource>,
    tx: mpsc::Sender<LoadOutcome>,
    rx: mpsc::Receiver<LoadOutcome>,
    in_flight: usize,
}

impl MaterialLoader {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Start loading `descriptor` in the background.
    pub fn spawn(&mut self, request: RequestId, descriptor: MaterialSetDescriptor) {
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let name = format!("material-load-{}", request.0);
        let set_id = descriptor.id.clone();

        let spawned = std::thread::Builder::new().name(name).spawn(move || {
            let result = fetch_set(source.as_ref(), &descriptor);
            // Receiver dropped means the renderer is gone; nothing to report to.
            let _ = tx.send(LoadOutcome {
                request,
                set_id: descriptor.id,
                result,
            });
        });

        match spawned {
            Ok(_) => self.in_flight += 1,
            Err(e) => {
                log::warn!("Failed to start material loader thread: {e}");
                // Report through the channel so the failure is handled like any other.
                let _ = self.tx.send(LoadOutcome {
                    request,
                    set_id,
                    result: Err(LoadError::WorkerLost),
                });
                self.in_flight += 1;
            }
        }
    }

    /// Drain every completed load without blocking.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let done: Vec<LoadOutcome> = self.rx.try_iter().collect();
        self.in_flight -= done.len();
        done
    }

    /// Number of requests spawned but not yet polled.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render3d::material::tests::FakeUploader;
    use crate::render3d::material::{Channel, LoadStatus, MaterialManager};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Encode a small solid PNG in memory.
    fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        bytes
    }

    /// In-memory image source that can fail on the n-th fetch.
    #[derive(Default)]
    struct MemorySource {
        files: HashMap<String, Vec<u8>>,
        fail_on_call: Option<usize>,
        calls: Mutex<Vec<String>>,
    }

    impl ImageSource for MemorySource {
        fn fetch(&self, location: &str) -> Result<Vec<u8>, LoadError> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(location.to_owned());
            if Some(calls.len()) == self.fail_on_call {
                return Err(LoadError::Io {
                    location: location.to_owned(),
                    source: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "injected"),
                });
            }
            self.files.get(location).cloned().ok_or_else(|| LoadError::Io {
                location: location.to_owned(),
                source: std::io::ErrorKind::NotFound.into(),
            })
        }
    }

    fn descriptor(id: &str) -> MaterialSetDescriptor {
        MaterialSetDescriptor {
            id: id.to_owned(),
            diffuse: format!("{id}/diffuse.png"),
            displacement: format!("{id}/displacement.png"),
            normal: format!("{id}/normal.png"),
            roughness: format!("{id}/roughness.png"),
            ambient_occlusion: format!("{id}/ao.png"),
        }
    }

    fn source_with(sets: &[&str]) -> MemorySource {
        let mut source = MemorySource::default();
        for id in sets {
            let desc = descriptor(id);
            for (i, channel) in Channel::ALL.into_iter().enumerate() {
                let shade = (i as u8 + 1) * 40;
                source
                    .files
                    .insert(desc.location(channel).to_owned(), png(4, 2, [shade, shade, shade, 255]));
            }
        }
        source
    }

    fn wait_for(loader: &mut MaterialLoader, count: usize) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut done = Vec::new();
        while done.len() < count {
            assert!(Instant::now() < deadline, "timed out waiting for loader");
            done.extend(loader.poll());
            std::thread::sleep(Duration::from_millis(5));
        }
        done
    }

    #[test]
    fn decode_produces_rgba8_at_image_size() {
        let px = decode_image("x.png", &png(3, 5, [10, 20, 30, 255])).unwrap();
        assert_eq!((px.width, px.height), (3, 5));
        assert_eq!(px.rgba.len(), 3 * 5 * 4);
        assert_eq!(&px.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_image("bad.png", b"definitely not an image").unwrap_err();
        assert!(matches!(err, LoadError::Decode { ref location, .. } if location == "bad.png"));
    }

    #[test]
    fn fetch_set_decodes_all_channels_in_order() {
        let source = source_with(&["rock"]);
        let set = fetch_set(&source, &descriptor("rock")).unwrap();
        for (i, (_, px)) in set.iter().enumerate() {
            assert_eq!((px.width, px.height), (4, 2));
            assert_eq!(px.rgba[0], (i as u8 + 1) * 40);
        }
        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0], "rock/diffuse.png");
        assert_eq!(calls[4], "rock/ao.png");
    }

    #[test]
    fn failure_on_third_fetch_leaves_active_set_unchanged() {
        let mut up = FakeUploader::default();
        let mut manager = MaterialManager::new(&mut up);

        let good = source_with(&["rock", "moss"]);
        let first = manager.begin_load();
        let result = fetch_set(&good, &descriptor("rock"));
        manager
            .finish_load(LoadOutcome { request: first, set_id: "rock".into(), result }, &mut up)
            .unwrap();
        let before = manager.active().cloned();
        let uploads_before = up.uploads.len();

        let flaky = MemorySource {
            fail_on_call: Some(3),
            ..source_with(&["moss"])
        };
        let second = manager.begin_load();
        let result = fetch_set(&flaky, &descriptor("moss"));
        assert_eq!(flaky.calls.lock().unwrap().len(), 3, "fetching stops at the failure");
        assert!(result.is_err());

        let outcome = LoadOutcome { request: second, set_id: "moss".into(), result };
        assert!(manager.finish_load(outcome, &mut up).is_err());
        assert_eq!(manager.active().cloned(), before);
        assert_eq!(up.uploads.len(), uploads_before);
    }

    #[test]
    fn fs_source_resolves_relative_to_root() {
        let source = FsImageSource::new("/assets");
        assert_eq!(source.resolve_path("rock/diffuse.png"), PathBuf::from("/assets/rock/diffuse.png"));
        assert_eq!(source.resolve_path("/abs/a.png"), PathBuf::from("/abs/a.png"));
    }

    #[test]
    fn fs_source_reports_missing_file() {
        let source = FsImageSource::new(std::env::temp_dir());
        let err = source.fetch("relief-does-not-exist.png").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn background_load_reports_through_poll() {
        let mut loader = MaterialLoader::new(Arc::new(source_with(&["rock"])));
        loader.spawn(RequestId(7), descriptor("rock"));
        assert_eq!(loader.in_flight(), 1);

        let done = wait_for(&mut loader, 1);
        assert_eq!(loader.in_flight(), 0);
        assert_eq!(done[0].request, RequestId(7));
        assert_eq!(done[0].set_id, "rock");
        assert!(done[0].result.is_ok());
    }

    #[test]
    fn background_loads_apply_newest_only() {
        let mut up = FakeUploader::default();
        let mut manager = MaterialManager::new(&mut up);
        let mut loader = MaterialLoader::new(Arc::new(source_with(&["rock", "moss"])));

        let older = manager.begin_load();
        let newer = manager.begin_load();
        loader.spawn(older, descriptor("rock"));
        loader.spawn(newer, descriptor("moss"));

        let mut done = wait_for(&mut loader, 2);
        // Deliver newest first, the order a slow first request produces.
        done.sort_by_key(|o| std::cmp::Reverse(o.request));
        let statuses: Vec<LoadStatus> = done
            .into_iter()
            .map(|o| manager.finish_load(o, &mut up).unwrap())
            .collect();
        assert_eq!(statuses, [LoadStatus::Applied, LoadStatus::Superseded]);
        assert_eq!(manager.active().unwrap().id, "moss");
    }

    #[test]
    fn bundled_sample_sets_decode() {
        let config = crate::config::ViewerConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/materials.json")).unwrap();
        let source = FsImageSource::new(config.asset_root.clone());
        assert!(!config.material_sets.is_empty());
        for descriptor in &config.material_sets {
            let set = fetch_set(&source, descriptor).unwrap_or_else(|e| panic!("{}: {e}", descriptor.id));
            for (channel, image) in set.iter() {
                assert!(image.width > 0 && image.height > 0, "{} {}", descriptor.id, channel.name());
                assert_eq!(image.rgba.len(), (image.width * image.height * 4) as usize);
            }
        }
    }
}
