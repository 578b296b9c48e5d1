//! # Material Hot-Reload
//!
//! Watches the files of the active material set and asks for the set to be
//! reloaded when any of them changes on disk. The reload goes through the
//! normal load path, so a half-written or broken file just fails the load
//! and the current set stays bound.
//!
//! ```text
//! MaterialWatcher
//!   watcher ──► notify background thread
//!               watches the parent directory of each map
//!               sends events over an mpsc channel
//!   rx ◄──────── filesystem events
//!   files ────── the five canonical paths of the active set
//!   debouncer ── path → time of last event
//!
//! Per frame: poll(now)
//!   1. Drain rx, record events for watched files
//!   2. Once a path has been quiet for 100ms → report the set id
//! ```
//!
//! Directories are watched rather than the files themselves because image
//! editors save atomically (write a temp file, rename over the original),
//! which would detach a watch placed on the old file.
//!
//! If the watcher can't be created the viewer runs without hot reload; the
//! error is logged, not propagated.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Quiet time required after the last event before a reload fires.
pub const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// Collapses bursts of events per key into one, once the key goes quiet.
#[derive(Debug)]
pub struct Debouncer<K> {
    window: Duration,
    pending: HashMap<K, Instant>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Note an event for `key`. Repeated events restart its timer.
    pub fn record(&mut self, key: K, now: Instant) {
        self.pending.insert(key, now);
    }

    /// Remove and return every key that has been quiet for the full window.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<K> {
        let mut ready = Vec::new();
        self.pending.retain(|key, last| {
            if now.saturating_duration_since(*last) >= self.window {
                ready.push(key.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Watches the files of one material set at a time.
pub struct MaterialWatcher {
    /// `None` if the watcher failed to initialize.
    watcher: Option<RecommendedWatcher>,
    rx: mpsc::Receiver<notify::Result<notify::Event>>,
    set_id: Option<String>,
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
    debouncer: Debouncer<PathBuf>,
    rx_disconnected: bool,
}

impl MaterialWatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        let watcher = notify::recommended_watcher(move |res| {
            // Receiver dropped means the viewer is shutting down.
            let _ = tx.send(res);
        });

        let watcher = match watcher {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Failed to create file watcher: {e}. Hot-reload disabled.");
                None
            }
        };

        Self {
            watcher,
            rx,
            set_id: None,
            files: HashSet::new(),
            dirs: HashSet::new(),
            debouncer: Debouncer::new(DEBOUNCE_DURATION),
            rx_disconnected: false,
        }
    }

    /// Id of the set whose files are being watched.
    pub fn watched_set(&self) -> Option<&str> {
        self.set_id.as_deref()
    }

    /// Replace the watch list with the files of `set_id`.
    pub fn watch_set(&mut self, set_id: &str, paths: impl IntoIterator<Item = PathBuf>) {
        self.unwatch_all();
        self.set_id = Some(set_id.to_owned());

        for path in paths {
            // Canonicalize so event paths compare equal.
            let canonical = match path.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Cannot watch '{}': {e}", path.display());
                    continue;
                }
            };
            if let Some(dir) = canonical.parent().map(PathBuf::from) {
                if !self.dirs.contains(&dir) {
                    if let Some(watcher) = &mut self.watcher {
                        if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
                            log::warn!("Failed to watch '{}': {e}", dir.display());
                            continue;
                        }
                    }
                    self.dirs.insert(dir);
                }
            }
            self.files.insert(canonical);
        }

        log::debug!("Watching {} files of material set '{set_id}'", self.files.len());
    }

    fn unwatch_all(&mut self) {
        if let Some(watcher) = &mut self.watcher {
            for dir in &self.dirs {
                let _ = watcher.unwatch(dir);
            }
        }
        self.dirs.clear();
        self.files.clear();
        self.debouncer.clear();
        self.set_id = None;
    }

    /// Drain filesystem events; returns the watched set's id once a change
    /// to one of its files has settled.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        self.drain_events(now);
        let ready = self.debouncer.drain_ready(now);
        if ready.is_empty() {
            return None;
        }
        for path in &ready {
            log::info!("Material file changed: {}", path.display());
        }
        self.set_id.clone()
    }

    fn drain_events(&mut self, now: Instant) {
        if self.rx_disconnected {
            return;
        }

        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    // Atomic saves show up as create.
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                        for path in event.paths {
                            let canonical = path.canonicalize().unwrap_or(path);
                            if self.files.contains(&canonical) {
                                self.debouncer.record(canonical, now);
                            }
                        }
                    }
                }
                Ok(Err(e)) => {
                    log::warn!("File watcher error: {e}");
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    log::warn!("File watcher disconnected. Hot-reload disabled.");
                    self.rx_disconnected = true;
                    break;
                }
            }
        }
    }
}

impl Default for MaterialWatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_collapses_into_one_event() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(DEBOUNCE_DURATION);
        for ms in [0, 10, 30, 60] {
            debouncer.record("diffuse.png", t0 + Duration::from_millis(ms));
        }

        assert!(debouncer.drain_ready(t0 + Duration::from_millis(120)).is_empty(), "last event only 60ms old");
        assert_eq!(debouncer.drain_ready(t0 + Duration::from_millis(160)), ["diffuse.png"]);
        assert!(debouncer.is_empty());
        assert!(debouncer.drain_ready(t0 + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn keys_settle_independently() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(DEBOUNCE_DURATION);
        debouncer.record("a", t0);
        debouncer.record("b", t0 + Duration::from_millis(80));

        assert_eq!(debouncer.drain_ready(t0 + Duration::from_millis(100)), ["a"]);
        assert_eq!(debouncer.drain_ready(t0 + Duration::from_millis(180)), ["b"]);
    }

    #[test]
    fn clear_drops_pending_events() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(DEBOUNCE_DURATION);
        debouncer.record(1u32, t0);
        debouncer.clear();
        assert!(debouncer.drain_ready(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn watch_set_replaces_the_previous_set() {
        let dir = std::env::temp_dir().join(format!("relief-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("diffuse.png");
        std::fs::write(&file, b"x").unwrap();

        let mut watcher = MaterialWatcher::new();
        watcher.watch_set("rock", [file.clone(), dir.join("missing.png")]);
        assert_eq!(watcher.watched_set(), Some("rock"));
        assert_eq!(watcher.files.len(), 1, "missing files are skipped");

        watcher.watch_set("moss", Vec::new());
        assert_eq!(watcher.watched_set(), Some("moss"));
        assert!(watcher.files.is_empty());
        assert!(watcher.poll(Instant::now()).is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
