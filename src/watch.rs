//! Payload file watcher: the "refetch" trigger of the browser.
//!
//! The watcher observes the payload file's parent directory (editors and
//! sync tools replace files rather than rewriting them in place, which
//! drops inotify watches on the file itself) and forwards debounced
//! changes as [`Event::PayloadChange`]. Each change is stamped with the
//! next fetch sequence number at notification time; the engine uses the
//! stamp to discard stale reloads.

use std::ffi::OsString;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use tokio::sync::mpsc;

use crate::event::Event;

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Watches the organization listing file and reports changes.
pub struct PayloadWatcher {
    /// Handle to the debouncer (dropped to stop watching).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl PayloadWatcher {
    /// Watch `payload_path` for changes.
    ///
    /// `seq` is the shared fetch sequence counter; it is bumped once per
    /// debounced change and the new value travels with the event.
    pub fn new(
        payload_path: &Path,
        debounce_duration: Duration,
        seq: Arc<AtomicU64>,
        event_tx: mpsc::UnboundedSender<Event>,
    ) -> notify::Result<Self> {
        let file_name: Option<OsString> = payload_path.file_name().map(|n| n.to_os_string());
        let watch_dir = payload_path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let mut debouncer = new_debouncer(
            debounce_duration,
            move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
                Ok(events) => {
                    if !touches_payload(&events, file_name.as_deref()) {
                        return;
                    }
                    let stamped = seq.fetch_add(1, Ordering::Relaxed) + 1;
                    let _ = event_tx.send(Event::PayloadChange(stamped));
                }
                Err(_errors) => {
                    // Watcher errors are non-fatal; silently ignore
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&watch_dir, notify::RecursiveMode::NonRecursive)?;

        Ok(Self {
            _debouncer: debouncer,
        })
    }
}

/// Whether any debounced event concerns the payload file.
fn touches_payload(events: &[DebouncedEvent], file_name: Option<&std::ffi::OsStr>) -> bool {
    events
        .iter()
        .filter(|event| event.kind == DebouncedEventKind::Any)
        .any(|event| is_payload_path(&event.path, file_name))
}

/// Exact file-name comparison; rename/replace events arrive with the
/// full directory-entry path.
fn is_payload_path(path: &Path, file_name: Option<&std::ffi::OsStr>) -> bool {
    match file_name {
        Some(name) => path.file_name() == Some(name),
        None => false,
    }
}
