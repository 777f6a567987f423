use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, trace};

/// Unified worker event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// The watched history file was modified or recreated.
    SourceChanged(PathBuf),
    /// Stop after the in-flight cycle.
    Shutdown,
}

/// What the worker should do next after draining the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// One or more change notifications, coalesced.
    Changed { coalesced: usize },
    Shutdown,
}

/// Bounded queue of change notifications feeding the single worker.
pub struct NotificationQueue {
    tx: SyncSender<TailEvent>,
    rx: Receiver<TailEvent>,
}

impl NotificationQueue {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        Self { tx, rx }
    }

    pub fn sender(&self) -> SyncSender<TailEvent> {
        self.tx.clone()
    }

    /// Block until there is work, then drain everything already queued so
    /// a burst of notifications becomes one cycle. Shutdown wins over
    /// pending changes.
    pub fn next(&self) -> Wakeup {
        let first = match self.rx.recv() {
            Ok(event) => event,
            // Unreachable while `self.tx` is alive, but treat it as a stop.
            Err(_) => return Wakeup::Shutdown,
        };
        if first == TailEvent::Shutdown {
            return Wakeup::Shutdown;
        }

        let mut coalesced = 1;
        loop {
            match self.rx.try_recv() {
                Ok(TailEvent::Shutdown) => return Wakeup::Shutdown,
                Ok(TailEvent::SourceChanged(_)) => coalesced += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Wakeup::Changed { coalesced }
    }
}

/// Forward an event without blocking the notifier. A full queue already
/// guarantees a pending cycle, so the event is dropped.
pub fn forward(tx: &SyncSender<TailEvent>, event: TailEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => trace!("notification queue full; coalesced"),
        Err(TrySendError::Disconnected(_)) => trace!("worker gone; notification dropped"),
    }
}

/// Whether a notifier path refers to the watched file. Names compare
/// ASCII case-insensitively.
pub fn matches_source(path: &Path, source_name: &OsString) -> bool {
    match (path.file_name(), source_name.to_str()) {
        (Some(name), Some(source)) => name
            .to_str()
            .map(|n| n.eq_ignore_ascii_case(source))
            .unwrap_or(false),
        (Some(name), None) => name == source_name.as_os_str(),
        _ => false,
    }
}

/// Watch the directory containing `source` and send `SourceChanged` for
/// modify/create events on that file. The returned watcher must be kept
/// alive; dropping it ends the subscription.
pub fn spawn_source_watcher(
    source: &Path,
    tx: SyncSender<TailEvent>,
) -> notify::Result<RecommendedWatcher> {
    let source_name = source
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| notify::Error::generic("source path has no file name"))?;
    let dir = match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: Result<NotifyEvent, notify::Error>| {
        match res {
            Ok(event) => {
                debug!(kind = ?event.kind, paths = ?event.paths, "watcher event");
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    if matches_source(&path, &source_name) {
                        forward(&tx, TailEvent::SourceChanged(path));
                    }
                }
            }
            Err(e) => error!("file watcher error: {e}"),
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    debug!(dir = %dir.display(), "watching history directory");

    Ok(watcher)
}
