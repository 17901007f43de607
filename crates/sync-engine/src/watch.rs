//! Watch coordinator
//!
//! Observes the flow file and the files directory and calls back into a
//! [`WatchHandler`]. Each watcher feeds a channel drained by one task:
//!
//! ```text
//! Idle -> ChangeDetected -> guard held? -> Suppressed
//!                                  \-> Debounced -> guard held? -> Dropped
//!                                                          \-> Handler -> Idle
//! ```
//!
//! Events arriving during the debounce window restart it, so a burst of
//! writes results in a single callback.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flow_model::EditableKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};
use crate::files;
use crate::guard::SyncGuard;

/// Default quiet period after a flow file change
pub const DEFAULT_FLOW_DEBOUNCE: Duration = Duration::from_millis(500);
/// Default quiet period after a files directory change
pub const DEFAULT_FILES_DEBOUNCE: Duration = Duration::from_millis(300);

/// Receiver of debounced change notifications
#[async_trait]
pub trait WatchHandler: Send + Sync {
    /// The flow file changed on disk
    async fn on_flow_changed(&self);

    /// A tracked file was created, changed or removed
    async fn on_files_changed(&self);
}

/// Which side of the sync a watcher observes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchTarget {
    Flow,
    Files,
}

impl WatchTarget {
    fn label(self) -> &'static str {
        match self {
            Self::Flow => "flows file",
            Self::Files => "files directory",
        }
    }
}

/// Debounce windows for the two watchers
#[derive(Debug, Clone, Copy)]
pub struct WatchSettings {
    pub flow_debounce: Duration,
    pub files_debounce: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            flow_debounce: DEFAULT_FLOW_DEBOUNCE,
            files_debounce: DEFAULT_FILES_DEBOUNCE,
        }
    }
}

struct ActiveWatch {
    // Dropping a watcher unregisters it
    _watchers: Vec<RecommendedWatcher>,
    tasks: Vec<JoinHandle<()>>,
}

/// Owns the filesystem observers for one flow file and files directory
pub struct WatchCoordinator {
    guard: SyncGuard,
    handler: Arc<dyn WatchHandler>,
    settings: WatchSettings,
    active: Mutex<Option<ActiveWatch>>,
}

impl WatchCoordinator {
    pub fn new(guard: SyncGuard, handler: Arc<dyn WatchHandler>, settings: WatchSettings) -> Self {
        Self {
            guard,
            handler,
            settings,
            active: Mutex::new(None),
        }
    }

    /// Whether observers are registered
    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Register observers for `flow_path` and `files_dir`.
    ///
    /// Must be called inside a tokio runtime. Restarts cleanly if already
    /// running. The files directory is created if missing.
    pub async fn start(&self, flow_path: &Path, files_dir: &Path) -> Result<()> {
        self.stop();
        files::ensure_dir(files_dir).await?;

        let flow_name = flow_path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| SyncError::Watch(format!("not a file path: {}", flow_path.display())))?;
        let flow_dir = match flow_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (flow_tx, flow_rx) = mpsc::unbounded_channel();
        let flow_watcher = watch_dir(&flow_dir, move |event| {
            if is_content_change(&event) && touches_flow_file(&event, &flow_name) {
                let _ = flow_tx.send(());
            }
        })?;

        let (files_tx, files_rx) = mpsc::unbounded_channel();
        let files_watcher = watch_dir(files_dir, move |event| {
            if is_content_change(&event) && touches_tracked_file(&event) {
                let _ = files_tx.send(());
            }
        })?;

        let tasks = vec![
            self.spawn_debounced(flow_rx, WatchTarget::Flow, self.settings.flow_debounce),
            self.spawn_debounced(files_rx, WatchTarget::Files, self.settings.files_debounce),
        ];

        log::info!(
            "Watching {} and {}",
            flow_path.display(),
            files_dir.display()
        );
        *self.active.lock() = Some(ActiveWatch {
            _watchers: vec![flow_watcher, files_watcher],
            tasks,
        });
        Ok(())
    }

    /// Release the observers; a no-op when not running
    pub fn stop(&self) {
        if let Some(active) = self.active.lock().take() {
            for task in active.tasks {
                task.abort();
            }
            log::info!("File watchers stopped");
        }
    }

    fn spawn_debounced(
        &self,
        signals: mpsc::UnboundedReceiver<()>,
        target: WatchTarget,
        window: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(run_debounced(
            signals,
            self.guard.clone(),
            window,
            target,
            self.handler.clone(),
        ))
    }
}

impl Drop for WatchCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_debounced(
    mut signals: mpsc::UnboundedReceiver<()>,
    guard: SyncGuard,
    window: Duration,
    target: WatchTarget,
    handler: Arc<dyn WatchHandler>,
) {
    while signals.recv().await.is_some() {
        if guard.is_held() {
            log::debug!("Ignoring {} change during engine write", target.label());
            continue;
        }

        loop {
            match tokio::time::timeout(window, signals.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        if guard.is_held() {
            log::debug!("Dropping {} change, engine write in progress", target.label());
            continue;
        }

        match target {
            WatchTarget::Flow => handler.on_flow_changed().await,
            WatchTarget::Files => handler.on_files_changed().await,
        }
    }
}

fn watch_dir<F>(dir: &Path, on_event: F) -> Result<RecommendedWatcher>
where
    F: Fn(Event) + Send + 'static,
{
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => on_event(event),
        Err(e) => log::warn!("Watcher error: {}", e),
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

fn is_content_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn touches_flow_file(event: &Event, flow_name: &OsString) -> bool {
    event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(flow_name.as_os_str()))
}

fn touches_tracked_file(event: &Event) -> bool {
    event.paths.iter().any(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(EditableKind::is_tracked)
    })
}
