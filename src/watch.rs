use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Notifies when another process writes the tracker database.
///
/// SQLite writes through `-wal` and `-journal` side files, so the parent
/// directory is watched and events are filtered down to the database's files.
pub struct DbWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<()>,
}

impl DbWatcher {
    pub fn new(db_path: &str) -> Result<Self> {
        let path = Path::new(db_path);
        let file_name = path
            .file_name()
            .with_context(|| format!("database path {db_path} has no file name"))?
            .to_os_string();
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if is_db_write(&event, &file_name) => {
                    // Receiver dropped means the TUI is shutting down.
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => log::debug!("watch error: {e}"),
            }
        })
        .context("failed to create file watcher")?;

        let watch_path = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", watch_path.display()))?;
        log::debug!("watching {} for changes", watch_path.display());

        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// True if any change arrived since the last call. Pending events are drained.
    pub fn changed(&self) -> bool {
        if self.rx.recv_timeout(Duration::ZERO).is_err() {
            return false;
        }
        while self.rx.try_recv().is_ok() {}
        true
    }
}

fn is_db_write(event: &Event, db_file: &OsString) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|p| is_db_file(p, db_file))
}

/// `captrack.db`, `captrack.db-wal`, `captrack.db-journal` and so on.
fn is_db_file(path: &Path, db_file: &OsString) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(db_file) = db_file.to_str() else {
        return false;
    };
    name == db_file || name.strip_prefix(db_file).is_some_and(|rest| rest.starts_with('-'))
}
