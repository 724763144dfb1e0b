//! Change detection for one file using the notify crate.

use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Capacity of the signal channel. A full channel means a wake-up is already
/// queued, so further events are dropped.
pub(crate) const SIGNAL_CAPACITY: usize = 4;

/// What the watcher tells the monitoring loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChangeSignal {
    /// The file may have been written, created, renamed or deleted.
    Changed,
    /// The OS watcher reported an error.
    Failed(String),
}

/// Watches the parent directory of one file and signals events naming it.
///
/// Dropping the detector removes the OS watch.
pub(crate) struct ChangeDetector {
    _watcher: RecommendedWatcher,
    file_path: PathBuf,
}

impl ChangeDetector {
    /// Arms a watcher for `path`, sending coalesced signals to `tx`.
    pub(crate) fn arm<P: AsRef<Path>>(path: P, tx: mpsc::Sender<ChangeSignal>) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let signal = match res {
                    Ok(event) => {
                        if !is_change_event(&event.kind)
                            || !is_event_relevant_to_file(&event, &file_name)
                        {
                            return;
                        }
                        tracing::trace!(kind = ?event.kind, "File change event");
                        ChangeSignal::Changed
                    }
                    Err(e) => ChangeSignal::Failed(e.to_string()),
                };
                let _ = tx.try_send(signal);
            },
            Config::default(),
        )?;

        watcher.watch(watch_dir(&file_path), RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            file_path,
        })
    }

    #[cfg(test)]
    pub(crate) fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl Drop for ChangeDetector {
    fn drop(&mut self) {
        tracing::debug!(path = %self.file_path.display(), "File watcher disarmed");
    }
}

/// Directory to register with the OS; `.` for a bare file name.
pub(crate) fn watch_dir(file_path: &Path) -> &Path {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Opening or reading the file is not a change; our own reads would
/// otherwise wake the loop.
fn is_change_event(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

/// Check if a notify event is relevant to a specific file
pub(crate) fn is_event_relevant_to_file(event: &Event, target_file_name: &str) -> bool {
    event.paths.iter().any(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy() == target_file_name)
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_watch_dir() {
        assert_eq!(watch_dir(Path::new("/var/log/app.log")), Path::new("/var/log"));
        assert_eq!(watch_dir(Path::new("app.log")), Path::new("."));
        assert_eq!(watch_dir(Path::new("logs/app.log")), Path::new("logs"));
    }

    #[test]
    fn test_is_event_relevant_to_file_exact_match() {
        let event = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/tmp/test.log"],
        );

        assert!(is_event_relevant_to_file(&event, "test.log"));
        assert!(!is_event_relevant_to_file(&event, "other.log"));
    }

    #[test]
    fn test_is_event_relevant_to_file_rename_pair() {
        // Renames carry both the old and new path
        let event = event(
            EventKind::Modify(ModifyKind::Name(notify::event::RenameMode::Both)),
            &["/tmp/test.log", "/tmp/test.log.1"],
        );

        assert!(is_event_relevant_to_file(&event, "test.log"));
        assert!(is_event_relevant_to_file(&event, "test.log.1"));
        assert!(!is_event_relevant_to_file(&event, "test.log.2"));
    }

    #[test]
    fn test_is_event_relevant_to_file_no_file_name() {
        let root = event(EventKind::Any, &["/"]);
        let empty = event(EventKind::Any, &[]);

        assert!(!is_event_relevant_to_file(&root, "test.log"));
        assert!(!is_event_relevant_to_file(&empty, "test.log"));
    }

    #[test]
    fn test_is_event_relevant_to_file_case_sensitivity() {
        let event = event(EventKind::Any, &["/tmp/Test.Log"]);

        assert!(!is_event_relevant_to_file(&event, "test.log"));
        assert!(is_event_relevant_to_file(&event, "Test.Log"));
    }

    #[test]
    fn test_access_events_are_not_changes() {
        assert!(!is_change_event(&EventKind::Access(AccessKind::Any)));
        assert!(is_change_event(&EventKind::Create(CreateKind::File)));
        assert!(is_change_event(&EventKind::Remove(RemoveKind::File)));
        assert!(is_change_event(&EventKind::Modify(ModifyKind::Any)));
    }

    #[tokio::test]
    async fn test_arm_existing_file() {
        let file = TempLogFile::new().unwrap();
        let (tx, _rx) = mpsc::channel(SIGNAL_CAPACITY);

        let detector = ChangeDetector::arm(file.path(), tx).unwrap();
        assert_eq!(detector.file_path(), file.path());
    }

    #[tokio::test]
    async fn test_arm_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(SIGNAL_CAPACITY);

        let result = ChangeDetector::arm(dir.path().join("nope").join("app.log"), tx);
        assert!(matches!(result, Err(crate::Error::Watcher(_))));
    }

    #[tokio::test]
    async fn test_append_raises_signal() {
        let file = TempLogFile::new().unwrap();
        let (tx, mut rx) = mpsc::channel(SIGNAL_CAPACITY);
        let _detector = ChangeDetector::arm(file.path(), tx).unwrap();

        file.append_content("hello").unwrap();

        let signal = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert_eq!(signal.unwrap(), Some(ChangeSignal::Changed));
    }

    #[tokio::test]
    async fn test_other_file_in_directory_is_ignored() {
        let file = TempLogFile::new().unwrap();
        let (tx, mut rx) = mpsc::channel(SIGNAL_CAPACITY);
        let _detector = ChangeDetector::arm(file.path(), tx).unwrap();

        std::fs::write(file.dir().join("unrelated.log"), "noise\n").unwrap();

        let signal = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(signal.is_err());
    }

    #[tokio::test]
    async fn test_burst_is_coalesced() {
        let file = TempLogFile::new().unwrap();
        let (tx, mut rx) = mpsc::channel(SIGNAL_CAPACITY);
        let _detector = ChangeDetector::arm(file.path(), tx).unwrap();

        for i in 0..50 {
            file.append_content(&format!("burst {}", i)).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received >= 1);
        assert!(received <= SIGNAL_CAPACITY);
    }
}
