//! Test utilities for creating, growing and rotating temporary log files.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct TempLogFile {
    pub path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogFile {
    /// Create a new, empty temporary log file
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("test.log");

        File::create(&path)?;

        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }

    /// Create a temporary log file holding exactly `content`
    pub fn with_raw(content: &str) -> std::io::Result<Self> {
        Self::with_bytes(content.as_bytes())
    }

    pub fn with_bytes(content: &[u8]) -> std::io::Result<Self> {
        let temp_file = Self::new()?;
        temp_file.append_bytes(content)?;
        Ok(temp_file)
    }

    /// Append one line (a newline is added)
    pub fn append_content(&self, content: &str) -> std::io::Result<()> {
        self.append_raw(&format!("{}\n", content))
    }

    /// Append `content` as-is
    pub fn append_raw(&self, content: &str) -> std::io::Result<()> {
        self.append_bytes(content.as_bytes())
    }

    pub fn append_bytes(&self, content: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(content)?;
        file.flush()?;
        Ok(())
    }

    /// Truncate the file to zero length (simulate copytruncate rotation)
    pub fn truncate(&self) -> std::io::Result<()> {
        File::create(&self.path)?;
        Ok(())
    }

    /// Delete the file
    pub fn remove(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    /// Rename the file away, leaving nothing at the original path
    pub fn rename_to(&self, file_name: &str) -> std::io::Result<PathBuf> {
        let target = self.dir().join(file_name);
        std::fs::rename(&self.path, &target)?;
        Ok(target)
    }

    pub fn dir(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Get the path to the temporary file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_file_creation() {
        let temp_file = TempLogFile::new().unwrap();
        assert!(temp_file.path().exists());
        assert_eq!(std::fs::read(temp_file.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_append_content_adds_newline() {
        let temp_file = TempLogFile::new().unwrap();
        temp_file.append_content("line 1").unwrap();
        temp_file.append_content("line 2").unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "line 1\nline 2\n");
    }

    #[test]
    fn test_append_raw_is_verbatim() {
        let temp_file = TempLogFile::with_raw("no newline").unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "no newline");
    }

    #[test]
    fn test_truncate() {
        let temp_file = TempLogFile::with_raw("initial content\n").unwrap();
        temp_file.truncate().unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn test_remove_and_recreate() {
        let temp_file = TempLogFile::with_raw("old\n").unwrap();
        temp_file.remove().unwrap();
        assert!(!temp_file.path().exists());

        temp_file.append_raw("new\n").unwrap();
        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, "new\n");
    }

    #[test]
    fn test_rename_to() {
        let temp_file = TempLogFile::with_raw("rotated\n").unwrap();
        let target = temp_file.rename_to("test.log.1").unwrap();

        assert!(!temp_file.path().exists());
        assert!(target.exists());
    }
}
