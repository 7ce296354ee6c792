//! Delivery of backup files to the host environment.

use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Receives an exported backup. How the bytes reach the user is up to the
/// implementation (file write, HTTP response, stdout).
pub trait BackupSink {
    fn deliver(&mut self, file_name: &str, contents: &str) -> io::Result<()>;
}

/// Writes backups as files inside one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BackupSink for DirectorySink {
    fn deliver(&mut self, file_name: &str, contents: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, contents)?;
        info!(
            "event=backup_write module=store status=ok path={} bytes={}",
            path.display(),
            contents.len()
        );
        Ok(())
    }
}
