//! Log Writer
//!
//! Appends encoded records to the log file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Exclusive append handle for the log file
pub struct LogWriter {
    file: File,
    path: PathBuf,

    /// Next append writes only this many bytes, then fails
    #[cfg(test)]
    torn_write: Option<usize>,
}

impl LogWriter {
    /// Open or create the log file in append mode
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            #[cfg(test)]
            torn_write: None,
        })
    }

    /// Wrap an already opened handle
    #[cfg(test)]
    pub(crate) fn from_file(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            torn_write: None,
        }
    }

    /// Make the next append stop after `bytes` and report an error
    #[cfg(test)]
    pub(crate) fn tear_next_append(&mut self, bytes: usize) {
        self.torn_write = Some(bytes);
    }

    /// Append a record and wait for it to reach stable storage
    ///
    /// A failed sync fails the append, even though the bytes may already be
    /// visible to readers in this process.
    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        #[cfg(test)]
        if let Some(bytes) = self.torn_write.take() {
            self.file.write_all(&record[..bytes.min(record.len())])?;
            return Err(std::io::Error::new(std::io::ErrorKind::WriteZero, "torn write").into());
        }

        self.file.write_all(record)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Current file length
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Cut the file back to `len` bytes and sync
    ///
    /// Used to drop whatever part of a failed append reached the file.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Force a full sync (data + metadata)
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
