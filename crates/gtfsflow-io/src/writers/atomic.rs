//! Write-to-temp-then-rename output file.
//!
//! The temp file lives next to the destination (same file system, so the
//! rename is atomic). Until [`AtomicFile::commit`] succeeds the destination
//! is untouched; dropping an uncommitted file removes the temp file.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;

pub struct AtomicFile {
    dest: PathBuf,
    tmp: PathBuf,
    file: Option<File>,
}

impl AtomicFile {
    pub fn create(dest: &Path) -> Result<Self> {
        let parent = dest.parent().unwrap_or_else(|| Path::new(""));
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
        let filename = dest
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        let tmp = parent.join(format!(
            ".{}.{}.{}.tmp",
            filename,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let file = File::create(&tmp)?;
        Ok(Self {
            dest: dest.to_path_buf(),
            tmp,
            file: Some(file),
        })
    }

    pub fn temp_path(&self) -> &Path {
        &self.tmp
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "output already committed"))
    }

    /// Sync and move the temp file into place.
    pub fn commit(mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        if let Err(err) = fs::rename(&self.tmp, &self.dest) {
            let _ = fs::remove_file(&self.tmp);
            return Err(err.into());
        }
        tracing::debug!(path = %self.dest.display(), "output committed");
        Ok(())
    }
}

impl Write for AtomicFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl Seek for AtomicFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file()?.seek(pos)
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        // `commit` takes the handle; anything still open was abandoned.
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}
