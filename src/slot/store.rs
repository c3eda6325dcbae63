//! Dumb fixed-slot file accessor
//!
//! Reads and writes exactly one record at offset 0. No OS-level locking is
//! taken here or anywhere else; mutual exclusion is entirely a property of
//! the status handshake driven by the server and client loops.

use crate::error::{IpcError, Result};
use crate::slot::message::{Message, RECORD_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// An open handle to one slot file
#[derive(Debug)]
pub struct SlotFile {
    file: File,
    path: PathBuf,
}

impl SlotFile {
    /// Open an existing slot file read/write.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Create a slot file that must not already exist.
    pub fn create_exclusive(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an initial FREE record if the file is smaller than one record.
    pub fn ensure_initialized(&mut self) -> Result<()> {
        let len = self.file.seek(SeekFrom::End(0))?;
        if len < RECORD_SIZE as u64 {
            self.write(&Message::zeroed())?;
        }
        Ok(())
    }

    /// Read the record at offset 0.
    ///
    /// An empty file decodes as the all-zero FREE record; any other short
    /// read is an error.
    pub fn read(&mut self) -> Result<Message> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; RECORD_SIZE];
        let mut filled = 0;
        while filled < RECORD_SIZE {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(Message::zeroed());
        }
        if filled != RECORD_SIZE {
            return Err(IpcError::ShortRead {
                got: filled,
                expected: RECORD_SIZE,
            });
        }
        Message::decode(&buf)
    }

    /// Overwrite the record at offset 0 and force it to stable storage.
    ///
    /// The peer is only allowed to act once this returns, so a reader can
    /// never observe a torn mix of old and new fields.
    pub fn write(&mut self, msg: &Message) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&msg.encode())?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Unlink the file; the open handle stays usable until dropped.
    pub fn unlink(&self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}
