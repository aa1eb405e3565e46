use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    fn prefix(&self) -> &'static [u8] {
        match self {
            Direction::Inbound => b"< ",
            Direction::Outbound => b"> ",
        }
    }
}

/// Append-only record of raw traffic.
pub struct DumpFile {
    path: PathBuf,
    file: File,
}

impl DumpFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one chunk as a single append so records never interleave.
    pub fn record(&mut self, direction: Direction, bytes: &[u8]) -> io::Result<()> {
        let mut chunk = Vec::with_capacity(bytes.len() + 2);
        chunk.extend_from_slice(direction.prefix());
        chunk.extend_from_slice(bytes);
        self.file.write_all(&chunk)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
