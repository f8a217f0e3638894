//! # On-disk Video Recorder
//!
//! Local recording of the incoming elementary stream, independent of the
//! downlink: the UDP link is lossy, the SD card is not.
//!
//! Recording is gated on the flight controller's armed state so bench time
//! does not fill the card. Writes are buffered and flushed in large blocks
//! (SD cards hate small writes), and output rotates to a numbered sibling
//! file (`<name><N>.h264`) once the size cap is reached; FAT32 cards top
//! out at 4GB per file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

/// Buffered bytes before a write hits the filesystem
const WRITE_THRESHOLD: usize = 1024 * 1024;

/// Armed-gated H.264 stream recorder with size-based rotation
#[derive(Debug)]
pub struct VideoRecorder {
    base: PathBuf,
    file: File,
    file_number: u32,
    file_size: u64,
    max_file_size: u64,
    buf: Vec<u8>,
}

impl VideoRecorder {
    /// Create a recorder writing `<base><N>.h264` files
    ///
    /// Probes upward from 1 for the first file name not already present, so
    /// a restart never overwrites an earlier flight.
    ///
    /// # Arguments
    ///
    /// * `base` - Output path prefix (directory and basename, no extension)
    /// * `max_file_size` - Bytes after which output rotates to the next file
    pub fn create(base: &Path, max_file_size: u64) -> Result<Self> {
        let mut file_number = 0u32;
        let path = loop {
            file_number += 1;
            let candidate = numbered_path(base, file_number);
            if !candidate.exists() {
                break candidate;
            }
        };

        info!("Recording video to {}", path.display());
        let file = File::create(&path)?;

        Ok(Self {
            base: base.to_path_buf(),
            file,
            file_number,
            file_size: 0,
            max_file_size,
            buf: Vec::with_capacity(WRITE_THRESHOLD),
        })
    }

    /// Ingest a chunk of the elementary stream
    ///
    /// Bytes are buffered; once the buffer passes the write threshold it is
    /// written out if `armed`, or discarded if not. Rotation happens after
    /// the write that crosses the size cap, on a buffer boundary, so files
    /// stay playable.
    pub fn ingest(&mut self, chunk: &[u8], armed: bool) -> Result<()> {
        self.buf.extend_from_slice(chunk);
        if self.buf.len() < WRITE_THRESHOLD {
            return Ok(());
        }

        if armed {
            self.file.write_all(&self.buf)?;
            self.file_size += self.buf.len() as u64;
        }
        self.buf.clear();

        if self.file_size > self.max_file_size {
            self.rotate()?;
        }
        Ok(())
    }

    /// Flush buffered bytes regardless of threshold (shutdown path)
    pub fn flush(&mut self, armed: bool) -> Result<()> {
        if armed && !self.buf.is_empty() {
            self.file.write_all(&self.buf)?;
            self.file_size += self.buf.len() as u64;
        }
        self.buf.clear();
        self.file.flush()?;
        Ok(())
    }

    /// Bytes written to the current output file
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Current output file path
    pub fn current_path(&self) -> PathBuf {
        numbered_path(&self.base, self.file_number)
    }

    fn rotate(&mut self) -> Result<()> {
        self.file_number += 1;
        let path = numbered_path(&self.base, self.file_number);
        debug!(
            "Video file reached {} bytes, rotating to {}",
            self.file_size,
            path.display()
        );
        self.file = File::create(&path)?;
        self.file_size = 0;
        Ok(())
    }
}

fn numbered_path(base: &Path, number: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!("{}.h264", number));
    PathBuf::from(name)
}
