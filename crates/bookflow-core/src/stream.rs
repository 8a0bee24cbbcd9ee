//! Byte stream contract.
//!
//! Parsers read through [`BookStream`]: a seekable, finite byte source with a
//! known size. Streaming-only inputs are not supported. Short reads are
//! legal and are treated by callers as progress toward end of stream.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Random-access read contract over a finite byte sequence.
pub trait BookStream {
    /// Total size of the stream in bytes.
    fn size(&self) -> u64;

    /// Current absolute read position.
    fn position(&self) -> u64;

    /// Repositions the stream.
    ///
    /// # Errors
    /// Returns an error if the position cannot be applied to the underlying
    /// source. Seeking past the end is not an error; the next read returns 0.
    fn seek(&mut self, pos: u64) -> io::Result<()>;

    /// Reads up to `dst.len()` bytes, returning the count actually read.
    ///
    /// # Errors
    /// Returns an error only for hard I/O failures; 0 means end of stream.
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize>;
}

/// In-memory stream over an owned byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStream {
    data: Vec<u8>,
    pos: u64,
}

impl MemoryStream {
    /// Wraps a byte buffer.
    #[must_use]
    pub const fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for MemoryStream {
    fn from(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }
}

impl From<&str> for MemoryStream {
    fn from(data: &str) -> Self {
        Self::new(data.as_bytes().to_vec())
    }
}

impl BookStream for MemoryStream {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let start = self.pos.min(self.data.len() as u64) as usize;
        let n = dst.len().min(self.data.len() - start);
        dst[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }
}

/// File-backed stream. The size is captured at open time.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    size: u64,
    pos: u64,
}

impl FileStream {
    /// Opens a file for reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its metadata read.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size, pos: 0 })
    }
}

impl BookStream for FileStream {
    fn size(&self) -> u64 {
        self.size
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let n = self.file.read(dst)?;
        self.pos += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_stream_reads_and_tracks_position() {
        let mut s = MemoryStream::from("hello world");
        let mut buf = [0u8; 5];
        assert_eq!(s.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(s.position(), 5);
        assert_eq!(s.size(), 11);
    }

    #[test]
    fn test_memory_stream_short_read_at_tail() {
        let mut s = MemoryStream::from("abc");
        s.seek(2).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(s.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'c');
        // At end: reads return 0, not an error.
        assert_eq!(s.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_memory_stream_seek_past_end_reads_nothing() {
        let mut s = MemoryStream::from("abc");
        s.seek(100).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(s.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_file_stream_round_trip() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        let mut s = FileStream::open(tmp.path()).unwrap();
        assert_eq!(s.size(), 10);
        s.seek(4).unwrap();
        let mut buf = [0u8; 3];
        assert_eq!(s.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"456");
        assert_eq!(s.position(), 7);
    }
}
