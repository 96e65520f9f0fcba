//! Composable stream wrappers
//!
//! Sources and sinks participate through the standard `Read`, `Write` and `Seek`
//! capabilities plus [`Named`]. Every wrapper owns what it wraps and forwards all
//! bytes unchanged; some additionally observe how many bytes went through.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Something with a human-readable label, used for progress display only
pub trait Named {
    fn name(&self) -> &str;
}

/// A readable, rewindable source that can be moved between threads
pub trait SeekRead: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekRead for T {}

/// Receives the number of bytes moved by each read or write
pub trait Tick {
    fn tick(&mut self, n: u64);
}

impl<F: FnMut(u64)> Tick for F {
    fn tick(&mut self, n: u64) {
        self(n)
    }
}

/// Forwards every written chunk to two independent sinks
#[derive(Debug)]
pub struct TeeWriter<A, B> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

/// A sink that only counts the bytes written to it
#[derive(Debug, Default, Clone, Copy)]
pub struct Sizer {
    written: u64,
}

impl Sizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Write for Sizer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Attaches a label to a reader
pub struct NamedReader<R> {
    name: String,
    inner: R,
}

impl<R> NamedReader<R> {
    pub fn new(name: impl Into<String>, inner: R) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> Named for NamedReader<R> {
    fn name(&self) -> &str {
        &self.name
    }
}

impl<R: Read> Read for NamedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for NamedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl<R> std::fmt::Debug for NamedReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedReader").field("name", &self.name).finish()
    }
}

/// Shorthand for [`NamedReader::new`]
pub fn named<R>(name: impl Into<String>, inner: R) -> NamedReader<R> {
    NamedReader::new(name, inner)
}

/// Forwards reads unchanged and reports each read's length to a tick observer
pub struct ProgressReader<R, T> {
    inner: R,
    observer: T,
}

impl<R, T> ProgressReader<R, T> {
    pub fn new(inner: R, observer: T) -> Self {
        Self { inner, observer }
    }

    pub fn into_inner(self) -> (R, T) {
        (self.inner, self.observer)
    }
}

impl<R: Read, T: Tick> Read for ProgressReader<R, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.observer.tick(n as u64);
        Ok(n)
    }
}

impl<R: Named, T> Named for ProgressReader<R, T> {
    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Forwards writes unchanged and reports each write's length to a tick observer
pub struct ProgressWriter<W, T> {
    inner: W,
    observer: T,
}

impl<W, T> ProgressWriter<W, T> {
    pub fn new(inner: W, observer: T) -> Self {
        Self { inner, observer }
    }

    pub fn into_inner(self) -> (W, T) {
        (self.inner, self.observer)
    }
}

impl<W: Write, T: Tick> Write for ProgressWriter<W, T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.observer.tick(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Read until `buf` is full or the source ends, returning the number of bytes read
pub fn read_full<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_tee_writer_feeds_both_sinks() {
        let mut tee = TeeWriter::new(Vec::new(), Sizer::new());
        tee.write_all(b"hello ").unwrap();
        tee.write_all(b"world").unwrap();

        let (bytes, sizer) = tee.into_inner();
        assert_eq!(bytes, b"hello world");
        assert_eq!(sizer.written(), 11);
    }

    #[test]
    fn test_named_reader_forwards_reads_and_seeks() {
        let mut reader = named("greeting", Cursor::new(b"hello".to_vec()));
        assert_eq!(reader.name(), "greeting");

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");

        reader.seek(SeekFrom::Start(0)).unwrap();
        out.clear();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_progress_reader_reports_every_read() {
        let mut seen = Vec::new();
        let mut reader = ProgressReader::new(Cursor::new(vec![7u8; 10]), |n| seen.push(n));

        let mut buf = [0u8; 4];
        while reader.read(&mut buf).unwrap() > 0 {}
        drop(reader);

        assert_eq!(seen, vec![4, 4, 2, 0]);
    }

    #[test]
    fn test_progress_writer_does_not_alter_content() {
        let mut total = 0;
        let mut writer = ProgressWriter::new(Vec::new(), |n| total += n);
        writer.write_all(b"abc").unwrap();
        writer.write_all(b"").unwrap();
        let (bytes, _) = writer.into_inner();

        assert_eq!(bytes, b"abc");
        assert_eq!(total, 3);
    }

    #[test]
    fn test_read_full_stops_at_end_of_source() {
        let mut source = Cursor::new(vec![1u8; 5]);
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut source, &mut buf).unwrap(), 5);
        assert_eq!(read_full(&mut source, &mut buf).unwrap(), 0);
    }
}
