use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Stream compression, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }

    /// Extension appended to a file name, dot included (empty for `None`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Bzip2 => ".bz2",
        }
    }

    pub fn open(path: &Path) -> io::Result<Box<dyn Read>> {
        let file = File::open(path)?;
        Ok(match Self::from_path(path) {
            Compression::Gzip => Box::new(MultiGzDecoder::new(file)),
            Compression::Bzip2 => Box::new(BzDecoder::new(file)),
            Compression::None => Box::new(file),
        })
    }

    pub fn create(path: &Path) -> io::Result<CompressedWriter> {
        let file = BufWriter::with_capacity(WRITE_BUFFER_SIZE, File::create(path)?);
        Ok(match Self::from_path(path) {
            Compression::Gzip => CompressedWriter::Gzip(GzEncoder::new(file, flate2::Compression::default())),
            Compression::Bzip2 => CompressedWriter::Bzip2(BzEncoder::new(file, bzip2::Compression::default())),
            Compression::None => CompressedWriter::Plain(file),
        })
    }
}

/// File writer that must be [`finish`](CompressedWriter::finish)ed to flush the compressed trailer.
pub enum CompressedWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
}

impl CompressedWriter {
    pub fn finish(self) -> io::Result<()> {
        let mut inner = match self {
            CompressedWriter::Plain(w) => w,
            CompressedWriter::Gzip(w) => w.finish()?,
            CompressedWriter::Bzip2(w) => w.finish()?,
        };
        inner.flush()
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressedWriter::Plain(w) => w.write(buf),
            CompressedWriter::Gzip(w) => w.write(buf),
            CompressedWriter::Bzip2(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressedWriter::Plain(w) => w.flush(),
            CompressedWriter::Gzip(w) => w.flush(),
            CompressedWriter::Bzip2(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(Compression::from_path(Path::new("a.sql.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("a.sql.bz2")), Compression::Bzip2);
        assert_eq!(Compression::from_path(Path::new("a.sql")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("a")), Compression::None);
    }

    #[test]
    fn write_then_read_each_format() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["plain.txt", "packed.txt.gz", "packed.txt.bz2"] {
            let path = dir.path().join(name);
            let mut w = Compression::create(&path).unwrap();
            w.write_all(b"line one\nline two\n").unwrap();
            w.finish().unwrap();

            let mut out = String::new();
            Compression::open(&path).unwrap().read_to_string(&mut out).unwrap();
            assert_eq!(out, "line one\nline two\n", "{}", name);
        }
    }
}
