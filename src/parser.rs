//! Tuple scanner for MediaWiki SQL dump lines.
//!
//! Dump files are `INSERT INTO ... VALUES (...),(...),...;` statements with
//! thousands of tuples per line. Rather than parse SQL, each line is scanned for
//! every non-overlapping tuple shaped like a row of the table being read.

use crate::compression::Compression;
use crate::config::{CATEGORY_NAMESPACE, SUBCAT_TYPE};
use crate::models::{CategoryId, CategoryRecord, DumpRecord, DumpTable, LinkRecord, PageRecord};
use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::trace;

/// `(id,'name',pages,subcats,files)`
static CATEGORY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s-u)\(\d+,('(?:[^'\\]|\\.)*'),(\d+),(\d+),\d+\)").unwrap()
});

/// `(from,'to','sortkey','timestamp','prefix','collation','type')`
static CATEGORY_LINKS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s-u)\((\d+),('(?:[^'\\]|\\.)*'),(?:'(?:[^'\\]|\\.)*',){4}'([a-z]+)'\)").unwrap()
});

/// `(id,namespace,'title',` followed by columns we never read
static PAGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s-u)\((\d+),(\d+),('(?:[^'\\]|\\.)*'),").unwrap());

const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Records found on one line, plus how many matched tuples could not be decoded.
#[derive(Debug, Default)]
pub struct ParsedLine {
    pub records: Vec<DumpRecord>,
    pub rejected: u64,
    /// Tuples of the right shape that belong to another namespace or membership kind.
    pub filtered: u64,
}

pub fn parse_line(table: DumpTable, line: &[u8]) -> ParsedLine {
    match table {
        DumpTable::Category => parse_category_line(line),
        DumpTable::CategoryLinks => parse_category_links_line(line),
        DumpTable::Page => parse_page_line(line),
    }
}

pub fn parse_category_line(line: &[u8]) -> ParsedLine {
    let mut parsed = ParsedLine::default();
    for caps in CATEGORY_REGEX.captures_iter(line) {
        match decode_category(&caps) {
            Some(record) => parsed.records.push(DumpRecord::Category(record)),
            None => parsed.rejected += 1,
        }
    }
    parsed
}

fn decode_category(caps: &Captures) -> Option<CategoryRecord> {
    Some(CategoryRecord {
        name: decode_literal(&caps[1])?,
        page_count: parse_int(&caps[2])?,
        subcategory_count: parse_int(&caps[3])?,
    })
}

pub fn parse_category_links_line(line: &[u8]) -> ParsedLine {
    let mut parsed = ParsedLine::default();
    for caps in CATEGORY_LINKS_REGEX.captures_iter(line) {
        if &caps[3] != SUBCAT_TYPE {
            parsed.filtered += 1;
            continue;
        }
        let record = parse_int::<CategoryId>(&caps[1])
            .zip(decode_literal(&caps[2]))
            .map(|(child_id, parent_name)| LinkRecord {
                child_id,
                parent_name,
            });
        match record {
            Some(record) => parsed.records.push(DumpRecord::Link(record)),
            None => parsed.rejected += 1,
        }
    }
    parsed
}

pub fn parse_page_line(line: &[u8]) -> ParsedLine {
    let mut parsed = ParsedLine::default();
    for caps in PAGE_REGEX.captures_iter(line) {
        if parse_int::<u32>(&caps[2]) != Some(CATEGORY_NAMESPACE) {
            parsed.filtered += 1;
            continue;
        }
        let record = parse_int::<CategoryId>(&caps[1])
            .zip(decode_literal(&caps[3]))
            .map(|(page_id, name)| PageRecord { page_id, name });
        match record {
            Some(record) => parsed.records.push(DumpRecord::Page(record)),
            None => parsed.rejected += 1,
        }
    }
    parsed
}

fn parse_int<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Decodes a quoted SQL string literal, falling back to Latin-1 for invalid UTF-8.
pub fn decode_literal(quoted: &[u8]) -> Option<String> {
    let inner = quoted.strip_prefix(b"'")?.strip_suffix(b"'")?;
    let bytes = unescape(inner);
    match String::from_utf8(bytes) {
        Ok(s) => Some(s),
        Err(e) => {
            trace!("Literal is not valid UTF-8, decoding as Latin-1");
            Some(e.into_bytes().into_iter().map(char::from).collect())
        }
    }
}

/// MySQL backslash escapes; an unknown escape keeps the escaped byte.
fn unescape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter();
    while let Some(&b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'0') => out.push(0),
            Some(b'n') => out.push(b'\n'),
            Some(b'r') => out.push(b'\r'),
            Some(b't') => out.push(b'\t'),
            Some(b'b') => out.push(0x08),
            Some(b'Z') => out.push(0x1a),
            Some(&other) => out.push(other),
            None => out.push(b'\\'),
        }
    }
    out
}

/// Lazily turns a stream of dump lines into records of one kind.
///
/// `T` picks which [`DumpRecord`] variant is yielded; the table decides which
/// pattern is scanned for. Only one line is held in memory at a time.
pub struct RecordReader<I, T> {
    lines: I,
    table: DumpTable,
    pending: std::vec::IntoIter<DumpRecord>,
    lines_read: u64,
    rejected: u64,
    filtered: u64,
    _record: std::marker::PhantomData<T>,
}

impl<I, T> RecordReader<I, T>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
    T: TryFrom<DumpRecord>,
{
    pub fn new(table: DumpTable, lines: I) -> Self {
        Self {
            lines,
            table,
            pending: Vec::new().into_iter(),
            lines_read: 0,
            rejected: 0,
            filtered: 0,
            _record: std::marker::PhantomData,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Matched tuples dropped because a field failed to decode.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Matched tuples skipped for being outside namespace 14 or not `subcat`.
    pub fn filtered(&self) -> u64 {
        self.filtered
    }
}

impl<I, T> Iterator for RecordReader<I, T>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
    T: TryFrom<DumpRecord>,
{
    type Item = io::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                match T::try_from(record) {
                    Ok(record) => return Some(Ok(record)),
                    Err(_) => continue,
                }
            }

            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            self.lines_read += 1;

            let parsed = parse_line(self.table, &line);
            self.rejected += parsed.rejected;
            self.filtered += parsed.filtered;
            self.pending = parsed.records.into_iter();
        }
    }
}

impl TryFrom<DumpRecord> for CategoryRecord {
    type Error = DumpRecord;

    fn try_from(record: DumpRecord) -> Result<Self, Self::Error> {
        match record {
            DumpRecord::Category(c) => Ok(c),
            other => Err(other),
        }
    }
}

impl TryFrom<DumpRecord> for LinkRecord {
    type Error = DumpRecord;

    fn try_from(record: DumpRecord) -> Result<Self, Self::Error> {
        match record {
            DumpRecord::Link(l) => Ok(l),
            other => Err(other),
        }
    }
}

impl TryFrom<DumpRecord> for PageRecord {
    type Error = DumpRecord;

    fn try_from(record: DumpRecord) -> Result<Self, Self::Error> {
        match record {
            DumpRecord::Page(p) => Ok(p),
            other => Err(other),
        }
    }
}

/// Byte-line source over a local dump file, decompressing `.gz` and `.bz2` by extension.
pub struct DumpReader {
    reader: Box<dyn BufRead>,
}

impl DumpReader {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::from_reader(Compression::open(path)?))
    }

    pub fn from_reader<R: Read + 'static>(reader: R) -> Self {
        Self {
            reader: Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, reader)),
        }
    }

    pub fn lines(self) -> io::Split<Box<dyn BufRead>> {
        self.reader.split(b'\n')
    }

    pub fn records<T: TryFrom<DumpRecord>>(
        self,
        table: DumpTable,
    ) -> RecordReader<io::Split<Box<dyn BufRead>>, T> {
        RecordReader::new(table, self.lines())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> impl Iterator<Item = io::Result<Vec<u8>>> {
        raw.iter()
            .map(|l| Ok(l.as_bytes().to_vec()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn category_with_escaped_quote() {
        let parsed = parse_category_line(br"INSERT INTO `category` VALUES (5,'Foo\'s Bar',12,3,0);");
        assert_eq!(parsed.rejected, 0);
        assert_eq!(
            parsed.records,
            vec![DumpRecord::Category(CategoryRecord {
                name: "Foo's Bar".to_string(),
                page_count: 12,
                subcategory_count: 3,
            })]
        );
        match &parsed.records[0] {
            DumpRecord::Category(c) => assert_eq!(c.own_pages(), 9),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn category_line_with_many_tuples() {
        let parsed =
            parse_category_line(b"INSERT INTO `category` VALUES (1,'A',3,1,0),(2,'B_c',0,0,0),(3,'D',7,7,2);");
        assert_eq!(parsed.records.len(), 3);
    }

    #[test]
    fn line_without_tuples_yields_nothing() {
        let parsed = parse_category_line(b"-- MySQL dump 10.19  Distrib 10.3.38-MariaDB");
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.rejected, 0);
    }

    #[test]
    fn links_keep_only_subcat_rows() {
        let line = b"INSERT INTO `categorylinks` VALUES \
            (100,'Science','SCIENCE','2020-01-01 00:00:00','','uppercase','subcat'),\
            (101,'Science','ART','2020-01-01 00:00:00','','uppercase','page'),\
            (102,'Science','X','2020-01-01 00:00:00','','uppercase','file');";
        let parsed = parse_category_links_line(line);
        assert_eq!(parsed.filtered, 2);
        assert_eq!(
            parsed.records,
            vec![DumpRecord::Link(LinkRecord {
                child_id: 100,
                parent_name: "Science".to_string(),
            })]
        );
    }

    #[test]
    fn links_sortkey_may_contain_quotes_and_newlines() {
        let line = b"(7,'Physics','PHYS\\'ICS\nX','2020-01-01 00:00:00','','uca-default','subcat')";
        let parsed = parse_category_links_line(line);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn pages_keep_only_category_namespace() {
        let line = b"INSERT INTO `page` VALUES (10,0,'Rust',0,0,0.5,'20240101000000',NULL,1,20,'wikitext',NULL),\
            (11,14,'Programming_languages',0,0,0.2,'20240101000000',NULL,2,30,'wikitext',NULL);";
        let parsed = parse_page_line(line);
        assert_eq!(parsed.filtered, 1);
        assert_eq!(
            parsed.records,
            vec![DumpRecord::Page(PageRecord {
                page_id: 11,
                name: "Programming_languages".to_string(),
            })]
        );
    }

    #[test]
    fn overflowing_id_is_rejected_not_fatal() {
        let parsed = parse_page_line(b"(99999999999,14,'Huge',0),(3,14,'Small',0)");
        assert_eq!(parsed.rejected, 1);
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let decoded = decode_literal(b"'Caf\xe9'").unwrap();
        assert_eq!(decoded, "Caf\u{e9}");
    }

    #[test]
    fn utf8_literal_decodes() {
        let decoded = decode_literal("'Économie_du_Québec'".as_bytes()).unwrap();
        assert_eq!(decoded, "Économie_du_Québec");
    }

    #[test]
    fn unescape_handles_mysql_escapes() {
        assert_eq!(unescape(br#"a\\b\"c\nd\0"#), b"a\\b\"c\nd\0".to_vec());
        assert_eq!(unescape(b"trailing\\"), b"trailing\\".to_vec());
    }

    #[test]
    fn record_reader_streams_across_lines() {
        let input = lines(&[
            "(1,14,'A',0),(2,0,'Main',0)",
            "nothing here",
            "(3,14,'B',0)",
        ]);
        let mut reader: RecordReader<_, PageRecord> = RecordReader::new(DumpTable::Page, input);
        let pages: Vec<PageRecord> = reader.by_ref().map(|r| r.unwrap()).collect();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].name, "B");
        assert_eq!(reader.lines_read(), 3);
        assert_eq!(reader.filtered(), 1);
    }

    #[test]
    fn record_reader_surfaces_io_errors() {
        let input = vec![
            Ok(b"(1,14,'A',0)".to_vec()),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ]
        .into_iter();
        let results: Vec<io::Result<PageRecord>> = RecordReader::new(DumpTable::Page, input).collect();
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn dump_reader_splits_lines() {
        let data = b"(1,14,'A',0)\n(2,14,'B',0)\n".to_vec();
        let reader = DumpReader::from_reader(io::Cursor::new(data));
        let pages: Vec<PageRecord> = reader
            .records(DumpTable::Page)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(pages.len(), 2);
    }
}
