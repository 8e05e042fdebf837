//! Delimited source file reader
//!
//! Wraps a `csv` reader configured for the protest export format and turns
//! each record into a `SourceRow`: a column-name -> string view over one
//! line. Fields are decoded with the configured encoding one record at a
//! time, so arbitrarily large files are streamed.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::Encoding;

use crate::config::ImportOptions;
use crate::error::{ImportError, RowError};

const BOM: char = '\u{feff}';

/// Header names and their positions
#[derive(Debug, Clone, Default)]
pub struct Headers {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Headers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| n.into().trim_start_matches(BOM).trim().to_string())
            .collect();

        // First occurrence wins for duplicated headers.
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }

        Self { names, index }
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One decoded source record
#[derive(Debug, Clone)]
pub struct SourceRow {
    headers: Arc<Headers>,
    values: Vec<String>,
    line: Option<u64>,
}

impl SourceRow {
    pub fn new(headers: Arc<Headers>, values: Vec<String>, line: Option<u64>) -> Self {
        Self {
            headers,
            values,
            line,
        }
    }

    /// Raw value of `column`; `None` when the header lacks the column or the
    /// record is shorter than the header
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .position(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.contains(column)
    }

    /// 1-based line in the source file where this record starts
    pub fn line(&self) -> Option<u64> {
        self.line
    }
}

/// Streaming reader over a delimited file
pub struct SourceReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Arc<Headers>,
    encoding: &'static Encoding,
    record: ByteRecord,
}

impl SourceReader<File> {
    /// Open `path`; a missing file is reported as `SourceNotFound`
    pub fn open(path: &Path, options: &ImportOptions) -> Result<Self, ImportError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ImportError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => ImportError::SourceOpen {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        Self::from_reader(file, options)
    }
}

impl<R: Read> SourceReader<R> {
    pub fn from_reader(input: R, options: &ImportOptions) -> Result<Self, ImportError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(input);

        let encoding = options.encoding;
        let raw_headers = reader
            .byte_headers()
            .map_err(|e| ImportError::Header(e.to_string()))?
            .clone();

        let mut names = Vec::with_capacity(raw_headers.len());
        for (i, field) in raw_headers.iter().enumerate() {
            let name = encoding
                .decode_without_bom_handling_and_without_replacement(field)
                .ok_or_else(|| {
                    ImportError::Header(format!(
                        "column {} is not valid {}",
                        i + 1,
                        encoding.name()
                    ))
                })?;
            names.push(name.into_owned());
        }

        let headers = Headers::new(names);
        if headers.is_empty() || headers.names().iter().all(|n| n.is_empty()) {
            return Err(ImportError::Header("source has no header row".to_string()));
        }

        Ok(Self {
            reader,
            headers: Arc::new(headers),
            encoding,
            record: ByteRecord::new(),
        })
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Line of the record read last
    pub fn current_line(&self) -> Option<u64> {
        self.record.position().map(|p| p.line())
    }

    /// Next record, or `None` at end of input
    ///
    /// The outer error is fatal (the underlying stream failed); the inner
    /// one only concerns this record. With flexible byte records the
    /// tokenizer itself only fails on I/O.
    pub fn next_row(&mut self) -> Result<Option<Result<SourceRow, RowError>>, ImportError> {
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => Ok(None),
            Ok(true) => Ok(Some(self.decode_current())),
            Err(e) => Err(ImportError::SourceRead {
                line: e.position().map(|p| p.line()),
                source: e,
            }),
        }
    }

    fn decode_current(&self) -> Result<SourceRow, RowError> {
        let line = self.current_line();
        let mut values = Vec::with_capacity(self.record.len());

        for (i, field) in self.record.iter().enumerate() {
            let value = self
                .encoding
                .decode_without_bom_handling_and_without_replacement(field)
                .ok_or_else(|| RowError::Encoding {
                    column: self
                        .headers
                        .names()
                        .get(i)
                        .cloned()
                        .unwrap_or_else(|| format!("#{}", i + 1)),
                    encoding: self.encoding.name(),
                })?;
            values.push(value.into_owned());
        }

        Ok(SourceRow::new(Arc::clone(&self.headers), values, line))
    }
}
