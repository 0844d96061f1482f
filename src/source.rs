//! Chunked record source
//!
//! Streams a delimited file with a header row and hands out fixed-size,
//! contiguous chunks of records in file order. The source is forward-only:
//! once it reports end of input (or an error) it stays exhausted.

use csv::{ByteRecord, ReaderBuilder};
use std::io::Read;
use std::sync::Arc;

use crate::config::AggregatorConfig;
use crate::decompression::open_input;
use crate::error::AggError;

const MAX_PREALLOCATED_RECORDS: usize = 65_536;

/// Field names from the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<String>,
}

impl Schema {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the first column named `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }
}

/// A borrowed view of one record, addressable by field name
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    number: u64,
    fields: &'a ByteRecord,
    schema: &'a Schema,
}

impl<'a> Record<'a> {
    /// One-based position among the data records of the file
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.schema
            .index_of(name)
            .and_then(|index| self.fields.get(index))
    }

    pub fn get_index(&self, index: usize) -> Option<&'a [u8]> {
        self.fields.get(index)
    }
}

/// Contiguous run of at most `chunk_size` records
#[derive(Debug, Clone)]
pub struct Chunk {
    index: u64,
    first_record: u64,
    schema: Arc<Schema>,
    records: Vec<ByteRecord>,
}

impl Chunk {
    pub fn new(index: u64, first_record: u64, schema: Arc<Schema>, records: Vec<ByteRecord>) -> Self {
        Self {
            index,
            first_record,
            schema,
            records,
        }
    }

    /// Zero-based position of this chunk in the file
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn first_record(&self) -> u64 {
        self.first_record
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        let schema: &Schema = &self.schema;
        self.records
            .iter()
            .zip(self.first_record..)
            .map(move |(fields, number)| Record {
                number,
                fields,
                schema,
            })
    }
}

/// Sequential, single-reader chunker over a delimited record stream
pub struct ChunkSource {
    reader: csv::Reader<Box<dyn Read + Send>>,
    schema: Arc<Schema>,
    origin: String,
    chunk_size: usize,
    next_index: u64,
    records_read: u64,
    exhausted: bool,
}

impl ChunkSource {
    /// Open the input named by `config` and read its header row
    pub fn open(config: &AggregatorConfig) -> Result<Self, AggError> {
        let stream = open_input(&config.input.source)?;
        Self::from_reader(
            stream,
            config.input.source.display_name(),
            config.input.delimiter,
            config.performance.chunk_size,
        )
    }

    /// Build a source over any byte stream; used directly by tests and benchmarks
    pub fn from_reader(
        stream: Box<dyn Read + Send>,
        origin: impl Into<String>,
        delimiter: u8,
        chunk_size: usize,
    ) -> Result<Self, AggError> {
        let origin = origin.into();
        if chunk_size == 0 {
            return Err(AggError::config("chunk size must be a positive integer"));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(stream);

        let headers = reader
            .byte_headers()
            .map_err(|e| csv_error(&origin, e))?
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();

        Ok(Self {
            reader,
            schema: Arc::new(Schema::new(headers)),
            origin,
            chunk_size,
            next_index: 0,
            records_read: 0,
            exhausted: false,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn chunks_emitted(&self) -> u64 {
        self.next_index
    }

    /// Next chunk in file order, or `None` at end of input.
    ///
    /// A short final chunk is emitted as-is. After an error the source is
    /// exhausted and keeps returning `None`.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>, AggError> {
        if self.exhausted {
            return Ok(None);
        }

        let first_record = self.records_read + 1;
        let mut records = Vec::with_capacity(self.chunk_size.min(MAX_PREALLOCATED_RECORDS));
        while records.len() < self.chunk_size {
            let mut record = ByteRecord::new();
            match self.reader.read_byte_record(&mut record) {
                Ok(true) => records.push(record),
                Ok(false) => {
                    self.exhausted = true;
                    break;
                }
                Err(e) => {
                    self.exhausted = true;
                    return Err(csv_error(&self.origin, e));
                }
            }
        }

        if records.is_empty() {
            return Ok(None);
        }

        self.records_read += records.len() as u64;
        let chunk = Chunk::new(self.next_index, first_record, Arc::clone(&self.schema), records);
        self.next_index += 1;
        Ok(Some(chunk))
    }
}

impl Iterator for ChunkSource {
    type Item = Result<Chunk, AggError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl std::iter::FusedIterator for ChunkSource {}

impl std::fmt::Debug for ChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSource")
            .field("origin", &self.origin)
            .field("chunk_size", &self.chunk_size)
            .field("next_index", &self.next_index)
            .field("records_read", &self.records_read)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

/// Byte records on a flexible reader only fail on the underlying stream
fn csv_error(origin: &str, err: csv::Error) -> AggError {
    let io_error = if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(io_error) => io_error,
            other => std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", other)),
        }
    } else {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
    };
    AggError::io(origin, io_error)
}
