use crate::counts::PartialAggregation;
use crate::error::AggError;
use crate::source::{Chunk, Schema};

/// Turns one chunk into a partial aggregation.
///
/// Implementations run concurrently on the worker pool and must not touch
/// shared mutable state. Mapping the same chunk twice yields equal results.
pub trait Mapper: Send + Sync {
    /// Checked once against the header before any chunk is dispatched
    fn prepare(&self, _schema: &Schema) -> Result<(), AggError> {
        Ok(())
    }

    fn map(&self, chunk: &Chunk) -> Result<PartialAggregation, AggError>;
}

impl<F> Mapper for F
where
    F: Fn(&Chunk) -> Result<PartialAggregation, AggError> + Send + Sync,
{
    fn map(&self, chunk: &Chunk) -> Result<PartialAggregation, AggError> {
        self(chunk)
    }
}

/// Counts records per value of one named field
#[derive(Debug, Clone)]
pub struct GroupCountMapper {
    field: String,
}

impl GroupCountMapper {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn column(&self, schema: &Schema) -> Result<usize, AggError> {
        schema.index_of(&self.field).ok_or_else(|| {
            AggError::config(format!(
                "field '{}' not present in header (available: {})",
                self.field,
                schema.fields().join(", ")
            ))
        })
    }
}

impl Mapper for GroupCountMapper {
    fn prepare(&self, schema: &Schema) -> Result<(), AggError> {
        self.column(schema).map(|_| ())
    }

    /// Fails on the first record whose width differs from the header or
    /// whose grouping value is not UTF-8. The empty string is a valid key.
    fn map(&self, chunk: &Chunk) -> Result<PartialAggregation, AggError> {
        let schema = chunk.schema();
        let column = self.column(schema)?;
        let width = schema.len();

        let mut counts = PartialAggregation::new();
        for record in chunk.records() {
            if record.len() != width {
                return Err(AggError::map_failure(
                    chunk.index(),
                    record.number(),
                    format!("expected {} fields, found {}", width, record.len()),
                ));
            }
            let raw = record.get_index(column).unwrap_or_default();
            let key = std::str::from_utf8(raw).map_err(|e| {
                AggError::map_failure(
                    chunk.index(),
                    record.number(),
                    format!("field '{}' is not valid UTF-8: {}", self.field, e),
                )
            })?;
            counts.increment(key);
        }
        Ok(counts)
    }
}
