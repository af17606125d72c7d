use crate::domain::Instrument;
use polars::prelude::*;

pub const DATE_COLUMN: &str = "date";

/// Crypto columns: never null in a valid table.
pub const REQUIRED_COLUMNS: [&str; 3] = ["price", "total_volume", "market_cap"];

/// Expected schema for the observation table
pub struct TableSchema;

impl TableSchema {
    /// Get the canonical table schema, in persisted column order
    pub fn schema() -> Schema {
        let mut fields = vec![Field::new(DATE_COLUMN.into(), DataType::Date)];
        fields.extend(
            REQUIRED_COLUMNS
                .iter()
                .map(|name| Field::new((*name).into(), DataType::Float64)),
        );
        fields.extend(
            Instrument::ALL
                .iter()
                .map(|i| Field::new(i.column().into(), DataType::Float64)),
        );
        Schema::from_iter(fields)
    }

    /// Validate DataFrame against schema
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let expected = Self::schema();
        let actual = df.schema();

        // Check all required columns exist
        for field in expected.iter_fields() {
            if !actual.contains(field.name()) {
                return Err(SchemaError::MissingColumn(field.name().to_string()));
            }
        }

        // Check data types match
        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
