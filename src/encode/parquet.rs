use crate::error::{ExtractorError, Result};
use crate::schema::{FieldType, NormalizedRecord, FIELDS};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::sync::Arc;

/// Arrow schema derived from the fixed column table; every column nullable.
pub fn arrow_schema() -> Schema {
    let fields: Vec<Field> = FIELDS
        .iter()
        .map(|(name, kind)| {
            let data_type = match kind {
                FieldType::Utf8 => DataType::Utf8,
                FieldType::Int64 => DataType::Int64,
            };
            Field::new(*name, data_type, true)
        })
        .collect();
    Schema::new(fields)
}

fn utf8_column<'a, F>(batch: &'a [NormalizedRecord], get: F) -> ArrayRef
where
    F: Fn(&'a NormalizedRecord) -> Option<&'a str>,
{
    Arc::new(StringArray::from_iter(batch.iter().map(get)))
}

fn int64_column<F>(batch: &[NormalizedRecord], get: F) -> ArrayRef
where
    F: Fn(&NormalizedRecord) -> Option<i64>,
{
    Arc::new(Int64Array::from_iter(batch.iter().map(get)))
}

/// Encodes the batch as SNAPPY-compressed Parquet against the fixed schema.
/// Column order must match [`FIELDS`]; the integer columns carry the values
/// the normalizer already coerced.
pub fn encode(batch: &[NormalizedRecord]) -> Result<Vec<u8>> {
    let schema = Arc::new(arrow_schema());
    let columns: Vec<ArrayRef> = vec![
        utf8_column(batch, |r| r.gender.as_deref()),
        utf8_column(batch, |r| r.first_name.as_deref()),
        utf8_column(batch, |r| r.last_name.as_deref()),
        utf8_column(batch, |r| r.email.as_deref()),
        utf8_column(batch, |r| r.country.as_deref()),
        utf8_column(batch, |r| r.state.as_deref()),
        utf8_column(batch, |r| r.city.as_deref()),
        utf8_column(batch, |r| r.postcode.as_deref()),
        int64_column(batch, |r| r.street_number),
        utf8_column(batch, |r| r.street_name.as_deref()),
        utf8_column(batch, |r| r.phone.as_deref()),
        utf8_column(batch, |r| r.cell.as_deref()),
        utf8_column(batch, |r| r.nat.as_deref()),
        utf8_column(batch, |r| r.dob.as_deref()),
        int64_column(batch, |r| r.age),
        utf8_column(batch, |r| r.registered_date.as_deref()),
        int64_column(batch, |r| r.registered_age),
        utf8_column(batch, |r| r.uuid.as_deref()),
        utf8_column(batch, |r| r.username.as_deref()),
        utf8_column(batch, |r| r.picture_large.as_deref()),
        utf8_column(batch, |r| r.picture_medium.as_deref()),
        utf8_column(batch, |r| r.picture_thumbnail.as_deref()),
        utf8_column(batch, |r| r.id_name.as_deref()),
        utf8_column(batch, |r| r.id_value.as_deref()),
    ];

    let record_batch = RecordBatch::try_new(schema.clone(), columns).map_err(|e| {
        ExtractorError::Encode {
            message: format!("arrow batch construction failed: {}", e),
        }
    })?;

    let properties = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut out = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut out, schema, Some(properties)).map_err(|e| {
            ExtractorError::Encode {
                message: format!("parquet writer init failed: {}", e),
            }
        })?;
    writer.write(&record_batch).map_err(|e| ExtractorError::Encode {
        message: format!("parquet write failed: {}", e),
    })?;
    writer.close().map_err(|e| ExtractorError::Encode {
        message: format!("parquet close failed: {}", e),
    })?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use bytes::Bytes;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn sample_batch() -> Vec<NormalizedRecord> {
        vec![
            NormalizedRecord {
                gender: Some("male".to_string()),
                first_name: Some("John".to_string()),
                postcode: Some("12345".to_string()),
                street_number: Some(42),
                age: Some(34),
                ..Default::default()
            },
            NormalizedRecord {
                gender: Some("female".to_string()),
                first_name: Some("Ana".to_string()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn schema_follows_the_column_table() {
        let schema = arrow_schema();
        assert_eq!(schema.fields().len(), FIELDS.len());
        assert_eq!(schema.field(0).name(), "gender");
        assert_eq!(schema.field(8).name(), "street_number");
        assert_eq!(schema.field(8).data_type(), &DataType::Int64);
        assert_eq!(schema.field(14).name(), "age");
        assert_eq!(schema.field(16).name(), "registered_age");
        assert!(schema.fields().iter().all(|f| f.is_nullable()));
    }

    #[test]
    fn round_reads_values_and_nulls() {
        let bytes = Bytes::from(encode(&sample_batch()).unwrap());
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
            .unwrap()
            .build()
            .unwrap();

        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), FIELDS.len());

        let genders = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(genders.value(0), "male");
        assert_eq!(genders.value(1), "female");

        let street_numbers = batch
            .column(8)
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(street_numbers.value(0), 42);
        assert!(street_numbers.is_null(1));
    }

    #[test]
    fn output_is_snappy_compressed() {
        let bytes = Bytes::from(encode(&sample_batch()).unwrap());
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).unwrap();
        let row_group = builder.metadata().row_group(0);
        assert_eq!(row_group.column(0).compression(), Compression::SNAPPY);
    }

    #[test]
    fn empty_batch_still_writes_a_valid_file() {
        let bytes = Bytes::from(encode(&[]).unwrap());
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes).unwrap();
        assert_eq!(builder.schema().fields().len(), FIELDS.len());
    }
}
