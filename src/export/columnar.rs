//! Parquet copies of the result tables.
//!
//! Scalar columns map one-to-one; TIC traces are stored as `List<Float64>`
//! rows so a whole trace is read back without scanning a long table.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Float64Builder, ListBuilder, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::schema::types::ColumnPath;

use super::ExportError;
use crate::store::{Ms2MatchRecord, PeakRecord, TicRecord};

/// ZSTD level used for every table
pub const COMPRESSION_LEVEL: i32 = 3;

fn trace_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Float64, false))
}

fn writer_properties(list_columns: &[&str]) -> WriterProperties {
    let compression = Compression::ZSTD(
        ZstdLevel::try_new(COMPRESSION_LEVEL).unwrap_or_default(),
    );

    let mut builder = WriterProperties::builder().set_compression(compression);
    // Trace values are nearly unique
    for column in list_columns {
        builder = builder.set_column_dictionary_enabled(
            ColumnPath::new(vec![column.to_string(), "list".to_string(), "item".to_string()]),
            false,
        );
    }
    builder.build()
}

fn write_batch(path: &Path, batch: &RecordBatch, props: WriterProperties) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn identity_columns<'a, I>(rows: I) -> [ArrayRef; 4]
where
    I: Iterator<Item = (&'a str, u32, &'static str, &'static str)> + Clone,
{
    [
        Arc::new(StringArray::from_iter_values(rows.clone().map(|r| r.0))),
        Arc::new(UInt32Array::from_iter_values(rows.clone().map(|r| r.1))),
        Arc::new(StringArray::from_iter_values(rows.clone().map(|r| r.2))),
        Arc::new(StringArray::from_iter_values(rows.map(|r| r.3))),
    ]
}

fn identity_fields() -> Vec<Field> {
    vec![
        Field::new("file_name", DataType::Utf8, false),
        Field::new("run_num", DataType::UInt32, false),
        Field::new("file_category", DataType::Utf8, false),
        Field::new("polarity", DataType::Utf8, false),
    ]
}

/// Schema of the MS1 peak table
pub fn peak_schema() -> SchemaRef {
    let mut fields = identity_fields();
    fields.push(Field::new("compound_name", DataType::Utf8, false));
    for name in [
        "retention_time",
        "theoretical_mz",
        "observed_mz",
        "ppm_error",
        "observed_intensity",
    ] {
        fields.push(Field::new(name, DataType::Float64, false));
    }
    Arc::new(Schema::new(fields))
}

/// Schema of the MS1 TIC table
pub fn tic_schema() -> SchemaRef {
    let mut fields = identity_fields();
    fields.push(Field::new("group", DataType::Utf8, false));
    fields.push(Field::new("retention_times", DataType::List(trace_field()), false));
    fields.push(Field::new("tic_intensities", DataType::List(trace_field()), false));
    Arc::new(Schema::new(fields))
}

/// Schema of the MS2 match table
pub fn ms2_schema() -> SchemaRef {
    let mut fields = identity_fields();
    for name in ["theoretical_mz", "observed_mz", "ppm_error", "observed_intensity"] {
        fields.push(Field::new(name, DataType::Float64, false));
    }
    Arc::new(Schema::new(fields))
}

fn f64_column<T>(rows: &[T], value: impl Fn(&T) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(rows.iter().map(value)))
}

/// Write the MS1 peak table
pub fn write_peaks(path: &Path, rows: &[PeakRecord]) -> Result<(), ExportError> {
    let ids = rows
        .iter()
        .map(|r| (r.file_name.as_str(), r.run_num, r.file_category.as_str(), r.polarity.as_str()));
    let mut columns: Vec<ArrayRef> = identity_columns(ids).into();
    columns.push(Arc::new(StringArray::from_iter_values(
        rows.iter().map(|r| r.compound_name.as_str()),
    )));
    columns.push(f64_column(rows, |r| r.retention_time));
    columns.push(f64_column(rows, |r| r.theoretical_mz));
    columns.push(f64_column(rows, |r| r.observed_mz));
    columns.push(f64_column(rows, |r| r.ppm_error));
    columns.push(f64_column(rows, |r| r.observed_intensity));

    let batch = RecordBatch::try_new(peak_schema(), columns)?;
    write_batch(path, &batch, writer_properties(&[]))
}

/// Write the MS1 TIC table
pub fn write_tics(path: &Path, rows: &[TicRecord]) -> Result<(), ExportError> {
    let ids = rows
        .iter()
        .map(|r| (r.file_name.as_str(), r.run_num, r.file_category.as_str(), r.polarity.as_str()));
    let mut columns: Vec<ArrayRef> = identity_columns(ids).into();
    columns.push(Arc::new(StringArray::from_iter_values(
        rows.iter().map(|r| r.group.as_str()),
    )));

    let mut times = ListBuilder::new(Float64Builder::new()).with_field(trace_field());
    let mut intensities = ListBuilder::new(Float64Builder::new()).with_field(trace_field());
    for row in rows {
        times.values().append_slice(&row.retention_times);
        times.append(true);
        intensities.values().append_slice(&row.tic_intensities);
        intensities.append(true);
    }
    columns.push(Arc::new(times.finish()));
    columns.push(Arc::new(intensities.finish()));

    let batch = RecordBatch::try_new(tic_schema(), columns)?;
    write_batch(
        path,
        &batch,
        writer_properties(&["retention_times", "tic_intensities"]),
    )
}

/// Write the MS2 match table
pub fn write_ms2(path: &Path, rows: &[Ms2MatchRecord]) -> Result<(), ExportError> {
    let ids = rows
        .iter()
        .map(|r| (r.file_name.as_str(), r.run_num, r.file_category.as_str(), r.polarity.as_str()));
    let mut columns: Vec<ArrayRef> = identity_columns(ids).into();
    columns.push(f64_column(rows, |r| r.theoretical_mz));
    columns.push(f64_column(rows, |r| r.observed_mz));
    columns.push(f64_column(rows, |r| r.ppm_error));
    columns.push(f64_column(rows, |r| r.observed_intensity));

    let batch = RecordBatch::try_new(ms2_schema(), columns)?;
    write_batch(path, &batch, writer_properties(&[]))
}
