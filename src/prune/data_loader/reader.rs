//! Readers for the head of a calibration dataset.

use super::source::{CalibrationSource, HubDataset};
use crate::error::{Error, Result};
use arrow::array::{Array, LargeStringArray, StringArray};
use hf_hub::api::sync::ApiBuilder;
use hf_hub::{Repo, RepoType};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Read at most `limit` texts from the head of `source`
pub(crate) fn read_texts(
    source: &CalibrationSource,
    limit: usize,
    cache_dir: Option<&Path>,
) -> Result<Vec<String>> {
    match source {
        CalibrationSource::Hub(dataset) => read_hub(dataset, limit, cache_dir),
        CalibrationSource::JsonFile(path) => read_json(path, source.column(), limit),
    }
}

/// Hub token from `HF_TOKEN` or `~/.huggingface/token`
fn hf_token() -> Option<String> {
    let token = std::env::var("HF_TOKEN").ok().or_else(|| {
        let path = dirs::home_dir()?.join(".huggingface").join("token");
        std::fs::read_to_string(path).ok()
    })?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn read_hub(dataset: &HubDataset, limit: usize, cache_dir: Option<&Path>) -> Result<Vec<String>> {
    let mut builder = ApiBuilder::new().with_progress(false).with_token(hf_token());
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.to_path_buf());
    }
    let api = builder
        .build()
        .map_err(|e| Error::Dataset(format!("Failed to create hub client: {e}")))?;
    let repo = api.repo(Repo::with_revision(
        dataset.repo_id.to_string(),
        RepoType::Dataset,
        dataset.revision.to_string(),
    ));

    let info = repo
        .info()
        .map_err(|e| Error::Dataset(format!("Failed to list {}: {e}", dataset.repo_id)))?;
    let mut shards: Vec<String> = info
        .siblings
        .into_iter()
        .map(|sibling| sibling.rfilename)
        .filter(|name| dataset.is_shard(name))
        .collect();
    shards.sort();
    if shards.is_empty() {
        return Err(Error::Dataset(format!(
            "No parquet shards under {} in {}",
            dataset.shard_prefix, dataset.repo_id
        )));
    }

    let mut texts = Vec::with_capacity(limit);
    for shard in &shards {
        if texts.len() >= limit {
            break;
        }
        let path = repo
            .get(shard)
            .map_err(|e| Error::Dataset(format!("Failed to download {shard}: {e}")))?;
        read_parquet_column(&path, dataset.repo_id, dataset.column, limit, &mut texts)?;
    }
    Ok(texts)
}

/// Append rows of a string column until `out` holds `limit` texts
pub(crate) fn read_parquet_column(
    path: &Path,
    source_name: &str,
    column: &str,
    limit: usize,
    out: &mut Vec<String>,
) -> Result<()> {
    let file = File::open(path).map_err(|e| parquet_error(path, e))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| parquet_error(path, e))?;
    let index = builder.schema().index_of(column).map_err(|_| Error::MissingColumn {
        source_name: source_name.to_string(),
        column: column.to_string(),
    })?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
    let reader = builder
        .with_projection(mask)
        .with_batch_size(limit.clamp(1, 8192))
        .build()
        .map_err(|e| parquet_error(path, e))?;

    for batch in reader {
        if out.len() >= limit {
            break;
        }
        let batch = batch.map_err(|e| parquet_error(path, e))?;
        let array = batch.column(0);
        let wanted = limit - out.len();
        if let Some(strings) = array.as_any().downcast_ref::<StringArray>() {
            push_strings(strings.iter(), wanted, out);
        } else if let Some(strings) = array.as_any().downcast_ref::<LargeStringArray>() {
            push_strings(strings.iter(), wanted, out);
        } else {
            return Err(Error::Dataset(format!(
                "Column '{column}' in {} is {}, expected strings",
                path.display(),
                array.data_type()
            )));
        }
    }
    Ok(())
}

fn parquet_error(path: &Path, e: impl fmt::Display) -> Error {
    Error::Dataset(format!("Failed to read parquet {}: {e}", path.display()))
}

fn push_strings<'a>(values: impl Iterator<Item = Option<&'a str>>, take: usize, out: &mut Vec<String>) {
    out.extend(values.take(take).map(|v| v.unwrap_or_default().to_string()));
}

/// Read a local JSON-lines file or a single top-level JSON array
pub(crate) fn read_json(path: &Path, column: &str, limit: usize) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| {
        Error::Dataset(format!("Failed to open calibration file {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);
    let source_name = path.display().to_string();

    let mut first = String::new();
    loop {
        first.clear();
        if reader.read_line(&mut first)? == 0 || !first.trim().is_empty() {
            break;
        }
    }

    if first.trim_start().starts_with('[') {
        let mut document = first;
        reader.read_to_string(&mut document)?;
        let rows: Vec<Value> = serde_json::from_str(&document)
            .map_err(|e| Error::Dataset(format!("Invalid JSON array in {source_name}: {e}")))?;
        return rows
            .iter()
            .take(limit)
            .map(|row| text_field(row, column, &source_name))
            .collect();
    }

    let mut texts = Vec::with_capacity(limit);
    let mut record = 0usize;
    let mut line = first;
    loop {
        if texts.len() >= limit || line.is_empty() {
            break;
        }
        if !line.trim().is_empty() {
            record += 1;
            let row: Value = serde_json::from_str(line.trim()).map_err(|e| {
                Error::Dataset(format!("Invalid JSON in record {record} of {source_name}: {e}"))
            })?;
            texts.push(text_field(&row, column, &source_name)?);
        }
        line.clear();
        reader.read_line(&mut line)?;
    }
    Ok(texts)
}

fn text_field(row: &Value, column: &str, source_name: &str) -> Result<String> {
    let Value::Object(fields) = row else {
        return Err(Error::Dataset(format!("Expected JSON objects in {source_name}")));
    };
    match fields.get(column) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(Error::Dataset(format!(
            "Field '{column}' in {source_name} must be a string, found {other}"
        ))),
        None => Err(Error::MissingColumn {
            source_name: source_name.to_string(),
            column: column.to_string(),
        }),
    }
}
