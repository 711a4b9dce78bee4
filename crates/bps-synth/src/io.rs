//! Delimited-table readers and writers for synthetic-data artifacts.
//!
//! Writers render into memory and land the file with a temp-file rename, so
//! a reader never observes a half-written table.

use std::collections::HashMap;
use std::path::Path;

use bps_core::{CountMatrix, Error, LoadingsMatrix, Result, SignatureSet, write_atomic};
use nalgebra::DMatrix;

use crate::trim::GroundTruthSummary;

/// Index column of signature reference tables.
pub const SIGNATURE_INDEX_COLUMN: &str = "Somatic Mutation Type";
const SIGNATURE_DROPPED_COLUMNS: [&str; 2] = ["Substitution Type", "Trinucleotide"];

fn require_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingArtifact { path: path.to_path_buf() })
    }
}

fn tsv_reader(path: &Path, has_headers: bool) -> Result<csv::Reader<std::fs::File>> {
    require_exists(path)?;
    Ok(csv::ReaderBuilder::new().delimiter(b'\t').has_headers(has_headers).from_path(path)?)
}

fn parse_f64(field: &str, path: &Path) -> Result<f64> {
    field.trim().parse::<f64>().map_err(|_| {
        Error::Validation(format!("non-numeric value '{field}' in {}", path.display()))
    })
}

fn parse_count(field: &str, path: &Path) -> Result<u64> {
    let field = field.trim();
    if let Ok(v) = field.parse::<u64>() {
        return Ok(v);
    }
    let v = parse_f64(field, path)?;
    if v >= 0.0 && v.fract() == 0.0 && v < u64::MAX as f64 {
        Ok(v as u64)
    } else {
        Err(Error::Validation(format!(
            "count '{field}' in {} is not a non-negative integer",
            path.display()
        )))
    }
}

/// Write a count matrix: header of sample labels, one row per channel.
pub fn write_counts_tsv(path: &Path, counts: &CountMatrix) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(Vec::new());
    let mut header = vec![String::new()];
    header.extend(counts.samples().iter().cloned());
    wtr.write_record(&header)?;
    for (i, label) in counts.channels().iter().enumerate() {
        let mut record = Vec::with_capacity(counts.n_samples() + 1);
        record.push(label.clone());
        record.extend(counts.row(i).iter().map(|c| c.to_string()));
        wtr.write_record(&record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    write_atomic(path, &bytes)
}

/// Read a count matrix written by [`write_counts_tsv`] (or any channel-indexed TSV).
pub fn read_counts_tsv(path: &Path) -> Result<CountMatrix> {
    let mut rdr = tsv_reader(path, true)?;
    let samples: Vec<String> = rdr.headers()?.iter().skip(1).map(str::to_string).collect();
    let mut channels = Vec::new();
    let mut data = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut fields = record.iter();
        let label = fields.next().unwrap_or_default().to_string();
        let row = fields.map(|f| parse_count(f, path)).collect::<Result<Vec<u64>>>()?;
        if row.len() != samples.len() {
            return Err(Error::Validation(format!(
                "row '{label}' in {} has {} values, expected {}",
                path.display(),
                row.len(),
                samples.len()
            )));
        }
        channels.push(label);
        data.extend(row);
    }
    CountMatrix::new(channels, samples, data)
}

/// Read a reference signature table.
///
/// Rows are channels (indexed by [`SIGNATURE_INDEX_COLUMN`], or the first
/// column when absent); signature columns are those whose header starts with
/// `prefix`. Rows are reordered to `channel_order` when it is non-empty.
pub fn read_signature_table(
    path: &Path,
    prefix: &str,
    channel_order: &[String],
) -> Result<SignatureSet> {
    let mut rdr = tsv_reader(path, true)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let index_col = headers.iter().position(|h| h == SIGNATURE_INDEX_COLUMN).unwrap_or(0);
    let sig_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(c, h)| {
            *c != index_col
                && !SIGNATURE_DROPPED_COLUMNS.contains(&h.as_str())
                && h.starts_with(prefix)
        })
        .map(|(c, _)| c)
        .collect();
    if sig_cols.is_empty() {
        return Err(Error::Configuration(format!(
            "no columns with prefix '{prefix}' in {}",
            path.display()
        )));
    }

    let mut labels = Vec::new();
    let mut rows: HashMap<String, Vec<f64>> = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        let label = record.get(index_col).unwrap_or_default().to_string();
        let values = sig_cols
            .iter()
            .map(|&c| parse_f64(record.get(c).unwrap_or_default(), path))
            .collect::<Result<Vec<f64>>>()?;
        labels.push(label.clone());
        rows.insert(label, values);
    }

    let order: &[String] = if channel_order.is_empty() { &labels } else { channel_order };
    let mut by_channel = Vec::with_capacity(order.len());
    for label in order {
        let row = rows.get(label).ok_or_else(|| {
            Error::Configuration(format!("channel '{label}' missing from {}", path.display()))
        })?;
        by_channel.push(row);
    }

    let matrix = DMatrix::from_fn(sig_cols.len(), by_channel.len(), |k, i| by_channel[i][k]);
    let names = sig_cols.iter().map(|&c| headers[c].clone()).collect();
    SignatureSet::new(names, matrix)
}

/// Write a `K × J` loadings table (no header).
pub fn write_loadings_tsv(path: &Path, loadings: &LoadingsMatrix) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(Vec::new());
    for row in loadings.matrix().row_iter() {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    write_atomic(path, &bytes)
}

/// Read a `K × J` loadings table. A missing file is a [`Error::MissingArtifact`].
pub fn read_loadings_tsv(path: &Path) -> Result<LoadingsMatrix> {
    let mut rdr = tsv_reader(path, false)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(|f| parse_f64(f, path)).collect::<Result<Vec<f64>>>()?);
    }
    LoadingsMatrix::from_rows(&rows)
}

/// Write the ground-truth summary as `mean_loading,signature` rows without a header.
pub fn write_ground_truth(path: &Path, summary: &GroundTruthSummary) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for entry in summary.entries() {
        wtr.write_record([entry.mean_loading.to_string(), entry.signature.clone()])?;
    }
    let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    write_atomic(path, &bytes)
}
