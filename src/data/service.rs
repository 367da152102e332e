//! Service layer for ingesting, loading and splitting sales datasets.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::common::error::{SalesError, SalesResult};
use crate::common::ids::Fingerprint;
use crate::common::time;

use super::domain::{
    DataRepo, Dataset, DatasetId, DatasetMeta, SalesRecord, COL_MONTH, COL_SALES, COL_SUBJECT,
    COL_TITLE,
};

const REQUIRED_COLUMNS: [&str; 4] = [COL_MONTH, COL_TITLE, COL_SUBJECT, COL_SALES];

/// Parse and validate a sales CSV. Extra columns are ignored.
pub fn parse_records<R: Read>(reader: R) -> SalesResult<Vec<SalesRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(SalesError::missing_column(column));
        }
    }

    let mut records = Vec::new();
    for (idx, row) in rdr.deserialize::<SalesRecord>().enumerate() {
        let record = row?;
        // header is line 1
        let line = idx + 2;
        if !record.month.is_finite() || !record.sales.is_finite() {
            return Err(SalesError::invalid(format!("line {line}: non-finite number")));
        }
        if record.title.is_empty() || record.subject.is_empty() {
            return Err(SalesError::invalid(format!(
                "line {line}: empty {COL_TITLE} or {COL_SUBJECT}"
            )));
        }
        records.push(record);
    }
    Ok(records)
}

/// Ingest a CSV file into the registry under `name`, returning its content id.
pub fn ingest_file(repo: &dyn DataRepo, path: &Path, name: &str) -> SalesResult<DatasetId> {
    let start = Instant::now();
    let raw = fs::read(path)?;
    let records = parse_records(raw.as_slice())?;
    if records.is_empty() {
        return Err(SalesError::invalid(format!("{} has no rows", path.display())));
    }

    let id = DatasetId::new(format!("ds-{}", Fingerprint::of(&raw).finish_hex()));
    let meta = DatasetMeta {
        name: name.to_string(),
        id: id.clone(),
        rows: records.len() as u64,
        created_ms: time::now_ms(),
    };
    repo.put_dataset(&meta, &raw)?;

    info!(
        ev = "dataset_ingested",
        dataset = name,
        id = %id,
        rows = meta.rows,
        dur_ms = time::elapsed_ms(start),
    );
    Ok(id)
}

/// Fetch a registered dataset by name.
pub fn load_by_name(repo: &dyn DataRepo, name: &str) -> SalesResult<Dataset> {
    let dataset = repo.get_dataset(name)?;
    info!(
        ev = "dataset_loaded",
        dataset = name,
        id = %dataset.meta.id,
        rows = dataset.records.len(),
    );
    Ok(dataset)
}

/// Shuffle-split `items` into `(train, test)`.
///
/// The test side receives `ceil(test_size * n)` items. The same seed and
/// input always produce the same split.
pub fn train_test_split<T: Clone>(
    items: &[T],
    test_size: f64,
    seed: u64,
) -> SalesResult<(Vec<T>, Vec<T>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(SalesError::invalid(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    let n = items.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(SalesError::invalid(format!(
            "cannot split {n} rows with test_size {test_size}"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let test = order[..n_test].iter().map(|&i| items[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| items[i].clone()).collect();
    Ok((train, test))
}
