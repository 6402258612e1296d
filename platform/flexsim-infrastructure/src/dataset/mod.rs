use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use flexsim_domain::entities::dataset::{Dataset, DatasetReport};
use flexsim_domain::repositories::dataset::{DatasetQuery, DatasetRepository};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info_span};

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvDatasetRepository;

impl CsvDatasetRepository {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetRepository for CsvDatasetRepository {
    fn load_dataset(&self, query: &DatasetQuery) -> Result<(Dataset, DatasetReport), String> {
        let _span = info_span!("load_dataset", path = %query.path.display()).entered();
        let start = Instant::now();
        let result = load_csv(&query.path, &query.timestamp_column);
        let result_label = if result.is_ok() { "ok" } else { "err" };
        metrics::counter!("flexsim.infra.dataset.load.calls_total", "result" => result_label)
            .increment(1);
        metrics::histogram!("flexsim.infra.dataset.load_ms", "result" => result_label)
            .record(start.elapsed().as_millis() as f64);
        result
    }
}

/// Reads a wide CSV: one timestamp column plus any number of numeric columns.
/// Rows are canonicalized by timestamp; a later duplicate replaces an earlier
/// one and rows with unparseable values are dropped.
pub fn load_csv(path: &Path, timestamp_column: &str) -> Result<(Dataset, DatasetReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open dataset CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| format!("failed to read CSV header {}: {}", path.display(), err))?
        .clone();
    let ts_idx = headers
        .iter()
        .position(|h| h == timestamp_column)
        .ok_or_else(|| {
            format!(
                "dataset {} has no timestamp column `{}`",
                path.display(),
                timestamp_column
            )
        })?;
    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != ts_idx)
        .map(|(_, name)| name.to_string())
        .collect();

    let mut rows_by_ts: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    let mut report = DatasetReport::default();
    let mut last_seen_ts: Option<i64> = None;

    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|err| format!("failed to parse CSV row {}: {}", line + 1, err))?;
        let raw_ts = record
            .get(ts_idx)
            .ok_or_else(|| format!("CSV row {} has no timestamp", line + 1))?;
        let timestamp = parse_timestamp(raw_ts)?;

        let values: Option<Vec<f64>> = record
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != ts_idx)
            .map(|(_, raw)| raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect();
        let Some(values) = values else {
            report.invalid_values += 1;
            if report.first_invalid_value.is_none() {
                report.first_invalid_value = Some(timestamp);
            }
            continue;
        };

        if let Some(prev) = last_seen_ts {
            if timestamp < prev {
                report.out_of_order += 1;
            }
        }
        last_seen_ts = Some(timestamp);

        if rows_by_ts.insert(timestamp, values).is_some() {
            report.duplicates += 1;
        }
    }

    let (timestamps, rows): (Vec<i64>, Vec<Vec<f64>>) = rows_by_ts.into_iter().unzip();
    report.rows = rows.len();
    debug!(
        rows = report.rows,
        columns = columns.len(),
        duplicates = report.duplicates,
        "dataset parsed"
    );

    let dataset = Dataset::new(timestamps, columns, rows)
        .map_err(|err| format!("invalid dataset {}: {}", path.display(), err))?;
    Ok((dataset, report))
}

fn parse_timestamp(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        let dt: DateTime<Utc> = Utc.from_utc_datetime(&naive);
        return Ok(dt.timestamp());
    }
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(seconds);
    }

    Err(format!("unsupported timestamp format: {}", value))
}

#[cfg(test)]
mod tests {
    use super::{load_csv, parse_timestamp};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_tmp_path(name: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("flexsim_{name}_{}_{}", std::process::id(), now))
    }

    #[test]
    fn load_csv_keeps_all_numeric_columns() {
        let tmp_path = unique_tmp_path("dataset_columns.csv");
        let csv_data = "timestamp,C_demand [MW],C_electricity_price [$/MWh],D_h_0_Predicted_Price_Bin_0\n\
2026-01-01 00:00:00,10,40,1\n\
2026-01-01 00:05:00,11,42,0\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let (dataset, report) = load_csv(&tmp_path, "timestamp").expect("load csv");
        assert_eq!(report.rows, 2);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.columns().len(), 3);
        assert_eq!(dataset.column_index("C_electricity_price [$/MWh]"), Some(1));
        assert_eq!(dataset.timestamps()[1] - dataset.timestamps()[0], 300);
        assert_eq!(dataset.row(1), Some(&[11.0, 42.0, 0.0][..]));
    }

    #[test]
    fn load_csv_reports_duplicates_out_of_order_and_invalid_values() {
        let tmp_path = unique_tmp_path("dataset_quality.csv");
        let csv_data = "timestamp,C_demand [MW],C_electricity_price [$/MWh]\n\
2026-01-01T00:10:00Z,1,1\n\
2026-01-01T00:00:00Z,1,1\n\
2026-01-01T00:05:00Z,oops,1\n\
2026-01-01T00:00:00Z,2,2\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let (dataset, report) = load_csv(&tmp_path, "timestamp").expect("load csv");
        assert_eq!(report.rows, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.out_of_order, 1);
        assert_eq!(report.invalid_values, 1);
        assert!(report.first_invalid_value.is_some());
        assert!(dataset.timestamps().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(dataset.row(0), Some(&[2.0, 2.0][..]));
    }

    #[test]
    fn load_csv_requires_the_timestamp_column() {
        let tmp_path = unique_tmp_path("dataset_no_ts.csv");
        fs::write(&tmp_path, "time,C_demand [MW]\n0,1\n").expect("write csv");

        let err = load_csv(&tmp_path, "timestamp").expect_err("missing column");
        assert!(err.contains("timestamp"));
    }

    #[test]
    fn parse_timestamp_accepts_common_formats() {
        let rfc = parse_timestamp("2026-01-01T00:05:00Z").expect("rfc3339");
        let naive = parse_timestamp("2026-01-01 00:05:00").expect("naive");
        let offset = parse_timestamp("2026-01-01 01:05:00+0100").expect("offset");
        assert_eq!(rfc, naive);
        assert_eq!(rfc, offset);
        assert_eq!(parse_timestamp("300").expect("epoch"), 300);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
