//! Tabular telemetry store.
//!
//! Records are persisted as CSV with a fixed header and
//! `YYYY-MM-DD HH:MM:SS` timestamps. Two append disciplines exist:
//!
//! - [`TelemetryStore::append`] -- unbounded, for manual and experiment
//!   logging; carries an optional comment column.
//! - [`TelemetryStore::windowed_append`] -- bounded trailing window, for
//!   the background safety trail. Every call reads the whole store,
//!   drops records older than the window, and rewrites the file.
//!
//! The full rewrite is an O(n)-per-call design choice: the safety trail
//! is written every ten minutes and bounded to a few days, so the store
//! stays small. A deployment logging orders of magnitude faster should
//! move to incremental storage while keeping the same observable
//! "only records within the window survive" contract.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use phytolib_core::error::{Error, Result};
use phytolib_core::types::{PumpSnapshot, SensorSnapshot};

/// Timestamp format used in the first CSV column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header of a manual-log store (with the trailing comment column).
pub const HEADER: [&str; 12] = [
    "timestamp",
    "temp",
    "pH",
    "light_prim",
    "light_sec",
    "air",
    "co2",
    "heater_pump",
    "cooler_pump",
    "co2_pump",
    "turb_pump",
    "comments",
];

/// Header of a trailing-window store (no comment column).
pub const WINDOW_HEADER: [&str; 11] = [
    "timestamp",
    "temp",
    "pH",
    "light_prim",
    "light_sec",
    "air",
    "co2",
    "heater_pump",
    "cooler_pump",
    "co2_pump",
    "turb_pump",
];

/// One telemetry record: both snapshots taken in the same poll tick,
/// stamped at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Local wall-clock time the record was created.
    pub timestamp: NaiveDateTime,
    /// Sensor snapshot for this tick.
    pub sensors: SensorSnapshot,
    /// Pump snapshot for this tick.
    pub pumps: PumpSnapshot,
    /// Optional operator comment (manual logs only).
    pub comment: Option<String>,
}

impl LogRecord {
    /// Create a record stamped with the current local time.
    pub fn now(sensors: SensorSnapshot, pumps: PumpSnapshot, comment: Option<String>) -> Self {
        LogRecord {
            timestamp: Local::now().naive_local(),
            sensors,
            pumps,
            comment,
        }
    }

    /// The CSV value row for this record, without the comment column.
    fn row(&self) -> Vec<String> {
        vec![
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.sensors.temp_c.to_string(),
            self.sensors.ph.to_string(),
            self.sensors.light_primary.to_string(),
            self.sensors.light_secondary.to_string(),
            self.sensors.air_flow.to_string(),
            self.sensors.co2_flow.to_string(),
            self.pumps.heater_pump.to_string(),
            self.pumps.cooler_pump.to_string(),
            self.pumps.co2_pump.to_string(),
            self.pumps.turb_pump.to_string(),
        ]
    }
}

/// Append-oriented CSV telemetry store.
///
/// The store is created lazily: the file (and its parent directory)
/// appears with a fixed header row on the first append, and is never
/// truncated except by the windowed compactor's deliberate rewrite.
#[derive(Debug)]
pub struct TelemetryStore {
    path: Mutex<PathBuf>,
}

impl TelemetryStore {
    /// Create a store that will write to `path`.
    ///
    /// No file is created until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TelemetryStore {
            path: Mutex::new(path.into()),
        }
    }

    /// The current store path.
    pub fn path(&self) -> PathBuf {
        self.path.lock().expect("store path lock poisoned").clone()
    }

    /// Redirect future appends to a new location.
    ///
    /// The new store is created with a header if missing; data already
    /// written to the previous location is never migrated.
    pub fn set_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        ensure_store(&path, &HEADER)?;
        info!(path = %path.display(), "telemetry store path set");
        *self.path.lock().expect("store path lock poisoned") = path;
        Ok(())
    }

    /// Append one record, creating the store (with the 12-column manual
    /// header) if it does not exist yet.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        let path = self.path();
        ensure_store(&path, &HEADER)?;

        let file = OpenOptions::new().append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut row = record.row();
        row.push(record.comment.clone().unwrap_or_default());
        writer.write_record(&row).map_err(csv_io_error)?;
        writer.flush()?;
        Ok(())
    }

    /// Append one record to a trailing-window store, dropping everything
    /// older than `window`.
    ///
    /// The whole file is read, each row's timestamp is parsed (a row
    /// that fails to parse is skipped with a warning, not fatal), the
    /// new record is appended, rows with a timestamp older than
    /// `record.timestamp - window` are dropped, and the file is
    /// rewritten from scratch -- header plus retained rows, original
    /// relative order preserved.
    pub fn windowed_append(&self, record: &LogRecord, window: Duration) -> Result<()> {
        let path = self.path();
        let window = chrono::Duration::from_std(window)
            .map_err(|e| Error::InvalidParameter(format!("window out of range: {e}")))?;

        let mut retained: Vec<(NaiveDateTime, Vec<String>)> = Vec::new();
        if path.exists() {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(&path)
                .map_err(csv_io_error)?;
            for row in reader.records() {
                let row = row.map_err(csv_io_error)?;
                let Some(ts_field) = row.get(0) else {
                    warn!("skipping empty row in telemetry store");
                    continue;
                };
                match NaiveDateTime::parse_from_str(ts_field, TIMESTAMP_FORMAT) {
                    Ok(ts) => retained.push((ts, row.iter().map(str::to_string).collect())),
                    Err(e) => {
                        warn!(row = ?row, error = %e, "skipping unparseable row in telemetry store");
                    }
                }
            }
        }

        // Retained rows are never re-sorted; a wall clock that jumped
        // backwards since the last append is surfaced instead of being
        // papered over by reordering.
        if let Some((newest, _)) = retained.iter().max_by_key(|(ts, _)| *ts) {
            if record.timestamp < *newest {
                warn!(
                    record_ts = %record.timestamp,
                    newest_ts = %newest,
                    "clock regression detected, appending out-of-order record"
                );
            }
        }

        retained.push((record.timestamp, record.row()));

        let cutoff = record.timestamp - window;
        retained.retain(|(ts, _)| *ts >= cutoff);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(WINDOW_HEADER).map_err(csv_io_error)?;
        for (_, row) in &retained {
            writer.write_record(row).map_err(csv_io_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Create the store file with the given header if it does not exist.
fn ensure_store(path: &Path, header: &[&str]) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(header).map_err(csv_io_error)?;
    writer.flush()?;
    Ok(())
}

fn csv_io_error(e: csv::Error) -> Error {
    Error::Io(std::io::Error::other(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn sensors() -> SensorSnapshot {
        SensorSnapshot {
            temp_c: 21.5,
            ph: 7.2,
            light_primary: 300.0,
            light_secondary: 310.0,
            air_flow: 50.0,
            co2_flow: 12.0,
        }
    }

    fn pumps() -> PumpSnapshot {
        PumpSnapshot {
            co2_pump: 10.0,
            heater_pump: 20.0,
            cooler_pump: 0.0,
            turb_pump: 5.0,
        }
    }

    fn record_at(ts: NaiveDateTime) -> LogRecord {
        LogRecord {
            timestamp: ts,
            sensors: sensors(),
            pumps: pumps(),
            comment: None,
        }
    }

    // NaiveDateTime has sub-second precision but the stored format does
    // not; truncate so written and reparsed values compare equal.
    fn now() -> NaiveDateTime {
        use chrono::Timelike;
        let t = Local::now().naive_local();
        t.with_nanosecond(0).unwrap_or(t)
    }

    #[test]
    fn append_creates_store_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("log.csv");
        let store = TelemetryStore::new(&path);

        store
            .append(&LogRecord::now(sensors(), pumps(), Some("inoculated".into())))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), HEADER.join(","));
        let row = lines.next().unwrap();
        assert!(row.ends_with("inoculated"));
        assert!(row.contains("21.5"));
    }

    #[test]
    fn append_does_not_rewrite_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let store = TelemetryStore::new(&path);

        store.append(&record_at(now())).unwrap();
        store.append(&record_at(now())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3); // header + 2 rows
    }

    #[test]
    fn windowed_append_drops_rows_older_than_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safety.csv");
        let store = TelemetryStore::new(&path);

        let t = now();
        let window = Duration::from_secs(72 * 3600);
        store
            .windowed_append(&record_at(t - ChronoDuration::hours(80)), window)
            .unwrap();
        store
            .windowed_append(&record_at(t - ChronoDuration::hours(10)), window)
            .unwrap();
        store.windowed_append(&record_at(t), window).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], WINDOW_HEADER.join(","));
        // T-80h dropped; T-10h and T retained in original order.
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(
            &(t - ChronoDuration::hours(10))
                .format(TIMESTAMP_FORMAT)
                .to_string()
        ));
        assert!(lines[2].starts_with(&t.format(TIMESTAMP_FORMAT).to_string()));
    }

    #[test]
    fn windowed_append_skips_unparseable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safety.csv");
        std::fs::write(
            &path,
            format!(
                "{}\nnot-a-timestamp,1,2,3,4,5,6,7,8,9,10\n",
                WINDOW_HEADER.join(",")
            ),
        )
        .unwrap();

        let store = TelemetryStore::new(&path);
        store
            .windowed_append(&record_at(now()), Duration::from_secs(3600))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        // Corrupt row dropped; header + the new record remain.
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn windowed_append_keeps_order_under_clock_regression() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safety.csv");
        let store = TelemetryStore::new(&path);

        let t = now();
        let window = Duration::from_secs(72 * 3600);
        store.windowed_append(&record_at(t), window).unwrap();
        // Clock jumped back an hour; the record is still appended last.
        store
            .windowed_append(&record_at(t - ChronoDuration::hours(1)), window)
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(&t.format(TIMESTAMP_FORMAT).to_string()));
        assert!(lines[2].starts_with(
            &(t - ChronoDuration::hours(1))
                .format(TIMESTAMP_FORMAT)
                .to_string()
        ));
    }

    #[test]
    fn set_path_redirects_without_migrating() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let store = TelemetryStore::new(&first);

        store.append(&record_at(now())).unwrap();
        store.set_path(&second).unwrap();
        store.append(&record_at(now())).unwrap();

        // First store keeps its single row; second has header + one row.
        assert_eq!(std::fs::read_to_string(&first).unwrap().lines().count(), 2);
        assert_eq!(std::fs::read_to_string(&second).unwrap().lines().count(), 2);
    }
}
