//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV with a `timestamp,open,high,low,close,volume` header
//! 2. Seeded synthetic random walk (developer/debug mode, tagged as such)
//!
//! Empty price cells load as NaN and become void bars; the simulator skips
//! them. Timestamps must be strictly increasing.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use log::warn;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use swingtrail_core::domain::{Bar, RunId};
use swingtrail_core::rng::RngHierarchy;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },
    #[error("{origin} row {row}: unrecognised timestamp '{value}'")]
    Timestamp {
        origin: String,
        row: usize,
        value: String,
    },
    #[error("{origin} row {row}: timestamp not after the previous row")]
    Unordered { origin: String, row: usize },
    #[error("no bars in {0}")]
    Empty(String),
}

/// Where a run's bars come from.
#[derive(Debug, Clone, PartialEq)]
pub enum BarSource {
    Csv(PathBuf),
    Synthetic { bars: usize, seed: u64 },
}

/// Bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every bar, for tagging results with the exact data used.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Resolve a [`BarSource`] for `symbol`.
pub fn load_bars(source: &BarSource, symbol: &str) -> Result<LoadedBars, LoadError> {
    let (bars, synthetic) = match source {
        BarSource::Csv(path) => (load_csv(path)?, false),
        BarSource::Synthetic { bars, seed } => {
            warn!("generating {bars} synthetic bars for {symbol}; results are tagged as synthetic");
            (synthetic_bars(symbol, *bars, *seed), true)
        }
    };
    if bars.is_empty() {
        return Err(LoadError::Empty(describe(source)));
    }
    let void = bars.iter().filter(|b| b.is_void()).count();
    if void > 0 {
        warn!("{symbol}: {void} of {} bars are void and will be skipped", bars.len());
    }
    Ok(LoadedBars {
        dataset_hash: dataset_hash(&bars),
        bars,
        synthetic,
    })
}

pub fn load_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_csv(file, &path.display().to_string())
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

/// Parse bars from any reader. `origin` names the input in errors.
pub fn parse_csv<R: Read>(reader: R, origin: &str) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();

    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = i + 1;
        let r = record.map_err(|source| LoadError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        let timestamp = parse_timestamp(&r.timestamp).ok_or_else(|| LoadError::Timestamp {
            origin: origin.to_string(),
            row,
            value: r.timestamp.clone(),
        })?;
        if bars.last().is_some_and(|prev| prev.timestamp >= timestamp) {
            return Err(LoadError::Unordered {
                origin: origin.to_string(),
                row,
            });
        }
        bars.push(Bar {
            timestamp,
            open: r.open.unwrap_or(f64::NAN),
            high: r.high.unwrap_or(f64::NAN),
            low: r.low.unwrap_or(f64::NAN),
            close: r.close.unwrap_or(f64::NAN),
            volume: r.volume.unwrap_or(0.0),
        });
    }
    Ok(bars)
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, RFC 3339,
/// a bare date (midnight), or unix seconds / milliseconds.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    let n: i64 = raw.parse().ok()?;
    // 10^11 seconds is year 5138: anything larger is milliseconds.
    let dt = if n.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    };
    dt.map(|d| d.naive_utc())
}

/// Hourly random walk starting at 100.0 on 2024-01-01.
///
/// The stream depends only on `(seed, symbol, n)`, never on the run config,
/// so every run in a sweep sees the same bars.
pub fn synthetic_bars(symbol: &str, n: usize, seed: u64) -> Vec<Bar> {
    let dataset = RunId::from_bytes(format!("synthetic:{n}").as_bytes());
    let mut rng = RngHierarchy::new(seed).rng_for(&dataset, symbol, 0);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    for i in 0..n {
        let ret: f64 = rng.gen_range(-0.01..0.01);
        let open = price;
        let close = price * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.004));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.004));
        let volume = rng.gen_range(100.0..10_000.0);
        bars.push(Bar {
            timestamp: start + Duration::hours(i as i64),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}

/// BLAKE3 over timestamps and OHLCV bit patterns.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for b in bars {
        hasher.update(&b.timestamp.and_utc().timestamp().to_le_bytes());
        for v in [b.open, b.high, b.low, b.close, b.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn describe(source: &BarSource) -> String {
    match source {
        BarSource::Csv(path) => path.display().to_string(),
        BarSource::Synthetic { bars, seed } => format!("synthetic(bars={bars}, seed={seed})"),
    }
}
