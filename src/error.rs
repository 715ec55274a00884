use thiserror::Error;

/// Problems with the site/surface configuration. These are fatal and are
/// reported before any record is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} = {value} is outside of [{min}, {max}] degrees")]
    AngleOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("ground reflectance {0} is outside of [0, 1]")]
    ReflectanceOutOfRange(f64),

    #[error("solar constant must be positive, got {0} W/m^2")]
    InvalidSolarConstant(f64),

    #[error("{name} is not a finite number")]
    NotFinite { name: &'static str },

    #[error("invalid calendar start {value:?}: {reason}")]
    InvalidCalendarStart { value: String, reason: String },
}

/// A single input row that can't be turned into an hourly record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("input table has no {0:?} column")]
    MissingColumn(&'static str),

    #[error("line {line}: {column} is empty")]
    Empty { line: u64, column: &'static str },

    #[error("line {line}: {column} value {value:?} is not a number")]
    NotNumeric {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: hour index {value} is not a non-negative integer")]
    InvalidHour { line: u64, value: f64 },

    #[error("line {line}: {column} value {value} is not finite")]
    NotFinite {
        line: u64,
        column: &'static str,
        value: f64,
    },
}

/// Failure while reading the input table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Record(#[from] RecordError),
}
