//! Domain error types.
//!
//! Only malformed input and I/O surface as errors. Missing data inside the
//! selection and simulation core is recovered and counted instead, see
//! [`crate::domain::diagnostics`].

/// Top-level error type for optitrader.
#[derive(Debug, thiserror::Error)]
pub enum OptitraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&OptitraderError> for std::process::ExitCode {
    fn from(err: &OptitraderError) -> Self {
        let code: u8 = match err {
            OptitraderError::Io(_) => 1,
            OptitraderError::ConfigParse { .. }
            | OptitraderError::ConfigInvalid { .. } => 2,
            OptitraderError::Data { .. } | OptitraderError::NoData { .. } => 3,
            OptitraderError::Report { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
