use std::path::PathBuf;

pub type CigaleResult<T> = Result<T, CigaleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigaleErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
}

impl CigaleErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CigaleError {
    #[error("more than one line begins with '{key}' (lines {lines:?})")]
    DuplicateKey { key: String, lines: Vec<usize> },

    #[error("no line begins with '{key}' at indentation 0, 2 or 4")]
    KeyNotFound { key: String },

    #[error(
        "parameter '{key}' has unsupported type {found}; expected str, bool, int, float or a list of these"
    )]
    UnsupportedValue { key: String, found: String },

    #[error("instrument '{instrument}' is not valid for {observatory}; expected one of {expected}")]
    InvalidInstrument {
        observatory: &'static str,
        instrument: String,
        expected: &'static str,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid simulation plan '{}': {message}", .path.display())]
    InvalidPlan { path: PathBuf, message: String },

    #[error("I/O failure on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file '{}' does not exist", .path.display())]
    MissingFile { path: PathBuf },

    #[error("FITS failure on '{}': {source}", .path.display())]
    Fits {
        path: PathBuf,
        #[source]
        source: fitsio::errors::Error,
    },

    #[error("failed to launch '{program} {step}': {source}")]
    ProcessSpawn {
        program: String,
        step: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program} {step}' failed with {status}")]
    ProcessFailed {
        program: String,
        step: &'static str,
        status: String,
    },

    #[error("column '{column}' is not present in the model table")]
    MissingColumn { column: String },

    #[error("invalid model table: {0}")]
    InvalidTable(String),
}

impl CigaleError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn fits(path: impl Into<PathBuf>, source: fitsio::errors::Error) -> Self {
        Self::Fits {
            path: path.into(),
            source,
        }
    }

    pub const fn category(&self) -> CigaleErrorCategory {
        match self {
            Self::DuplicateKey { .. }
            | Self::KeyNotFound { .. }
            | Self::UnsupportedValue { .. }
            | Self::InvalidInstrument { .. }
            | Self::InvalidArgument(_)
            | Self::InvalidPlan { .. } => CigaleErrorCategory::InputValidationError,
            Self::Io { .. }
            | Self::MissingFile { .. }
            | Self::Fits { .. }
            | Self::ProcessSpawn { .. } => CigaleErrorCategory::IoSystemError,
            Self::ProcessFailed { .. } | Self::MissingColumn { .. } | Self::InvalidTable(_) => {
                CigaleErrorCategory::ComputationError
            }
        }
    }

    pub const fn placeholder(&self) -> &'static str {
        match self {
            Self::DuplicateKey { .. } => "INPUT.DUPLICATE_KEY",
            Self::KeyNotFound { .. } => "INPUT.KEY_NOT_FOUND",
            Self::UnsupportedValue { .. } => "INPUT.UNSUPPORTED_VALUE",
            Self::InvalidInstrument { .. } => "INPUT.INVALID_INSTRUMENT",
            Self::InvalidArgument(_) => "INPUT.INVALID_ARGUMENT",
            Self::InvalidPlan { .. } => "INPUT.INVALID_PLAN",
            Self::Io { .. } => "IO.FILE",
            Self::MissingFile { .. } => "IO.MISSING_FILE",
            Self::Fits { .. } => "IO.FITS",
            Self::ProcessSpawn { .. } => "IO.PROCESS_SPAWN",
            Self::ProcessFailed { .. } => "RUN.PROCESS_EXIT",
            Self::MissingColumn { .. } => "RUN.MISSING_COLUMN",
            Self::InvalidTable(_) => "RUN.INVALID_TABLE",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder(), self)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::{CigaleError, CigaleErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (CigaleErrorCategory::InputValidationError, 2),
            (CigaleErrorCategory::IoSystemError, 3),
            (CigaleErrorCategory::ComputationError, 4),
        ];

        for (category, exit_code) in cases {
            assert_eq!(category.exit_code(), exit_code);
        }
    }

    #[test]
    fn duplicate_key_renders_compatibility_lines() {
        let error = CigaleError::DuplicateKey {
            key: "age".to_string(),
            lines: vec![12, 40],
        };

        assert_eq!(error.category(), CigaleErrorCategory::InputValidationError);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.DUPLICATE_KEY] more than one line begins with 'age' (lines [12, 40])"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 2");
    }

    #[test]
    fn process_failure_is_a_computation_error() {
        let error = CigaleError::ProcessFailed {
            program: "pcigale".to_string(),
            step: "run",
            status: "exit code 1".to_string(),
        };

        assert_eq!(error.exit_code(), 4);
        assert_eq!(error.placeholder(), "RUN.PROCESS_EXIT");
        assert_eq!(error.to_string(), "'pcigale run' failed with exit code 1");
    }
}
