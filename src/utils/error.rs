use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Storage,
    Analysis,
}

#[derive(Error, Debug)]
pub enum ProwError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Zip archive error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("GPX error: {message}")]
    GpxError { message: String },

    #[error("Overpass error: {message}")]
    OverpassError { message: String },

    #[error("Geocoding failed for '{query}': {reason}")]
    GeocodeError { query: String, reason: String },

    #[error("Unknown authority: {name}")]
    UnknownAuthorityError { name: String },

    #[error("Analysis failed at {stage}: {details}")]
    AnalysisError { stage: String, details: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

impl ProwError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ProwError::HttpError(_) => ErrorSeverity::Medium,
            ProwError::IoError(_) | ProwError::ZipError(_) => ErrorSeverity::Critical,
            ProwError::CsvError(_)
            | ProwError::SerializationError(_)
            | ProwError::XmlError(_)
            | ProwError::GpxError { .. }
            | ProwError::OverpassError { .. }
            | ProwError::AnalysisError { .. } => ErrorSeverity::High,
            ProwError::GeocodeError { .. } | ProwError::UnknownAuthorityError { .. } => {
                ErrorSeverity::High
            }
            ProwError::ConfigValidationError { .. }
            | ProwError::InvalidConfigValueError { .. }
            | ProwError::MissingConfigError { .. } => ErrorSeverity::Low,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProwError::HttpError(_)
            | ProwError::OverpassError { .. }
            | ProwError::GeocodeError { .. } => ErrorCategory::Network,
            ProwError::IoError(_) | ProwError::ZipError(_) => ErrorCategory::Storage,
            ProwError::CsvError(_)
            | ProwError::SerializationError(_)
            | ProwError::XmlError(_)
            | ProwError::GpxError { .. } => ErrorCategory::Data,
            ProwError::AnalysisError { .. } => ErrorCategory::Analysis,
            ProwError::ConfigValidationError { .. }
            | ProwError::InvalidConfigValueError { .. }
            | ProwError::MissingConfigError { .. }
            | ProwError::UnknownAuthorityError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ProwError::HttpError(_) => {
                "Check network connectivity and endpoint URLs, then retry".to_string()
            }
            ProwError::IoError(_) => {
                "Check that the data and output directories exist and are writable".to_string()
            }
            ProwError::ZipError(_) => {
                "The downloaded trace archive may be truncated; delete the cached copy and retry"
                    .to_string()
            }
            ProwError::CsvError(_) => {
                "Delete the cached CSV for this authority so it is rebuilt from source".to_string()
            }
            ProwError::SerializationError(_) => {
                "Delete the cached graph chunks so they are re-downloaded".to_string()
            }
            ProwError::XmlError(_) | ProwError::GpxError { .. } => {
                "The GPX payload is malformed; re-download it or check the source endpoint"
                    .to_string()
            }
            ProwError::OverpassError { .. } => {
                "Overpass may be rate-limiting; wait a minute and retry, or lower concurrency"
                    .to_string()
            }
            ProwError::GeocodeError { .. } => {
                "Check the authority name spelling against the rowmaps dataset list".to_string()
            }
            ProwError::UnknownAuthorityError { .. } => {
                "Pass --code explicitly or use an authority name from the rowmaps dataset list"
                    .to_string()
            }
            ProwError::AnalysisError { .. } => {
                "Re-run with --verbose to locate the failing stage".to_string()
            }
            ProwError::ConfigValidationError { .. }
            | ProwError::InvalidConfigValueError { .. }
            | ProwError::MissingConfigError { .. } => {
                "Fix the configuration value and re-run".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ProwError::HttpError(e) => format!("A download failed: {}", e),
            ProwError::GeocodeError { query, .. } => {
                format!("Could not locate authority '{}'", query)
            }
            ProwError::UnknownAuthorityError { name } => {
                format!("No rowmaps dataset code is known for '{}'", name)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_low_severity() {
        let err = ProwError::MissingConfigError {
            field: "authority".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_overpass_error_is_network_category() {
        let err = ProwError::OverpassError {
            message: "timeout".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(!err.recovery_suggestion().is_empty());
    }
}
