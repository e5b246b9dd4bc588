pub mod cli;
pub mod toml_config;

use crate::domain::model::AuthorityJob;
use crate::domain::ports::ConfigProvider;
use crate::osm::authorities;
use crate::utils::error::{ProwError, Result};
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROW_ENDPOINT: &str = "https://www.rowmaps.com/getgpx.php";
pub const DEFAULT_TRACES_ENDPOINT: &str =
    "http://zverik.openstreetmap.ru/gps/files/extracts/europe/great_britain";
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "prow-etl"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Compare public GPS traces against recorded rights of way")
)]
pub struct CliConfig {
    /// Authority name as listed in the rowmaps datasets
    #[cfg_attr(feature = "cli", arg(long))]
    pub authority: String,

    /// Public-trace region containing the authority
    #[cfg_attr(feature = "cli", arg(long))]
    pub region: String,

    /// Two-letter dataset code; derived from the authority name when omitted
    #[cfg_attr(feature = "cli", arg(long))]
    pub code: Option<String>,

    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_ROW_ENDPOINT))]
    pub row_endpoint: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_TRACES_ENDPOINT))]
    pub traces_endpoint: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_OVERPASS_ENDPOINT))]
    pub overpass_endpoint: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = DEFAULT_GEOCODE_ENDPOINT))]
    pub geocode_endpoint: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "./data"))]
    pub data_dir: String,

    #[cfg_attr(feature = "cli", arg(long, default_value = "./output"))]
    pub output_dir: String,

    /// Interpolation spacing for traces and edge samples, metres
    #[cfg_attr(feature = "cli", arg(long, default_value = "10.0"))]
    pub sample_spacing_m: f64,

    /// Point-to-path match radius, metres
    #[cfg_attr(feature = "cli", arg(long, default_value = "20.0"))]
    pub match_radius_m: f64,

    /// Side length of the square analysis chunks, metres
    #[cfg_attr(feature = "cli", arg(long, default_value = "5000.0"))]
    pub chunk_length_m: f64,

    /// Fraction of an edge that RoW points must cover
    #[cfg_attr(feature = "cli", arg(long, default_value = "0.5"))]
    pub row_coverage: f64,

    #[cfg_attr(feature = "cli", arg(long, default_value = "5"))]
    pub concurrent_requests: usize,

    #[cfg_attr(feature = "cli", arg(long, help = "Enable verbose output"))]
    pub verbose: bool,

    #[cfg_attr(feature = "cli", arg(long, help = "Enable system monitoring"))]
    pub monitor: bool,
}

impl CliConfig {
    /// Resolve the run identity, deriving the dataset code from the
    /// authority name unless one was given explicitly.
    pub fn job(&self) -> Result<AuthorityJob> {
        let code = match &self.code {
            Some(code) => code.to_uppercase(),
            None => authorities::reverse_search(&self.authority)
                .ok_or_else(|| ProwError::UnknownAuthorityError {
                    name: self.authority.clone(),
                })?
                .to_string(),
        };

        Ok(AuthorityJob {
            authority: self.authority.clone(),
            code,
            region: self.region.clone(),
        })
    }
}

impl ConfigProvider for CliConfig {
    fn row_endpoint(&self) -> &str {
        &self.row_endpoint
    }

    fn traces_endpoint(&self) -> &str {
        &self.traces_endpoint
    }

    fn overpass_endpoint(&self) -> &str {
        &self.overpass_endpoint
    }

    fn geocode_endpoint(&self) -> &str {
        &self.geocode_endpoint
    }

    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn sample_spacing_m(&self) -> f64 {
        self.sample_spacing_m
    }

    fn match_radius_m(&self) -> f64 {
        self.match_radius_m
    }

    fn chunk_length_m(&self) -> f64 {
        self.chunk_length_m
    }

    fn row_coverage(&self) -> f64 {
        self.row_coverage
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("authority", &self.authority)?;
        validation::validate_non_empty_string("region", &self.region)?;
        validation::validate_url("row_endpoint", &self.row_endpoint)?;
        validation::validate_url("traces_endpoint", &self.traces_endpoint)?;
        validation::validate_url("overpass_endpoint", &self.overpass_endpoint)?;
        validation::validate_url("geocode_endpoint", &self.geocode_endpoint)?;
        validation::validate_path("data_dir", &self.data_dir)?;
        validation::validate_path("output_dir", &self.output_dir)?;
        validation::validate_positive_metres("sample_spacing_m", self.sample_spacing_m)?;
        validation::validate_positive_metres("match_radius_m", self.match_radius_m)?;
        validation::validate_positive_metres("chunk_length_m", self.chunk_length_m)?;
        validation::validate_fraction("row_coverage", self.row_coverage)?;
        validation::validate_positive_number("concurrent_requests", self.concurrent_requests, 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> CliConfig {
        CliConfig {
            authority: "Devon".to_string(),
            region: "devon".to_string(),
            code: None,
            row_endpoint: DEFAULT_ROW_ENDPOINT.to_string(),
            traces_endpoint: DEFAULT_TRACES_ENDPOINT.to_string(),
            overpass_endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            geocode_endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            data_dir: "./data".to_string(),
            output_dir: "./output".to_string(),
            sample_spacing_m: 10.0,
            match_radius_m: 20.0,
            chunk_length_m: 5000.0,
            row_coverage: 0.5,
            concurrent_requests: 5,
            verbose: false,
            monitor: false,
        }
    }

    #[test]
    fn test_job_derives_code_from_authority() {
        let job = base_config().job().unwrap();
        assert_eq!(job.code, "DN");
        assert_eq!(job.region, "devon");
    }

    #[test]
    fn test_job_explicit_code_wins() {
        let mut config = base_config();
        config.code = Some("xx".to_string());
        assert_eq!(config.job().unwrap().code, "XX");
    }

    #[test]
    fn test_job_unknown_authority_without_code() {
        let mut config = base_config();
        config.authority = "Atlantis".to_string();
        assert!(config.job().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_coverage() {
        let mut config = base_config();
        config.row_coverage = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = base_config();
        config.overpass_endpoint = "not-a-url".to_string();
        assert!(config.validate().is_err());
    }
}
