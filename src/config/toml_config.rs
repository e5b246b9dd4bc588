use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{
    DEFAULT_GEOCODE_ENDPOINT, DEFAULT_OVERPASS_ENDPOINT, DEFAULT_ROW_ENDPOINT,
    DEFAULT_TRACES_ENDPOINT,
};
use crate::domain::model::AuthorityJob;
use crate::domain::ports::ConfigProvider;
use crate::osm::authorities;
use crate::utils::error::{ProwError, Result};
use crate::utils::validation::{self, Validate};

/// TOML configuration for a multi-authority batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub batch: BatchSection,
    #[serde(default)]
    pub endpoints: EndpointsSection,
    #[serde(default)]
    pub tuning: TuningSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub monitoring: Option<MonitoringSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub runs: Vec<RunSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    pub authority: String,
    pub region: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsSection {
    #[serde(default = "default_row_endpoint")]
    pub row: String,
    #[serde(default = "default_traces_endpoint")]
    pub traces: String,
    #[serde(default = "default_overpass_endpoint")]
    pub overpass: String,
    #[serde(default = "default_geocode_endpoint")]
    pub geocode: String,
}

impl Default for EndpointsSection {
    fn default() -> Self {
        Self {
            row: default_row_endpoint(),
            traces: default_traces_endpoint(),
            overpass: default_overpass_endpoint(),
            geocode: default_geocode_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningSection {
    #[serde(default = "default_sample_spacing")]
    pub sample_spacing_m: f64,
    #[serde(default = "default_match_radius")]
    pub match_radius_m: f64,
    #[serde(default = "default_chunk_length")]
    pub chunk_length_m: f64,
    #[serde(default = "default_row_coverage")]
    pub row_coverage: f64,
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for TuningSection {
    fn default() -> Self {
        Self {
            sample_spacing_m: default_sample_spacing(),
            match_radius_m: default_match_radius(),
            chunk_length_m: default_chunk_length(),
            row_coverage: default_row_coverage(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSection {
    pub enabled: bool,
}

fn default_row_endpoint() -> String {
    DEFAULT_ROW_ENDPOINT.to_string()
}
fn default_traces_endpoint() -> String {
    DEFAULT_TRACES_ENDPOINT.to_string()
}
fn default_overpass_endpoint() -> String {
    DEFAULT_OVERPASS_ENDPOINT.to_string()
}
fn default_geocode_endpoint() -> String {
    DEFAULT_GEOCODE_ENDPOINT.to_string()
}
fn default_sample_spacing() -> f64 {
    10.0
}
fn default_match_radius() -> f64 {
    20.0
}
fn default_chunk_length() -> f64 {
    5000.0
}
fn default_row_coverage() -> f64 {
    0.5
}
fn default_concurrent_requests() -> usize {
    5
}
fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_output_dir() -> String {
    "./output".to_string()
}

impl BatchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProwError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ProwError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` references with environment values. Unset variables
    /// are left as-is so validation can point at them.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    /// Resolve the run list into jobs, deriving dataset codes where the
    /// config does not pin them.
    pub fn jobs(&self) -> Result<Vec<AuthorityJob>> {
        self.batch
            .runs
            .iter()
            .map(|run| {
                let code = match &run.code {
                    Some(code) => code.to_uppercase(),
                    None => authorities::reverse_search(&run.authority)
                        .ok_or_else(|| ProwError::UnknownAuthorityError {
                            name: run.authority.clone(),
                        })?
                        .to_string(),
                };
                Ok(AuthorityJob {
                    authority: run.authority.clone(),
                    code,
                    region: run.region.clone(),
                })
            })
            .collect()
    }
}

impl ConfigProvider for BatchConfig {
    fn row_endpoint(&self) -> &str {
        &self.endpoints.row
    }

    fn traces_endpoint(&self) -> &str {
        &self.endpoints.traces
    }

    fn overpass_endpoint(&self) -> &str {
        &self.endpoints.overpass
    }

    fn geocode_endpoint(&self) -> &str {
        &self.endpoints.geocode
    }

    fn data_dir(&self) -> &str {
        &self.output.data_dir
    }

    fn output_dir(&self) -> &str {
        &self.output.output_dir
    }

    fn sample_spacing_m(&self) -> f64 {
        self.tuning.sample_spacing_m
    }

    fn match_radius_m(&self) -> f64 {
        self.tuning.match_radius_m
    }

    fn chunk_length_m(&self) -> f64 {
        self.tuning.chunk_length_m
    }

    fn row_coverage(&self) -> f64 {
        self.tuning.row_coverage
    }

    fn concurrent_requests(&self) -> usize {
        self.tuning.concurrent_requests
    }
}

impl Validate for BatchConfig {
    fn validate(&self) -> Result<()> {
        if self.batch.runs.is_empty() {
            return Err(ProwError::MissingConfigError {
                field: "batch.runs".to_string(),
            });
        }
        for run in &self.batch.runs {
            validation::validate_non_empty_string("batch.runs.authority", &run.authority)?;
            validation::validate_non_empty_string("batch.runs.region", &run.region)?;
        }
        validation::validate_url("endpoints.row", &self.endpoints.row)?;
        validation::validate_url("endpoints.traces", &self.endpoints.traces)?;
        validation::validate_url("endpoints.overpass", &self.endpoints.overpass)?;
        validation::validate_url("endpoints.geocode", &self.endpoints.geocode)?;
        validation::validate_path("output.data_dir", &self.output.data_dir)?;
        validation::validate_path("output.output_dir", &self.output.output_dir)?;
        validation::validate_positive_metres("tuning.sample_spacing_m", self.tuning.sample_spacing_m)?;
        validation::validate_positive_metres("tuning.match_radius_m", self.tuning.match_radius_m)?;
        validation::validate_positive_metres("tuning.chunk_length_m", self.tuning.chunk_length_m)?;
        validation::validate_fraction("tuning.row_coverage", self.tuning.row_coverage)?;
        validation::validate_positive_number(
            "tuning.concurrent_requests",
            self.tuning.concurrent_requests,
            1,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC_TOML: &str = r#"
[batch]
name = "south-west"
description = "South West England survey"
version = "1.0"

[[batch.runs]]
authority = "Devon"
region = "devon"

[[batch.runs]]
authority = "Cornwall"
region = "cornwall"
code = "CO"

[tuning]
match_radius_m = 25.0
"#;

    #[test]
    fn test_parse_basic_batch_config() {
        let config = BatchConfig::from_toml_str(BASIC_TOML).unwrap();

        assert_eq!(config.batch.name, "south-west");
        assert_eq!(config.batch.runs.len(), 2);
        assert_eq!(config.match_radius_m(), 25.0);
        // unspecified sections fall back to defaults
        assert_eq!(config.sample_spacing_m(), 10.0);
        assert_eq!(config.row_endpoint(), DEFAULT_ROW_ENDPOINT);
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_jobs_resolve_codes() {
        let config = BatchConfig::from_toml_str(BASIC_TOML).unwrap();
        let jobs = config.jobs().unwrap();

        assert_eq!(jobs[0].code, "DN");
        assert_eq!(jobs[1].code, "CO");
    }

    #[test]
    fn test_jobs_unknown_authority_is_error() {
        let toml = r#"
[batch]
name = "bad"

[[batch.runs]]
authority = "Atlantis"
region = "atlantis"
"#;
        let config = BatchConfig::from_toml_str(toml).unwrap();
        assert!(config.jobs().is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_OVERPASS", "https://overpass.test/api");

        let toml = r#"
[batch]
name = "env-test"

[[batch.runs]]
authority = "Devon"
region = "devon"

[endpoints]
overpass = "${TEST_OVERPASS}"
"#;

        let config = BatchConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.overpass_endpoint(), "https://overpass.test/api");

        std::env::remove_var("TEST_OVERPASS");
    }

    #[test]
    fn test_validate_rejects_empty_runs() {
        let toml = r#"
[batch]
name = "empty"
runs = []
"#;
        let config = BatchConfig::from_toml_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tuning() {
        let toml = r#"
[batch]
name = "bad-tuning"

[[batch.runs]]
authority = "Devon"
region = "devon"

[tuning]
row_coverage = 1.5
"#;
        let config = BatchConfig::from_toml_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC_TOML.as_bytes()).unwrap();

        let config = BatchConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.batch.name, "south-west");
    }
}
