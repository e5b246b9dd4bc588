pub mod analysis;
pub mod config;
pub mod core;
pub mod domain;
pub mod geo;
pub mod gpx;
pub mod osm;
pub mod output;
pub mod utils;

pub use config::{cli::LocalStorage, CliConfig};
pub use config::toml_config::BatchConfig;
pub use core::batch::BatchRunner;
pub use core::{etl::AnalysisEngine, pipeline::ProwPipeline};
pub use domain::model::AuthorityJob;
pub use utils::error::{ProwError, Result};
