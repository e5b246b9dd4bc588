pub mod batch;
pub mod etl;
pub mod pipeline;

pub use crate::domain::model::{AnalysisResult, AuthorityJob, RunResult, SurveyData};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
