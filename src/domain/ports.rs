use crate::domain::model::{AnalysisResult, SurveyData};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn row_endpoint(&self) -> &str;
    fn traces_endpoint(&self) -> &str;
    fn overpass_endpoint(&self) -> &str;
    fn geocode_endpoint(&self) -> &str;
    fn data_dir(&self) -> &str;
    fn output_dir(&self) -> &str;
    /// Interpolation spacing for traces and edge sampling, metres.
    fn sample_spacing_m(&self) -> f64;
    /// Point-to-path match radius, metres.
    fn match_radius_m(&self) -> f64;
    /// Side length of the square analysis chunks, metres.
    fn chunk_length_m(&self) -> f64;
    /// Fraction of edge samples that must be covered by RoW points for the
    /// edge to count as a recorded right of way.
    fn row_coverage(&self) -> f64;
    fn concurrent_requests(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SurveyData>;
    async fn transform(&self, data: SurveyData) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<String>;
}
