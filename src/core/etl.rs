use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting survey pipeline...");
        self.monitor.log_stats("Extract starting");

        // Extract
        let survey = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} RoW points, {} public points, {} graph chunks",
            survey.row_points.len(),
            survey.public_points.len(),
            survey.chunks.len()
        );
        self.monitor.log_stats("Extract complete");

        // Transform
        let result = self.pipeline.transform(survey).await?;
        tracing::info!(
            "🔄 Classified {} edges (B: {}, P: {}, R: {})",
            result.counts.total(),
            result.counts.both,
            result.counts.public_only,
            result.counts.row_only
        );
        self.monitor.log_stats("Transform complete");

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
