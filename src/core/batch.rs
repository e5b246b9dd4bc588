use std::collections::HashMap;
use std::time::Instant;

use crate::core::pipeline::ProwPipeline;
use crate::core::{AuthorityJob, ConfigProvider, Pipeline, RunResult, Storage};
use crate::domain::model::ClassCounts;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Sequential multi-authority execution. Each authority gets its own
/// pipeline; runs whose outputs already exist are skipped.
pub struct BatchRunner<S: Storage + Clone, C: ConfigProvider + Clone> {
    storage: S,
    config: C,
    monitor: SystemMonitor,
}

impl<S: Storage + Clone, C: ConfigProvider + Clone> BatchRunner<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub async fn run_all(&self, jobs: &[AuthorityJob]) -> Result<Vec<RunResult>> {
        let mut results = Vec::with_capacity(jobs.len());
        self.monitor.log_stats("Batch starting");

        for job in jobs {
            tracing::info!(
                "Analysis for authority '{}' code '{}' in region '{}'",
                job.authority,
                job.code,
                job.region
            );

            let pipeline =
                ProwPipeline::new(self.storage.clone(), self.config.clone(), job.clone())?;

            if pipeline.outputs_exist().await {
                tracing::info!("⏭️ Output for {} already exists, skipping", job.code);
                results.push(RunResult {
                    authority: job.authority.clone(),
                    code: job.code.clone(),
                    region: job.region.clone(),
                    counts: ClassCounts::default(),
                    duration: std::time::Duration::ZERO,
                    output_path: format!("{}/{}", self.config.output_dir(), job.code),
                    skipped: true,
                    metadata: HashMap::new(),
                });
                continue;
            }

            let start = Instant::now();
            let result = self.run_one(&pipeline).await;
            let duration = start.elapsed();

            match result {
                Ok((counts, output_path)) => {
                    tracing::info!(
                        "✅ {} done in {:?} (B: {}, P: {}, R: {})",
                        job.code,
                        duration,
                        counts.both,
                        counts.public_only,
                        counts.row_only
                    );
                    self.monitor.log_stats(&format!("After {}", job.code));
                    let mut metadata = HashMap::new();
                    metadata.insert(
                        "completed_at".to_string(),
                        serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
                    );
                    results.push(RunResult {
                        authority: job.authority.clone(),
                        code: job.code.clone(),
                        region: job.region.clone(),
                        counts,
                        duration,
                        output_path,
                        skipped: false,
                        metadata,
                    });
                }
                Err(e) => {
                    tracing::error!("❌ Analysis for {} failed: {}", job.code, e);
                    return Err(e);
                }
            }
        }

        self.monitor.log_final_stats();
        Ok(results)
    }

    async fn run_one(&self, pipeline: &ProwPipeline<S, C>) -> Result<(ClassCounts, String)> {
        let survey = pipeline.extract().await?;
        tracing::debug!(
            "📥 Extracted {} RoW points, {} public points, {} chunks",
            survey.row_points.len(),
            survey.public_points.len(),
            survey.chunks.len()
        );

        let analysis = pipeline.transform(survey).await?;
        let counts = analysis.counts;
        tracing::debug!("🔄 Classified {} edges", counts.total());

        let output_path = pipeline.load(analysis).await?;
        tracing::debug!("💾 Output at {}", output_path);

        Ok((counts, output_path))
    }
}

/// Summary of a finished batch, for the final log line and tests.
pub fn execution_summary(results: &[RunResult]) -> HashMap<String, serde_json::Value> {
    let mut summary = HashMap::new();

    let executed: Vec<&RunResult> = results.iter().filter(|r| !r.skipped).collect();
    let total_edges: usize = executed.iter().map(|r| r.counts.total()).sum();
    let total_candidates: usize = executed.iter().map(|r| r.counts.public_only).sum();
    let total_duration: std::time::Duration = executed.iter().map(|r| r.duration).sum();

    summary.insert(
        "total_runs".to_string(),
        serde_json::Value::Number(results.len().into()),
    );
    summary.insert(
        "skipped_runs".to_string(),
        serde_json::Value::Number((results.len() - executed.len()).into()),
    );
    summary.insert(
        "total_edges".to_string(),
        serde_json::Value::Number(total_edges.into()),
    );
    summary.insert(
        "candidate_edges".to_string(),
        serde_json::Value::Number(total_candidates.into()),
    );
    summary.insert(
        "total_duration_ms".to_string(),
        serde_json::Value::Number((total_duration.as_millis() as u64).into()),
    );

    let codes: Vec<serde_json::Value> = executed
        .iter()
        .map(|r| serde_json::Value::String(r.code.clone()))
        .collect();
    summary.insert("executed_codes".to_string(), serde_json::Value::Array(codes));

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_result(code: &str, public_only: usize, skipped: bool) -> RunResult {
        RunResult {
            authority: code.to_string(),
            code: code.to_string(),
            region: "region".to_string(),
            counts: ClassCounts {
                both: 2,
                public_only,
                row_only: 1,
            },
            duration: std::time::Duration::from_millis(100),
            output_path: format!("./output/{}", code),
            skipped,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_execution_summary_counts() {
        let results = vec![
            run_result("DN", 3, false),
            run_result("CO", 5, false),
            run_result("SO", 9, true),
        ];

        let summary = execution_summary(&results);

        assert_eq!(summary["total_runs"], serde_json::Value::Number(3.into()));
        assert_eq!(summary["skipped_runs"], serde_json::Value::Number(1.into()));
        assert_eq!(summary["candidate_edges"], serde_json::Value::Number(8.into()));
        assert_eq!(summary["total_edges"], serde_json::Value::Number(12.into()));

        let codes = summary["executed_codes"].as_array().unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0], "DN");
    }
}
