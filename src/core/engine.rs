use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use serde::Serialize;

/// 單次執行摘要；binaries 可用 --metrics-file 落地成 JSON
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub items: usize,
    pub output_path: String,
    pub duration_ms: u64,
    pub finished_at: String,
}

pub struct JudgeEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> JudgeEngine<P> {
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

    pub async fn run(&self) -> Result<RunSummary> {
        let run_id = format!("run_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
        let started = std::time::Instant::now();

        tracing::info!("🚀 Starting {}", run_id);

        tracing::info!("📥 Extracting input items...");
        let items = self.pipeline.extract().await?;
        let item_count = items.len();
        tracing::info!("📊 Extracted {} items", item_count);
        self.monitor.log_stats("Extract");

        tracing::info!("🔄 Transforming...");
        let outcome = self.pipeline.transform(items).await?;
        self.monitor.log_stats("Transform");

        tracing::info!("💾 Loading results...");
        let output_path = self.pipeline.load(outcome).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(RunSummary {
            run_id,
            items: item_count,
            output_path,
            duration_ms: started.elapsed().as_millis() as u64,
            finished_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}
