use crate::config::job::JobConfig;
use crate::core::chat::{ChatClient, ChatOptions};
use crate::core::salvage;
use crate::core::{Pipeline, Storage};
use crate::domain::model::{AssessmentReport, InputItem};
use crate::utils::error::{JudgeError, Result};
use async_trait::async_trait;

pub const DEFAULT_INPUT_FILE: &str = "yago2026_descriptions.json";
pub const DEFAULT_RESULTS_FILE: &str = "2026_likelihood_output.json";
pub const DEFAULT_RAW_LOG_FILE: &str = "2026_likelihood_raw_responses.jsonl";

// 系統提示：要求只用定義好的 JSON 結構回答
const SYSTEM_PROMPT: &str = concat!(
    "Analyze whether the following event description could realistically occur in 2026. ",
    "Return STRICT JSON ONLY with the required schema. Do not include extra text.",
    "Please evaluate:",
    "1. **Factual Accuracy**: Are the people, organizations, and relationships mentioned realistic and factually plausible?",
    "2. **Timeline Feasibility**: Is the specified date/timeframe reasonable?",
    "3. **Real-world Plausibility**: Could this scenario actually happen given current knowledge of the people/organizations involved? Even though the possibility is low, if it is not impossible, please consider it as possible."
);

const USER_INSTRUCTIONS: &str = r#"Given an array of items, each with fields {id, description}, assess each item and output a JSON object with this exact shape:

{
  "results": [
    {
      "id": string,
      "possible_in_2026": boolean,
      "likelihood": "impossible" | "low" | "medium" | "high",
      "rationale": string
    }
  ]
}

Rules:
- Base the judgment on general plausibility by 2026 (not certainty).
- If the scenario is absolutely impossible in 2026, then possible_in_2026 = false, otherwise true.
- Use concise, concrete rationale (<= 2 sentences).
- The array order in results must follow the input order.
- Answer in English.
"#;

#[derive(Debug)]
pub struct AssessOutcome {
    pub report: AssessmentReport,
    pub batches: usize,
}

pub struct AssessPipeline<S: Storage> {
    storage: S,
    config: JobConfig,
    client: ChatClient,
}

impl<S: Storage> AssessPipeline<S> {
    pub fn new(storage: S, config: JobConfig) -> Result<Self> {
        let client = ChatClient::new(ChatOptions::from_config(&config)?)?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    pub fn input_file(&self) -> String {
        self.config
            .files
            .input
            .clone()
            .unwrap_or_else(|| DEFAULT_INPUT_FILE.to_string())
    }

    pub fn results_file(&self) -> String {
        self.config
            .files
            .results
            .clone()
            .unwrap_or_else(|| DEFAULT_RESULTS_FILE.to_string())
    }

    pub fn raw_log_file(&self) -> String {
        self.config
            .files
            .raw_log
            .clone()
            .unwrap_or_else(|| DEFAULT_RAW_LOG_FILE.to_string())
    }

    fn build_user_content(batch: &[InputItem]) -> Result<String> {
        let payload = serde_json::to_string_pretty(batch)?;
        Ok(format!("{}\nInput:\n{}", USER_INSTRUCTIONS, payload))
    }

    fn parse_report(content: &str) -> Result<AssessmentReport> {
        let value = salvage::parse_object(content)?;
        serde_json::from_value(value).map_err(|e| JudgeError::ModelReplyError {
            message: format!("reply JSON does not match the expected schema: {}", e),
        })
    }
}

#[async_trait]
impl<S: Storage> Pipeline for AssessPipeline<S> {
    type Item = InputItem;
    type Outcome = AssessOutcome;

    async fn extract(&self) -> Result<Vec<InputItem>> {
        let path = self.input_file();
        tracing::debug!("Reading input from: {}", path);

        let data = self.storage.read_file(&path).await?;
        let mut items = InputItem::parse_list(&data)?;

        if let Some(limit) = self.config.limit() {
            if items.len() > limit {
                tracing::info!("⏭️ Limiting input to the first {} items", limit);
                items.truncate(limit);
            }
        }

        Ok(items)
    }

    async fn transform(&self, items: Vec<InputItem>) -> Result<AssessOutcome> {
        let batch_size = self.config.batch_size().max(1);
        let total_batches = (items.len() + batch_size - 1) / batch_size;
        let raw_log = self.raw_log_file();

        // 每次執行重開 raw log；之後逐批追加，中途失敗也保得住已完成的批次
        self.storage.write_file(&raw_log, b"").await?;

        let mut results = Vec::new();
        let mut batches = 0usize;

        for (index, batch) in items.chunks(batch_size).enumerate() {
            tracing::info!(
                "🔄 Batch {}/{} ({} items)",
                index + 1,
                total_batches,
                batch.len()
            );

            let user_content = Self::build_user_content(batch)?;
            let (report, raw) = self
                .client
                .chat_with_retry(SYSTEM_PROMPT, &user_content, Self::parse_report)
                .await?;

            let mut line = serde_json::to_string(&raw)?;
            line.push('\n');
            self.storage.append_file(&raw_log, line.as_bytes()).await?;

            results.extend(report.results);
            batches += 1;
        }

        tracing::info!(
            "📊 Collected {} assessments over {} batches",
            results.len(),
            batches
        );

        Ok(AssessOutcome {
            report: AssessmentReport { results },
            batches,
        })
    }

    async fn load(&self, outcome: AssessOutcome) -> Result<String> {
        let path = self.results_file();
        let json = serde_json::to_string_pretty(&outcome.report)?;
        self.storage.write_file(&path, json.as_bytes()).await?;

        tracing::debug!("Wrote {} assessments", outcome.report.results.len());
        Ok(path)
    }
}
