use crate::config::job::JobConfig;
use crate::core::chat::{ChatClient, ChatOptions};
use crate::core::salvage;
use crate::core::{Pipeline, Storage};
use crate::domain::model::{GeneratedStatement, InputItem};
use crate::utils::error::{JudgeError, Result};
use async_trait::async_trait;

pub const DEFAULT_INPUT_FILE: &str = "yago2026_possible.json";
pub const DEFAULT_RESULTS_FILE: &str = "true_false_output.json";
pub const DEFAULT_RAW_LOG_FILE: &str = "true_false_raw_responses.jsonl";

/// 每筆輸入要產生的敘述數
pub const STATEMENTS_PER_ITEM: usize = 4;

const SYSTEM_PROMPT: &str = concat!(
    "You are a data transformation assistant. ",
    "Always follow the rules strictly and output valid JSON only."
);

const USER_INSTRUCTIONS: &str = r#"TASK
You will receive an array named "Input" that contains objects with fields:
- id (string or number)
- description (string)

For EACH item in Input, generate FOUR true/false statements with likelihood labels:
- "Highly likely"
- "Possible"
- "Unlikely"
- "Highly unlikely"

GENERATION RULES
- Use ONLY information present in the item's 'description'; do not add external facts.
- Preserve key entities, dates, organizations, and roles.
- Create statements as follows:
  • Highly likely: a faithful, tight paraphrase that would be true if the description is true.
  • Possible: a softened variant (e.g., “around 2026”, “may have”), still consistent with the description.
  • Unlikely: a plausible-sounding inversion of the core relation (e.g., joined↔left, continued↔ended).
  • Highly unlikely: a strong contradiction or role reversal that clearly conflicts with the description.
- Avoid hedging words in “Highly likely” and “Highly unlikely”.
- Keep each statement ≤ 30 words.
- Do NOT include analysis or explanations—output JSON only.

OUTPUT FORMAT
- Return a single JSON ARRAY (not prose). The array length must be exactly 4 × len(Input).
- Each element is an object:
  {
    "id": "<original-id>_<suffix>",  // suffix ∈ {"highly_likely","possible","unlikely","highly_unlikely"}
    "statement": "<the generated true/false statement>",
    "label": "Highly likely" | "Possible" | "Unlikely" | "Highly unlikely"
  }

VALIDATION
- If the description lacks enough detail to invert safely, keep entities/timeframe but invert the main relation reasonably.
- If exact dates appear (e.g., “2026-01-01”), keep them exact in “Highly likely”; in “Possible” you may relax to “around 2026”.
"#;

#[derive(Debug)]
pub struct StatementOutcome {
    pub statements: Vec<GeneratedStatement>,
    pub batches: usize,
}

pub struct StatementPipeline<S: Storage> {
    storage: S,
    config: JobConfig,
    client: ChatClient,
}

impl<S: Storage> StatementPipeline<S> {
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

    fn parse_statements(content: &str) -> Result<Vec<GeneratedStatement>> {
        let value = salvage::parse_array(content)?;
        serde_json::from_value(value).map_err(|e| JudgeError::ModelReplyError {
            message: format!("reply JSON does not match the expected schema: {}", e),
        })
    }
}

#[async_trait]
impl<S: Storage> Pipeline for StatementPipeline<S> {
    type Item = InputItem;
    type Outcome = StatementOutcome;

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

    async fn transform(&self, items: Vec<InputItem>) -> Result<StatementOutcome> {
        let batch_size = self.config.batch_size().max(1);
        let total_batches = (items.len() + batch_size - 1) / batch_size;
        let raw_log = self.raw_log_file();

        self.storage.write_file(&raw_log, b"").await?;

        let mut statements = Vec::new();
        let mut batches = 0usize;

        for (index, batch) in items.chunks(batch_size).enumerate() {
            tracing::info!(
                "🔄 Batch {}/{} ({} items)",
                index + 1,
                total_batches,
                batch.len()
            );

            let user_content = Self::build_user_content(batch)?;
            let (parsed, raw) = self
                .client
                .chat_with_retry(SYSTEM_PROMPT, &user_content, Self::parse_statements)
                .await?;

            // 數量不符只警告，不中斷整趟批次
            let expected = STATEMENTS_PER_ITEM * batch.len();
            if parsed.len() != expected {
                tracing::warn!(
                    "⚠️ Batch {} returned {} statements, expected {}",
                    index + 1,
                    parsed.len(),
                    expected
                );
            }

            let mut line = serde_json::to_string(&raw)?;
            line.push('\n');
            self.storage.append_file(&raw_log, line.as_bytes()).await?;

            statements.extend(parsed);
            batches += 1;
        }

        tracing::info!(
            "📊 Collected {} statements over {} batches",
            statements.len(),
            batches
        );

        Ok(StatementOutcome {
            statements,
            batches,
        })
    }

    async fn load(&self, outcome: StatementOutcome) -> Result<String> {
        let path = self.results_file();
        // 直接存 array，下游工具不需要再剝一層信封
        let json = serde_json::to_string_pretty(&outcome.statements)?;
        self.storage.write_file(&path, json.as_bytes()).await?;

        tracing::debug!("Wrote {} statements", outcome.statements.len());
        Ok(path)
    }
}
