use crate::config::job::JobConfig;
use crate::core::chat::{ChatClient, ChatOptions};
use crate::core::Storage;
use crate::domain::model::{RagRecord, RagVerdict};
use crate::utils::error::Result;
use chrono::Utc;

pub const DEFAULT_RESULTS_FILE: &str = "rag_conflict_results.json";

const SYSTEM_PROMPT: &str = concat!(
    "You are a reasoning assistant.",
    "Always follow the rules strictly and output valid JSON only."
);

/// 單次 RAG 衝突測試：一段檢索 context 配一句陳述，把模型判斷追加到結果檔。
///
/// 與批次管線不同：結果檔不清空、逐次追加；回覆不是合法 JSON 也不重試，
/// 原文照收，留給人工檢查。
pub struct RagProbe<S: Storage> {
    storage: S,
    config: JobConfig,
    client: ChatClient,
}

impl<S: Storage> RagProbe<S> {
    pub fn new(storage: S, config: JobConfig) -> Result<Self> {
        let client = ChatClient::new(ChatOptions::from_config(&config)?)?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    pub fn results_file(&self) -> String {
        self.config
            .files
            .results
            .clone()
            .unwrap_or_else(|| DEFAULT_RESULTS_FILE.to_string())
    }

    fn build_user_content(context: &str, statement: &str) -> String {
        format!(
            r#"TASK
- You will be given two inputs:
  1) A context passage (retrieved text).
  2) A true/false statement (the claim).

- Consider BOTH:
  • The context passage (RAG input)
  • Your own built-in knowledge

- Your goal is to decide whether the claim is true or false, and explain whether your judgment comes from the context passage, your own knowledge, or both.

OUTPUT FORMAT
Return your answer as a JSON object with the following fields:
{{
  "statement": "<the input statement>",
  "answer": "True" | "False",
  "reasoning": "<explain whether you relied on RAG, your own knowledge, or noticed a conflict between them>"
}}

INPUT
Context passage:
<<<
{context}
>>>

Statement:
{statement}
"#
        )
    }

    pub async fn run(&self, context: &str, statement: &str) -> Result<RagRecord> {
        let user_content = Self::build_user_content(context, statement);

        // 解析採寬鬆策略，閉包一律成功，因此只有傳輸層錯誤會觸發重試
        let (content, _raw) = self
            .client
            .chat_with_retry(SYSTEM_PROMPT, &user_content, |content| {
                Ok(content.to_string())
            })
            .await?;

        println!("\n=== Model Output (raw content) ===");
        println!("{}", content);
        println!("=================================\n");

        let model_output = match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("⚠️ Reply is not valid JSON, keeping the raw text");
                serde_json::Value::String(content.clone())
            }
        };

        if let Ok(verdict) = serde_json::from_value::<RagVerdict>(model_output.clone()) {
            tracing::info!("🔍 Model answered {:?}: {}", verdict.answer, verdict.reasoning);
        }

        let record = RagRecord {
            context: context.to_string(),
            statement: statement.to_string(),
            model_output,
            recorded_at: Utc::now().to_rfc3339(),
        };

        let path = self.results_file();
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.storage.append_file(&path, line.as_bytes()).await?;

        tracing::info!("✅ Appended result to {}", path);
        Ok(record)
    }
}
