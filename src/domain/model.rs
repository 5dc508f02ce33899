use crate::utils::error::{JudgeError, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// 輸入項目：{id, description}。id 接受字串或數字，統一轉成字串
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputItem {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub description: String,
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "id must be a string or number, got: {}",
            other
        ))),
    }
}

impl InputItem {
    /// 解析輸入檔案：必須是 JSON 陣列，逐筆檢查 id 與 description
    pub fn parse_list(data: &[u8]) -> Result<Vec<InputItem>> {
        let value: serde_json::Value = serde_json::from_slice(data)?;

        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            _ => {
                return Err(JudgeError::ValidationError {
                    message: "input must be a JSON array of {id, description} items".to_string(),
                })
            }
        };

        let mut items = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let item: InputItem =
                serde_json::from_value(entry).map_err(|e| JudgeError::ValidationError {
                    message: format!("item {} is missing id or description: {}", index, e),
                })?;
            items.push(item);
        }

        Ok(items)
    }
}

/// 模型回傳的可能性等級（wire 格式為小寫）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Likelihood {
    Impossible,
    Low,
    Medium,
    High,
}

/// 單筆可能性判定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub possible_in_2026: bool,
    pub likelihood: Likelihood,
    pub rationale: String,
}

/// 判定輸出的 {"results": [...]} 外層
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub results: Vec<Assessment>,
}

/// 陳述句標籤（wire 格式帶空格）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementLabel {
    #[serde(rename = "Highly likely")]
    HighlyLikely,
    #[serde(rename = "Possible")]
    Possible,
    #[serde(rename = "Unlikely")]
    Unlikely,
    #[serde(rename = "Highly unlikely")]
    HighlyUnlikely,
}

/// 由模型產生的是非陳述句；id 為原始 id 加上標籤後綴
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedStatement {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub statement: String,
    pub label: StatementLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruthAnswer {
    True,
    False,
}

/// RAG 衝突測試的結構化回答（模型不一定遵守，僅在合法時解析）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagVerdict {
    pub statement: String,
    pub answer: TruthAnswer,
    pub reasoning: String,
}

/// 追加到結果檔的單行紀錄；model_output 為解析後 JSON 或原始文字
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagRecord {
    pub context: String,
    pub statement: String,
    pub model_output: serde_json::Value,
    pub recorded_at: String,
}

/// 過濾工具輸出：possible_in_2026 為 false 的項目投影
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpossibleEntry {
    pub id: String,
    pub likelihood: Likelihood,
    pub rationale: String,
}

/// 描述投影工具輸出；id 僅在啟用補號時出現
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_accepts_string_and_number_ids() {
        let data = br#"[
            {"id": "evt_1", "description": "first"},
            {"id": 42, "description": "second"}
        ]"#;

        let items = InputItem::parse_list(data).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "evt_1");
        assert_eq!(items[1].id, "42");
    }

    #[test]
    fn test_parse_list_rejects_non_array() {
        let err = InputItem::parse_list(br#"{"id": "x", "description": "y"}"#).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn test_parse_list_reports_offending_index() {
        let data = br#"[
            {"id": "evt_1", "description": "ok"},
            {"id": "evt_2"}
        ]"#;

        let err = InputItem::parse_list(data).unwrap_err();
        assert!(err.to_string().contains("item 1"));
    }

    #[test]
    fn test_likelihood_wire_format_is_lowercase() {
        let json = serde_json::to_string(&Likelihood::Impossible).unwrap();
        assert_eq!(json, r#""impossible""#);

        let parsed: Likelihood = serde_json::from_str(r#""high""#).unwrap();
        assert_eq!(parsed, Likelihood::High);

        assert!(serde_json::from_str::<Likelihood>(r#""certain""#).is_err());
    }

    #[test]
    fn test_statement_label_wire_format_keeps_spaces() {
        let json = serde_json::to_string(&StatementLabel::HighlyUnlikely).unwrap();
        assert_eq!(json, r#""Highly unlikely""#);

        let parsed: StatementLabel = serde_json::from_str(r#""Highly likely""#).unwrap();
        assert_eq!(parsed, StatementLabel::HighlyLikely);
    }

    #[test]
    fn test_description_entry_omits_absent_id() {
        let entry = DescriptionEntry {
            id: None,
            description: "an event".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"description":"an event"}"#
        );
    }
}
