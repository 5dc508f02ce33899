use crate::domain::model::{DescriptionEntry, ImpossibleEntry};
use crate::utils::error::{JudgeError, Result};

pub const DEFAULT_ASSESSMENT_FILE: &str = "2026_likelihood_output.json";
pub const DEFAULT_IMPOSSIBLE_FILE: &str = "2026_possible_false.json";

pub const DEFAULT_SOURCE_FILE: &str = "yago2026.json";
pub const DEFAULT_DESCRIPTIONS_FILE: &str = "yago2026_descriptions.json";

/// 從判定輸出挑出 possible_in_2026 嚴格為 false 的項目，投影成 {id, likelihood, rationale}。
///
/// 欄位缺漏或非布林值一律視為「不是 false」而略過；被挑中的項目若缺投影欄位則報錯。
pub fn filter_impossible_entries(data: &[u8]) -> Result<Vec<ImpossibleEntry>> {
    let value: serde_json::Value = serde_json::from_slice(data)?;

    let results = value
        .get("results")
        .ok_or_else(|| JudgeError::ValidationError {
            message: "input is missing the top-level results array".to_string(),
        })?
        .as_array()
        .ok_or_else(|| JudgeError::ValidationError {
            message: "results must be a JSON array".to_string(),
        })?;

    let mut entries = Vec::new();
    for (index, item) in results.iter().enumerate() {
        if item.get("possible_in_2026") != Some(&serde_json::Value::Bool(false)) {
            continue;
        }

        let entry: ImpossibleEntry =
            serde_json::from_value(item.clone()).map_err(|e| JudgeError::ValidationError {
                message: format!("result {} cannot be projected: {}", index, e),
            })?;
        entries.push(entry);
    }

    Ok(entries)
}

/// 投影結果：保留的項目與缺 description 而被略過的筆數
#[derive(Debug)]
pub struct DescriptionProjection {
    pub entries: Vec<DescriptionEntry>,
    pub skipped: usize,
}

/// 從任意物件陣列挑出帶 description 的項目；with_ids 啟用時補上 item_0001 式流水號。
pub fn project_descriptions(data: &[u8], with_ids: bool) -> Result<DescriptionProjection> {
    let value: serde_json::Value = serde_json::from_slice(data)?;

    let items = value.as_array().ok_or_else(|| JudgeError::ValidationError {
        message: "input must be a JSON array".to_string(),
    })?;

    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for item in items {
        let description = match item.get("description").and_then(|d| d.as_str()) {
            Some(text) => text.to_string(),
            None => {
                skipped += 1;
                continue;
            }
        };

        let id = if with_ids {
            Some(format!("item_{:04}", entries.len() + 1))
        } else {
            None
        };

        entries.push(DescriptionEntry { id, description });
    }

    Ok(DescriptionProjection { entries, skipped })
}
