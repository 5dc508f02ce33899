use crate::utils::error::{JudgeError, Result};
use serde_json::Value;

/// 錯誤訊息內附帶的回覆節錄長度上限
const EXCERPT_MAX_LEN: usize = 400;

/// 去除 markdown 程式碼圍欄（```json ... ```）
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}

/// 取安全節錄：在 UTF-8 字元邊界截斷
pub fn excerpt(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn invalid_reply(content: &str) -> JudgeError {
    JudgeError::ModelReplyError {
        message: format!(
            "reply is not valid JSON: {}",
            excerpt(content, EXCERPT_MAX_LEN)
        ),
    }
}

/// 第一個 open 到最後一個 close 之間的區段（含邊界）
fn slice_between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}

/// 解析預期為物件的模型回覆。
/// 先嘗試整段解析，失敗時取第一個 `{` 到最後一個 `}` 的區段。
/// 區段存在但仍解析失敗即視為無效回覆，不再嘗試其他復原。
pub fn parse_object(content: &str) -> Result<Value> {
    let stripped = strip_code_fences(content);

    if let Ok(value) = serde_json::from_str(stripped) {
        return Ok(value);
    }

    if let Some(slice) = slice_between(stripped, '{', '}') {
        return serde_json::from_str(slice).map_err(|_| invalid_reply(content));
    }

    Err(invalid_reply(content))
}

/// 解析預期為陣列的模型回覆，容忍 {"results": [...]} 外層。
/// 復原順序：整段解析 → `[..]` 區段 → `{..}` 區段（需含 results 陣列）。
pub fn parse_array(content: &str) -> Result<Value> {
    let stripped = strip_code_fences(content);

    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return normalize_array(value, content);
    }

    if let Some(slice) = slice_between(stripped, '[', ']') {
        let value: Value = serde_json::from_str(slice).map_err(|_| invalid_reply(content))?;
        return normalize_array(value, content);
    }

    if let Some(slice) = slice_between(stripped, '{', '}') {
        let value: Value = serde_json::from_str(slice).map_err(|_| invalid_reply(content))?;
        return match &value {
            Value::Object(map) if map.contains_key("results") => normalize_array(value, content),
            _ => Err(invalid_reply(content)),
        };
    }

    Err(invalid_reply(content))
}

fn normalize_array(value: Value, content: &str) -> Result<Value> {
    match value {
        Value::Array(_) => Ok(value),
        Value::Object(map) => match map.get("results") {
            Some(results) if results.is_array() => Ok(results.clone()),
            _ => Err(JudgeError::ModelReplyError {
                message: format!(
                    "expected a JSON array, got: {}",
                    excerpt(content, EXCERPT_MAX_LEN)
                ),
            }),
        },
        _ => Err(JudgeError::ModelReplyError {
            message: format!(
                "expected a JSON array, got: {}",
                excerpt(content, EXCERPT_MAX_LEN)
            ),
        }),
    }
}
