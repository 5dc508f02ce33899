use httpmock::prelude::*;
use likelihood_etl::domain::model::{RagRecord, RagVerdict, TruthAnswer};
use likelihood_etl::{JobConfig, LocalStorage, RagProbe};
use tempfile::TempDir;

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}}
        ]
    })
}

fn job_config(server: &MockServer) -> JobConfig {
    let toml = format!(
        r#"
[endpoint]
url = "{}"
api_key = "integration-test-key"
retry_attempts = 2
retry_wait_seconds = 0

[files]
results = "rag_results.jsonl"
"#,
        server.url("/v1/chat/completions")
    );

    JobConfig::from_toml_str(&toml).unwrap()
}

#[tokio::test]
async fn test_probe_appends_records_across_runs() {
    let temp_dir = TempDir::new().unwrap();

    let server = MockServer::start();
    let content = serde_json::json!({
        "statement": "Matt Read became chancellor in 2026.",
        "answer": "False",
        "reasoning": "The context only says his affiliation ended."
    })
    .to_string();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chat_body(&content));
    });

    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let probe = RagProbe::new(storage, job_config(&server)).unwrap();

    probe
        .run("January 2026 news passage.", "Matt Read became chancellor in 2026.")
        .await
        .unwrap();
    probe
        .run("Another passage.", "A different claim.")
        .await
        .unwrap();

    api_mock.assert_hits(2);

    // Results accumulate, one JSON line per probe
    let raw = std::fs::read_to_string(temp_dir.path().join("rag_results.jsonl")).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: RagRecord = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.context, "January 2026 news passage.");
    assert_eq!(first.statement, "Matt Read became chancellor in 2026.");
    assert!(!first.recorded_at.is_empty());

    let verdict: RagVerdict = serde_json::from_value(first.model_output).unwrap();
    assert_eq!(verdict.answer, TruthAnswer::False);

    let second: RagRecord = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second.context, "Another passage.");
}

#[tokio::test]
async fn test_probe_preserves_existing_result_file() {
    let temp_dir = TempDir::new().unwrap();

    // A line left over from an earlier session stays in place
    std::fs::write(
        temp_dir.path().join("rag_results.jsonl"),
        "{\"context\": \"old\", \"statement\": \"old\", \"model_output\": \"x\", \"recorded_at\": \"t\"}\n",
    )
    .unwrap();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chat_body(r#"{"statement": "s", "answer": "True", "reasoning": "r"}"#));
    });

    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let probe = RagProbe::new(storage, job_config(&server)).unwrap();

    probe.run("ctx", "claim").await.unwrap();

    let raw = std::fs::read_to_string(temp_dir.path().join("rag_results.jsonl")).unwrap();
    assert_eq!(raw.lines().count(), 2);
    assert!(raw.contains("\"old\""));
}

#[tokio::test]
async fn test_probe_records_unparseable_reply_as_text() {
    let temp_dir = TempDir::new().unwrap();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chat_body("Sorry, I can only answer in prose."));
    });

    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let probe = RagProbe::new(storage, job_config(&server)).unwrap();

    let record = probe.run("ctx", "claim").await.unwrap();

    // No retry for a malformed reply, the text goes into the record as-is
    api_mock.assert();
    assert_eq!(
        record.model_output,
        serde_json::Value::String("Sorry, I can only answer in prose.".to_string())
    );

    let raw = std::fs::read_to_string(temp_dir.path().join("rag_results.jsonl")).unwrap();
    let line: RagRecord = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert!(line.model_output.is_string());
}
