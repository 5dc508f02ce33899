use httpmock::prelude::*;
use likelihood_etl::domain::model::{GeneratedStatement, StatementLabel};
use likelihood_etl::{JobConfig, JudgeEngine, LocalStorage, StatementPipeline};
use tempfile::TempDir;

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}}
        ]
    })
}

fn job_config(server: &MockServer, limit: Option<usize>) -> JobConfig {
    let limit_line = match limit {
        Some(value) => format!("limit = {}\n", value),
        None => String::new(),
    };

    let toml = format!(
        r#"
[endpoint]
url = "{}"
api_key = "integration-test-key"
retry_attempts = 2
retry_wait_seconds = 0

[batch]
size = 20
{}
[files]
input = "possible.json"
results = "statements.json"
raw_log = "statements_raw.jsonl"
"#,
        server.url("/v1/chat/completions"),
        limit_line
    );

    JobConfig::from_toml_str(&toml).unwrap()
}

fn write_input(dir: &TempDir, count: usize) {
    let items: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": format!("evt_{}", i),
                "description": format!("Event number {} happens in 2026.", i)
            })
        })
        .collect();

    std::fs::write(
        dir.path().join("possible.json"),
        serde_json::to_vec_pretty(&items).unwrap(),
    )
    .unwrap();
}

fn statements_for(id: &str) -> Vec<serde_json::Value> {
    [
        ("highly_likely", "Highly likely"),
        ("possible", "Possible"),
        ("unlikely", "Unlikely"),
        ("highly_unlikely", "Highly unlikely"),
    ]
    .iter()
    .map(|(suffix, label)| {
        serde_json::json!({
            "id": format!("{}_{}", id, suffix),
            "statement": format!("A claim derived from {}.", id),
            "label": label
        })
    })
    .collect()
}

#[tokio::test]
async fn test_end_to_end_statement_generation() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, 1);

    let server = MockServer::start();
    let content = serde_json::Value::Array(statements_for("evt_0")).to_string();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chat_body(&content));
    });

    let config = job_config(&server, None);
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let pipeline = StatementPipeline::new(storage, config).unwrap();
    let engine = JudgeEngine::new(pipeline);

    let summary = engine.run().await.unwrap();

    api_mock.assert();
    assert_eq!(summary.items, 1);
    assert_eq!(summary.output_path, "statements.json");

    // Output is a bare pretty-printed array, no envelope
    let text = std::fs::read_to_string(temp_dir.path().join("statements.json")).unwrap();
    assert!(text.starts_with("[\n"));

    let statements: Vec<GeneratedStatement> = serde_json::from_str(&text).unwrap();
    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0].id, "evt_0_highly_likely");
    assert_eq!(statements[0].label, StatementLabel::HighlyLikely);
    assert_eq!(statements[3].label, StatementLabel::HighlyUnlikely);

    let raw = std::fs::read_to_string(temp_dir.path().join("statements_raw.jsonl")).unwrap();
    assert_eq!(raw.lines().count(), 1);
}

#[tokio::test]
async fn test_results_envelope_is_tolerated_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, 1);

    let server = MockServer::start();
    let content = serde_json::json!({ "results": statements_for("evt_0") }).to_string();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chat_body(&content));
    });

    let config = job_config(&server, None);
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let pipeline = StatementPipeline::new(storage, config).unwrap();
    let engine = JudgeEngine::new(pipeline);

    engine.run().await.unwrap();

    api_mock.assert();

    let text = std::fs::read_to_string(temp_dir.path().join("statements.json")).unwrap();
    let statements: Vec<GeneratedStatement> = serde_json::from_str(&text).unwrap();
    assert_eq!(statements.len(), 4);
}

#[tokio::test]
async fn test_limit_caps_the_processed_items() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, 5);

    let server = MockServer::start();
    let content = serde_json::Value::Array(statements_for("evt_0")).to_string();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(chat_body(&content));
    });

    let config = job_config(&server, Some(1));
    let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
    let pipeline = StatementPipeline::new(storage, config).unwrap();
    let engine = JudgeEngine::new(pipeline);

    let summary = engine.run().await.unwrap();

    // Only the first item goes out, in a single batch
    api_mock.assert_hits(1);
    assert_eq!(summary.items, 1);
}
