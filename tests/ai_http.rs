//! Reasoning client against a local one-shot HTTP server.

use judgebox::config::settings::JudgeConfig;
use judgebox::config::types::{JudgeError, SubmissionStatus, Verdict};
use judgebox::core::orchestrator::JudgeOrchestrator;
use judgebox::core::types::{Problem, StrategyKind, Submission, TestCase};
use judgebox::store::{MemoryStore, SubmissionStore};
use judgebox::strategy::ai::client::MAX_RESPONSE_BYTES;
use judgebox::strategy::ai::{GeminiClient, ReasoningClient};
use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Serve exactly one request; the handle yields the raw request (head and body)
fn serve_once(status: &str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let status = status.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            head.push_str(&line);
        }
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        // the client may hang up early on an oversized body
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();

        format!("{}\r\n{}", head, String::from_utf8_lossy(&request_body))
    });

    (format!("http://{}", addr), handle)
}

fn candidate_body(text: &str) -> String {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

fn client(endpoint: &str) -> GeminiClient {
    GeminiClient::new("secret-key", endpoint, "test-model", Duration::from_secs(5))
}

#[test]
fn test_generate_round_trip() {
    let (endpoint, server) = serve_once("200 OK", candidate_body("hello from the model"));

    let text = client(&endpoint).generate("judge this").unwrap();
    assert_eq!(text, "hello from the model");

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /v1beta/models/test-model:generateContent"));
    assert!(request.to_ascii_lowercase().contains("x-goog-api-key: secret-key"));
    assert!(request.contains("\"generationConfig\""));
    assert!(request.contains("judge this"));
}

#[test]
fn test_server_error_is_unavailable() {
    let (endpoint, server) = serve_once(
        "500 Internal Server Error",
        json!({"error": {"message": "overloaded"}}).to_string(),
    );

    let result = client(&endpoint).generate("x");
    assert!(matches!(result, Err(JudgeError::StrategyUnavailable(_))));
    server.join().unwrap();
}

#[test]
fn test_empty_candidates_are_unavailable() {
    let (endpoint, server) = serve_once("200 OK", json!({"candidates": []}).to_string());

    let result = client(&endpoint).generate("x");
    assert!(matches!(result, Err(JudgeError::StrategyUnavailable(_))));
    server.join().unwrap();
}

#[test]
fn test_oversized_response_is_unavailable() {
    let huge = "x".repeat(2 * MAX_RESPONSE_BYTES as usize);
    let (endpoint, server) = serve_once("200 OK", candidate_body(&huge));

    let result = client(&endpoint).generate("x");
    assert!(matches!(result, Err(JudgeError::StrategyUnavailable(_))));
    server.join().unwrap();
}

#[test]
fn test_ai_verdict_through_orchestrator() {
    let model_text = r#"Here is my assessment:
```json
{"verdict": "wrong_answer", "testCasesPassed": 1, "feedback": "Second case overflows",
 "analysis": "int overflow on large input", "estimatedTimeMs": 15,
 "suggestions": ["use long long"]}
```"#;
    let (endpoint, server) = serve_once("200 OK", candidate_body(model_text));

    let root = tempfile::tempdir().unwrap();
    let mut config = JudgeConfig::default();
    config.workspace_root = root.path().join("ws");
    config.ai.enabled = true;

    let store = Arc::new(MemoryStore::new());
    let orchestrator = JudgeOrchestrator::new(config, store.clone(), store.clone())
        .with_ai_client(Arc::new(client(&endpoint)));

    let problem = Problem {
        id: "big-sum".to_string(),
        title: "Big Sum".to_string(),
        difficulty: "medium".to_string(),
        description: "Add two large integers".to_string(),
        input_format: None,
        output_format: None,
        constraints: Some("|a|, |b| <= 10^18".to_string()),
        time_limit_ms: 1_000,
        memory_limit_mb: 64,
    };
    let mut cases = vec![
        TestCase::new("1 2", "3"),
        TestCase::new("1000000000000 1000000000000", "2000000000000"),
    ];
    cases[0].points = 4;

    let id = orchestrator
        .submit(Submission::new("carol", "big-sum", "cpp", "int main(){}"))
        .unwrap();
    let report = orchestrator.judge(&id, &problem, &cases).unwrap();
    server.join().unwrap();

    assert_eq!(report.strategy, StrategyKind::Ai);
    assert_eq!(report.verdict, Verdict::WrongAnswer);
    let record = store.get(&id).unwrap();
    assert_eq!(record.status, SubmissionStatus::WrongAnswer);
    assert_eq!(record.strategy, Some(StrategyKind::Ai));
    assert_eq!(record.test_cases_passed, 1);
    assert_eq!(record.points_earned, 4);
    assert_eq!(record.execution_time_ms, 15);
    assert_eq!(record.ai_feedback.as_deref(), Some("Second case overflows"));
    assert_eq!(record.ai_suggestions, vec!["use long long".to_string()]);
    assert_eq!(store.problem_stats("big-sum").total_submissions, 1);
}
