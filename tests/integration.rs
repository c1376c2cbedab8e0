use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn es_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("es");
    path
}

fn hit(server: &MockServer, id: &str) -> Value {
    json!({
        "_score": 1.5,
        "_source": {
            "documentId": id,
            "ORIGIN_FILE_NAME": format!("{id}.txt"),
            "ORIGIN_FILE_URI": format!("{}/files/{id}.txt", server.uri()),
            "contentType": "text/plain",
            "startPage": 1,
            "endPage": 2
        },
        "highlight": { "content": [format!("about\n<em>{id}</em>  ")] }
    })
}

/// Mock library with "pizza" (p1, p2, shared) and "flights" (shared, f1),
/// two hits per page, plus a text document for every id.
async fn start_library() -> MockServer {
    let server = MockServer::start().await;
    let pages = [
        ("pizza", 0, 3, vec!["p1", "shared"]),
        ("pizza", 1, 3, vec!["p2"]),
        ("flights", 0, 2, vec!["shared", "f1"]),
    ];
    for (query, page, total, ids) in pages {
        let hits: Vec<Value> = ids.iter().map(|id| hit(&server, id)).collect();
        Mock::given(method("GET"))
            .and(path("/multimedia-search"))
            .and(query_param("keys", query))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": { "total": { "value": total }, "hits": hits }
            })))
            .mount(&server)
            .await;
    }
    for id in ["p1", "p2", "shared", "f1"] {
        Mock::given(method("GET"))
            .and(path(format!("/files/{id}.txt")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("Flight log for {id}. Departed Teterboro.")),
            )
            .mount(&server)
            .await;
    }
    server
}

fn setup_test_env(server: &MockServer) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("es.toml");
    let config_content = format!(
        r#"[search]
base_url = "{uri}"
page_size = 2

[enrich]
api_url = "{uri}/llm"
model = "test/model"
workers = 2
"#,
        uri = server.uri()
    );
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

fn run_es_with_env(config_path: &Path, args: &[&str], api_key: Option<&str>) -> (String, String, bool) {
    let binary = es_binary();
    let mut cmd = Command::new(&binary);
    cmd.arg("--config").arg(config_path).args(args);
    match api_key {
        Some(key) => cmd.env("OPENROUTER_API_KEY", key),
        None => cmd.env_remove("OPENROUTER_API_KEY"),
    };
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run es binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_es(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_es_keyed(config_path, args, None).await
}

async fn run_es_keyed(config_path: &Path, args: &[&str], key: Option<&str>) -> (String, String, bool) {
    let config_path = config_path.to_path_buf();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let key = key.map(str::to_string);
    tokio::task::spawn_blocking(move || {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_es_with_env(&config_path, &args, key.as_deref())
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_search_plain_output() {
    let server = start_library().await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (stdout, stderr, success) = run_es(&config_path, &["search", "pizza"]).await;
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains(&format!("{}/files/p1.txt\n  about <em>p1</em>\n", server.uri())));
    assert!(stdout.contains("/files/p2.txt"));
}

#[tokio::test]
async fn test_search_or_query_json() {
    let server = start_library().await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (stdout, stderr, success) =
        run_es(&config_path, &["search", "pizza | flights", "--json"]).await;
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    let hits: Value = serde_json::from_str(&stdout).unwrap();
    let ids: Vec<&str> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["_source"]["documentId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["p1", "shared", "f1", "p2"]);
}

#[tokio::test]
async fn test_search_window_and_verbose() {
    let server = start_library().await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (stdout, _, success) =
        run_es(&config_path, &["search", "pizza", "-n", "1", "-s", "1", "--verbose"]).await;
    assert!(success);
    assert!(stdout.contains("--- shared.txt "));
    assert!(stdout.contains("document_id:"));
    assert!(stdout.contains("end_page:"));
    assert!(!stdout.contains("p1.txt"));
}

#[tokio::test]
async fn test_count() {
    let server = start_library().await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (stdout, _, success) = run_es(&config_path, &["count", "pizza"]).await;
    assert!(success);
    assert_eq!(stdout.trim(), "3");

    let (_, stderr, success) = run_es(&config_path, &["count", "pizza | flights"]).await;
    assert!(!success);
    assert!(stderr.contains("OR queries"));
}

#[tokio::test]
async fn test_text_extracts_document() {
    let server = start_library().await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (stdout, stderr, success) =
        run_es(&config_path, &["text", "flights", "-n", "2", "--progress", "off"]).await;
    assert!(success, "text failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Flight log for shared."));
    assert!(stdout.contains("Flight log for f1."));
}

#[tokio::test]
async fn test_events_json_with_mock_llm() {
    let server = start_library().await;
    let reply = json!({"events": [
        {"summary": "Plane departed Teterboro", "timestamp": "07/04/2002", "location": "Teterboro"}
    ]});
    Mock::given(method("POST"))
        .and(path("/llm/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": reply.to_string() } }]
        })))
        .mount(&server)
        .await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (stdout, stderr, success) = run_es_keyed(
        &config_path,
        &["events", "flights", "-n", "2", "--json", "--progress", "json"],
        Some("sk-test"),
    )
    .await;
    assert!(success, "events failed: stdout={}, stderr={}", stdout, stderr);

    let entries: Value = serde_json::from_str(&stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["events"][0]["location"], "Teterboro");
    assert!(stderr.contains("\"phase\":\"completed\""));
}

#[tokio::test]
async fn test_events_require_api_key() {
    let server = start_library().await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (_, stderr, success) = run_es(&config_path, &["events", "pizza"]).await;
    assert!(!success);
    assert!(stderr.contains("OPENROUTER_API_KEY"));
    // Rejected before the search endpoint was contacted.
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_error_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let (_tmp, config_path) = setup_test_env(&server);

    let (_, stderr, success) = run_es(&config_path, &["search", "anything"]).await;
    assert!(!success);
    assert!(stderr.contains("upstream error"));
}

#[test]
fn test_timeline_sorts_appended_runs() {
    let tmp = TempDir::new().unwrap();
    let events_path = tmp.path().join("events.json");
    fs::write(
        &events_path,
        r#"[{"filename":"a.pdf","url":"u1","events":[{"summary":"later","timestamp":"2004","location":null}]}]
[{"filename":"b.pdf","url":"u2","events":[{"summary":"earlier","timestamp":"March 2001","location":"NYC"}]}]
"#,
    )
    .unwrap();

    let output = Command::new(es_binary())
        .arg("timeline")
        .arg(&events_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let events: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(events[0]["summary"], "earlier");
    assert_eq!(events[0]["filename"], "b.pdf");
    assert_eq!(events[1]["summary"], "later");
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("es.toml");
    fs::write(&config_path, "[search]\npage_size = 0\n").unwrap();

    let (_, stderr, success) = run_es_with_env(&config_path, &["count", "x"], None);
    assert!(!success);
    assert!(stderr.contains("page_size"));
}
