//! End-to-end pipeline against a mock search endpoint: search → merge →
//! download → text → events, through the public library API.

use std::sync::Arc;

use async_trait::async_trait;
use epstein_search::config::{Config, SearchConfig};
use epstein_search::events::{EventExtractor, ExtractionRequest};
use epstein_search::{Error, Event, Library, Record};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Minimal valid PDF whose single page shows `phrase`.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn hit(server: &MockServer, id: &str) -> Value {
    json!({
        "_score": 3.2,
        "_source": {
            "documentId": id,
            "ORIGIN_FILE_NAME": format!("{id}.pdf"),
            "ORIGIN_FILE_URI": format!("{}/files/DataSet1/{id}.pdf", server.uri()),
            "contentType": "application/pdf",
            "startPage": 1,
            "endPage": 1
        },
        "highlight": { "content": ["the <em>island</em>"] }
    })
}

fn page(total: u64, hits: Vec<Value>) -> Value {
    json!({ "hits": { "total": { "value": total, "relation": "eq" }, "hits": hits } })
}

async fn mount_search(server: &MockServer, query: &str, page_no: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path("/multimedia-search"))
        .and(query_param("keys", query))
        .and(query_param("page", page_no.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_pdf(server: &MockServer, id: &str, phrase: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/files/DataSet1/{id}.pdf")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "application/pdf")
                .set_body_bytes(minimal_pdf_with_phrase(phrase)),
        )
        .mount(server)
        .await;
}

fn library_for(server: &MockServer) -> Library {
    let config = Config {
        search: SearchConfig {
            base_url: server.uri(),
            page_size: 2,
            ..SearchConfig::default()
        },
        ..Config::default()
    };
    Library::from_config(config).unwrap()
}

fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.document_id.clone()).collect()
}

/// Echoes the whitespace-normalized text back as a single event.
struct EchoExtractor;

#[async_trait]
impl EventExtractor for EchoExtractor {
    async fn extract(&self, request: ExtractionRequest<'_>) -> epstein_search::Result<Vec<Event>> {
        Ok(vec![Event {
            summary: request.text.split_whitespace().collect::<Vec<_>>().join(" "),
            timestamp: "07/04/2002".to_string(),
            location: Some("St. Thomas".to_string()),
        }])
    }
}

#[tokio::test]
async fn paginates_and_merges_or_queries() {
    let server = MockServer::start().await;
    mount_search(&server, "pizza", 0, page(3, vec![hit(&server, "p1"), hit(&server, "shared")])).await;
    mount_search(&server, "pizza", 1, page(3, vec![hit(&server, "p2")])).await;
    mount_search(&server, "flights", 0, page(2, vec![hit(&server, "shared"), hit(&server, "f1")])).await;

    let library = library_for(&server);
    let queries = vec!["pizza".to_string(), "flights".to_string()];
    let records = library.search(&queries, None, 0).collect().await.unwrap();
    // p1 | shared ; shared(dup) | f1 ; p2
    assert_eq!(ids(&records), vec!["p1", "shared", "f1", "p2"]);

    let window = library.search(&queries, Some(2), 1).collect().await.unwrap();
    assert_eq!(ids(&window), vec!["shared", "f1"]);

    assert_eq!(library.count("pizza").await.unwrap(), 3);
}

#[tokio::test]
async fn upstream_failure_aborts_search() {
    let server = MockServer::start().await;
    mount_search(&server, "q", 0, page(4, vec![hit(&server, "a"), hit(&server, "b")])).await;
    Mock::given(method("GET"))
        .and(path("/multimedia-search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let library = library_for(&server);
    let err = library
        .search(&["q".to_string()], None, 0)
        .collect()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn enrichment_isolates_a_missing_document() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        "island",
        0,
        page(3, vec![hit(&server, "d1"), hit(&server, "d2")]),
    )
    .await;
    mount_search(&server, "island", 1, page(3, vec![hit(&server, "d3")])).await;
    mount_pdf(&server, "d1", "island flight manifest").await;
    // d2 is not mounted: wiremock answers 404.
    mount_pdf(&server, "d3", "island flight manifest").await;

    let library = library_for(&server).with_extractor(Arc::new(EchoExtractor));
    let pool = library.events_pool("island", None, 3).unwrap();
    let records = library
        .search(&["island".to_string()], None, 0)
        .collect()
        .await
        .unwrap();
    assert_eq!(records.len(), 3);

    let mut outcomes = pool.run(records).collect().await;
    outcomes.sort_by(|a, b| a.record.document_id.cmp(&b.record.document_id));
    assert_eq!(outcomes.len(), 3);

    for i in [0, 2] {
        let o = &outcomes[i];
        assert!(o.is_ok(), "{}: {:?}", o.record.document_id, o.error);
        let text: String = o
            .record
            .text
            .as_deref()
            .unwrap()
            .split_whitespace()
            .collect();
        assert!(text.contains("islandflightmanifest"), "got {:?}", text);
        assert_eq!(o.record.events.as_ref().unwrap().len(), 1);
    }

    let missing = &outcomes[1];
    assert_eq!(missing.record.document_id, "d2");
    assert!(matches!(missing.error, Some(Error::Fetch(_))));
    assert!(missing.record.text.is_none());
    assert!(missing.record.events.is_none());
}

#[tokio::test]
async fn events_without_credential_fail_before_any_request() {
    let server = MockServer::start().await;
    let mut config = Config::default();
    config.search.base_url = server.uri();
    config.enrich.api_url = server.uri();
    let library = Library::from_config(config).unwrap();

    // Only meaningful when the variable is absent from the test environment.
    if std::env::var(epstein_search::events::API_KEY_ENV).is_err() {
        let err = library.events_pool("island", None, 2).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
