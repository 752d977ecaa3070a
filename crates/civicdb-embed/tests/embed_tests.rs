use std::time::Duration;

use civicdb_core::config::{EmbeddingSettings, ProviderKind};
use civicdb_core::traits::EmbedProvider;
use civicdb_embed::{parse_embedding_payload, provider_from_settings, FakeEmbedder, OpenAiProvider};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve exactly one HTTP response, handing back the raw request text.
async fn serve_once(status_line: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        let _ = tx.send(String::from_utf8_lossy(&buf).to_string());
    });
    (format!("http://{addr}/v1/embeddings"), rx)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(header_end) = text.find("\r\n\r\n") else { return false };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim().eq_ignore_ascii_case("content-length") { value.trim().parse::<usize>().ok() } else { None }
        })
        .unwrap_or(0);
    buf.len() >= header_end + 4 + content_length
}

fn provider(endpoint: &str) -> OpenAiProvider {
    OpenAiProvider::new(endpoint, "text-embedding-3-small", "sk-test", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn openai_provider_posts_model_and_input() {
    let (endpoint, request) = serve_once("200 OK", r#"{"data":[{"embedding":[0.25,-0.5,1]}]}"#.to_string()).await;
    let embedding = provider(&endpoint).embed("garage permit").await.expect("embed");
    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /v1/embeddings"));
    assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""model":"text-embedding-3-small""#));
    assert!(request.contains(r#""input":"garage permit""#));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (endpoint, _request) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#.to_string()).await;
    let err = provider(&endpoint).embed("garage").await.unwrap_err();
    assert!(err.to_string().contains("429"), "{err}");
}

#[tokio::test]
async fn empty_or_non_numeric_vector_is_an_error() {
    let (endpoint, _request) = serve_once("200 OK", r#"{"data":[{"embedding":["a",null]}]}"#.to_string()).await;
    assert!(provider(&endpoint).embed("garage").await.is_err());

    let (endpoint, _request) = serve_once("200 OK", r#"{"data":[]}"#.to_string()).await;
    assert!(provider(&endpoint).embed("garage").await.is_err());
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let endpoint = format!("http://{addr}/v1/embeddings");
    assert!(provider(&endpoint).embed("garage").await.is_err());
}

#[test]
fn payload_parsing_drops_non_numeric_entries() {
    let payload = serde_json::json!({ "data": [{ "embedding": [1.0, "x", 2, null, 3.5] }] });
    assert_eq!(parse_embedding_payload(&payload), Some(vec![1.0, 2.0, 3.5]));
    assert_eq!(parse_embedding_payload(&serde_json::json!({ "data": [{ "embedding": "nope" }] })), None);
    assert_eq!(parse_embedding_payload(&serde_json::json!({})), None);
}

#[tokio::test]
async fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::new(64);
    let v1 = embedder.embed("Garage permit rules").await.expect("embed");
    let v2 = embedder.embed("garage PERMIT rules").await.expect("embed");

    assert_eq!(v1.len(), 64);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
    assert!(embedder.embed("   ").await.is_err());
}

#[test]
fn provider_selection_follows_settings() {
    let mut settings = EmbeddingSettings::default();
    assert!(provider_from_settings(&settings).unwrap().is_none(), "no key, no provider");

    settings.api_key = Some("   ".to_string());
    assert!(provider_from_settings(&settings).unwrap().is_none(), "blank key, no provider");

    settings.api_key = Some("sk-test".to_string());
    let p = provider_from_settings(&settings).unwrap().expect("openai");
    assert_eq!(p.embedder_id(), "openai:text-embedding-3-small");

    settings.provider = ProviderKind::Fake;
    settings.fake_dim = 16;
    let p = provider_from_settings(&settings).unwrap().expect("fake");
    assert_eq!(p.embedder_id(), "fake:xxhash64:d16");

    settings.provider = ProviderKind::Disabled;
    assert!(provider_from_settings(&settings).unwrap().is_none());
}
