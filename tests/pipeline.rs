//! End-to-end tests for the extraction and generation pipeline.
//!
//! No test here needs pdfium or a real API key. PDF extraction runs against
//! a fake [`PdfEngine`]; the HTTP client talks to a one-shot local server
//! that replays a canned response.

use async_trait::async_trait;
use pdf2cards::config::{MAX_DOCUMENT_BYTES, MAX_PAGES};
use pdf2cards::{
    extract_file, extract_with, generate, generate_from_pdf, generate_request, CancellationToken,
    ChatCompletionsClient, ClientConfig, CompletionClient, Difficulty, ExtractError,
    ExtractOptions, ExtractedText, FlashcardSetDraft, GenerateError, GeneratedCard,
    GenerationRequest, PageSource, PdfEngine, Pdf2CardsError, SourceDocument,
};
use pdf2cards::pipeline::extract::extract_pages;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// ── Fakes ────────────────────────────────────────────────────────────────

/// A document of `pages` pages, each holding the items `["Page", "<n>"]`.
struct CountingEngine {
    pages: usize,
    calls: AtomicUsize,
    pages_requested: Arc<Mutex<Vec<usize>>>,
}

impl CountingEngine {
    fn new(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            calls: AtomicUsize::new(0),
            pages_requested: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

struct NumberedPages {
    pages: usize,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl PageSource for NumberedPages {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page_items(&mut self, index: usize) -> Result<Vec<String>, ExtractError> {
        assert!(index < self.pages, "page {index} does not exist");
        self.requested.lock().unwrap().push(index);
        Ok(vec!["Page".to_string(), (index + 1).to_string()])
    }
}

impl PdfEngine for CountingEngine {
    fn extract(
        &self,
        _bytes: &[u8],
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut source = NumberedPages {
            pages: self.pages,
            requested: self.pages_requested.clone(),
        };
        extract_pages(&mut source, max_pages, cancel)
    }
}

struct ScriptedClient {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerateError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.7\n% fake body\n".to_vec()
}

// ── Local HTTP responder ─────────────────────────────────────────────────

/// Serve exactly one response on a random port. The join handle yields the
/// raw request the client sent.
async fn serve_once(
    status_line: &'static str,
    extra_headers: &'static str,
    body: String,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{extra_headers}Connection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (format!("http://{addr}/chat/completions"), handle)
}

/// Accept one connection and never answer it.
async fn serve_silence() -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    (format!("http://{addr}/chat/completions"), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("pdf2cards=debug")
        .with_test_writer()
        .try_init();
}

fn http_client(endpoint: &str, timeout_secs: u64) -> ChatCompletionsClient {
    init_logging();
    let config = ClientConfig::builder("sk-local-test")
        .endpoint(endpoint)
        .timeout_secs(timeout_secs)
        .build()
        .unwrap();
    ChatCompletionsClient::new(config).unwrap()
}

fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "cmpl-1",
        "model": "sonar-pro",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

// ── Extraction ───────────────────────────────────────────────────────────

#[tokio::test]
async fn wrong_media_type_does_no_extraction_work() {
    let engine = CountingEngine::new(3);
    let doc = SourceDocument::new(pdf_bytes(), "image/png");
    let err = extract_with(engine.clone(), doc, &ExtractOptions::default(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::InvalidType { .. }));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn oversized_upload_does_no_extraction_work() {
    let engine = CountingEngine::new(3);
    let doc = SourceDocument::pdf(pdf_bytes()).with_declared_size(MAX_DOCUMENT_BYTES + 1);
    let err = extract_with(engine.clone(), doc, &ExtractOptions::default(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::TooLarge { .. }));
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn exactly_ten_mib_is_accepted() {
    let engine = CountingEngine::new(1);
    let doc = SourceDocument::pdf(pdf_bytes()).with_declared_size(MAX_DOCUMENT_BYTES);
    let out = extract_with(engine.clone(), doc, &ExtractOptions::default(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out.text, "Page 1");
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn long_document_reads_only_first_fifty_pages() {
    let engine = CountingEngine::new(80);
    let out = extract_with(
        engine.clone(),
        SourceDocument::pdf(pdf_bytes()),
        &ExtractOptions::default(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(out.pages_read, MAX_PAGES);
    assert_eq!(out.total_pages, 80);
    assert!(out.text.starts_with("Page 1\n\nPage 2\n\n"));
    assert!(out.text.ends_with("Page 50"));
    assert!(!out.text.contains("Page 51"));

    let requested = engine.pages_requested.lock().unwrap();
    assert_eq!(*requested, (0..MAX_PAGES).collect::<Vec<_>>());
}

#[tokio::test]
async fn cancelled_token_skips_engine() {
    let engine = CountingEngine::new(2);
    let token = CancellationToken::new();
    token.cancel();
    let err = extract_with(engine.clone(), SourceDocument::pdf(pdf_bytes()), &ExtractOptions::default(), token)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::Cancelled));
    assert_eq!(engine.calls(), 0);
}

#[test]
fn text_files_are_rejected_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Mitochondria are the powerhouse of the cell.").unwrap();

    let err = tokio_test::block_on(extract_file(&path)).unwrap_err();
    assert!(matches!(err, ExtractError::InvalidType { .. }), "got {err:?}");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = tokio_test::block_on(extract_file(dir.path().join("gone.pdf"))).unwrap_err();
    assert!(matches!(err, ExtractError::FileNotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn oversized_file_is_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.pdf");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(11 * 1024 * 1024).unwrap();

    let err = SourceDocument::from_path(&path).await.unwrap_err();
    match err {
        ExtractError::TooLarge { size, limit } => {
            assert_eq!(size, 11 * 1024 * 1024);
            assert_eq!(limit, MAX_DOCUMENT_BYTES);
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }

    let err = extract_file(&path).await.unwrap_err();
    assert!(matches!(err, ExtractError::TooLarge { .. }), "got {err:?}");
}

#[tokio::test]
async fn oversized_text_file_reports_type_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.txt");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(MAX_DOCUMENT_BYTES + 1).unwrap();

    let err = extract_file(&path).await.unwrap_err();
    assert!(matches!(err, ExtractError::InvalidType { .. }), "got {err:?}");
}

// ── Generation over HTTP ─────────────────────────────────────────────────

#[tokio::test]
async fn two_card_reply_round_trips() {
    let content = r#"[{"question":"What is ATP?","answer":"The cell's energy currency."},{"question":"Where is ATP made?","answer":"In the mitochondria."}]"#;
    let (endpoint, server) = serve_once("200 OK", "", completion_body(content)).await;
    let client = http_client(&endpoint, 10);

    let cards = generate(&client, "ATP is made in mitochondria.", 2, Difficulty::Basic)
        .await
        .unwrap();
    assert_eq!(
        cards,
        vec![
            GeneratedCard::new("What is ATP?", "The cell's energy currency."),
            GeneratedCard::new("Where is ATP made?", "In the mitochondria."),
        ]
    );

    let request = server.await.unwrap();
    let lower = request.to_lowercase();
    assert!(request.starts_with("POST /chat/completions"));
    assert!(lower.contains("authorization: bearer sk-local-test"));
    assert!(request.contains(r#""model":"sonar-pro""#));
    assert!(request.contains("Generate exactly 2 high-quality"));
    assert!(request.contains("at basic difficulty level"));
}

#[tokio::test]
async fn prose_wrapped_reply_is_parsed() {
    let content = "Here are your flashcards:\n```json\n[{\"question\":\"Q1\",\"answer\":\"A1\"}]\n```\nGood luck!";
    let (endpoint, _server) = serve_once("200 OK", "", completion_body(content)).await;
    let client = http_client(&endpoint, 10);

    let cards = generate(&client, "text", 1, Difficulty::Intermediate).await.unwrap();
    assert_eq!(cards, vec![GeneratedCard::new("Q1", "A1")]);
}

#[tokio::test]
async fn http_429_is_rate_limited() {
    let (endpoint, _server) = serve_once(
        "429 Too Many Requests",
        "Retry-After: 30\r\n",
        r#"{"error":"rate limit"}"#.to_string(),
    )
    .await;
    let client = http_client(&endpoint, 10);

    let err = generate(&client, "text", 5, Difficulty::Basic).await.unwrap_err();
    assert!(
        matches!(err, GenerateError::RateLimited { retry_after_secs: Some(30) }),
        "got {err:?}"
    );
    assert!(err.user_message().to_lowercase().contains("rate limit"));
}

#[tokio::test]
async fn http_500_is_service_unavailable() {
    let (endpoint, _server) =
        serve_once("500 Internal Server Error", "", "upstream exploded".to_string()).await;
    let client = http_client(&endpoint, 10);

    let err = generate(&client, "text", 5, Difficulty::Basic).await.unwrap_err();
    assert!(matches!(err, GenerateError::ServiceUnavailable { .. }), "got {err:?}");
}

#[tokio::test]
async fn reply_without_array_is_unparseable() {
    let (endpoint, _server) =
        serve_once("200 OK", "", completion_body("I cannot help with that.")).await;
    let client = http_client(&endpoint, 10);

    let err = generate(&client, "text", 5, Difficulty::Basic).await.unwrap_err();
    assert!(matches!(err, GenerateError::Unparseable { .. }), "got {err:?}");
}

#[tokio::test]
async fn silent_server_times_out() {
    let (endpoint, _server) = serve_silence().await;
    let client = http_client(&endpoint, 1);

    let err = generate(&client, "text", 5, Difficulty::Basic).await.unwrap_err();
    assert!(matches!(err, GenerateError::Timeout { secs: 1 }), "got {err:?}");
}

#[tokio::test]
async fn cancel_abandons_in_flight_call() {
    let (endpoint, _server) = serve_silence().await;
    let client = http_client(&endpoint, 30);
    let request = GenerationRequest::new("text", 5, Difficulty::Basic).unwrap();

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = generate_request(&client, &request, &token).await.unwrap_err();
    assert!(matches!(err, GenerateError::Cancelled));
}

// ── Combined flow ────────────────────────────────────────────────────────

#[tokio::test]
async fn pdf_to_validated_set_draft() {
    let engine = CountingEngine::new(3);
    let client = ScriptedClient::new(
        r#"[{"question":"  What is on page 1? ","answer":"Page 1"},{"question":"","answer":"dropped"}]"#,
    );

    let cards = generate_from_pdf(
        engine,
        &client,
        SourceDocument::pdf(pdf_bytes()).with_file_name("biology.pdf"),
        10,
        Difficulty::Advanced,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(cards.len(), 1);

    let prompts = client.prompts.lock().unwrap();
    assert!(prompts[0].contains("Create 10 flashcards at advanced difficulty level"));
    assert!(prompts[0].ends_with("Page 1\n\nPage 2\n\nPage 3"));

    let draft = FlashcardSetDraft::from_generated("Biology", cards).with_description("Chapter 1");
    draft.validate().unwrap();
    assert_eq!(draft.cards[0].question, "What is on page 1?");
}

#[tokio::test]
async fn extraction_failure_never_reaches_client() {
    let engine = CountingEngine::new(3);
    let client = ScriptedClient::new("[]");

    let err = generate_from_pdf(
        engine,
        &client,
        SourceDocument::new(pdf_bytes(), "text/plain"),
        10,
        Difficulty::Basic,
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Pdf2CardsError::Extract(ExtractError::InvalidType { .. })));
    assert!(client.prompts.lock().unwrap().is_empty());
}
