use async_trait::async_trait;
use reqwest::multipart;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nutrify::config::Config;
use nutrify::error::AppError;
use nutrify::gemini::{GenerativeBackend, ImagePart};
use nutrify::server::Server;

struct StubBackend {
    calls: Mutex<Vec<(String, usize, String)>>,
    fail: bool,
}

impl StubBackend {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }

    fn calls(&self) -> Vec<(String, usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for StubBackend {
    async fn generate(
        &self,
        input: &str,
        images: &[ImagePart],
        prompt: &str,
    ) -> Result<String, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((input.to_string(), images.len(), prompt.to_string()));
        if self.fail {
            return Err(AppError::ProviderRejection {
                status: 429,
                message: "quota exceeded".to_string(),
            });
        }
        Ok(format!("echo: {}", input))
    }
}

async fn start_server(port: u16, backend: Arc<dyn GenerativeBackend>) {
    let mut config = Config::default();
    config.server.port = port;

    let server = Server::new(&config, backend);
    tokio::spawn(async move {
        let _: anyhow::Result<()> = server.run().await;
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
}

async fn send_chat(
    client: &reqwest::Client,
    base: &str,
    session_id: Option<&str>,
    message: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/chat", base))
        .json(&serde_json::json!({ "session_id": session_id, "message": message }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn chat_without_image_sends_message_in_input_slot() {
    let backend = StubBackend::new(false);
    start_server(38741, backend.clone()).await;
    let client = reqwest::Client::new();

    let resp = send_chat(&client, "http://127.0.0.1:38741", None, "what is a macro?").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "echo: what is a macro?");
    assert_eq!(body["turns"], 2);

    // Free-text argument carries the message; image list empty; prompt empty.
    let calls = backend.calls();
    assert_eq!(calls, vec![("what is a macro?".to_string(), 0, String::new())]);
}

#[tokio::test]
async fn chat_with_uploaded_image_resends_it() {
    let backend = StubBackend::new(false);
    start_server(38742, backend.clone()).await;
    let client = reqwest::Client::new();
    let base = "http://127.0.0.1:38742";

    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(vec![1, 2, 3]).file_name("lunch.jpeg"),
    );
    let resp = client
        .post(format!("{}/api/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let resp = send_chat(&client, base, Some(&session_id), "how much protein?").await;
    assert_eq!(resp.status(), 200);

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "how much protein?");
    assert_eq!(calls[0].1, 1);
    assert_eq!(calls[0].2, "");
}

#[tokio::test]
async fn transcript_grows_two_turns_per_exchange_in_order() {
    let backend = StubBackend::new(false);
    start_server(38743, backend.clone()).await;
    let client = reqwest::Client::new();
    let base = "http://127.0.0.1:38743";

    let mut session_id: Option<String> = None;
    for i in 0..3 {
        let resp = send_chat(
            &client,
            base,
            session_id.as_deref(),
            &format!("question {}", i),
        )
        .await;
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        session_id = Some(body["session_id"].as_str().unwrap().to_string());
        assert_eq!(body["turns"], (i + 1) * 2);
    }

    let resp = client
        .get(format!(
            "{}/api/transcript?session_id={}",
            base,
            session_id.unwrap()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let turns = body["turns"].as_array().unwrap();

    assert_eq!(turns.len(), 6);
    for (i, turn) in turns.iter().enumerate() {
        let expected = if i % 2 == 0 { "user" } else { "assistant" };
        assert_eq!(turn["role"], expected);
    }
    assert_eq!(turns[2]["content"], "question 1");
    assert_eq!(turns[3]["content"], "echo: question 1");
}

#[tokio::test]
async fn provider_rejection_surfaces_and_keeps_user_turn() {
    let backend = StubBackend::new(true);
    start_server(38744, backend.clone()).await;
    let client = reqwest::Client::new();
    let base = "http://127.0.0.1:38744";

    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(vec![9, 9, 9]).file_name("toast.jpg"),
    );
    let resp = client
        .post(format!("{}/api/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let resp = send_chat(&client, base, Some(&session_id), "hello").await;
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["kind"], "provider_rejection");
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));

    // The user turn stays in the transcript; no assistant turn was appended.
    let resp = client
        .get(format!("{}/api/transcript?session_id={}", base, session_id))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    let turns = body["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["role"], "user");
}

/// Stalls on the message "slow"; answers everything else immediately.
struct DelayBackend;

#[async_trait]
impl GenerativeBackend for DelayBackend {
    async fn generate(
        &self,
        input: &str,
        _images: &[ImagePart],
        _prompt: &str,
    ) -> Result<String, AppError> {
        if input == "slow" {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        Ok(format!("echo: {}", input))
    }
}

#[tokio::test]
async fn slow_session_does_not_block_others() {
    start_server(38746, Arc::new(DelayBackend)).await;
    let base = "http://127.0.0.1:38746";

    let slow = tokio::spawn(async {
        let client = reqwest::Client::new();
        send_chat(&client, "http://127.0.0.1:38746", None, "slow").await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    // A different session gets its answer while the slow call is in flight.
    let client = reqwest::Client::new();
    let started = std::time::Instant::now();
    let resp = send_chat(&client, base, None, "quick question").await;
    assert_eq!(resp.status(), 200);
    assert!(started.elapsed() < Duration::from_secs(1));
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["response"], "echo: quick question");

    let resp = slow.await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn health_and_status_report() {
    let backend = StubBackend::new(false);
    start_server(38745, backend.clone()).await;
    let client = reqwest::Client::new();
    let base = "http://127.0.0.1:38745";

    let resp = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");

    let resp = client
        .get(format!("{}/api/status", base))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "gemini-1.5-flash");
}
