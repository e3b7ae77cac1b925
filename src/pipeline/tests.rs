use super::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use wikipeek_core::config::SelectorConfig;
use wikipeek_core::error::WikipeekError;
use wikipeek_snapshot::ExtractionResult;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Send { content: String },
    SendImage { content: String, bytes: usize },
    Edit { message: String, content: String },
    Fetch { message: String },
    Delete { message: String },
}

/// Recording ChatApi double. Message ids are "m1", "m2", ...
#[derive(Default)]
struct FakeChat {
    calls: Mutex<Vec<Call>>,
    counter: AtomicU64,
    fail_send: bool,
    fail_fetch: bool,
}

impl FakeChat {
    fn refusing_sends() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    fn refusing_fetches() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send(&self, _channel_id: &str, content: &str) -> Result<String, WikipeekError> {
        self.calls.lock().unwrap().push(Call::Send {
            content: content.to_string(),
        });
        if self.fail_send {
            return Err(WikipeekError::Chat("send refused".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("m{n}"))
    }

    async fn send_with_image(
        &self,
        _channel_id: &str,
        content: &str,
        _filename: &str,
        image: &[u8],
    ) -> Result<String, WikipeekError> {
        self.calls.lock().unwrap().push(Call::SendImage {
            content: content.to_string(),
            bytes: image.len(),
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("m{n}"))
    }

    async fn edit(
        &self,
        _channel_id: &str,
        message_id: &str,
        content: &str,
    ) -> Result<(), WikipeekError> {
        self.calls.lock().unwrap().push(Call::Edit {
            message: message_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn fetch(&self, _channel_id: &str, message_id: &str) -> Result<(), WikipeekError> {
        self.calls.lock().unwrap().push(Call::Fetch {
            message: message_id.to_string(),
        });
        if self.fail_fetch {
            return Err(WikipeekError::Chat("fetch refused".into()));
        }
        Ok(())
    }

    async fn delete(&self, _channel_id: &str, message_id: &str) -> Result<(), WikipeekError> {
        self.calls.lock().unwrap().push(Call::Delete {
            message: message_id.to_string(),
        });
        Ok(())
    }
}

/// Snapshotter double with a fixed outcome.
struct FakeSnapshot {
    outcome: Result<ExtractionResult, String>,
    called: AtomicBool,
    urls: Mutex<Vec<String>>,
}

impl FakeSnapshot {
    fn succeeding(result: ExtractionResult) -> Self {
        Self {
            outcome: Ok(result),
            called: AtomicBool::new(false),
            urls: Mutex::new(Vec::new()),
        }
    }

    fn rejecting(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            called: AtomicBool::new(false),
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Snapshotter for FakeSnapshot {
    async fn extract(&self, url: &str) -> Result<ExtractionResult, WikipeekError> {
        self.called.store(true, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        match &self.outcome {
            Ok(result) => Ok(result.clone()),
            Err(message) => Err(WikipeekError::Snapshot(message.clone())),
        }
    }
}

fn pipeline(chat: Arc<FakeChat>, engine: Arc<FakeSnapshot>, delay_ms: u64) -> Pipeline {
    let wiki = WikiConfig {
        base_url: "https://w/".to_string(),
        selectors: SelectorConfig::default(),
    };
    let reply = ReplyConfig {
        delete_delay_ms: delay_ms,
    };
    Pipeline::new(chat, engine, &wiki, &reply)
}

fn reference(raw: &str) -> Reference {
    Reference {
        raw_text: raw.to_string(),
        is_literal: false,
    }
}

#[tokio::test]
async fn test_success_with_screenshot_replaces_placeholder() {
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult {
        success: true,
        textblock: Some("A test item.".to_string()),
        screenshot: Some(vec![9, 9, 9]),
    }));
    let pipeline = pipeline(chat.clone(), engine.clone(), 10);

    let state = pipeline
        .handle_reference("chan", "Guild", reference("Tabula Rasa"))
        .await;

    assert_eq!(state, Some(ReplyState::ReplacedWithAttachment));
    assert_eq!(engine.urls.lock().unwrap()[0], "https://w/Tabula_Rasa");

    let calls = chat.calls();
    assert!(matches!(&calls[0], Call::Send { content } if content.contains("Tabula Rasa")));
    assert_eq!(calls[1], Call::Fetch { message: "m1".into() });
    assert_eq!(calls[2], Call::Delete { message: "m1".into() });
    assert_eq!(
        calls[3],
        Call::SendImage {
            content: "<https://w/Tabula_Rasa>\nA test item.".into(),
            bytes: 3,
        }
    );
    assert_eq!(calls.len(), 4);
}

#[tokio::test]
async fn test_success_without_screenshot_edits_in_place() {
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult {
        success: true,
        textblock: Some("Text only.".to_string()),
        screenshot: None,
    }));
    let pipeline = pipeline(chat.clone(), engine, 10);

    let state = pipeline
        .handle_reference("chan", "Guild", reference("goldrim"))
        .await;

    assert_eq!(state, Some(ReplyState::EditedText));
    let calls = chat.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        Call::Edit {
            message: "m1".into(),
            content: "<https://w/Goldrim>\nText only.".into(),
        }
    );
}

#[tokio::test]
async fn test_success_without_textblock_posts_bare_url() {
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult {
        success: true,
        textblock: None,
        screenshot: None,
    }));
    let pipeline = pipeline(chat.clone(), engine, 10);

    pipeline
        .handle_reference("chan", "Guild", reference("Goldrim"))
        .await;

    let calls = chat.calls();
    assert_eq!(
        calls[1],
        Call::Edit {
            message: "m1".into(),
            content: "<https://w/Goldrim>".into(),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_invalid_page_edits_failure_then_deletes_after_delay() {
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult::failure()));
    let pipeline = pipeline(chat.clone(), engine, 2000);

    let state = pipeline
        .handle_reference("chan", "Guild", reference("nonexistent page"))
        .await;

    assert_eq!(state, Some(ReplyState::DeletedOnFailure));

    // Immediately after: placeholder sent and edited, not yet deleted.
    let calls = chat.calls();
    assert_eq!(calls.len(), 2);
    assert!(
        matches!(&calls[1], Call::Edit { content, .. } if content.contains("Could not get details"))
    );

    // The delayed one-shot removes the placeholder.
    tokio::time::sleep(Duration::from_millis(2100)).await;
    tokio::task::yield_now().await;

    let calls = chat.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[2], Call::Fetch { message: "m1".into() });
    assert_eq!(calls[3], Call::Delete { message: "m1".into() });
}

#[tokio::test]
async fn test_engine_rejection_deletes_placeholder() {
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::rejecting("browser launch failed"));
    let pipeline = pipeline(chat.clone(), engine, 10);

    let state = pipeline
        .handle_reference("chan", "Guild", reference("Tabula Rasa"))
        .await;

    assert_eq!(state, Some(ReplyState::DeletedOnFailure));
    let calls = chat.calls();
    assert!(matches!(calls[0], Call::Send { .. }));
    assert_eq!(calls[1], Call::Fetch { message: "m1".into() });
    assert_eq!(calls[2], Call::Delete { message: "m1".into() });
    assert_eq!(calls.len(), 3);
}

#[tokio::test]
async fn test_placeholder_send_failure_aborts_pipeline() {
    let chat = Arc::new(FakeChat::refusing_sends());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult {
        success: true,
        textblock: Some("never seen".to_string()),
        screenshot: None,
    }));
    let pipeline = pipeline(chat.clone(), engine.clone(), 10);

    let state = pipeline
        .handle_reference("chan", "Guild", reference("Tabula Rasa"))
        .await;

    assert_eq!(state, None);
    // Only the failed send happened; no edit/delete, no render.
    assert_eq!(chat.calls().len(), 1);
    assert!(!engine.called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_empty_reference_is_looked_up_as_is() {
    // `[]` parses to an empty title; the lookup still runs against the
    // bare base URL.
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult::failure()));
    let pipeline = pipeline(chat.clone(), engine.clone(), 1);

    pipeline.handle_reference("chan", "Guild", reference("")).await;

    assert_eq!(engine.urls.lock().unwrap()[0], "https://w/");
    assert!(matches!(&chat.calls()[0], Call::Send { .. }));
}

#[tokio::test]
async fn test_failed_removal_is_swallowed_and_state_stays_terminal() {
    // Fetch refuses, so the delete is never attempted; the failure is
    // logged and the lifecycle still ends in its terminal state.
    let chat = Arc::new(FakeChat::refusing_fetches());
    let engine = Arc::new(FakeSnapshot::rejecting("browser launch failed"));
    let pipeline = pipeline(chat.clone(), engine, 10);

    let state = pipeline
        .handle_reference("chan", "Guild", reference("Tabula Rasa"))
        .await;

    assert_eq!(state, Some(ReplyState::DeletedOnFailure));
    let calls = chat.calls();
    assert_eq!(calls[1], Call::Fetch { message: "m1".into() });
    assert!(!calls.iter().any(|call| matches!(call, Call::Delete { .. })));
}

/// Layer recording the target of every emitted event.
#[derive(Clone, Default)]
struct TargetRecorder {
    targets: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for TargetRecorder {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        self.targets
            .lock()
            .unwrap()
            .push(event.metadata().target().to_string());
    }
}

fn request_record_count(recorder: &TargetRecorder) -> usize {
    recorder
        .targets
        .lock()
        .unwrap()
        .iter()
        .filter(|target| target.as_str() == wikipeek_core::REQUEST_LOG_TARGET)
        .count()
}

#[tokio::test]
async fn test_error_paths_stay_out_of_request_log() {
    use tracing_subscriber::layer::SubscriberExt;

    let recorder = TargetRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    // Placeholder send failure and a refused removal both log errors,
    // but neither is a lookup record.
    let chat = Arc::new(FakeChat::refusing_sends());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult::failure()));
    pipeline(chat, engine, 10)
        .handle_reference("chan", "Guild", reference("x"))
        .await;

    let chat = Arc::new(FakeChat::refusing_fetches());
    let engine = Arc::new(FakeSnapshot::rejecting("browser launch failed"));
    pipeline(chat, engine, 10)
        .handle_reference("chan", "Guild", reference("x"))
        .await;

    assert_eq!(request_record_count(&recorder), 0);
}

#[tokio::test]
async fn test_lookups_write_exactly_one_request_record() {
    use tracing_subscriber::layer::SubscriberExt;

    let recorder = TargetRecorder::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    // Successful lookup.
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult {
        success: true,
        textblock: None,
        screenshot: None,
    }));
    pipeline(chat, engine, 10)
        .handle_reference("chan", "Guild", reference("x"))
        .await;
    assert_eq!(request_record_count(&recorder), 1);

    // Invalid page contributes its own record too.
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult::failure()));
    pipeline(chat, engine, 1)
        .handle_reference("chan", "Guild", reference("x"))
        .await;
    assert_eq!(request_record_count(&recorder), 2);
}

#[tokio::test]
async fn test_dispatch_spawns_one_pipeline_per_reference() {
    let chat = Arc::new(FakeChat::default());
    let engine = Arc::new(FakeSnapshot::succeeding(ExtractionResult {
        success: true,
        textblock: None,
        screenshot: None,
    }));
    let pipeline = Arc::new(pipeline(chat.clone(), engine, 10));

    let incoming = IncomingMessage {
        id: uuid::Uuid::new_v4(),
        channel: "discord".to_string(),
        channel_id: "chan".to_string(),
        guild_name: "Guild".to_string(),
        author_name: Some("someone".to_string()),
        author_is_bot: false,
        text: "[[alpha]] and [[beta]]".to_string(),
        timestamp: chrono::Utc::now(),
    };

    let handles = pipeline.dispatch(&incoming);
    assert_eq!(handles.len(), 2);
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(ReplyState::EditedText));
    }

    let placeholders: Vec<String> = chat
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Send { content } => Some(content),
            _ => None,
        })
        .collect();
    assert_eq!(placeholders.len(), 2);
    assert!(placeholders.iter().any(|c| c.contains("**Alpha**")));
    assert!(placeholders.iter().any(|c| c.contains("**Beta**")));
}
