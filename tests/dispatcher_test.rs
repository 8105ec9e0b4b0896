mod common;

use botpic::core::dispatcher::DispatchSettings;
use botpic::domain::model::DeliveryOutcome;
use botpic::domain::ports::{HttpResponse, PhotoSender, RequestBody};
use botpic::TelegramDispatcher;
use common::{candidate, destination, ScriptedTransport};
use std::sync::Arc;
use std::time::Duration;

const IMAGE_URL: &str = "https://upload.wikimedia.org/thumb/fili.jpg";

fn dispatcher(transport: &Arc<ScriptedTransport>) -> TelegramDispatcher<ScriptedTransport> {
    let mut settings = DispatchSettings::new("123:ABC");
    settings.api_base = "https://telegram.test".to_string();
    TelegramDispatcher::new(transport.clone(), settings)
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_reference_is_retried_after_pause() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(HttpResponse::with_body(429, "{\"ok\":false}"))
            .reply(HttpResponse::with_body(200, "{\"ok\":true}")),
    );

    let outcome = dispatcher(&transport)
        .send(&destination("@ChatFili", "Фили"), &candidate(IMAGE_URL))
        .await;

    assert_eq!(outcome, DeliveryOutcome::SentByReference);
    let calls = transport.calls();
    assert_eq!(transport.methods(), vec!["POST", "POST"]);
    assert_eq!(calls[0].url, "https://telegram.test/bot123:ABC/sendPhoto");
    assert!(calls[1].at.duration_since(calls[0].at) >= Duration::from_secs(3));

    match &calls[0].body {
        Some(RequestBody::Json(payload)) => {
            assert_eq!(payload["chat_id"], "@ChatFili");
            assert_eq!(payload["photo"], IMAGE_URL);
            assert_eq!(
                payload["caption"],
                "🏛 Вид на Фили\n📅 1955 год\n📍 Фили"
            );
        }
        other => panic!("expected JSON body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_reference_falls_back_to_file_upload() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(HttpResponse::with_body(500, "{\"ok\":false}"))
            .reply(HttpResponse::with_body(200, vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .reply(HttpResponse::with_body(200, "{\"ok\":true}")),
    );

    let outcome = dispatcher(&transport)
        .send(&destination("@ChatFili", "Фили"), &candidate(IMAGE_URL))
        .await;

    assert_eq!(outcome, DeliveryOutcome::SentAsFile);
    assert_eq!(transport.methods(), vec!["POST", "GET", "POST"]);

    let calls = transport.calls();
    assert_eq!(calls[1].url, IMAGE_URL);
    match &calls[2].body {
        Some(RequestBody::Multipart(form)) => {
            assert!(form
                .fields
                .iter()
                .any(|(k, v)| k == "chat_id" && v == "@ChatFili"));
            assert!(form.fields.iter().any(|(k, _)| k == "caption"));
            assert_eq!(form.files.len(), 1);
            assert_eq!(form.files[0].field, "photo");
            assert_eq!(form.files[0].filename, "photo.jpg");
            assert_eq!(form.files[0].mime, "image/jpeg");
            assert_eq!(form.files[0].bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
        }
        other => panic!("expected multipart body, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reference_network_error_falls_back_to_file_upload() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail()
            .reply(HttpResponse::with_body(200, vec![1, 2, 3]))
            .reply(HttpResponse::with_status(200)),
    );

    let outcome = dispatcher(&transport)
        .send(&destination("@ChatFili", "Фили"), &candidate(IMAGE_URL))
        .await;

    assert_eq!(outcome, DeliveryOutcome::SentAsFile);
    assert_eq!(transport.methods(), vec!["POST", "GET", "POST"]);
}

#[tokio::test]
async fn test_failed_download_stops_delivery() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(HttpResponse::with_status(400))
            .reply(HttpResponse::with_status(404)),
    );

    let outcome = dispatcher(&transport)
        .send(&destination("@ChatFili", "Фили"), &candidate(IMAGE_URL))
        .await;

    assert_eq!(outcome, DeliveryOutcome::DownloadFailed);
    assert!(!outcome.is_delivered());
    assert_eq!(transport.methods(), vec!["POST", "GET"]);
}

#[tokio::test]
async fn test_rejected_upload_is_reported() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(HttpResponse::with_status(400))
            .reply(HttpResponse::with_body(200, vec![1, 2, 3]))
            .reply(HttpResponse::with_body(
                400,
                "{\"ok\":false,\"description\":\"Bad Request: chat not found\"}",
            )),
    );

    let sender = dispatcher(&transport);
    let delivered = sender
        .deliver(&destination("@Nowhere", "Нигде"), &candidate(IMAGE_URL))
        .await;

    assert!(!delivered);
    assert_eq!(transport.methods(), vec!["POST", "GET", "POST"]);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_retry_rejection_falls_back_to_file_upload() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(HttpResponse::with_body(429, "{\"ok\":false}"))
            .reply(HttpResponse::with_body(400, "{\"ok\":false}"))
            .reply(HttpResponse::with_body(200, vec![0xFF, 0xD8]))
            .reply(HttpResponse::with_body(200, "{\"ok\":true}")),
    );

    let outcome = dispatcher(&transport)
        .send(&destination("@ChatFili", "Фили"), &candidate(IMAGE_URL))
        .await;

    assert_eq!(outcome, DeliveryOutcome::SentAsFile);
    assert_eq!(transport.methods(), vec!["POST", "POST", "GET", "POST"]);
    assert!(matches!(
        transport.calls()[3].body,
        Some(RequestBody::Multipart(_))
    ));
}
