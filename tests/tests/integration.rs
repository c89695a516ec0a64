use courier_kernel::token::liveness_payload;
use courier_kernel::{
    DependentService, DialogForwarder, ForwardEndpoint, InboundMessage, RegistryTransport, Secret,
    ServiceRecord, ServicesQuery, TokenCodec,
};
use courier_testing::{
    MockDialogServer, MockRegistryServer, RecordingClock, RecordingForwarder, ScriptedRegistry,
    sample_message,
};
use courier_kernel::Clock;
use serde_json::json;
use std::time::Duration;

#[test]
fn sample_message_passes_validation() {
    let message = InboundMessage::validate(&sample_message("hello")).unwrap();
    assert!(message.is_private());
    assert!(!message.is_bot);
    assert_eq!(message.chat_id, 555);
}

#[tokio::test]
async fn scripted_registry_fails_then_recovers() {
    let registry = ScriptedRegistry::new().fail_registrations(2);
    let codec = TokenCodec::new("r");
    let record = ServiceRecord::new("gw", "127.0.0.1", 5000, Secret::from("s"));
    let token = codec.encode(&record).unwrap();

    assert!(registry.register(&record, &token).await.is_err());
    assert!(registry.register(&record, &token).await.is_err());
    assert!(registry.register(&record, &token).await.is_ok());
    assert_eq!(registry.register_calls(), 3);
}

#[tokio::test]
async fn late_service_appears_after_scripted_calls() {
    let registry = ScriptedRegistry::new();
    registry.publish_service_after(1, "dialog-manager", "dm", 8000, "s");
    let query = ServicesQuery::single("dialog-manager");
    let token = TokenCodec::new("r").encode(&query).unwrap();

    let first = registry.get_services(&query, &token).await.unwrap();
    assert!(first.resolve("dialog-manager").is_err());
    let second = registry.get_services(&query, &token).await.unwrap();
    assert_eq!(second.resolve("dialog-manager").unwrap().port, 8000);
}

#[tokio::test]
async fn recording_forwarder_counts_per_endpoint() {
    let forwarder = RecordingForwarder::new();
    let target = DependentService {
        name: "dialog-manager".into(),
        host: "dm".into(),
        port: 8000,
        secret: Secret::from("s"),
    };
    let payload = InboundMessage::validate(&sample_message("hi"))
        .unwrap()
        .forward_payload();
    let token = TokenCodec::new("s").encode(&payload).unwrap();

    for endpoint in [ForwardEndpoint::Message, ForwardEndpoint::Message, ForwardEndpoint::Registration] {
        assert_eq!(forwarder.forward(&target, endpoint, &payload, &token).await, Ok(200));
    }
    courier_testing::assert_forwarded!(forwarder, ForwardEndpoint::Message, 2);
    courier_testing::assert_forwarded!(forwarder, ForwardEndpoint::Registration, 1);
}

#[tokio::test]
async fn recording_clock_returns_immediately() {
    let clock = RecordingClock::new();
    clock.sleep(Duration::from_secs(3600)).await;
    clock.sleep(Duration::from_secs(5)).await;
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(3600), Duration::from_secs(5)]);
    assert_eq!(clock.total(), Duration::from_secs(3605));
}

#[tokio::test]
async fn mock_registry_records_and_scripts_statuses() {
    let server = MockRegistryServer::start(json!({
        "dialog-manager": {"general": {"host": "dm", "port": "8000"}, "security": {"secret_key": "s"}}
    }))
    .await
    .unwrap();
    server.script_register([503]);

    let client = reqwest::Client::new();
    let url = format!("{}/register", server.base_url());
    let first = client.post(&url).header("Token", "abc").json(&json!({"a": 1})).send().await.unwrap();
    let second = client.post(&url).json(&json!({"a": 1})).send().await.unwrap();
    assert_eq!(first.status().as_u16(), 503);
    assert_eq!(second.status().as_u16(), 200);

    let directory: serde_json::Value = client
        .get(format!("{}/get_services", server.base_url()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(directory["dialog-manager"]["general"]["host"], "dm");

    let registers = server.requests_to("register");
    assert_eq!(registers.len(), 2);
    assert_eq!(registers[0].token.as_deref(), Some("abc"));
    assert_eq!(registers[0].body, json!({"a": 1}));
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn mock_dialog_server_answers_scripted_status() {
    let server = MockDialogServer::start().await.unwrap();
    server.script("message", [500]);
    let base = format!("http://{}:{}", server.host(), server.port());
    let client = reqwest::Client::new();

    let failed = client.post(format!("{base}/message")).json(&liveness_payload()).send().await.unwrap();
    let ok = client.post(format!("{base}/user")).json(&liveness_payload()).send().await.unwrap();
    assert_eq!(failed.status().as_u16(), 500);
    assert_eq!(ok.status().as_u16(), 200);
    assert_eq!(server.requests()[1].path, "/user");
}
