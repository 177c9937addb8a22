//! OpenShock gateway request format and error handling, checked against a mock server.

use std::time::Duration;

use chrono::NaiveDate;
use openshock_clock::{
    AlarmRecord, Credentials, EventKind, FiringEvent, GatewayError, OpenShockGateway,
    TriggerGateway,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wake() -> AlarmRecord {
    AlarmRecord::new(
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
        50,
        2000,
        true,
    )
}

fn gateway(server: &MockServer) -> OpenShockGateway {
    OpenShockGateway::with_endpoint(format!("{}/2/shockers/control", server.uri()))
        .expect("client")
}

#[tokio::test]
async fn main_event_sends_shock_with_alarm_settings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/shockers/control"))
        .and(header("OpenShockToken", "test-key"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({
            "shocks": [{
                "id": "shocker-1",
                "type": "Shock",
                "intensity": 50,
                "duration": 2000,
                "exclusive": true
            }],
            "customName": "OpenShockClock"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let alarm = wake();
    let event = FiringEvent::new("Wake", &alarm, EventKind::Main, alarm.fire_at);
    let result = gateway(&server)
        .fire(&Credentials::new("test-key", "shocker-1"), &event)
        .await;
    assert!(result.is_ok(), "fire should succeed: {result:?}");
}

#[tokio::test]
async fn pre_alarm_sends_fixed_vibration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/shockers/control"))
        .and(body_json(json!({
            "shocks": [{
                "id": "shocker-1",
                "type": "Vibrate",
                "intensity": 100,
                "duration": 5000,
                "exclusive": true
            }],
            "customName": "OpenShockClock"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let alarm = wake();
    let event = FiringEvent::new("Wake", &alarm, EventKind::PreAlarm, alarm.fire_at);
    gateway(&server)
        .fire(&Credentials::new("test-key", "shocker-1"), &event)
        .await
        .expect("pre-alarm should succeed");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/shockers/control"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .expect(1)
        .mount(&server)
        .await;

    let alarm = wake();
    let event = FiringEvent::new("Wake", &alarm, EventKind::Main, alarm.fire_at);
    let err = gateway(&server)
        .fire(&Credentials::new("wrong", "shocker-1"), &event)
        .await
        .expect_err("401 should fail");
    match err {
        GatewayError::Status { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "bad token");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error() {
    // nothing listens on port 9 of localhost
    let gateway = OpenShockGateway::with_endpoint("http://127.0.0.1:9/2/shockers/control")
        .expect("client");
    let alarm = wake();
    let event = FiringEvent::new("Wake", &alarm, EventKind::Main, alarm.fire_at);
    let err = gateway
        .fire(&Credentials::new("key", "shocker-1"), &event)
        .await
        .expect_err("connection should fail");
    assert!(matches!(err, GatewayError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/shockers/control"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let gateway = gateway(&server)
        .with_timeout(Duration::from_millis(200))
        .expect("client");
    let alarm = wake();
    let event = FiringEvent::new("Wake", &alarm, EventKind::Main, alarm.fire_at);
    let err = gateway
        .fire(&Credentials::new("key", "shocker-1"), &event)
        .await
        .expect_err("slow response should time out");
    assert!(matches!(err, GatewayError::Timeout), "got {err:?}");
}
