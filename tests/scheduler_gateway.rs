//! The scheduler and the real gateway together, against a mock OpenShock API.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use openshock_clock::{
    AlarmRecord, ConfigDir, Credentials, OpenShockGateway, Scheduler,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn today(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

#[tokio::test]
async fn wake_alarm_vibrates_fires_and_moves_to_tomorrow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/control"))
        .and(body_partial_json(json!({
            "shocks": [{ "type": "Vibrate", "intensity": 100, "duration": 5000 }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .named("vibrate")
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/control"))
        .and(body_partial_json(json!({
            "shocks": [{ "type": "Shock", "intensity": 50, "duration": 2000 }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .named("shock")
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let config = ConfigDir::new(dir.path());
    let store = config.alarm_store();
    let credentials = config.credential_source();
    credentials
        .save(&Credentials::new("test-key", "shocker-1"))
        .unwrap();
    store
        .upsert("Wake", &AlarmRecord::new(today(8, 0, 0), 50, 2000, true))
        .unwrap();

    let gateway = OpenShockGateway::with_endpoint(format!("{}/control", server.uri())).unwrap();
    let scheduler = Scheduler::new(store.clone(), credentials, Arc::new(gateway));

    let report = scheduler.tick(today(7, 59, 30)).await;
    assert_eq!((report.pre_alarms, report.fired), (1, 0));

    let report = scheduler.tick(today(8, 0, 5)).await;
    assert_eq!((report.pre_alarms, report.fired, report.failed), (0, 1, 0));
    assert_eq!(
        store.get("Wake").unwrap().unwrap().fire_at,
        today(8, 0, 0) + Duration::days(1)
    );
}

#[tokio::test]
async fn rejected_fire_still_moves_alarm() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let config = ConfigDir::new(dir.path());
    let store = config.alarm_store();
    let credentials = config.credential_source();
    credentials.save(&Credentials::new("key", "shocker-1")).unwrap();
    store
        .upsert("Wake", &AlarmRecord::new(today(8, 0, 0), 50, 2000, false))
        .unwrap();

    let gateway = OpenShockGateway::with_endpoint(server.uri()).unwrap();
    let scheduler = Scheduler::new(store.clone(), credentials, Arc::new(gateway));
    let report = scheduler.tick(today(8, 0, 5)).await;
    assert_eq!((report.fired, report.failed, report.advanced), (1, 1, 1));
    assert_eq!(
        store.get("Wake").unwrap().unwrap().fire_at,
        today(8, 0, 0) + Duration::days(1)
    );
}
