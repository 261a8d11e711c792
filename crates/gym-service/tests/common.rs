//! Common test utilities for gym-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use gym_core::{FixedClock, MemberId, TrainerId};
use gym_service::notify::NotifyError;
use gym_service::{create_router, AppState, Notification, Notifier, ServiceConfig};
use gym_store::RocksStore;

/// The harness clock starts here: Friday 2026-10-16, noon UTC.
pub const START: &str = "2026-10-16T12:00:00Z";

/// Notifier that keeps everything it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Wait until at least `count` notifications arrived, then return them.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let sent = self.sent.lock().unwrap().clone();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {count} notifications");
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test member for member requests.
    pub member_id: MemberId,
    /// The staff API key.
    pub staff_api_key: String,
    /// The clock every request reads.
    pub clock: Arc<FixedClock>,
    /// Notifications sent by the engine.
    pub notifications: Arc<RecordingNotifier>,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let staff_api_key = "test-staff-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            staff_api_key: Some(staff_api_key.clone()),
            ..ServiceConfig::default()
        };

        let clock = Arc::new(FixedClock::new(START.parse().expect("valid instant")));
        let notifications = Arc::new(RecordingNotifier::default());
        let state = AppState::with_parts(
            Arc::new(store),
            clock.clone(),
            notifications.clone(),
            config,
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            member_id: MemberId::generate(),
            staff_api_key,
            clock,
            notifications,
        }
    }

    /// Header value identifying the test member.
    pub fn member_header(&self) -> String {
        self.member_id.to_string()
    }

    /// Header value identifying some other member.
    pub fn other_member_header() -> String {
        MemberId::generate().to_string()
    }

    /// Grant credits to `member` through the staff API.
    pub async fn grant(&self, member: &str, amount: i64) {
        self.server
            .post("/v1/admin/credits/grant")
            .add_header("x-api-key", &self.staff_api_key)
            .json(&json!({
                "member_id": member,
                "amount": amount,
                "reference": "test-pack"
            }))
            .await
            .assert_status_ok();
    }

    /// Create a one-off class and return its id.
    pub async fn create_class(&self, date: &str, start_time: &str, capacity: u32) -> String {
        self.create_occurrence("class", date, start_time, capacity).await
    }

    /// Create a one-off occurrence and return its id.
    pub async fn create_occurrence(
        &self,
        kind: &str,
        date: &str,
        start_time: &str,
        capacity: u32,
    ) -> String {
        self.create_led_occurrence(kind, None, date, start_time, capacity)
            .await
    }

    /// Create a one-off occurrence led by `trainer` and return its id.
    pub async fn create_led_occurrence(
        &self,
        kind: &str,
        trainer: Option<&TrainerId>,
        date: &str,
        start_time: &str,
        capacity: u32,
    ) -> String {
        let response = self
            .server
            .post("/v1/admin/occurrences")
            .add_header("x-api-key", &self.staff_api_key)
            .json(&json!({
                "offering_id": uuid::Uuid::new_v4().to_string(),
                "kind": kind,
                "trainer_id": trainer.map(ToString::to_string),
                "date": date,
                "start_time": start_time,
                "duration_minutes": 60,
                "capacity": capacity
            }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["id"].as_str().expect("occurrence id").to_string()
    }

    /// Book `occurrence` as `member`.
    pub async fn book_as(&self, member: &str, occurrence: &str) -> TestResponse {
        self.server
            .post("/v1/bookings")
            .add_header("x-member-id", member)
            .json(&json!({ "occurrence_id": occurrence }))
            .await
    }

    /// Book `occurrence` as the test member.
    pub async fn book(&self, occurrence: &str) -> TestResponse {
        self.book_as(&self.member_header(), occurrence).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The `error.code` of an error response.
pub fn error_code(response: &TestResponse) -> String {
    let body: Value = response.json();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}
