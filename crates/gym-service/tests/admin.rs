//! Staff API integration tests: templates, generation, occurrences, blocks,
//! availability, and the gym timezone.

mod common;

use axum::http::StatusCode;
use common::{error_code, TestHarness};
use serde_json::{json, Value};

async fn create_template(harness: &TestHarness, weekdays: &[u8]) -> String {
    let response = harness
        .server
        .post("/v1/admin/templates")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({
            "name": "Evening Spin",
            "kind": "class",
            "weekdays": weekdays,
            "start_time": "18:00:00",
            "duration_minutes": 45,
            "capacity": 12
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

async fn generate(harness: &TestHarness, template_id: &str, weeks: u32) -> Value {
    let response = harness
        .server
        .post(&format!("/v1/admin/templates/{template_id}/generate"))
        .add_query_param("weeks_ahead", weeks)
        .add_header("x-api-key", &harness.staff_api_key)
        .await;
    response.assert_status_ok();
    response.json()
}

/// Find the slot starting at `start` on `date` in a grid response.
fn slot<'a>(grid: &'a Value, date: &str, start: &str) -> &'a Value {
    grid["slots"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["date"] == date && s["start"] == start)
        .unwrap_or_else(|| panic!("no slot {date} {start}"))
}

// ============================================================================
// Templates
// ============================================================================

#[tokio::test]
async fn create_list_and_get_template() {
    let harness = TestHarness::new();
    let template_id = create_template(&harness, &[4, 2]).await;

    let body: Value = harness
        .server
        .get("/v1/admin/templates")
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .json();
    assert_eq!(body["templates"].as_array().unwrap().len(), 1);

    let response = harness
        .server
        .get(&format!("/v1/admin/templates/{template_id}"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "Evening Spin");
    assert_eq!(body["weekdays"], json!([2, 4]));
}

#[tokio::test]
async fn create_template_rejects_zero_capacity() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/admin/templates")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({
            "name": "Ghost Class",
            "kind": "class",
            "weekdays": [1],
            "start_time": "07:00:00",
            "duration_minutes": 60,
            "capacity": 0
        }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(error_code(&response), "invalid_input");
}

#[tokio::test]
async fn templates_require_staff_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/admin/templates")
        .add_header("x-member-id", harness.member_header())
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn get_unknown_template_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/admin/templates/{}", uuid::Uuid::new_v4()))
        .add_header("x-api-key", &harness.staff_api_key)
        .await;

    response.assert_status_not_found();
}

// ============================================================================
// Generation
// ============================================================================

#[tokio::test]
async fn generation_is_idempotent() {
    let harness = TestHarness::new();
    // Tuesday and Thursday; the harness clock is Friday the 16th.
    let template_id = create_template(&harness, &[2, 4]).await;

    let first = generate(&harness, &template_id, 2).await;
    assert_eq!(first["window_start"], "2026-10-16");
    assert_eq!(first["window_end"], "2026-10-30");
    assert_eq!(first["inserted"].as_array().unwrap().len(), 4);
    assert_eq!(first["skipped"], 0);

    let second = generate(&harness, &template_id, 2).await;
    assert_eq!(second["inserted"].as_array().unwrap().len(), 0);
    assert_eq!(second["skipped"], 4);

    let body: Value = harness
        .server
        .get("/v1/admin/occurrences")
        .add_query_param("from", "2026-10-16")
        .add_query_param("until", "2026-10-30")
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .json();
    let dates: Vec<&str> = body["occurrences"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["date"].as_str().unwrap())
        .collect();
    assert_eq!(
        dates,
        vec!["2026-10-20", "2026-10-22", "2026-10-27", "2026-10-29"]
    );
}

#[tokio::test]
async fn generate_all_reports_every_template() {
    let harness = TestHarness::new();
    create_template(&harness, &[1]).await;
    create_template(&harness, &[3]).await;

    let response = harness
        .server
        .post("/v1/admin/generate")
        .add_query_param("weeks_ahead", 1)
        .add_header("x-api-key", &harness.staff_api_key)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| r["inserted"].as_array().unwrap().len() == 1));
}

#[tokio::test]
async fn delete_template_cascades_unless_booked() {
    let harness = TestHarness::new();
    let template_id = create_template(&harness, &[2, 4]).await;
    let report = generate(&harness, &template_id, 2).await;
    let occurrence = report["inserted"][0].as_str().unwrap().to_string();

    harness.grant(&harness.member_header(), 1).await;
    let booked: Value = harness.book(&occurrence).await.json();
    let booking_id = booked["booking"]["id"].as_str().unwrap().to_string();

    let response = harness
        .server
        .delete(&format!("/v1/admin/templates/{template_id}"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_code(&response), "template_in_use");

    harness
        .server
        .delete(&format!("/v1/admin/bookings/{booking_id}"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .delete(&format!("/v1/admin/templates/{template_id}"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["occurrences_removed"], 4);
}

// ============================================================================
// Occurrences
// ============================================================================

#[tokio::test]
async fn roster_lists_bookings() {
    let harness = TestHarness::new();
    let other = TestHarness::other_member_header();
    harness.grant(&harness.member_header(), 1).await;
    harness.grant(&other, 1).await;
    let occurrence = harness.create_class("2026-10-21", "07:00:00", 8).await;
    harness.book(&occurrence).await.assert_status_ok();
    harness.book_as(&other, &occurrence).await.assert_status_ok();

    let response = harness
        .server
        .get(&format!("/v1/admin/occurrences/{occurrence}/bookings"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["occurrence"]["booked_count"], 2);
    assert_eq!(body["occurrence"]["capacity"], 8);
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn list_occurrences_rejects_empty_range() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/admin/occurrences")
        .add_query_param("from", "2026-10-20")
        .add_query_param("until", "2026-10-20")
        .add_header("x-api-key", &harness.staff_api_key)
        .await;

    response.assert_status_bad_request();
    assert_eq!(error_code(&response), "invalid_range");
}

// ============================================================================
// Blocks
// ============================================================================

#[tokio::test]
async fn blocks_can_be_created_listed_and_deleted() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/admin/blocks")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({
            "weekday": 1,
            "start_time": "12:00:00",
            "end_time": "13:00:00",
            "description": "Deep clean"
        }))
        .await;
    response.assert_status_ok();
    let block: Value = response.json();
    let block_id = block["id"].as_str().unwrap().to_string();

    let body: Value = harness
        .server
        .get("/v1/admin/blocks")
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .json();
    assert_eq!(body["blocks"].as_array().unwrap().len(), 1);

    harness
        .server
        .delete(&format!("/v1/admin/blocks/{block_id}"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .assert_status_ok();

    harness
        .server
        .delete(&format!("/v1/admin/blocks/{block_id}"))
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn block_with_bad_weekday_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/admin/blocks")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({
            "weekday": 7,
            "start_time": "12:00:00",
            "end_time": "13:00:00"
        }))
        .await;

    response.assert_status_bad_request();
}

// ============================================================================
// Availability
// ============================================================================

#[tokio::test]
async fn availability_views_differ_by_audience() {
    let harness = TestHarness::new();
    harness.grant(&harness.member_header(), 1).await;
    let class = harness.create_class("2026-10-19", "07:00:00", 2).await;
    let pt = harness
        .create_occurrence("personal_training", "2026-10-19", "09:00:00", 1)
        .await;
    harness.book(&class).await.assert_status_ok();
    harness
        .server
        .post("/v1/admin/blocks")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({
            "weekday": 1,
            "start_time": "12:00:00",
            "end_time": "13:00:00",
            "description": "Deep clean"
        }))
        .await
        .assert_status_ok();

    let admin: Value = harness
        .server
        .get("/v1/admin/availability")
        .add_query_param("from", "2026-10-19")
        .add_query_param("days", 1)
        .add_header("x-api-key", &harness.staff_api_key)
        .await
        .json();
    assert_eq!(admin["timezone"], "UTC");
    assert_eq!(admin["slots"].as_array().unwrap().len(), 32);

    let cell = slot(&admin, "2026-10-19", "07:30:00");
    assert_eq!(cell["status"], "class");
    assert_eq!(cell["occurrence_id"], class.as_str());
    assert_eq!(cell["booked"], 1);
    assert_eq!(cell["capacity"], 2);

    let cell = slot(&admin, "2026-10-19", "09:00:00");
    assert_eq!(cell["status"], "free");
    assert_eq!(cell["open_occurrence"], pt.as_str());

    let cell = slot(&admin, "2026-10-19", "12:30:00");
    assert_eq!(cell["status"], "blocked");
    assert_eq!(cell["description"], "Deep clean");

    let member: Value = harness
        .server
        .get("/v1/availability")
        .add_query_param("from", "2026-10-19")
        .add_query_param("days", 1)
        .add_query_param("view", "admin")
        .add_header("x-member-id", harness.member_header())
        .await
        .json();

    let cell = slot(&member, "2026-10-19", "07:00:00");
    assert_eq!(cell["status"], "class");
    assert_eq!(cell["spots_left"], 1);
    assert!(cell.get("booked").is_none());

    let cell = slot(&member, "2026-10-19", "12:00:00");
    assert_eq!(cell["status"], "busy");
    assert!(cell.get("description").is_none());

    let cell = slot(&member, "2026-10-19", "15:00:00");
    assert_eq!(cell["status"], "free");
}

#[tokio::test]
async fn availability_omits_past_cells() {
    let harness = TestHarness::new();

    let body: Value = harness
        .server
        .get("/v1/availability")
        .add_query_param("days", 1)
        .add_header("x-member-id", harness.member_header())
        .await
        .json();

    // Noon has started, so the first cell shown is 12:30.
    assert_eq!(body["from"], "2026-10-16");
    assert_eq!(body["slots"][0]["start"], "12:30:00");
    assert_eq!(body["slots"].as_array().unwrap().len(), 19);
}

#[tokio::test]
async fn availability_rejects_bad_range() {
    let harness = TestHarness::new();

    for days in [0, 63] {
        let response = harness
            .server
            .get("/v1/availability")
            .add_query_param("days", days)
            .add_header("x-member-id", harness.member_header())
            .await;
        response.assert_status_bad_request();
        assert_eq!(error_code(&response), "invalid_range");
    }
}

// ============================================================================
// Timezone
// ============================================================================

#[tokio::test]
async fn timezone_defaults_to_configured_zone() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/settings/timezone").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["timezone"], "UTC");
    assert_eq!(body["today"], "2026-10-16");
}

#[tokio::test]
async fn timezone_change_moves_today() {
    let harness = TestHarness::new();
    // 03:00 UTC on the 17th is still the 16th in Los Angeles.
    harness
        .clock
        .set("2026-10-17T03:00:00Z".parse().unwrap());

    let response = harness
        .server
        .put("/v1/settings/timezone")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({ "timezone": "America/Los_Angeles" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["timezone"], "America/Los_Angeles");
    assert_eq!(body["today"], "2026-10-16");
}

#[tokio::test]
async fn timezone_rejects_unknown_zone() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .put("/v1/settings/timezone")
        .add_header("x-api-key", &harness.staff_api_key)
        .json(&json!({ "timezone": "Atlantis/Central" }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(error_code(&response), "invalid_timezone");
}

#[tokio::test]
async fn timezone_change_requires_staff_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .put("/v1/settings/timezone")
        .add_header("x-member-id", harness.member_header())
        .json(&json!({ "timezone": "Europe/Paris" }))
        .await;

    response.assert_status_unauthorized();
}
