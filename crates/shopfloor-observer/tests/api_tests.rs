//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use shopfloor_core::config::{SimulationBoundsConfig, default_machines};
use shopfloor_core::fleet::Fleet;
use shopfloor_core::operator::OperatorState;
use shopfloor_machines::FleetOdds;
use shopfloor_observer::router::build_router;
use shopfloor_observer::state::AppState;
use shopfloor_types::{MachineId, TickBroadcast};
use tower::ServiceExt;

fn make_fleet() -> Arc<Fleet> {
    Arc::new(Fleet::from_config(&default_machines(), &FleetOdds::default()).unwrap())
}

fn make_test_state() -> Arc<AppState> {
    Arc::new(AppState::new(make_fleet()))
}

fn make_operator_state() -> (Arc<AppState>, Arc<OperatorState>) {
    let operator = Arc::new(OperatorState::new(
        200,
        &SimulationBoundsConfig { max_ticks: 50 },
    ));
    let state = Arc::new(AppState::with_operator(make_fleet(), Arc::clone(&operator)));
    (state, operator)
}

async fn get(state: Arc<AppState>, path: &str) -> Response {
    build_router(state)
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post(state: Arc<AppState>, path: &str, body: &'static str) -> Response {
    build_router(state)
        .oneshot(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(response: &Response) -> &str {
    response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
}

// =========================================================================
// Read endpoints
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let response = get(make_test_state(), "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).contains("text/html"));
    let html = body_to_string(response.into_body()).await;
    assert!(html.contains("haas_vf2"));
    assert!(html.contains("fiber_laser"));
}

#[tokio::test]
async fn test_list_machines_in_config_order() {
    let response = get(make_test_state(), "/api/machines").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec!["haas_vf2", "haas_vf4", "toyoda_hmc", "cnc_lathe", "durma_press", "fiber_laser"]
    );
    assert_eq!(json[0]["type"], "CNC");
    assert_eq!(json[4]["type"], "PRESS_BRAKE");
    assert_eq!(json[5]["type"], "LASER");
}

#[tokio::test]
async fn test_get_machine_by_id() {
    let response = get(make_test_state(), "/api/machines/durma_press").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["id"], "durma_press");
    assert_eq!(json["name"], "Durma Press Brake");
    assert_eq!(json["execution"], "IDLE");
    assert_eq!(json["cycle_phase"], "IDLE");
    assert!(json["alarm"].is_null());
    assert!(json["axis_positions"]["Z"].is_number());
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_get_machine_not_found() {
    let response = get(make_test_state(), "/api/machines/ghost").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Machine not found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_alarms_empty_on_fresh_fleet() {
    let response = get(make_test_state(), "/api/alarms").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!([]));
}

// =========================================================================
// Fault injection
// =========================================================================

#[tokio::test]
async fn test_inject_alarm_defaults_to_test_alarm() {
    let state = make_test_state();

    let response = post(Arc::clone(&state), "/api/machines/haas_vf4/inject_alarm", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(
        json,
        serde_json::json!({"status": "ok", "id": "haas_vf4", "alarm": "TEST_ALARM"})
    );

    let machine = body_to_json(get(Arc::clone(&state), "/api/machines/haas_vf4").await.into_body()).await;
    assert_eq!(machine["alarm"], "TEST_ALARM");
    assert_eq!(machine["execution"], "ALARM");
    assert_eq!(machine["cycle_phase"], "IDLE");

    let alarms = body_to_json(get(state, "/api/alarms").await.into_body()).await;
    let alarms = alarms.as_array().unwrap();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0]["id"], "haas_vf4");
    assert_eq!(alarms[0]["name"], "Haas VF-4");
    assert_eq!(alarms[0]["alarm"], "TEST_ALARM");
    assert_eq!(alarms[0]["execution"], "ALARM");
}

#[tokio::test]
async fn test_inject_alarm_with_code() {
    let state = make_test_state();

    let response = post(
        Arc::clone(&state),
        "/api/machines/fiber_laser/inject_alarm",
        r#"{"alarm": "RESONATOR_OVERHEAT"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["alarm"], "RESONATOR_OVERHEAT");

    let machine = body_to_json(get(state, "/api/machines/fiber_laser").await.into_body()).await;
    assert_eq!(machine["alarm"], "RESONATOR_OVERHEAT");
}

#[tokio::test]
async fn test_inject_alarm_empty_object_uses_default() {
    let response = post(
        make_test_state(),
        "/api/machines/cnc_lathe/inject_alarm",
        "{}",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["alarm"], "TEST_ALARM");
}

#[tokio::test]
async fn test_inject_alarm_unknown_machine() {
    let response = post(
        make_test_state(),
        "/api/machines/ghost/inject_alarm",
        r#"{"alarm": "X"}"#,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["error"], "Machine not found");
}

#[tokio::test]
async fn test_inject_alarm_malformed_body() {
    let state = make_test_state();
    let response = post(
        Arc::clone(&state),
        "/api/machines/haas_vf2/inject_alarm",
        "not json",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let alarms = body_to_json(get(state, "/api/alarms").await.into_body()).await;
    assert_eq!(alarms, serde_json::json!([]));
}

#[tokio::test]
async fn test_inject_alarm_blank_code_rejected() {
    let response = post(
        make_test_state(),
        "/api/machines/haas_vf2/inject_alarm",
        r#"{"alarm": "  "}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_escapes_injected_alarm_code() {
    let state = make_test_state();
    let response = post(
        Arc::clone(&state),
        "/api/machines/haas_vf2/inject_alarm",
        r#"{"alarm": "<script>alert(1)</script>"}"#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_to_string(get(state, "/").await.into_body()).await;
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

// =========================================================================
// MTConnect XML
// =========================================================================

#[tokio::test]
async fn test_mtconnect_current_is_xml() {
    let response = get(make_test_state(), "/mtconnect/toyoda_hmc/current").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("application/xml"));
    let xml = body_to_string(response.into_body()).await;
    assert!(xml.contains("<MTConnectStreams>"));
    assert!(xml.contains("uuid=\"toyoda_hmc\""));
    assert!(xml.contains("<Sample name=\"execution\">IDLE</Sample>"));
    assert!(xml.contains("<Sample name=\"alarm\">NONE</Sample>"));
}

#[tokio::test]
async fn test_mtconnect_reflects_injected_alarm() {
    let state = make_test_state();
    state.fleet.inject_fault("haas_vf2", "SPINDLE_THERMAL").unwrap();

    let xml = body_to_string(get(state, "/mtconnect/haas_vf2/current").await.into_body()).await;
    assert!(xml.contains("<Sample name=\"execution\">ALARM</Sample>"));
    assert!(xml.contains("<Sample name=\"alarm\">SPINDLE_THERMAL</Sample>"));
}

#[tokio::test]
async fn test_mtconnect_unknown_machine_is_plain_text() {
    let response = get(make_test_state(), "/mtconnect/ghost/current").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(content_type(&response).starts_with("text/plain"));
    assert_eq!(body_to_string(response.into_body()).await, "Machine not found");
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn test_operator_endpoints_without_state() {
    let response = get(make_test_state(), "/api/operator/status").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_operator_pause_resume_stop() {
    let (state, operator) = make_operator_state();

    let response = post(Arc::clone(&state), "/api/operator/pause", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(operator.is_paused());

    let status = body_to_json(get(Arc::clone(&state), "/api/operator/status").await.into_body()).await;
    assert_eq!(status["paused"], true);
    assert_eq!(status["max_ticks"], 50);
    assert_eq!(status["tick_interval_ms"], 200);

    let response = post(Arc::clone(&state), "/api/operator/resume", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!operator.is_paused());

    let response = post(state, "/api/operator/stop", "").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ok"], true);
    assert!(operator.is_stop_requested());
}

// =========================================================================
// Broadcast and routing
// =========================================================================

#[tokio::test]
async fn test_broadcast_channel() {
    let state = AppState::new(make_fleet());
    let mut rx = state.subscribe();

    let summary = TickBroadcast {
        tick: 42,
        sim_seconds: 8.4,
        running: 4,
        idle: 1,
        alarmed: 1,
        parts_finished: 2,
        alarms_raised: vec![(MachineId::new("haas_vf2"), String::from("LOW_COOLANT"))],
        alarms_cleared: Vec::new(),
    };

    let receivers = state.broadcast(&summary);
    assert_eq!(receivers, 1);

    let received = rx.recv().await.unwrap();
    assert_eq!(received.tick, 42);
    assert_eq!(received.alarms_raised.len(), 1);
}

#[tokio::test]
async fn test_broadcast_without_subscribers_is_not_an_error() {
    let state = AppState::new(make_fleet());
    let summary = TickBroadcast {
        tick: 1,
        sim_seconds: 0.2,
        running: 0,
        idle: 6,
        alarmed: 0,
        parts_finished: 0,
        alarms_raised: Vec::new(),
        alarms_cleared: Vec::new(),
    };
    assert_eq!(state.broadcast(&summary), 0);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let response = get(make_test_state(), "/api/nonexistent").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
