//! REST and XML endpoint handlers for the Observer server.
//!
//! All handlers read from the shared [`Fleet`](shopfloor_core::fleet::Fleet)
//! through [`AppState`]. Each snapshot locks a single machine only long
//! enough to copy it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/machines` | All machine records in configuration order |
//! | `GET` | `/api/machines/{id}` | Single machine record |
//! | `GET` | `/api/alarms` | Active alarms across the plant |
//! | `POST` | `/api/machines/{id}/inject_alarm` | Force an alarm onto a machine |
//! | `GET` | `/mtconnect/{id}/current` | MTConnect-style XML for one machine |

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use quick_xml::escape::escape;
use shopfloor_core::fleet::FleetError;
use shopfloor_types::ExecutionStatus;
use tracing::warn;

use crate::error::ObserverError;
use crate::mtconnect;
use crate::state::AppState;

/// Alarm code used when an injection request names none.
pub const DEFAULT_INJECTED_ALARM: &str = "TEST_ALARM";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/machines/{id}/inject_alarm`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct InjectAlarmRequest {
    /// Alarm code to force. Defaults to [`DEFAULT_INJECTED_ALARM`].
    pub alarm: Option<String>,
}

/// Response body for a successful injection.
#[derive(Debug, serde::Serialize)]
struct InjectAlarmResponse {
    status: &'static str,
    id: String,
    alarm: String,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with fleet status counts and API links.
///
/// Record strings are escaped, since alarm codes arrive from clients.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = state.fleet.snapshot_all();
    let count = |status: ExecutionStatus| records.iter().filter(|r| r.execution == status).count();
    let running = count(ExecutionStatus::Running);
    let idle = count(ExecutionStatus::Idle);
    let alarmed = count(ExecutionStatus::Alarm);
    let tick = state
        .operator_state
        .as_ref()
        .map_or(0, |operator| operator.current_tick());

    let rows: String = records
        .iter()
        .map(|r| {
            format!(
                r#"        <tr><td><a href="/api/machines/{id}">{id}</a></td><td>{name}</td><td>{kind}</td><td class="{class}">{execution}</td><td>{phase}</td><td>{alarm}</td><td><a href="/mtconnect/{id}/current">xml</a></td></tr>
"#,
                id = escape(r.id.as_str()),
                name = escape(&r.name),
                kind = r.kind,
                class = r.execution.as_str().to_lowercase(),
                execution = r.execution,
                phase = escape(&r.cycle_phase),
                alarm = escape(r.alarm.as_deref().unwrap_or("-")),
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Shopfloor Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 960px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        table {{ border-collapse: collapse; width: 100%; }}
        td {{ border-bottom: 1px solid #30363d; padding: 0.3rem 0.6rem; }}
        .running {{ color: #3fb950; }}
        .idle {{ color: #8b949e; }}
        .alarm {{ color: #f85149; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Shopfloor Observer</h1>
    <p class="subtitle">Machine telemetry simulator</p>

    <div>
        <div class="metric">
            <div class="label">Tick</div>
            <div class="value">{tick}</div>
        </div>
        <div class="metric">
            <div class="label">Running</div>
            <div class="value">{running}</div>
        </div>
        <div class="metric">
            <div class="label">Idle</div>
            <div class="value">{idle}</div>
        </div>
        <div class="metric">
            <div class="label">Alarm</div>
            <div class="value">{alarmed}</div>
        </div>
    </div>

    <hr>

    <table>
{rows}    </table>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/machines">/api/machines</a> -- All machine records</li>
        <li>GET /api/machines/{{id}} -- Single machine record</li>
        <li>GET <a href="/api/alarms">/api/alarms</a> -- Active alarms</li>
        <li>POST /api/machines/{{id}}/inject_alarm -- Force an alarm</li>
        <li>GET /mtconnect/{{id}}/current -- MTConnect-style XML</li>
        <li>GET <a href="/api/operator/status">/api/operator/status</a> -- Tick loop status</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/ticks</code> -- Live tick summary stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/machines
// ---------------------------------------------------------------------------

/// List every machine record in configuration order.
pub async fn list_machines(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.fleet.snapshot_all())
}

// ---------------------------------------------------------------------------
// GET /api/machines/{id}
// ---------------------------------------------------------------------------

/// Return one machine record.
pub async fn get_machine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(state.fleet.snapshot(&id)?))
}

// ---------------------------------------------------------------------------
// GET /api/alarms
// ---------------------------------------------------------------------------

/// List the active alarms across the plant.
pub async fn list_alarms(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.fleet.active_alarms())
}

// ---------------------------------------------------------------------------
// POST /api/machines/{id}/inject_alarm
// ---------------------------------------------------------------------------

/// Force an alarm onto a machine.
///
/// An empty body, or a JSON object without `alarm`, injects
/// [`DEFAULT_INJECTED_ALARM`]. A body that is not a JSON object or an
/// empty alarm code is rejected with 400.
pub async fn inject_alarm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ObserverError> {
    if !state.fleet.contains(&id) {
        return Err(ObserverError::MachineNotFound(id));
    }

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        InjectAlarmRequest::default()
    } else {
        serde_json::from_slice::<InjectAlarmRequest>(&body)
            .map_err(|e| ObserverError::InvalidRequest(format!("invalid body: {e}")))?
    };

    let alarm = request
        .alarm
        .unwrap_or_else(|| DEFAULT_INJECTED_ALARM.to_owned());
    if alarm.trim().is_empty() {
        return Err(ObserverError::InvalidRequest(
            "alarm code must not be empty".to_owned(),
        ));
    }

    state.fleet.inject_fault(&id, &alarm)?;

    Ok(Json(InjectAlarmResponse {
        status: "ok",
        id,
        alarm,
    }))
}

// ---------------------------------------------------------------------------
// GET /mtconnect/{id}/current
// ---------------------------------------------------------------------------

/// Return the MTConnect-style XML document for one machine.
///
/// Unknown ids answer with a plain-text 404 rather than the JSON error
/// body, since XML collectors do not parse JSON.
pub async fn mtconnect_current(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ObserverError> {
    let record = match state.fleet.snapshot(&id) {
        Ok(record) => record,
        Err(FleetError::NotFound { .. }) => {
            return Ok((
                StatusCode::NOT_FOUND,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                "Machine not found",
            )
                .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let xml = mtconnect::render_current(&record).map_err(|e| {
        warn!(machine = %id, error = %e, "MTConnect rendering failed");
        ObserverError::Internal(e.to_string())
    })?;

    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}
