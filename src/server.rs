//! ==============================================================================
//! server.rs - http surface for the esp32 and the dashboard
//! ==============================================================================
//!
//! routes:
//!
//!     GET  /                   dashboard page (latest snapshot + door state)
//!     GET  /update             esp32 pushes ?temp=&hum=&mq2=&mq6=&flame=
//!     GET  /data               dashboard polls the snapshot as json
//!     GET  /get_sensor_data    dashboard script polls snapshot + door state
//!     GET  /open-door          dashboard button, redirects back to /
//!     POST /open_door          same, for the dashboard script (json reply)
//!     GET  /door_status        esp32 polls "OPEN" / "CLOSED"
//!     GET  /door_status_reset  esp32 acknowledges the opened door
//!     GET  /health             liveness probe
//!
//! every handler is a thin wrapper: the locking and the hazard logic live in
//! telemetry.rs and door.rs. nothing here ever fails a device request.
//!
//! ==============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, Json, Redirect},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::domain::{DashboardSnapshot, DoorCommand, ReadingView, SensorReading, TelemetryUpdate};
use crate::door::DoorCommandChannel;
use crate::telemetry::TelemetryStore;

// ==============================================================================
// shared state
// ==============================================================================
// both components lock internally, the web layer only holds handles to them.

#[derive(Clone)]
pub struct AppState {
    pub telemetry: Arc<TelemetryStore>,
    pub door: Arc<DoorCommandChannel>,
}

impl AppState {
    pub fn new(telemetry: TelemetryStore, door: DoorCommandChannel) -> Self {
        Self {
            telemetry: Arc::new(telemetry),
            door: Arc::new(door),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/update", get(update_handler))
        .route("/data", get(data_handler))
        .route("/get_sensor_data", get(sensor_data_handler))
        .route("/open-door", get(open_door_handler))
        .route("/open_door", post(open_door_api_handler))
        .route("/door_status", get(door_status_handler))
        .route("/door_status_reset", get(door_status_reset_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// serve until the shutdown future resolves
pub async fn run(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ==============================================================================
// device endpoints
// ==============================================================================

/// telemetry push from the esp32
///
/// an undecodable query string is treated as an empty push.
async fn update_handler(
    State(state): State<AppState>,
    params: Option<Query<HashMap<String, String>>>,
) -> &'static str {
    let update = params
        .map(|Query(params)| TelemetryUpdate::from(params))
        .unwrap_or_default();
    let outcome = state.telemetry.write(&update).await;
    tracing::trace!(
        reading = ?outcome.reading,
        hazard_raised = outcome.hazard_raised,
        "Telemetry push handled"
    );
    "OK"
}

async fn door_status_handler(State(state): State<AppState>) -> String {
    state.door.peek().await.to_string()
}

async fn door_status_reset_handler(State(state): State<AppState>) -> &'static str {
    state.door.acknowledge().await;
    "OK"
}

// ==============================================================================
// dashboard endpoints
// ==============================================================================

async fn data_handler(State(state): State<AppState>) -> Json<ReadingView> {
    Json(state.telemetry.read().await.into())
}

async fn sensor_data_handler(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let reading = state.telemetry.read().await;
    let door = state.door.peek().await;
    Json(DashboardSnapshot::new(&reading, door))
}

async fn open_door_handler(State(state): State<AppState>) -> Redirect {
    state.door.request().await;
    Redirect::to("/")
}

async fn open_door_api_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.door.request().await;
    Json(serde_json::json!({ "status": DoorCommand::Open }))
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn dashboard_handler(State(state): State<AppState>) -> Html<String> {
    let reading = state.telemetry.read().await;
    let door = state.door.peek().await;
    Html(render_dashboard(&reading, door))
}

fn render_dashboard(reading: &SensorReading, door: DoorCommand) -> String {
    let (flame_text, flame_color) = if reading.flame_detected {
        ("YES 🔥", "#ff6b6b")
    } else {
        ("NO", "#6bff95")
    };

    format!(
        r#"<!doctype html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="5">
    <title>fire &amp; door hub</title>
</head>
<body style="font-family: system-ui; padding: 2rem; background: #1a1a2e; color: #eee;">
    <h1>Sensor dashboard</h1>
    <table style="font-size: 1.2rem;">
        <tr><td>Temperature</td><td id="temp">{temp} °C</td></tr>
        <tr><td>Humidity</td><td id="hum">{hum} %</td></tr>
        <tr><td>MQ2 gas</td><td id="mq2">{mq2}</td></tr>
        <tr><td>MQ6 gas</td><td id="mq6">{mq6}</td></tr>
        <tr><td>Flame</td><td id="fire" style="color: {flame_color};">{flame_text}</td></tr>
        <tr><td>Door command</td><td id="door">{door}</td></tr>
    </table>
    <p><a href="/open-door" style="color: #8ab4f8;">Open door</a></p>
</body>
</html>"#,
        temp = html_escape(&reading.temperature.to_string()),
        hum = html_escape(&reading.humidity.to_string()),
        mq2 = html_escape(&reading.gas_level_a.to_string()),
        mq6 = html_escape(&reading.gas_level_b.to_string()),
        door = html_escape(door.as_ref()),
    )
}

/// escape html special characters to prevent xss
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::fake::RecordingNotifier;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;

    fn app_state() -> (AppState, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            TelemetryStore::new(notifier.clone(), "fire!"),
            DoorCommandChannel::new(),
        );
        (state, notifier)
    }

    fn query(pairs: &[(&str, &str)]) -> Option<Query<HashMap<String, String>>> {
        Some(Query(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn update_then_data_reflects_the_push() {
        let (state, notifier) = app_state();

        let reply = update_handler(
            State(state.clone()),
            query(&[("temp", "23.5"), ("hum", "51"), ("mq2", "310"), ("mq6", "120"), ("flame", "0")]),
        )
        .await;
        assert_eq!(reply, "OK");

        let Json(view) = data_handler(State(state)).await;
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["temp"], 23.5);
        assert_eq!(json["hum"], 51.0);
        assert_eq!(json["mq2"], 310.0);
        assert_eq!(json["mq6"], 120.0);
        assert_eq!(json["flame"], 0);
        assert_eq!(json["flame_detected"], true);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn malformed_or_missing_query_still_answers_ok() {
        let (state, _) = app_state();

        update_handler(State(state.clone()), query(&[("temp", "19")])).await;
        assert_eq!(update_handler(State(state.clone()), query(&[("temp", "abc")])).await, "OK");
        assert_eq!(update_handler(State(state.clone()), None).await, "OK");

        assert_eq!(state.telemetry.read().await.temperature, 19.0);
    }

    #[tokio::test]
    async fn door_handshake_through_handlers() {
        let (state, _) = app_state();

        assert_eq!(door_status_handler(State(state.clone())).await, "CLOSED");

        let response = open_door_handler(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        assert_eq!(door_status_handler(State(state.clone())).await, "OPEN");
        assert_eq!(door_status_handler(State(state.clone())).await, "OPEN");

        assert_eq!(door_status_reset_handler(State(state.clone())).await, "OK");
        assert_eq!(door_status_handler(State(state.clone())).await, "CLOSED");

        // resetting again is harmless
        assert_eq!(door_status_reset_handler(State(state.clone())).await, "OK");
        assert_eq!(door_status_handler(State(state)).await, "CLOSED");
    }

    #[tokio::test]
    async fn api_open_door_replies_with_status() {
        let (state, _) = app_state();
        let Json(body) = open_door_api_handler(State(state.clone())).await;
        assert_eq!(body, serde_json::json!({ "status": "OPEN" }));
        assert_eq!(state.door.peek().await, DoorCommand::Open);
    }

    #[tokio::test]
    async fn dashboard_shows_snapshot_and_door() {
        let (state, _) = app_state();
        update_handler(State(state.clone()), query(&[("temp", "30"), ("flame", "0")])).await;
        state.door.request().await;

        let Html(page) = dashboard_handler(State(state)).await;
        assert!(page.contains("30 °C"));
        assert!(page.contains("YES 🔥"));
        assert!(page.contains(r#"<td id="door">OPEN</td>"#));
    }

    #[test]
    fn html_escape_neutralises_markup() {
        assert_eq!(html_escape(r#"<b a="1">&"#), "&lt;b a=&quot;1&quot;&gt;&amp;");
    }

    #[tokio::test]
    async fn sensor_data_reports_snapshot_and_door() {
        let (state, _) = app_state();
        update_handler(
            State(state.clone()),
            query(&[("temp", "27.5"), ("hum", "48"), ("flame", "0")]),
        )
        .await;
        state.door.request().await;

        let Json(snapshot) = sensor_data_handler(State(state)).await;
        assert_eq!(
            snapshot,
            DashboardSnapshot {
                temperature: 27.5,
                humidity: 48.0,
                fire: true,
                door: DoorCommand::Open,
            }
        );
    }

    // ==========================================================================
    // full round trips through the router on a real socket
    // ==========================================================================

    async fn spawn_hub() -> (String, Arc<RecordingNotifier>) {
        let (state, notifier) = app_state();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        (base, notifier)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap()
    }

    async fn get_text(client: &reqwest::Client, url: String) -> String {
        let response = client.get(url).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.text().await.unwrap()
    }

    #[tokio::test]
    async fn device_push_is_visible_on_data_route() {
        let (base, notifier) = spawn_hub().await;
        let client = client();

        let reply = get_text(
            &client,
            format!("{base}/update?temp=23.5&hum=51&mq2=310&mq6=120&flame=0"),
        )
        .await;
        assert_eq!(reply, "OK");

        // malformed and missing fields still answer OK
        assert_eq!(get_text(&client, format!("{base}/update?temp=abc")).await, "OK");
        assert_eq!(get_text(&client, format!("{base}/update")).await, "OK");

        let json: serde_json::Value = client
            .get(format!("{base}/data"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(json["temp"], 23.5);
        assert_eq!(json["hum"], 51.0);
        assert_eq!(json["mq2"], 310.0);
        assert_eq!(json["mq6"], 120.0);
        // the bare /update push carried no flame, which reads as clear
        assert_eq!(json["flame"], 1);
        assert_eq!(json["flame_detected"], false);
        assert_eq!(notifier.sent().len(), 1);

        let json: serde_json::Value = client
            .get(format!("{base}/get_sensor_data"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(json["temperature"], 23.5);
        assert_eq!(json["fire"], false);
        assert_eq!(json["door"], "CLOSED");
    }

    #[tokio::test]
    async fn door_handshake_over_the_wire() {
        let (base, _) = spawn_hub().await;
        let client = client();

        assert_eq!(get_text(&client, format!("{base}/door_status")).await, "CLOSED");

        let response = client.get(format!("{base}/open-door")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[reqwest::header::LOCATION], "/");

        assert_eq!(get_text(&client, format!("{base}/door_status")).await, "OPEN");
        assert_eq!(get_text(&client, format!("{base}/door_status")).await, "OPEN");

        assert_eq!(get_text(&client, format!("{base}/door_status_reset")).await, "OK");
        assert_eq!(get_text(&client, format!("{base}/door_status")).await, "CLOSED");

        let body: serde_json::Value = client
            .post(format!("{base}/open_door"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, serde_json::json!({ "status": "OPEN" }));
        assert_eq!(get_text(&client, format!("{base}/door_status")).await, "OPEN");
    }

    #[tokio::test]
    async fn dashboard_and_health_are_served() {
        let (base, _) = spawn_hub().await;
        let client = client();

        assert_eq!(get_text(&client, format!("{base}/health")).await, "OK");
        assert!(get_text(&client, base.clone()).await.contains("Sensor dashboard"));

        let response = client.get(format!("{base}/door-status")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
