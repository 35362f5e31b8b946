use crate::state::{AppState, SimState};
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use medpod_core::{inspect_text, snapshot, EventEnvelope, PodError, PodId};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let cors = match cors_origin.parse::<axum::http::HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(err) => {
            tracing::warn!(cors_origin, %err, "invalid CORS origin, allowing any");
            cors.allow_origin(Any)
        }
    };

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/pods/:id", get(pod_handler))
        .route("/api/v1/pods/:id/power", post(power_handler))
        .route("/api/v1/pods/:id/reset", post(reset_handler))
        .route("/api/v1/pods/:id/admit", post(admit_handler))
        .route("/api/v1/pods/:id/remove", post(remove_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/pause", post(pause_handler))
        .route("/api/v1/resume", post(resume_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type JsonReply = (StatusCode, Json<serde_json::Value>);

fn unknown_pod(pod_id: &PodId) -> JsonReply {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": PodError::UnknownPod(pod_id.clone()).to_string() })),
    )
}

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let sim = app_state.sim.lock();
    Json(serde_json::json!({
        "tick": sim.ward.meta.tick,
        "seed": sim.ward.meta.seed,
        "content_version": sim.ward.meta.content_version,
        "pods": sim.ward.pods.len(),
        "ticks_per_sec": app_state.ticks_per_sec,
        "paused": app_state.paused.load(Ordering::Relaxed),
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let sim = app_state.sim.lock();
    let result = serde_json::to_string(&sim.ward);
    drop(sim);
    match result {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        ),
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

/// Inspector view of one pod: the structured snapshot plus the text panel.
pub async fn pod_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> JsonReply {
    let pod_id = PodId(id);
    let sim = app_state.sim.lock();
    let Some(pod) = sim.ward.pods.get(&pod_id) else {
        return unknown_pod(&pod_id);
    };
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "snapshot": snapshot(pod, &sim.content.constants),
            "inspect": inspect_text(pod, &sim.content.constants),
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct PowerRequest {
    pub available: bool,
}

/// Switch the pod's power line. The pod reacts on the next tick.
pub async fn power_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PowerRequest>,
) -> JsonReply {
    let pod_id = PodId(id);
    let mut sim = app_state.sim.lock();
    if !sim.ward.pods.contains_key(&pod_id) {
        return unknown_pod(&pod_id);
    }
    sim.host.set_power(&pod_id, request.available);
    tracing::info!(pod = %pod_id, available = request.available, "power line switched");
    (
        StatusCode::OK,
        Json(serde_json::json!({ "pod_id": pod_id, "available": request.available })),
    )
}

pub async fn reset_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> JsonReply {
    let pod_id = PodId(id);
    let events = {
        let mut guard = app_state.sim.lock();
        let SimState {
            ward,
            host,
            content,
            ..
        } = &mut *guard;
        match medpod_core::reset_pod(ward, host, content, &pod_id) {
            Ok(events) => events,
            Err(_) => return unknown_pod(&pod_id),
        }
    };
    let count = events.len();
    broadcast_events(&app_state, events);
    (
        StatusCode::OK,
        Json(serde_json::json!({ "pod_id": pod_id, "events": count })),
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct AdmitRequest {
    #[serde(default)]
    pub occupant_id: Option<String>,
}

/// Put a patient in the pod. Without an occupant id a new patient is
/// generated.
pub async fn admit_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<AdmitRequest>>,
) -> JsonReply {
    let pod_id = PodId(id);
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let mut guard = app_state.sim.lock();
    let SimState {
        ward,
        host,
        content,
        rng,
        ..
    } = &mut *guard;
    if !ward.pods.contains_key(&pod_id) {
        return unknown_pod(&pod_id);
    }
    let occupant = match request.occupant_id {
        Some(id) => medpod_core::OccupantId(id),
        None => host.generate_patient(content, rng),
    };
    let previous = host.admit(&pod_id, occupant.clone());
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "pod_id": pod_id,
            "occupant_id": occupant,
            "previous_occupant_id": previous,
        })),
    )
}

pub async fn remove_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> JsonReply {
    let pod_id = PodId(id);
    let mut sim = app_state.sim.lock();
    if !sim.ward.pods.contains_key(&pod_id) {
        return unknown_pod(&pod_id);
    }
    let removed = sim.host.remove(&pod_id);
    (
        StatusCode::OK,
        Json(serde_json::json!({ "pod_id": pod_id, "occupant_id": removed })),
    )
}

fn broadcast_events(app_state: &AppState, events: Vec<EventEnvelope>) {
    if !events.is_empty() {
        let _ = app_state.event_tx.send(events);
    }
}

pub async fn pause_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(true, Ordering::Relaxed);
    Json(serde_json::json!({"paused": true}))
}

pub async fn resume_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    app_state.paused.store(false, Ordering::Relaxed);
    Json(serde_json::json!({"paused": false}))
}

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let sim = app_state.sim.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(1));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(100));
        flush.tick().await;
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let tick = sim.lock().ward.meta.tick;
                    let hb = serde_json::json!({"heartbeat": true, "tick": tick});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use medpod_core::test_fixtures::base_content;
    use medpod_core::{EventLevel, OccupancyProvider, PowerProvider, TreatmentStatus};
    use medpod_world::build_initial_state;
    use parking_lot::Mutex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_test_state() -> AppState {
        let content = base_content();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (ward, host) = build_initial_state(&content, 0, 2, &mut rng);
        let (event_tx, _) = broadcast::channel(64);
        AppState {
            sim: Arc::new(Mutex::new(SimState {
                ward,
                host,
                content,
                rng,
                event_level: EventLevel::Normal,
            })),
            event_tx,
            ticks_per_sec: 60.0,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn meta_reports_tick_and_pods() {
        let app = make_router(make_test_state());
        let (status, json) = send(app, Method::GET, "/api/v1/meta", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["tick"], 0);
        assert_eq!(json["pods"], 2);
        assert_eq!(json["paused"], false);
    }

    #[tokio::test]
    async fn snapshot_is_valid_json() {
        let app = make_router(make_test_state());
        let (status, json) = send(app, Method::GET, "/api/v1/snapshot", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["pods"]["pod_0001"].is_object());
    }

    #[tokio::test]
    async fn pod_returns_inspect_text() {
        let app = make_router(make_test_state());
        let (status, json) = send(app, Method::GET, "/api/v1/pods/pod_0001", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["inspect"], "Power needed: 125 W\nIdle");
        assert_eq!(json["snapshot"]["status"], "Idle");
    }

    #[tokio::test]
    async fn unknown_pod_is_404() {
        let app = make_router(make_test_state());
        let (status, json) = send(app, Method::GET, "/api/v1/pods/pod_9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("pod_9999"));
    }

    #[tokio::test]
    async fn power_switch_reaches_host() {
        let state = make_test_state();
        let app = make_router(state.clone());
        let (status, _) = send(
            app,
            Method::POST,
            "/api/v1/pods/pod_0001/power",
            Some(r#"{"available": false}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let pod_id = PodId("pod_0001".to_string());
        assert!(!state.sim.lock().host.power_available(&pod_id));
    }

    #[tokio::test]
    async fn reset_returns_pod_to_idle() {
        let state = make_test_state();
        {
            let mut sim = state.sim.lock();
            for _ in 0..100 {
                crate::tick_loop::step(&mut sim);
            }
        }
        let mut rx = state.event_tx.subscribe();
        let app = make_router(state.clone());

        let (status, _) = send(app, Method::POST, "/api/v1/pods/pod_0001/reset", None).await;

        assert_eq!(status, StatusCode::OK);
        let pod_id = PodId("pod_0001".to_string());
        assert_eq!(
            state.sim.lock().ward.pods[&pod_id].status(),
            TreatmentStatus::Idle
        );
        assert!(!rx.try_recv().unwrap().is_empty());
    }

    #[tokio::test]
    async fn admit_and_remove_change_occupancy() {
        let state = make_test_state();
        let pod_id = PodId("pod_0002".to_string());

        let (status, json) = send(
            make_router(state.clone()),
            Method::POST,
            "/api/v1/pods/pod_0002/remove",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["occupant_id"].is_string());
        assert_eq!(state.sim.lock().host.current_occupant(&pod_id), None);

        let (status, json) = send(
            make_router(state.clone()),
            Method::POST,
            "/api/v1/pods/pod_0002/admit",
            Some(r#"{"occupant_id": "visitor_01"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["occupant_id"], "visitor_01");
        assert_eq!(
            state.sim.lock().host.current_occupant(&pod_id),
            Some(medpod_core::OccupantId("visitor_01".to_string()))
        );
    }

    #[tokio::test]
    async fn pause_and_resume_toggle_flag() {
        let state = make_test_state();
        send(make_router(state.clone()), Method::POST, "/api/v1/pause", None).await;
        assert!(state.paused.load(Ordering::Relaxed));
        send(make_router(state.clone()), Method::POST, "/api/v1/resume", None).await;
        assert!(!state.paused.load(Ordering::Relaxed));
    }
}
