// HTTP request handlers
use crate::application::data_channel::Dispatch;
use crate::domain::analytics::{AnalyticsQuery, AnalyticsReport};
use crate::domain::flow::{Flow, FlowProgress};
use crate::domain::message::{Command, SubscribeInterval, Topic};
use crate::domain::telemetry::LidarPoint;
use crate::errors::ApiError;
use crate::presentation::app_state::AppState;
use crate::presentation::auth::OperatorSession;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::WatchStream;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct SubscribeBody {
    /// Milliseconds between samples; omitted means realtime
    pub interval_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct DispatchBody {
    pub dispatch: Dispatch,
}

#[derive(Serialize)]
pub struct ScanBody {
    /// `map` when a pose was available, `robot` otherwise
    pub frame: &'static str,
    pub angle_inc: f64,
    pub samples: usize,
    pub points: Vec<LidarPoint>,
}

fn latest_or_no_content<T: Serialize>(value: Option<T>) -> Response {
    match value {
        Some(value) => Json(value).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn dispatched(dispatch: Dispatch) -> Json<DispatchBody> {
    Json(DispatchBody { dispatch })
}

/// A serial that never connected has no bridge to send through.
fn never_connected(serial: &str) -> Json<DispatchBody> {
    tracing::warn!("No data channel was ever opened for {}, dropping request", serial);
    dispatched(Dispatch::Dropped)
}

fn unknown_robot(serial: &str) -> ApiError {
    ApiError::NotFound(format!("robot {}", serial))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Serials with an active data channel
pub async fn list_robots(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.connected_serials())
}

pub async fn get_position(
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let latest = state
        .registry
        .get(&serial)
        .and_then(|bridge| bridge.latest_position());
    latest_or_no_content(latest)
}

/// Stream odometry updates as server-sent events
pub async fn stream_position(
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let bridge = state.registry.get(&serial).ok_or_else(|| unknown_robot(&serial))?;
    let stream = WatchStream::new(bridge.position())
        .filter_map(|position| async move { position })
        .map(|position| Event::default().event("position").json_data(position));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Latest LiDAR scan as points, in the map frame when a pose is known
pub async fn get_lidar(Path(serial): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let Some(bridge) = state.registry.get(&serial) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let Some(scan) = bridge.latest_lidar() else {
        return StatusCode::NO_CONTENT.into_response();
    };

    let (frame, points) = match bridge.latest_position() {
        Some(pose) => ("map", scan.world_points(&pose)),
        None => ("robot", scan.local_points()),
    };

    Json(ScanBody {
        frame,
        angle_inc: scan.angle_inc,
        samples: scan.data.len(),
        points,
    })
    .into_response()
}

pub async fn get_system(Path(serial): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let latest = state
        .registry
        .get(&serial)
        .and_then(|bridge| bridge.latest_system_data());
    latest_or_no_content(latest)
}

pub async fn get_flow_state(
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let latest = state
        .registry
        .get(&serial)
        .and_then(|bridge| bridge.latest_flow_state());
    latest_or_no_content(latest)
}

/// Raw pass-through messages as server-sent events
pub async fn stream_events(
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let mut rx = state
        .registry
        .get(&serial)
        .ok_or_else(|| unknown_robot(&serial))?
        .raw_events();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(value) => yield Event::default().event("message").json_data(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Event stream for {} skipped {} messages", serial, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Send an arbitrary command bag verbatim
pub async fn send_command(
    session: OperatorSession,
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<DispatchBody>, ApiError> {
    let command = Command::from_fields(fields);
    tracing::info!(
        "Operator {:?} sending m={:?} c={:?} to {}",
        session.operator,
        command.module(),
        command.class(),
        serial
    );
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.send_command(&command).await?;
    Ok(dispatched(dispatch))
}

fn parse_topic(topic: &str) -> Result<Topic, ApiError> {
    topic.parse().map_err(ApiError::BadRequest)
}

pub async fn subscribe_topic(
    _session: OperatorSession,
    Path((serial, topic)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    body: Option<Json<SubscribeBody>>,
) -> Result<Json<DispatchBody>, ApiError> {
    let topic = parse_topic(&topic)?;
    let interval = body
        .and_then(|Json(body)| body.interval_ms)
        .map_or(SubscribeInterval::Realtime, SubscribeInterval::Millis);
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.subscribe(topic, interval).await?;
    Ok(dispatched(dispatch))
}

pub async fn unsubscribe_topic(
    _session: OperatorSession,
    Path((serial, topic)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DispatchBody>, ApiError> {
    let topic = parse_topic(&topic)?;
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.unsubscribe(topic).await?;
    Ok(dispatched(dispatch))
}

pub async fn emergency_stop(
    session: OperatorSession,
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<DispatchBody> {
    tracing::warn!("Operator {:?} triggered emergency stop on {}", session.operator, serial);
    let Some(bridge) = state.registry.get(&serial) else {
        return never_connected(&serial);
    };
    dispatched(bridge.emergency_stop().await)
}

pub async fn start_flow(
    _session: OperatorSession,
    Path((serial, flow_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DispatchBody>, ApiError> {
    if state.flow_service.get_flow(&flow_id).is_none() {
        return Err(ApiError::NotFound(format!("flow {}", flow_id)));
    }
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.start_flow(&flow_id).await?;
    Ok(dispatched(dispatch))
}

pub async fn stop_flow(
    _session: OperatorSession,
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DispatchBody>, ApiError> {
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.stop_flow().await?;
    Ok(dispatched(dispatch))
}

pub async fn pause_flow(
    _session: OperatorSession,
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DispatchBody>, ApiError> {
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.pause_flow().await?;
    Ok(dispatched(dispatch))
}

pub async fn resume_flow(
    _session: OperatorSession,
    Path(serial): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DispatchBody>, ApiError> {
    let Some(bridge) = state.registry.get(&serial) else {
        return Ok(never_connected(&serial));
    };
    let dispatch = bridge.resume_flow().await?;
    Ok(dispatched(dispatch))
}

pub async fn list_flows(
    Query(query): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<Flow>> {
    Json(state.flow_service.list_flows(query.q.as_deref()))
}

pub async fn get_flow(
    Path(flow_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Flow>, ApiError> {
    state
        .flow_service
        .get_flow(&flow_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("flow {}", flow_id)))
}

pub async fn list_commands(
    Query(query): Query<SearchQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(state.flow_service.search_commands(query.q.as_deref()))
}

pub async fn flow_progress(
    Path((serial, flow_id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<FlowProgress>, ApiError> {
    let flow_state = state
        .registry
        .get(&serial)
        .and_then(|bridge| bridge.latest_flow_state());
    state
        .flow_service
        .progress(&flow_id, flow_state.as_ref())
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("flow {}", flow_id)))
}

pub async fn get_analytics(
    Query(query): Query<AnalyticsQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    if query.end_date < query.start_date {
        return Err(ApiError::BadRequest("endDate precedes startDate".to_string()));
    }
    let report = state.analytics_service.conversation_analytics(&query).await?;
    Ok(Json(report))
}
