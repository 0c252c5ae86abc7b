// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::channel_socket::channel_handler;
use crate::presentation::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/robots", get(list_robots))
        .route("/robots/:serial/channel", get(channel_handler))
        .route("/robots/:serial/position", get(get_position))
        .route("/robots/:serial/position/stream", get(stream_position))
        .route("/robots/:serial/lidar", get(get_lidar))
        .route("/robots/:serial/system", get(get_system))
        .route("/robots/:serial/flow-state", get(get_flow_state))
        .route("/robots/:serial/events", get(stream_events))
        .route("/robots/:serial/commands", post(send_command))
        .route(
            "/robots/:serial/subscriptions/:topic",
            post(subscribe_topic).delete(unsubscribe_topic),
        )
        .route("/robots/:serial/emergency-stop", post(emergency_stop))
        .route("/robots/:serial/flows/:flow_id/start", post(start_flow))
        .route("/robots/:serial/flows/:flow_id/progress", get(flow_progress))
        .route("/robots/:serial/flow/stop", post(stop_flow))
        .route("/robots/:serial/flow/pause", post(pause_flow))
        .route("/robots/:serial/flow/resume", post(resume_flow))
        .route("/flows", get(list_flows))
        .route("/flows/:flow_id", get(get_flow))
        .route("/commands", get(list_commands))
        .route("/analytics", get(get_analytics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::analytics_repository::AnalyticsRepository;
    use crate::application::analytics_service::AnalyticsService;
    use crate::application::bridge_registry::BridgeRegistry;
    use crate::application::bridge_service::BridgeSettings;
    use crate::application::data_channel::testing::RecordingTransport;
    use crate::application::flow_service::FlowService;
    use crate::domain::analytics::{AnalyticsQuery, AnalyticsResponse};
    use crate::domain::flow::{Flow, FlowCommand};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Unreachable;

    #[async_trait]
    impl AnalyticsRepository for Unreachable {
        async fn fetch(&self, _query: &AnalyticsQuery) -> anyhow::Result<AnalyticsResponse> {
            anyhow::bail!("offline")
        }
    }

    struct Fixture;

    #[async_trait]
    impl AnalyticsRepository for Fixture {
        async fn fetch(&self, _query: &AnalyticsQuery) -> anyhow::Result<AnalyticsResponse> {
            Ok(serde_json::from_value(json!({
                "success": true,
                "data": {
                    "wordStats": [{"word": "door", "count": 3}],
                    "totals": {"conversations": 1, "messages": 4, "words": 12},
                    "byDate": [{"date": "2024-06-01", "count": 4}]
                }
            }))?)
        }
    }

    fn state() -> Arc<AppState> {
        let flows = vec![Flow {
            id: "patrol".to_string(),
            name: "Patrol".to_string(),
            description: None,
            commands: vec![
                FlowCommand {
                    id: "a".to_string(),
                    name: "Go A".to_string(),
                },
                FlowCommand {
                    id: "b".to_string(),
                    name: "Go B".to_string(),
                },
            ],
        }];
        Arc::new(AppState {
            registry: Arc::new(BridgeRegistry::new(BridgeSettings::default())),
            flow_service: FlowService::new(flows),
            analytics_service: AnalyticsService::new(Arc::new(Unreachable), Arc::new(Fixture)),
            outbound_buffer: 8,
        })
    }

    fn control_request(uri: &str, token: bool) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if token {
            builder = builder
                .header("user-token", "abc")
                .header("operator_data", "alice");
        }
        builder.body(Body::empty()).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_control_requires_user_token() {
        let state = state();
        let transport = Arc::new(RecordingTransport::default());
        state.registry.attach("SN-1", transport.clone()).unwrap();

        let response = build_router(state)
            .oneshot(control_request("/robots/SN-1/emergency-stop", false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["redirect"], "/login");
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_emergency_stop_route() {
        let state = state();
        let transport = Arc::new(RecordingTransport::default());
        state.registry.attach("SN-1", transport.clone()).unwrap();

        let response = build_router(state)
            .oneshot(control_request("/robots/SN-1/emergency-stop", true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["dispatch"], "sent");
        assert_eq!(
            transport.classes(),
            vec!["flow_stop", "lc_velocity", "emergency_stop"]
        );
    }

    #[tokio::test]
    async fn test_commands_dropped_when_disconnected() {
        let response = build_router(state())
            .oneshot(control_request("/robots/SN-9/flow/stop", true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["dispatch"], "dropped");
    }

    #[tokio::test]
    async fn test_unknown_flow_is_not_found() {
        let response = build_router(state())
            .oneshot(control_request("/robots/SN-1/flows/missing/start", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_telemetry_reads() {
        let state = state();
        let router = build_router(state.clone());

        let empty = router.clone().oneshot(get_request("/robots/SN-1/position")).await.unwrap();
        assert_eq!(empty.status(), StatusCode::NO_CONTENT);

        let bridge = state
            .registry
            .attach("SN-1", Arc::new(RecordingTransport::default()))
            .unwrap();
        bridge.handle_inbound(json!({"m": "lc", "c": "lc_odometry", "x": 2.0, "y": 0.0, "r": 0.0}));
        bridge.handle_inbound(json!({"m": "lidar", "angle_inc": 0.0, "data": [100, -1, 40000]}));

        let position = router.clone().oneshot(get_request("/robots/SN-1/position")).await.unwrap();
        assert_eq!(json_body(position).await["x"], 2.0);

        let scan = json_body(router.oneshot(get_request("/robots/SN-1/lidar")).await.unwrap()).await;
        assert_eq!(scan["frame"], "map");
        assert_eq!(scan["samples"], 3);
        assert_eq!(scan["points"].as_array().unwrap().len(), 1);
        assert_eq!(scan["points"][0]["x"], 3.0);
    }

    #[tokio::test]
    async fn test_flow_progress_route() {
        let state = state();
        let response = build_router(state)
            .oneshot(get_request("/robots/SN-1/flows/patrol/progress"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["percent"], 0);
        assert_eq!(body["slots"][0]["status"], "pending");
    }

    #[tokio::test]
    async fn test_analytics_falls_back_to_fixture() {
        let response = build_router(state())
            .oneshot(get_request(
                "/analytics?startDate=2024-06-01&endDate=2024-06-30&timezone=UTC&organizationId=org",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["source"], "fixture");
        assert_eq!(body["words"][0]["word"], "door");
        assert_eq!(body["dates"][0]["percent"], 100);
    }

    #[tokio::test]
    async fn test_subscription_routes() {
        let state = state();
        let transport = Arc::new(RecordingTransport::default());
        state.registry.attach("SN-1", transport.clone()).unwrap();
        let router = build_router(state);

        let subscribe = Request::builder()
            .method("POST")
            .uri("/robots/SN-1/subscriptions/lidar")
            .header("user-token", "abc")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"interval_ms": 500}"#))
            .unwrap();
        let response = router.clone().oneshot(subscribe).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let unsubscribe = Request::builder()
            .method("DELETE")
            .uri("/robots/SN-1/subscriptions/lidar")
            .header("user-token", "abc")
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(unsubscribe).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = transport.sent();
        assert_eq!(sent[0].get("interval"), Some(&json!(500)));
        assert_eq!(transport.classes(), vec!["subscribe", "unsubscribe"]);

        let bad = Request::builder()
            .method("DELETE")
            .uri("/robots/SN-1/subscriptions/camera")
            .header("user-token", "abc")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(bad).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_serials_allocate_nothing() {
        let state = state();
        let router = build_router(state.clone());

        for i in 0..50 {
            let serial = format!("ghost-{}", i);
            for read in ["position", "lidar", "system", "flow-state", "flows/patrol/progress"] {
                let uri = format!("/robots/{}/{}", serial, read);
                let response = router.clone().oneshot(get_request(&uri)).await.unwrap();
                assert!(response.status().is_success(), "{}", uri);
            }
            for stream in ["position/stream", "events"] {
                let uri = format!("/robots/{}/{}", serial, stream);
                let response = router.clone().oneshot(get_request(&uri)).await.unwrap();
                assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            }
            let stop = format!("/robots/{}/emergency-stop", serial);
            let response = router.clone().oneshot(control_request(&stop, true)).await.unwrap();
            assert_eq!(json_body(response).await["dispatch"], "dropped");

            assert!(state.registry.get(&serial).is_none());
        }
        assert!(state.registry.connected_serials().is_empty());
    }

    #[tokio::test]
    async fn test_bare_subscribe_is_realtime() {
        let state = state();
        let transport = Arc::new(RecordingTransport::default());
        state.registry.attach("SN-1", transport.clone()).unwrap();

        let response = build_router(state)
            .oneshot(control_request("/robots/SN-1/subscriptions/odometry", true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["dispatch"], "sent");
        let sent = transport.sent();
        assert_eq!(sent[0].get("topic"), Some(&json!("lc_odometry")));
        assert_eq!(sent[0].get("interval"), Some(&json!("realtime")));
    }

    #[tokio::test]
    async fn test_flow_search() {
        let response = build_router(state())
            .oneshot(get_request("/flows?q=patr"))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
