//! Axum router construction.
//!
//! [`build`] assembles the application router:
//! - per-request trace-id middleware
//! - health route
//! - voice routes under `/v1`
//! - rendered images under `/<bucket>`

mod health;
mod voice;

use std::sync::Arc;

use axum::{Router, middleware};
use tower_http::services::ServeDir;

use crate::middleware::trace;
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let images = ServeDir::new(&state.config.blob_dir);
    let bucket_path = format!("/{}", state.config.blob_bucket);

    Router::new()
        .merge(health::router())
        .nest("/v1", voice::router())
        .nest_service(&bucket_path, images)
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use vox_core::{MemoryQueue, MessageQueue, Registry};
    use vox_types::{Job, JobResult};

    use super::*;
    use crate::config::Config;
    use crate::middleware::trace::X_TRACE_ID;

    struct Harness {
        app: Router,
        blob_dir: std::path::PathBuf,
        requests: Arc<MemoryQueue>,
        responses: Arc<MemoryQueue>,
    }

    fn harness() -> Harness {
        let blob_dir = std::env::temp_dir().join(format!("vox-server-{}", uuid::Uuid::new_v4()));
        let mut config = Config::from_env();
        config.poll_delay_secs = 0;
        config.blob_dir = blob_dir.display().to_string();
        config.blob_bucket = "vox-images".into();

        let requests = Arc::new(MemoryQueue::new());
        let responses = Arc::new(MemoryQueue::new());
        let state = AppState::new(
            Arc::new(config),
            Arc::new(Registry::new()),
            requests.clone(),
            responses.clone(),
        );
        Harness {
            app: build(Arc::new(state)),
            blob_dir,
            requests,
            responses,
        }
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let h = harness();
        let response = h
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_TRACE_ID));
    }

    #[tokio::test]
    async fn prompt_enqueues_job_with_callers_trace_id() {
        let h = harness();
        let trace_id = "2f1c2b8e-6a49-4c1b-9a57-0d7d2c7f5a10";
        let mut request = json_request("POST", "/v1/prompt", r#"{"prompt":"tell me a fact"}"#);
        request
            .headers_mut()
            .insert(X_TRACE_ID, trace_id.parse().unwrap());

        let response = h.app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[X_TRACE_ID], trace_id);
        let body = body_json(response).await;
        assert_eq!(body["speech"], "your response will be available shortly");

        let raw = h.requests.pull(Duration::ZERO).await.unwrap().unwrap();
        let job: Job = serde_json::from_str(&raw).unwrap();
        assert_eq!(job.prompt, "tell me a fact");
        assert_eq!(job.model, "gpt");
        assert_eq!(job.trace_id, trace_id);
    }

    #[tokio::test]
    async fn malformed_and_empty_bodies_are_rejected() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(json_request("POST", "/v1/prompt", "{nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = h
            .app
            .clone()
            .oneshot(json_request("POST", "/v1/translate", r#"{"source_language":"en"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = h
            .app
            .oneshot(json_request("POST", "/v1/prompt", r#"{"prompt":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.requests.is_empty().await);
    }

    #[tokio::test]
    async fn last_response_renders_queued_result() {
        let h = harness();
        let result = JobResult {
            prompt: "p".into(),
            response: "Honey never spoils".into(),
            time_diff: "4".into(),
            model: "gemini".into(),
            ..Default::default()
        };
        h.responses
            .push(serde_json::to_string(&result).unwrap())
            .await
            .unwrap();

        let response = h
            .app
            .clone()
            .oneshot(Request::get("/v1/response").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(
            body["speech"],
            "Honey never spoils, from the gemini model, this took 4 seconds to fetch the answer"
        );

        // Served again from the cache slot.
        let response = h
            .app
            .oneshot(Request::get("/v1/response").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await["speech"], body["speech"]);
    }

    #[tokio::test]
    async fn corrupt_result_becomes_spoken_apology() {
        let h = harness();
        h.responses.push("not json".into()).await.unwrap();

        let response = h
            .app
            .oneshot(Request::get("/v1/response").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["speech"], crate::error::APOLOGY_SPEECH);
        assert_eq!(body["end_session"], true);
    }

    #[tokio::test]
    async fn model_selection_and_listing() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(json_request("PUT", "/v1/models", r#"{"alias":"which"}"#))
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await["speech"],
            "I am using the text-model gpt and image-model stable"
        );

        let response = h
            .app
            .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert!(body["speech"].as_str().unwrap().starts_with("The available models are"));
    }

    #[tokio::test]
    async fn system_prompt_is_applied_to_next_prompt() {
        let h = harness();
        h.app
            .clone()
            .oneshot(json_request("POST", "/v1/system-prompt", r#"{"system_prompt":"be brief"}"#))
            .await
            .unwrap();
        h.app
            .clone()
            .oneshot(json_request("POST", "/v1/prompt", r#"{"prompt":"hi"}"#))
            .await
            .unwrap();
        let job: Job =
            serde_json::from_str(&h.requests.pull(Duration::ZERO).await.unwrap().unwrap()).unwrap();
        assert_eq!(job.system_prompt, "be brief");

        let response = h
            .app
            .oneshot(
                Request::delete("/v1/system-prompt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn purge_is_silent_and_idempotent() {
        let h = harness();
        h.responses.push("stale".into()).await.unwrap();
        for _ in 0..2 {
            let response = h
                .app
                .clone()
                .oneshot(Request::post("/v1/queue/purge").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            assert!(bytes.is_empty());
        }
        assert!(h.responses.is_empty().await);
    }

    #[tokio::test]
    async fn rendered_images_are_served_under_bucket() {
        let h = harness();
        let image_dir = h.blob_dir.join("images/req-1");
        tokio::fs::create_dir_all(&image_dir).await.unwrap();
        tokio::fs::write(image_dir.join("abc-720-480.jpg"), b"jpeg bytes")
            .await
            .unwrap();

        let response = h
            .app
            .clone()
            .oneshot(
                Request::get("/vox-images/images/req-1/abc-720-480.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"jpeg bytes");

        let response = h
            .app
            .oneshot(Request::get("/vox-images/images/missing.jpg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        tokio::fs::remove_dir_all(&h.blob_dir).await.unwrap();
    }
}
