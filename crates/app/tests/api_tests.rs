//! HTTP round trips through the full router on in-memory storage.

use app::{AppState, build_router};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use rating_core::time::fixed_clock;
use serde_json::{Value, json};
use services::AppServices;
use tower::util::ServiceExt; // for `oneshot`

fn setup_app() -> Router {
    let state = AppState::new(AppServices::in_memory(fixed_clock()));
    build_router(state, &["http://localhost:5173".to_string()])
}

fn request(method: &str, uri: &str, subject: Option<u64>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = subject {
        builder = builder.header("x-subject-id", id.to_string());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, json)
}

async fn register(app: &Router, name: &str) -> u64 {
    let (status, body) = send(
        app,
        request("POST", "/subjects", None, Some(json!({"name": name}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_u64().unwrap()
}

/// Subject with a two-image session and one 1..=5 question.
struct Fixture {
    app: Router,
    subject: u64,
    session: u64,
    question: u64,
}

async fn fixture() -> Fixture {
    let app = setup_app();
    let subject = register(&app, "P1").await;

    for n in 1..=2 {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/images",
                Some(subject),
                Some(json!({"file_name": format!("{n}.jpg"), "file_path": format!("images/{n}.jpg")})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, question) = send(
        &app,
        request(
            "POST",
            "/questions",
            Some(subject),
            Some(json!({"text": "Quality?", "question_type": "likert", "min_scale": 1, "max_scale": 5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, session) = send(
        &app,
        request(
            "POST",
            "/sessions",
            Some(subject),
            Some(json!({"subject_id": subject, "session_type": "real"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["last_seen_position"], 0);
    let session = session["id"].as_u64().unwrap();

    let (status, assigned) = send(
        &app,
        request(
            "POST",
            &format!("/sessions/{session}/assign_images"),
            Some(subject),
            Some(json!([])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(assigned.as_array().unwrap().len(), 2);

    Fixture {
        app,
        subject,
        session,
        question: question["id"].as_u64().unwrap(),
    }
}

impl Fixture {
    async fn next(&self) -> Value {
        let (status, body) = send(
            &self.app,
            request(
                "GET",
                &format!("/flow/next_image?session_id={}", self.session),
                Some(self.subject),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn submit(&self, session_image_id: &Value, value: f64) -> (StatusCode, Value) {
        send(
            &self.app,
            request(
                "POST",
                "/flow/submit_rating",
                Some(self.subject),
                Some(json!({
                    "session_id": self.session,
                    "session_image_id": session_image_id,
                    "question_id": self.question,
                    "rating_value": value,
                    "response_time": 1.5
                })),
            ),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app();
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "rating-server");
}

#[tokio::test]
async fn test_missing_subject_header_is_unauthorized() {
    let app = setup_app();
    let (status, body) = send(&app, request("GET", "/sessions", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "UNAUTHORIZED");

    let garbled = Request::builder()
        .uri("/sessions")
        .header("x-subject-id", "not-a-number")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, garbled).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_flow_walks_session_to_completion() {
    let f = fixture().await;

    let first = f.next().await;
    assert_eq!(first["status"], "pending");
    assert_eq!(first["display_order"], 1);
    assert!(first["image_info"]["file_name"].as_str().unwrap().ends_with(".jpg"));

    // Fetching again without answering returns the same image.
    assert_eq!(f.next().await, first);

    let (status, receipt) = f.submit(&first["session_image_id"], 4.0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["status"], "ok");
    assert_eq!(receipt["last_seen_position"], 1);
    assert_eq!(receipt["advanced"], true);

    let second = f.next().await;
    assert_eq!(second["display_order"], 2);

    let (status, progress) = send(
        &f.app,
        request(
            "GET",
            &format!("/sessions/{}/progress", f.session),
            Some(f.subject),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(progress["answered"], 1);
    assert_eq!(progress["remaining"], 1);

    let (status, _) = f.submit(&second["session_image_id"], 2.0).await;
    assert_eq!(status, StatusCode::OK);

    let done = f.next().await;
    assert_eq!(done["status"], "complete");
    assert_eq!(done["message"], "No more images. Session completed.");

    let (status, session) = send(
        &f.app,
        request("GET", &format!("/sessions/{}", f.session), Some(f.subject), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["is_completed"], true);

    let (status, body) = f.submit(&second["session_image_id"], 3.0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "INVALID_STATE");
}

#[tokio::test]
async fn test_duplicate_submission_conflicts() {
    let f = fixture().await;
    let first = f.next().await;

    let (status, _) = f.submit(&first["session_image_id"], 4.0).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = f.submit(&first["session_image_id"], 5.0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "CONFLICT");

    let (status, stored) = send(
        &f.app,
        request(
            "GET",
            &format!("/session_images/{}/ratings", first["session_image_id"]),
            Some(f.subject),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stored = stored.as_array().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["rating_value"], 4.0);
}

#[tokio::test]
async fn test_ratings_route_accepts_answer_lists() {
    let f = fixture().await;
    let first = f.next().await;

    let (status, receipt) = send(
        &f.app,
        request(
            "POST",
            "/ratings",
            Some(f.subject),
            Some(json!({
                "session_image_id": first["session_image_id"],
                "answers": [{"question_id": f.question, "rating_value": 3}]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rating_id = receipt["rating_ids"][0].as_u64().unwrap();

    let (status, rating) = send(
        &f.app,
        request("GET", &format!("/ratings/{rating_id}"), Some(f.subject), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rating["session_id"], f.session);
    assert_eq!(rating["display_order"], 1);
}

#[tokio::test]
async fn test_out_of_scale_answer_is_invalid() {
    let f = fixture().await;
    let first = f.next().await;

    let (status, body) = f.submit(&first["session_image_id"], 9.0).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "INVALID");
    assert_eq!(f.next().await, first);
}

#[tokio::test]
async fn test_other_subjects_session_is_forbidden() {
    let f = fixture().await;
    let intruder = register(&f.app, "P2").await;

    let (status, body) = send(
        &f.app,
        request(
            "GET",
            &format!("/flow/next_image?session_id={}", f.session),
            Some(intruder),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "FORBIDDEN");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let f = fixture().await;
    let (status, body) = send(
        &f.app,
        request("GET", "/flow/next_image?session_id=999", Some(f.subject), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NOT_FOUND");
}

#[tokio::test]
async fn test_second_assignment_conflicts() {
    let f = fixture().await;
    let (status, body) = send(
        &f.app,
        request(
            "POST",
            &format!("/sessions/{}/assign_images", f.session),
            Some(f.subject),
            Some(json!([1])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "CONFLICT");
}
