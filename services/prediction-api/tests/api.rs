use model_registry::{fixtures, Cell, Frame, Predictor};
use prediction_api::config::{ModelConfig, DEFAULT_MODEL_URI};
use prediction_api::handle::ModelHandle;
use prediction_api::routes::{router, AppState};
use prediction_api::schema::COLUMNS;
use prediction_api::startup::initialize;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Behavior {
    Output(Vec<f64>),
    Fail,
    Panic,
    Sleep(Duration),
}

struct Stub {
    behavior: Behavior,
    calls: AtomicUsize,
    frames: Mutex<Vec<Frame>>,
}

impl Stub {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { behavior, calls: AtomicUsize::new(0), frames: Mutex::new(Vec::new()) })
    }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Predictor for Stub {
    fn predict(&self, frame: &Frame) -> anyhow::Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.frames.lock().unwrap().push(frame.clone());
        match &self.behavior {
            Behavior::Output(values) => Ok(values.clone()),
            Behavior::Fail => Err(anyhow::anyhow!("secret-internal tensor shape mismatch")),
            Behavior::Panic => panic!("predictor exploded"),
            Behavior::Sleep(d) => {
                std::thread::sleep(*d);
                Ok(vec![50.0])
            }
        }
    }
}

async fn spawn_with(handle: ModelHandle, timeout: Duration, max_body: usize) -> String {
    let app = router(AppState::new(handle, timeout), max_body);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn spawn(handle: ModelHandle) -> String { spawn_with(handle, Duration::from_secs(2), 64 * 1024).await }

fn loaded(stub: &Arc<Stub>) -> ModelHandle {
    ModelHandle::new(stub.clone(), "models:/StudentPerformanceModel/Production")
}

fn record() -> Value {
    json!({
        "Age": 16, "Gender": "F", "Class": "10", "Study_Hours_Per_Day": 3.5,
        "Attendance_Percentage": 92.0, "Parental_Education": "Graduate",
        "Internet_Access": "Yes", "Extracurricular_Activities": "No", "Previous_Year_Score": 78.0
    })
}

async fn post_predict(base: &str, body: &Value) -> (StatusCode, Value) {
    let resp = reqwest::Client::new().post(format!("{base}/predict")).json(body).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn liveness_does_not_depend_on_model() {
    let base = spawn(ModelHandle::empty()).await;
    let resp = reqwest::get(format!("{base}/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"status": "API is running"}));
}

#[tokio::test]
async fn readiness_follows_handle() {
    let empty = spawn(ModelHandle::empty()).await;
    let resp = reqwest::get(format!("{empty}/ready")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"ready": false}));

    let stub = Stub::new(Behavior::Output(vec![1.0]));
    let ready = spawn(loaded(&stub)).await;
    let resp = reqwest::get(format!("{ready}/ready")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"ready": true, "model": "models:/StudentPerformanceModel/Production"}));
}

#[tokio::test]
async fn predict_returns_first_output() {
    let stub = Stub::new(Behavior::Output(vec![81.2]));
    let base = spawn(loaded(&stub)).await;
    let (status, body) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predicted_final_percentage": 81.2}));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn registered_onnx_model_serves_predictions() {
    let store = tempfile::tempdir().unwrap();
    let graph = fixtures::age_plus_hours(&[("Gender", fixtures::STRING)]);
    fixtures::register(store.path(), "StudentPerformanceModel", fixtures::ONNX_MLMODEL, &graph).unwrap();
    let cfg = ModelConfig {
        tracking_uri: store.path().to_str().unwrap().to_string(),
        model_uri: DEFAULT_MODEL_URI.to_string(),
        tracking_token: None,
        request_timeout_secs: 2,
        artifact_cache_dir: store.path().join("cache"),
    };
    let handle = initialize(&cfg).await.unwrap();
    assert_eq!(handle.version(), Some(1));

    let base = spawn(handle).await;
    let (status, body) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"predicted_final_percentage": 19.5}));

    let resp = reqwest::get(format!("{base}/ready")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap()["version"], json!(1));
}

#[tokio::test]
async fn predictor_sees_one_row_with_named_columns() {
    let stub = Stub::new(Behavior::Output(vec![70.0]));
    let base = spawn(loaded(&stub)).await;
    let mut body = record();
    body["Attendance_Percentage"] = json!(92);
    body["Student_Name"] = json!("ignored");
    let (status, _) = post_predict(&base, &body).await;
    assert_eq!(status, StatusCode::OK);

    let frames = stub.frames.lock().unwrap();
    let frame = &frames[0];
    assert_eq!(frame.height(), 1);
    assert_eq!(frame.column_names().collect::<Vec<_>>(), COLUMNS.map(|(name, _)| name).to_vec());
    assert_eq!(frame.column("Age"), Some(&[Cell::Int(16)][..]));
    assert_eq!(frame.column("Attendance_Percentage"), Some(&[Cell::Float(92.0)][..]));
    assert_eq!(frame.column("Gender"), Some(&[Cell::Str("F".into())][..]));
}

#[tokio::test]
async fn missing_or_mistyped_fields_never_reach_the_model() {
    let stub = Stub::new(Behavior::Output(vec![81.2]));
    let base = spawn(loaded(&stub)).await;

    let mut missing = record();
    missing.as_object_mut().unwrap().remove("Age");
    let (status, body) = post_predict(&base, &missing).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(body["detail"].as_str().unwrap().contains("Age"), "{body}");

    for (field, value) in [("Age", json!("twelve")), ("Age", json!(16.5)), ("Previous_Year_Score", json!("78")), ("Gender", json!(1))] {
        let mut bad = record();
        bad[field] = value;
        let (status, body) = post_predict(&base, &bad).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{field}: {body}");
        assert_eq!(body["error"], "validation_error");
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn malformed_body_and_content_type() {
    let stub = Stub::new(Behavior::Output(vec![81.2]));
    let base = spawn(loaded(&stub)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/predict"))
        .header("content-type", "application/json")
        .body("{\"Age\": 16,")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.json::<Value>().await.unwrap()["error"], "validation_error");

    let resp = client.post(format!("{base}/predict")).body(record().to_string()).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let stub = Stub::new(Behavior::Output(vec![81.2]));
    let base = spawn_with(loaded(&stub), Duration::from_secs(2), 256).await;
    let mut body = record();
    body["Parental_Education"] = json!("x".repeat(1024));
    let (status, body) = post_predict(&base, &body).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn not_ready_without_model() {
    let base = spawn(ModelHandle::empty()).await;
    let (status, body) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "model_unavailable");
}

#[tokio::test]
async fn predictor_error_is_opaque_500() {
    let stub = Stub::new(Behavior::Fail);
    let base = spawn(loaded(&stub)).await;
    let (status, body) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "inference_error");
    assert!(!body.to_string().contains("secret-internal"), "{body}");
}

#[tokio::test]
async fn predictor_panic_is_contained() {
    let stub = Stub::new(Behavior::Panic);
    let base = spawn(loaded(&stub)).await;
    let (status, body) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "inference_error");

    let (status, _) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reqwest::get(format!("{base}/")).await.unwrap().status(), StatusCode::OK);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn empty_or_non_finite_output_is_inference_error() {
    for output in [vec![], vec![f64::NAN], vec![f64::INFINITY, 1.0]] {
        let stub = Stub::new(Behavior::Output(output));
        let base = spawn(loaded(&stub)).await;
        let (status, body) = post_predict(&base, &record()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "inference_error");
    }
}

#[tokio::test]
async fn slow_predictor_times_out() {
    let stub = Stub::new(Behavior::Sleep(Duration::from_millis(500)));
    let base = spawn_with(loaded(&stub), Duration::from_millis(50), 64 * 1024).await;
    let (status, body) = post_predict(&base, &record()).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "inference_timeout");
}
