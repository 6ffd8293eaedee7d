/// HTTP route tests against mocked providers
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use lead_scoring_api::config::Config;
use lead_scoring_api::handlers::{lead_routes, AppState};
use lead_scoring_api::model::{LinearKind, LinearModel};
use lead_scoring_api::services::ProviderCaches;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_state(base: &str) -> Arc<AppState> {
    let config = Config {
        port: 8080,
        mailboxlayer_api_key: "test_mailbox_key".to_string(),
        mailboxlayer_url: format!("{}/api/check", base),
        rapidapi_key: "test_rapid_key".to_string(),
        crunchbase_base_url: format!("{}/crunchbase", base),
        b2b_base_url: format!("{}/b2b", base),
        model_path: "model.json".to_string(),
        validation_concurrency: 2,
        request_timeout_secs: 5,
        email_cache_ttl_secs: 60,
        company_cache_ttl_secs: 60,
        max_upload_bytes: 1024 * 1024,
    };
    let caches = ProviderCaches::new(&config);
    Arc::new(AppState {
        config,
        caches,
        model: Arc::new(LinearModel {
            kind: LinearKind::Logistic,
            feature_names: Some(vec![]),
            coefficients: vec![],
            intercept: 0.0,
        }),
    })
}

async fn mount_mailboxlayer(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/check"))
        .and(query_param("email", "jane@acme.io"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "format_valid": true,
            "smtp_check": true,
            "score": 0.9
        })))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/check"))
        .and(query_param("email", "temp@mailinator.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "format_valid": true,
            "smtp_check": false,
            "disposable": true,
            "score": 0.3
        })))
        .mount(mock_server)
        .await;
}

fn post_csv(uri: &str, csv: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap()
}

const UPLOAD: &str = "email,company\njane@acme.io,\ntemp@mailinator.com,\n,\n";

#[tokio::test]
async fn test_validate_route_returns_statuses() {
    let mock_server = MockServer::start().await;
    mount_mailboxlayer(&mock_server).await;

    let app = lead_routes().with_state(create_test_state(&mock_server.uri()));
    let response = app
        .oneshot(post_csv("/api/v1/leads/validate", UPLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let statuses: Vec<&str> = json["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["email_status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["valid", "risky", "unknown"]);
    assert_eq!(json["rows"][0]["row"], 1);
    assert_eq!(json["rows"][2]["email"], serde_json::Value::Null);
    assert_eq!(json["counts"]["valid"], 1);
    assert_eq!(json["counts"]["invalid"], 0);
    assert!(json["run_id"].is_string());
}

#[tokio::test]
async fn test_score_route_applies_penalties() {
    let mock_server = MockServer::start().await;
    mount_mailboxlayer(&mock_server).await;

    let app = lead_routes().with_state(create_test_state(&mock_server.uri()));
    let response = app
        .oneshot(post_csv("/api/v1/leads/score", UPLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    // A logistic model without features scores every lead at 50%
    let adjusted: Vec<f64> = json["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["adjusted_score"].as_f64().unwrap())
        .collect();
    assert_eq!(json["rows"][0]["lead_score"].as_f64(), Some(50.0));
    assert_eq!(adjusted, vec![50.0, 40.0, 30.0]);
}

#[tokio::test]
async fn test_export_route_returns_csv_download() {
    let mock_server = MockServer::start().await;
    mount_mailboxlayer(&mock_server).await;

    let app = lead_routes().with_state(create_test_state(&mock_server.uri()));
    let response = app
        .oneshot(post_csv("/api/v1/leads/export", UPLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], "text/csv; charset=utf-8");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=\"scored_leads.csv\""
    );
    let checksum = headers["x-export-sha256"].to_str().unwrap().to_string();
    assert_eq!(checksum.len(), 64);
    assert!(headers.contains_key("x-run-id"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let mut lines = text.lines();
    let header_line = lines.next().unwrap();
    assert!(header_line.starts_with("email,company,email_status,"));
    assert!(header_line.ends_with("Lead Score (%),Adjusted Score (%)"));
    assert!(lines.next().unwrap().ends_with(",50.0,50.0"));
}

#[tokio::test]
async fn test_empty_upload_is_bad_request() {
    let mock_server = MockServer::start().await;

    let app = lead_routes().with_state(create_test_state(&mock_server.uri()));
    let response = app
        .oneshot(post_csv("/api/v1/leads/validate", "  \n"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Upload a CSV file to start analysis");
}

#[tokio::test]
async fn test_model_mismatch_is_server_error() {
    let mock_server = MockServer::start().await;
    mount_mailboxlayer(&mock_server).await;

    let mut state = (*create_test_state(&mock_server.uri())).clone();
    state.model = Arc::new(LinearModel {
        kind: LinearKind::Linear,
        feature_names: None,
        coefficients: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        intercept: 0.0,
    });

    let app = lead_routes().with_state(Arc::new(state));
    let response = app
        .oneshot(post_csv("/api/v1/leads/score", UPLOAD))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
