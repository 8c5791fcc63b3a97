//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

const BOUNDARY: &str = "fintrack-test-boundary";

const TYPED_CSV: &str = "Date,Description,Amount,Income/Expense\n\
    2024-01-03,Coffee,-50,Expense\n\
    2024-01-01,Salary,1000,Income\n\
    2024-01-04,Lunch,N/A,Expense\n";

fn setup_test_app() -> Router {
    create_router(Pipeline::default(), None, ServerConfig::default())
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

/// Build a multipart body with one file part and any number of text parts
fn multipart_body(file_name: &str, contents: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

// ========== Column preview ==========

#[tokio::test]
async fn test_preview_columns() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/columns",
            multipart_body("jan.csv", TYPED_CSV.as_bytes(), &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["file_kind"], "delimited");
    assert_eq!(json["headers"].as_array().unwrap().len(), 4);
    assert_eq!(json["sample"].as_array().unwrap().len(), 3);
    assert_eq!(json["detected"]["date"]["name"], "Date");
    assert_eq!(json["detected"]["type"]["name"], "Income/Expense");
    assert_eq!(json["complete"], true);
}

#[tokio::test]
async fn test_preview_missing_file() {
    let app = setup_test_app();

    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"mode\"\r\n\r\nauto\r\n--{BOUNDARY}--\r\n"
    );
    let response = app
        .oneshot(upload_request("/api/columns", body.into_bytes()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Missing file field");
}

// ========== Analyze ==========

#[tokio::test]
async fn test_analyze_auto() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body("jan.csv", TYPED_CSV.as_bytes(), &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["policy"], "type_keyed");
    assert_eq!(json["metrics"]["net_savings"], "950");
    assert_eq!(json["metrics"]["total_expenses"], "50");
    assert_eq!(json["report"]["drops"]["bad_amount"], 1);
    assert_eq!(json["report"]["rows_loaded"], 3);
    // Drop counts appear once, inside the run report
    assert!(json.get("drops").is_none());
    assert_eq!(json["transactions"].as_array().unwrap().len(), 2);
    assert_eq!(json["transactions"][0]["type"], "expense");
    assert_eq!(json["panels"]["income_vs_expense"]["status"], "ready");
    assert_eq!(json["roles"]["category"]["name"], "Description");
}

#[tokio::test]
async fn test_analyze_explicit_columns() {
    let app = setup_test_app();

    let csv = "Posted,Value,Bucket\n2024-02-01,-20,Food\n2024-02-02,100,Pay\n";
    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body(
                "feb.csv",
                csv.as_bytes(),
                &[
                    ("mode", "explicit"),
                    ("date_column", "Posted"),
                    ("amount_column", "value"),
                    ("category_column", "Bucket"),
                    ("type_column", ""),
                    ("top_n", "1"),
                ],
            ),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["policy"], "sign_keyed");
    assert_eq!(json["metrics"]["total_income"], "100");
    assert_eq!(json["metrics"]["total_expenses"], "20");
    let top = json["panels"]["top_categories"]["data"].as_array().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0]["category"], "Pay");
    assert_eq!(json["panels"]["income_vs_expense"]["status"], "no_data");
}

#[tokio::test]
async fn test_analyze_unknown_column_is_bad_request() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body(
                "jan.csv",
                TYPED_CSV.as_bytes(),
                &[("date_column", "When"), ("amount_column", "Amount")],
            ),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "resolution");
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("When"));
    assert!(message.contains("Date, Description, Amount, Income/Expense"));
}

#[tokio::test]
async fn test_analyze_explicit_missing_amount_with_unnamed_header() {
    let app = setup_test_app();

    let csv = "Date,,Amount\n2024-01-01,x,5\n";
    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body(
                "a.csv",
                csv.as_bytes(),
                &[("mode", "explicit"), ("date_column", "Date")],
            ),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "resolution");
    assert!(json["error"].as_str().unwrap().contains("amount"));
}

#[tokio::test]
async fn test_analyze_unsupported_file() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body("notes.docx", b"hello", &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "load");
}

#[tokio::test]
async fn test_analyze_forced_type_policy_without_type_column() {
    let app = setup_test_app();

    let csv = "Date,Amount\n2024-01-01,5\n";
    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body("a.csv", csv.as_bytes(), &[("policy", "type_keyed")]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "policy");
}

#[tokio::test]
async fn test_analyze_invalid_policy_field() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body("a.csv", TYPED_CSV.as_bytes(), &[("policy", "both")]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("Unknown sign policy"));
}

#[tokio::test]
async fn test_analyze_all_rows_dropped() {
    let app = setup_test_app();

    let csv = "Date,Amount\nsoon,1\nlater,2\n";
    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body("a.csv", csv.as_bytes(), &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["transactions"].as_array().unwrap().len(), 0);
    assert_eq!(json["panels"]["cumulative"]["status"], "no_data");
    assert_eq!(json["metrics"]["net_savings"], "0");
}

#[tokio::test]
async fn test_upload_too_large() {
    let config = ServerConfig {
        max_upload_bytes: 16,
        ..Default::default()
    };
    let app = create_router(Pipeline::default(), None, config);

    let response = app
        .oneshot(upload_request(
            "/api/analyze",
            multipart_body("jan.csv", TYPED_CSV.as_bytes(), &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ========== Exports ==========

#[tokio::test]
async fn test_export_csv() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/export/csv",
            multipart_body("jan.csv", TYPED_CSV.as_bytes(), &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"processed_transactions.csv\""
    );

    let body = String::from_utf8(get_body_bytes(response).await).unwrap();
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("date,amount,category,type,description"));
    assert_eq!(lines.next(), Some("2024-01-03,-50,Coffee,expense,"));
    assert_eq!(lines.count(), 1);
}

#[tokio::test]
async fn test_export_report() {
    let app = setup_test_app();

    let response = app
        .oneshot(upload_request(
            "/api/export/report",
            multipart_body("jan.csv", TYPED_CSV.as_bytes(), &[]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let bytes = get_body_bytes(response).await;
    assert!(bytes.starts_with(b"PK\x03\x04"));
}

// ========== Error mapping ==========

#[test]
fn test_pipeline_error_mapping() {
    let input = AppError::from_pipeline(fintrack_core::Error::PolicyUnavailable(
        fintrack_core::SignPolicy::TypeKeyed,
    ));
    assert_eq!(input.status(), StatusCode::BAD_REQUEST);

    let internal = AppError::from_pipeline(fintrack_core::Error::Export("disk full".into()));
    assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
