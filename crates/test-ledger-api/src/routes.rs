// crates/test-ledger-api/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: Axum router, handlers and JSON response views.
// Purpose: Translate HTTP requests into ledger service calls.
// Dependencies: axum, serde, serde_json, tower-http
// ============================================================================

//! ## Overview
//! Handlers capture credentials and the raw body, then run the matching
//! [`LedgerService`] operation on the blocking path. Body extraction failures
//! are carried into the service so authorization is still decided first.
//! The request logger wraps everything, including the 404/405 fallbacks and
//! the panic catcher.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::extract::rejection::QueryRejection;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use test_ledger_core::ExecutionResult;
use test_ledger_core::LogEntry;
use test_ledger_core::TestCase;
use tower_http::catch_panic::CatchPanicLayer;

use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::error::handle_panic;
use crate::request_log::RequestLogSink;
use crate::request_log::record_requests;
use crate::service::LedgerService;
use crate::service::run_blocking;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Router state shared by handlers.
type ServiceState = State<Arc<LedgerService>>;

/// Raw request body, or the reason it could not be read.
type RawBody = Result<Bytes, BytesRejection>;

/// Handler result carrying a JSON payload.
type JsonResult<T> = Result<(StatusCode, Json<T>), ApiError>;

/// Test case as returned to callers.
#[derive(Debug, Serialize)]
struct TestCaseView<'a> {
    /// Record id.
    id: i64,
    /// Name.
    name: &'a str,
    /// Description, `null` when unset.
    description: Option<&'a str>,
}

impl<'a> From<&'a TestCase> for TestCaseView<'a> {
    fn from(test_case: &'a TestCase) -> Self {
        Self {
            id: test_case.id,
            name: &test_case.name,
            description: test_case.description.as_deref(),
        }
    }
}

/// Execution result as returned to callers.
#[derive(Debug, Serialize)]
struct ExecutionResultView<'a> {
    /// Record id.
    id: i64,
    /// Referenced test case.
    test_case_id: i64,
    /// Asset id.
    test_asset_id: i64,
    /// Outcome label.
    result: &'a str,
}

impl<'a> From<&'a ExecutionResult> for ExecutionResultView<'a> {
    fn from(result: &'a ExecutionResult) -> Self {
        Self {
            id: result.id,
            test_case_id: result.test_case_id,
            test_asset_id: result.test_asset_id,
            result: &result.result,
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the application router.
pub fn build_router(
    service: Arc<LedgerService>,
    log_sink: Arc<dyn RequestLogSink>,
    max_body_bytes: usize,
) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/testcases", get(list_test_cases).post(create_test_case))
        .route("/testcases/", get(list_test_cases).post(create_test_case))
        .route(
            "/testcases/{id}",
            get(get_test_case).put(update_test_case).delete(delete_test_case),
        )
        .route("/execution_results", post(record_execution_result))
        .route("/execution_results/", post(record_execution_result))
        .route("/execution_results/{test_asset_id}", get(execution_results_for_asset))
        .route("/logs", get(query_logs))
        .route("/logs/", get(query_logs))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(log_sink, record_requests))
        .with_state(service)
}

/// Borrows the body bytes or converts the extraction failure.
fn body_bytes(body: &RawBody) -> Result<&[u8], ApiError> {
    match body {
        Ok(bytes) => Ok(bytes.as_ref()),
        Err(rejection) => Err(ApiError::from_body_rejection(rejection)),
    }
}

/// Parses a path id; non-integers behave like unknown routes.
fn path_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| resource_not_found())
}

/// Builds the unknown-route error.
fn resource_not_found() -> ApiError {
    ApiError::NotFound("Resource not found".to_string())
}

/// Builds a `{"message": ...}` payload.
fn message(text: &str) -> Value {
    json!({ "message": text })
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// `GET /`
async fn home(State(service): ServiceState) -> JsonResult<Value> {
    Ok((StatusCode::OK, Json(message(&service.status_message()))))
}

/// `POST /auth/register`
async fn register(State(service): ServiceState, body: RawBody) -> JsonResult<Value> {
    run_blocking(|| service.register(body_bytes(&body)))?;
    Ok((StatusCode::CREATED, Json(message("User registered successfully"))))
}

/// `POST /auth/login`
async fn login(State(service): ServiceState, body: RawBody) -> JsonResult<Value> {
    let token = run_blocking(|| service.login(body_bytes(&body)))?;
    Ok((StatusCode::OK, Json(json!({ "access_token": token }))))
}

/// `GET /testcases/`
async fn list_test_cases(State(service): ServiceState, headers: HeaderMap) -> JsonResult<Value> {
    let context = RequestContext::from_headers(&headers);
    let test_cases = run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.list_test_cases(identity.as_ref())
    })?;
    let views: Vec<TestCaseView<'_>> = test_cases.iter().map(TestCaseView::from).collect();
    Ok((StatusCode::OK, Json(json!(views))))
}

/// `GET /testcases/{id}`
async fn get_test_case(
    State(service): ServiceState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult<Value> {
    let id = path_id(&id)?;
    let context = RequestContext::from_headers(&headers);
    let test_case = run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.get_test_case(identity.as_ref(), id)
    })?;
    Ok((StatusCode::OK, Json(json!(TestCaseView::from(&test_case)))))
}

/// `POST /testcases/`
async fn create_test_case(
    State(service): ServiceState,
    headers: HeaderMap,
    body: RawBody,
) -> JsonResult<Value> {
    let context = RequestContext::from_headers(&headers);
    let test_case = run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.create_test_case(identity.as_ref(), body_bytes(&body))
    })?;
    let payload = json!({
        "message": "Test case created successfully",
        "test_case": TestCaseView::from(&test_case),
    });
    Ok((StatusCode::CREATED, Json(payload)))
}

/// `PUT /testcases/{id}`
async fn update_test_case(
    State(service): ServiceState,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: RawBody,
) -> JsonResult<Value> {
    let id = path_id(&id)?;
    let context = RequestContext::from_headers(&headers);
    run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.update_test_case(identity.as_ref(), id, body_bytes(&body))
    })?;
    Ok((StatusCode::OK, Json(message("Test case updated successfully"))))
}

/// `DELETE /testcases/{id}`
async fn delete_test_case(
    State(service): ServiceState,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> JsonResult<Value> {
    let id = path_id(&id)?;
    let context = RequestContext::from_headers(&headers);
    run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.delete_test_case(identity.as_ref(), id)
    })?;
    Ok((StatusCode::OK, Json(message("Test case deleted successfully"))))
}

/// `POST /execution_results`
async fn record_execution_result(
    State(service): ServiceState,
    headers: HeaderMap,
    body: RawBody,
) -> JsonResult<Value> {
    let context = RequestContext::from_headers(&headers);
    let result = run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.record_execution_result(identity.as_ref(), body_bytes(&body))
    })?;
    let payload = json!({
        "message": "Execution result recorded successfully",
        "execution_result": ExecutionResultView::from(&result),
    });
    Ok((StatusCode::CREATED, Json(payload)))
}

/// `GET /execution_results/{test_asset_id}`
async fn execution_results_for_asset(
    State(service): ServiceState,
    Path(test_asset_id): Path<String>,
    headers: HeaderMap,
) -> JsonResult<Value> {
    let test_asset_id = path_id(&test_asset_id)?;
    let context = RequestContext::from_headers(&headers);
    let results = run_blocking(|| {
        let identity = service.authenticate(&context)?;
        service.execution_results_for_asset(identity.as_ref(), test_asset_id)
    })?;
    let views: Vec<ExecutionResultView<'_>> =
        results.iter().map(ExecutionResultView::from).collect();
    Ok((StatusCode::OK, Json(json!(views))))
}

/// `GET /logs/`
async fn query_logs(
    State(service): ServiceState,
    headers: HeaderMap,
    query: Result<Query<BTreeMap<String, String>>, QueryRejection>,
) -> JsonResult<Vec<LogEntry>> {
    let context = RequestContext::from_headers(&headers);
    let entries = run_blocking(|| {
        let identity = service.log_identity(&context)?;
        let Query(params) =
            query.map_err(|_| ApiError::Validation("Invalid query string".to_string()))?;
        service.query_logs(identity.as_ref(), &params)
    })?;
    Ok((StatusCode::OK, Json(entries)))
}

/// Fallback for unknown routes.
async fn not_found() -> ApiError {
    resource_not_found()
}

/// Fallback for known routes called with the wrong method.
async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed("Method not allowed".to_string())
}
