//! Request extractors whose rejections are `AppError`s, so malformed bodies,
//! paths, and query strings get the same JSON error body as everything else.

use axum::extract::{FromRequest, FromRequestParts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::routing::{get, post};
    use axum::Router;
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;

    #[derive(Deserialize)]
    struct Credentials {
        username: String,
    }

    #[derive(Deserialize)]
    struct Page {
        limit: i64,
    }

    async fn echo(Json(creds): Json<Credentials>) -> String {
        creds.username
    }

    async fn by_id(Path(id): Path<Uuid>) -> String {
        id.to_string()
    }

    async fn page(Query(page): Query<Page>) -> String {
        page.limit.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(echo))
            .route("/items/{id}", get(by_id))
            .route("/page", get(page))
    }

    async fn send(req: Request<Body>) -> (StatusCode, Option<String>, Value) {
        let resp = app().oneshot(req).await.unwrap();
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, content_type, body)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn well_formed_body_passes_through() {
        let resp = app().oneshot(post_json(r#"{"username":"pm1"}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_typed_body_is_a_json_validation_error() {
        let (status, content_type, body) = send(post_json(r#"{"username":5}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body["kind"], "validation_error");
        assert!(body["error"].as_str().unwrap().contains("username"));
    }

    #[tokio::test]
    async fn unparsable_body_is_a_bad_request() {
        let (status, _, body) = send(post_json("{")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");

        let no_content_type = Request::post("/echo")
            .body(Body::from(r#"{"username":"pm1"}"#))
            .unwrap();
        let (status, _, body) = send(no_content_type).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }

    #[tokio::test]
    async fn bad_path_and_query_are_bad_requests() {
        let req = Request::get("/items/not-a-uuid").body(Body::empty()).unwrap();
        let (status, _, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");

        let req = Request::get("/page?limit=lots").body(Body::empty()).unwrap();
        let (status, _, body) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }
}
