use crate::db::UserRow;
use crate::export::{
    self, CollectionExportKind, ExportError, ExportResponse, SubmissionExportKind,
};
use crate::fetch::ImageFetchError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route(
            "/collections/{id}/export/{kind}",
            get(export_collection_handler),
        )
        .route(
            "/submissions/{id}/export/{kind}",
            get(export_submission_handler),
        )
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let (collections, submissions) = state
        .db
        .content_counts()
        .await
        .map_err(map_export_error)?;
    Ok(Json(serde_json::json!({
        "collections": collections,
        "submissions": submissions
    })))
}

async fn export_collection_handler(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let kind = CollectionExportKind::from_path(&kind).ok_or_else(ApiError::not_found)?;
    let caller = authenticate(&state, &headers).await?;
    let export = export::export_collection(&state, &caller, &id, kind)
        .await
        .map_err(map_export_error)?;
    Ok(attachment_response(export))
}

async fn export_submission_handler(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let kind = SubmissionExportKind::from_path(&kind).ok_or_else(ApiError::not_found)?;
    let caller = authenticate(&state, &headers).await?;
    let export = export::export_submission(&state, &caller, &id, kind)
        .await
        .map_err(map_export_error)?;
    Ok(attachment_response(export))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserRow, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(ApiError::unauthorized)?;
    state
        .db
        .user_by_token(token)
        .await
        .map_err(map_export_error)?
        .ok_or_else(ApiError::unauthorized)
}

fn attachment_response(export: ExportResponse) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(export.content_type.as_ref())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(export.bytes.len() as u64),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", export.filename))
            .unwrap_or(HeaderValue::from_static("attachment")),
    );
    (StatusCode::OK, headers, export.bytes).into_response()
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn map_export_error(error: anyhow::Error) -> ApiError {
    if let Some(export_error) = error.downcast_ref::<ExportError>() {
        return match export_error {
            ExportError::NotFound => ApiError::not_found(),
            ExportError::Validation(message) => ApiError::bad_request(message),
        };
    }
    // Fetch failures that escape the orchestrator are whole-request
    // failures like any other, the caller only sees the generic 500.
    if error.downcast_ref::<ImageFetchError>().is_some() {
        tracing::warn!(error = ?error, "export aborted by asset fetch");
    } else {
        tracing::warn!(error = ?error, "export failed");
    }
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "export failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crate::fetch::ImageFetcher;
    use axum::body::Body;
    use axum::http::Request;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::net::SocketAddr;
    use tempfile::tempdir;
    use tokio::net::TcpListener;
    use tower::ServiceExt;
    use zip::ZipArchive;

    fn png_fixture() -> Vec<u8> {
        let image = RgbaImage::from_pixel(8, 8, Rgba([90, 160, 60, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    async fn spawn_asset_server() -> SocketAddr {
        let app = Router::new()
            .route("/ok.png", get(|| async { png_fixture().into_response() }))
            .route(
                "/broken.png",
                get(|| async { StatusCode::NOT_FOUND.into_response() }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let mut config = Config::for_tests();
        config.db_path = dir.path().join("spot.db");
        let db = Database::new(&config).await.unwrap();
        let fetcher = ImageFetcher::new(&config).unwrap();
        db.seed_user("u1", "Ana", Some("ana"), "owner-token").await;
        db.seed_user("u2", "Ben", None, "other-token").await;
        db.seed_collection("c1", "u1", "Week 12", Some("Weekly picks"))
            .await;
        db.seed_submission(
            "s1",
            "u1",
            Some("c1"),
            Some("Sunset"),
            Some("<p>Nice</p>"),
            None,
            1,
        )
        .await;
        db.seed_submission("s2", "u1", Some("c1"), None, None, None, 2)
            .await;
        Arc::new(AppState::new(config, db, fetcher))
    }

    fn request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn requires_authentication() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let response = app
            .oneshot(request("/collections/c1/export/zip", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_owner_sees_not_found() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let response = app
            .oneshot(request("/collections/c1/export/zip", Some("other-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_collection_is_indistinguishable_from_foreign() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let missing = app
            .clone()
            .oneshot(request("/collections/nope/export/zip", Some("owner-token")))
            .await
            .unwrap();
        let foreign = app
            .oneshot(request("/collections/c1/export/zip", Some("other-token")))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_bytes(missing).await, body_bytes(foreign).await);
    }

    #[tokio::test]
    async fn owner_downloads_collection_zip() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let response = app
            .oneshot(request("/collections/c1/export/zip", Some("owner-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"Week 12.zip\""
        );
        let bytes = body_bytes(response).await;
        let mut archive = ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"01 - Sunset/metadata.md".to_string()));
        assert!(names.contains(&"01 - Sunset/text.md".to_string()));
        assert!(names.contains(&"02/metadata.md".to_string()));
    }

    #[tokio::test]
    async fn submission_pdf_download() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let response = app
            .oneshot(request("/submissions/s1/export/pdf", Some("owner-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        let bytes = body_bytes(response).await;
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn gif_download_with_progressions() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir).await;
        let addr = spawn_asset_server().await;
        state
            .db
            .seed_progression("p1", "s1", &format!("http://{addr}/ok.png"), 1)
            .await;
        state
            .db
            .seed_progression("p2", "s1", &format!("http://{addr}/ok.png"), 2)
            .await;
        let response = router(state)
            .oneshot(request("/submissions/s1/export/gif", Some("owner-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/gif"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"Sunset_progressions.gif\""
        );
        let bytes = body_bytes(response).await;
        assert!(bytes.starts_with(b"GIF8"));
    }

    #[tokio::test]
    async fn gif_frame_fetch_failure_is_internal_error() {
        let dir = tempdir().unwrap();
        let state = test_state(&dir).await;
        let addr = spawn_asset_server().await;
        state
            .db
            .seed_progression("p1", "s1", &format!("http://{addr}/broken.png"), 1)
            .await;
        state
            .db
            .seed_progression("p2", "s1", &format!("http://{addr}/broken.png"), 2)
            .await;
        let response = router(state)
            .oneshot(request("/submissions/s1/export/gif", Some("owner-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"], "export failed");
    }

    #[tokio::test]
    async fn gif_with_too_few_frames_is_rejected() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let response = app
            .oneshot(request("/submissions/s1/export/gif", Some("owner-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("progression images"));
    }

    #[tokio::test]
    async fn unknown_export_kind_is_not_found() {
        let dir = tempdir().unwrap();
        let app = router(test_state(&dir).await);
        let response = app
            .oneshot(request("/submissions/s1/export/tar", Some("owner-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
