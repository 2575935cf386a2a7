use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::handler::Handler;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::error::SiteError;

/// Body of every 404 response.
pub(crate) const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>404 - Page Not Found</title>
    <style>
        body { font-family: Arial, sans-serif; text-align: center; padding: 50px; }
        h1 { color: #f51a2d; }
        a { color: #f51a2d; text-decoration: none; }
        a:hover { text-decoration: underline; }
    </style>
</head>
<body>
    <h1>404 - Page Not Found</h1>
    <p>The page you're looking for doesn't exist.</p>
    <p><a href="/">Go back to Home</a></p>
    <p><a href="/search-programs.html">Browse Programs</a></p>
</body>
</html>
"#;

#[derive(Clone)]
struct SiteState {
    root: Arc<PathBuf>,
}

/// Router serving the page bundle under `root`.
///
/// | Path | Behavior |
/// |------|----------|
/// | `/` | `index.html` |
/// | `/program.html/{slug}`, `/program/{slug}` | 302 to `/program.html?slug={slug}` |
/// | any existing file | the file |
/// | other `/program…` paths | `program.html` |
/// | anything else | HTML 404 page |
pub fn router(root: impl Into<PathBuf>) -> Router {
    let root = root.into();
    let state = SiteState {
        root: Arc::new(root.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let files = ServeDir::new(&root).fallback(unmatched.with_state(state));

    Router::new()
        .route_service("/", ServeFile::new(root.join("index.html")))
        .route("/program.html/{slug}", get(program_redirect))
        .route("/program/{slug}", get(program_redirect))
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Rewrites path-style program links into the query form the page reads.
async fn program_redirect(Path(slug): Path<String>) -> Response {
    tracing::debug!(slug = %slug, "Serving program page for slug");
    let location = format!("/program.html?slug={}", urlencoding::encode(&slug));
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

async fn unmatched(State(state): State<SiteState>, uri: Uri) -> Result<Html<String>, SiteError> {
    let path = uri.path();
    if !path.starts_with("/program") {
        return Err(SiteError::NotFound(path.to_string()));
    }

    tracing::debug!(path = %path, "Fallback: serving program.html");
    match tokio::fs::read_to_string(state.root.join("program.html")).await {
        Ok(page) => Ok(Html(page)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SiteError::NotFound(path.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;

    fn site() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("program.html"), "<h1>program</h1>").unwrap();
        std::fs::write(dir.path().join("styles.css"), "body {}").unwrap();
        let app = router(dir.path());
        (dir, app)
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_program_paths_redirect_to_query_form() {
        let (_dir, app) = site();
        for uri in ["/program.html/clean-water", "/program/clean-water"] {
            let response = get(app.clone(), uri).await;
            assert_eq!(response.status(), StatusCode::FOUND, "{uri}");
            assert_eq!(
                response.headers()[LOCATION],
                "/program.html?slug=clean-water"
            );
        }
    }

    #[tokio::test]
    async fn test_redirect_encodes_slug() {
        let (_dir, app) = site();
        let response = get(app, "/program/books%20%26%20pens").await;
        assert_eq!(
            response.headers()[LOCATION],
            "/program.html?slug=books%20%26%20pens"
        );
    }

    #[tokio::test]
    async fn test_root_and_static_files() {
        let (_dir, app) = site();

        let response = get(app.clone(), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>home</h1>");

        let response = get(app, "/styles.css").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "body {}");
    }

    #[tokio::test]
    async fn test_program_prefix_falls_back_to_program_page() {
        let (_dir, app) = site();
        let response = get(app, "/programs/archive").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "<h1>program</h1>");
    }

    #[tokio::test]
    async fn test_unknown_path_is_html_404() {
        let (_dir, app) = site();
        let response = get(app, "/nope.html").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("404 - Page Not Found"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let (_dir, app) = site();
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/index.html")
                    .header("origin", "http://localhost:5500")
                    .header("access-control-request-method", "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        let methods = response.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap()
            .to_string();
        assert!(methods.contains("PUT") && methods.contains("DELETE"));
    }
}
