//! Cross-origin policy.
//!
//! Wrapper around tower-http CORS. No configured origins means no layer at all.

use std::time::Duration;

use axum::http::{HeaderValue, Method};
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use url::Url;

/// Preflight results may be cached by the browser for this long.
pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CORS origin '{0}'")]
pub struct InvalidOrigin(pub String);

/// Accepts `*` or an `http(s)://host[:port]` origin.
pub fn parse_origin(origin: &str) -> Result<HeaderValue, InvalidOrigin> {
    let invalid = || InvalidOrigin(origin.to_string());
    if origin == "*" {
        return Ok(HeaderValue::from_static("*"));
    }

    let url = Url::parse(origin).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(invalid());
    }
    HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|_| invalid())
}

/// Build the CORS layer, or `None` when no origins are configured.
pub fn cors_layer<S: AsRef<str>>(origins: &[S]) -> Result<Option<CorsLayer>, InvalidOrigin> {
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins.iter().any(|o| o.as_ref() == "*") {
        AllowOrigin::from(Any)
    } else {
        let values = origins
            .iter()
            .map(|o| parse_origin(o.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    Ok(Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::POST, Method::GET])
            .allow_headers(Any)
            .max_age(PREFLIGHT_MAX_AGE),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::any,
        Router,
    };
    use tower::ServiceExt;

    fn app(origins: &[&str]) -> Router {
        let router = Router::new().route("/", any(|| async { "inner" }));
        match cors_layer(origins).unwrap() {
            Some(layer) => router.layer(layer),
            None => router,
        }
    }

    #[test]
    fn test_parse_origin() {
        assert!(parse_origin("https://wallet.example.org").is_ok());
        assert!(parse_origin("http://localhost:3000").is_ok());
        assert!(parse_origin("*").is_ok());
        assert!(parse_origin("wallet.example.org").is_err());
        assert!(parse_origin("ftp://example.org").is_err());
    }

    #[test]
    fn test_no_origins_no_layer() {
        let empty: [&str; 0] = [];
        assert!(cors_layer(&empty).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header(header::ORIGIN, "https://wallet.example.org")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let res = app(&["https://wallet.example.org"]).oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://wallet.example.org"
        );
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "600");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_allowed_origin_is_echoed() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::ORIGIN, "https://wallet.example.org")
            .body(Body::empty())
            .unwrap();
        let res = app(&["https://wallet.example.org"]).oneshot(req).await.unwrap();
        assert_eq!(
            res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://wallet.example.org"
        );
    }

    #[tokio::test]
    async fn test_foreign_origin_gets_no_headers() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let res = app(&["https://wallet.example.org"]).oneshot(req).await.unwrap();
        assert!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_wildcard_origin() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::ORIGIN, "https://anyone.example")
            .body(Body::empty())
            .unwrap();
        let res = app(&["*"]).oneshot(req).await.unwrap();
        assert_eq!(res.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    }
}
