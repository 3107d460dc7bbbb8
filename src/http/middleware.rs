//! Redirect middleware.
//! Applies the redirect engine ahead of static file handling.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::redirects::{Redirect, Resolution, SharedEngine};

/// Bytes escaped in a `Location` value. Non-ASCII bytes are always escaped.
const LOCATION_ESCAPE: &AsciiSet = &CONTROLS;

pub async fn redirect_middleware(
    State(engine): State<SharedEngine>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let request_uri = match request.uri().path_and_query() {
        Some(pq) => pq.as_str().to_string(),
        None => request.uri().to_string(),
    };

    // The guard is released before awaiting the next handler.
    let resolution = engine.load().resolve(&request_uri);

    match resolution {
        Ok(Resolution::Redirect(redirect)) => {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info!(
                target: "redirects",
                request_id = %request_id,
                from = %request_uri,
                to = %redirect.destination,
                status = redirect.status.code(),
                "REDIR"
            );
            redirect_response(&redirect)
        }
        Ok(Resolution::NoMatch) => {
            tracing::debug!(path = %request_uri, "No redirect rule matched");
            next.run(request).await
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to resolve redirect");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Build a 301/302 response with a `Location` header.
///
/// Destinations carry decoded request values, so control and non-ASCII bytes
/// are percent-encoded before they reach the header.
pub fn redirect_response(redirect: &Redirect) -> Response {
    let location = utf8_percent_encode(&redirect.destination, LOCATION_ESCAPE).to_string();
    match HeaderValue::try_from(location) {
        Ok(location) => {
            let status = StatusCode::from(redirect.status);
            (status, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => {
            tracing::error!(destination = %redirect.destination, "Redirect destination is not a valid header value");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirects::RedirectStatus;

    #[test]
    fn test_redirect_response() {
        let response = redirect_response(&Redirect {
            destination: "/new?x=1".into(),
            status: RedirectStatus::Permanent,
        });
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/new?x=1");
    }

    #[test]
    fn test_location_escapes_non_ascii_and_controls() {
        let response = redirect_response(&Redirect {
            destination: "/articles/caf\u{e9}".into(),
            status: RedirectStatus::Permanent,
        });
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/articles/caf%C3%A9");

        let response = redirect_response(&Redirect {
            destination: "/line\nbreak?q=a b".into(),
            status: RedirectStatus::Temporary,
        });
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/line%0Abreak?q=a b");
    }

    #[test]
    fn test_location_keeps_reserved_characters() {
        let response = redirect_response(&Redirect {
            destination: r"https://example.com/a:b/c?x=1&y=$2#frag\".into(),
            status: RedirectStatus::Permanent,
        });
        assert_eq!(
            response.headers()[header::LOCATION],
            r"https://example.com/a:b/c?x=1&y=$2#frag\"
        );
    }
}
