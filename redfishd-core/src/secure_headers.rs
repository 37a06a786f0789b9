//! Security headers applied unconditionally to every response.
//!
//! | Header | Value |
//! |--------|-------|
//! | `Strict-Transport-Security` | `max-age=31536000; includeSubdomains; preload` |
//! | `X-Frame-Options` | `DENY` |
//! | `Pragma` | `no-cache` |
//! | `Cache-Control` | `no-Store,no-Cache` |
//! | `X-XSS-Protection` | `1; mode=block` |
//! | `X-Content-Type-Options` | `nosniff` |
//! | `Content-Security-Policy` | locked-down BMC policy, `connect-src` open for `wss:` |
//!
//! The set is BMC policy, not configuration; handlers cannot opt out.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::{HeaderName, HeaderValue};

const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     img-src 'self' data:; \
     font-src 'self'; \
     style-src 'self'; \
     script-src 'self'; \
     connect-src 'self' wss:; \
     form-action 'none'; \
     frame-ancestors 'none'; \
     object-src 'none'; \
     base-uri 'none'";

/// The fixed header set.
pub fn headers() -> [(HeaderName, HeaderValue); 7] {
    [
        (
            HeaderName::from_static("strict-transport-security"),
            HeaderValue::from_static("max-age=31536000; includeSubdomains; preload"),
        ),
        (
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ),
        (
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        ),
        (
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-Store,no-Cache"),
        ),
        (
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ),
        (
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ),
        (
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ),
    ]
}

/// Middleware applying the header set to every response, installed with
/// `axum::middleware::from_fn`.
pub async fn apply(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    for (name, value) in headers() {
        response.headers_mut().insert(name, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_matches_the_locked_down_set() {
        let headers = headers();
        let get = |name: &str| {
            headers
                .iter()
                .find(|(n, _)| n.as_str() == name)
                .map(|(_, v)| v.to_str().unwrap())
                .unwrap()
        };
        assert_eq!(
            get("strict-transport-security"),
            "max-age=31536000; includeSubdomains; preload"
        );
        assert_eq!(get("x-frame-options"), "DENY");
        assert_eq!(get("pragma"), "no-cache");
        assert_eq!(get("cache-control"), "no-Store,no-Cache");
        assert_eq!(get("x-xss-protection"), "1; mode=block");
        assert_eq!(get("x-content-type-options"), "nosniff");
        assert!(get("content-security-policy").starts_with("default-src 'none'; "));
        assert!(get("content-security-policy").contains("connect-src 'self' wss:; "));
    }
}
