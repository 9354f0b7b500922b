//! Where a request carries its access token.

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::CookieJar;

pub trait TokenCarrier: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    fn extract(&self, headers: &HeaderMap) -> Option<String>;
}

/// `Authorization: Bearer <token>`, used by the JSON API.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerCarrier;

impl TokenCarrier for BearerCarrier {
    fn name(&self) -> &'static str {
        "bearer"
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;

        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }
}

/// A named cookie, used by the server-rendered pages.
#[derive(Debug, Clone)]
pub struct CookieCarrier {
    cookie_name: String,
}

impl CookieCarrier {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
        }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

impl TokenCarrier for CookieCarrier {
    fn name(&self) -> &'static str {
        "cookie"
    }

    fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);
        let value = jar.get(&self.cookie_name)?.value().trim();

        // Some clients persist the header form inside the cookie.
        let value = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .unwrap_or(value);

        (!value.is_empty()).then(|| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_header(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_extracts_token() {
        let headers = with_header(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(BearerCarrier.extract(&headers).as_deref(), Some("abc.def.ghi"));

        let headers = with_header(header::AUTHORIZATION, "bearer  abc.def.ghi ");
        assert_eq!(BearerCarrier.extract(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_ignores_other_schemes() {
        assert!(BearerCarrier.extract(&HeaderMap::new()).is_none());
        assert!(
            BearerCarrier
                .extract(&with_header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
                .is_none()
        );
        assert!(
            BearerCarrier
                .extract(&with_header(header::AUTHORIZATION, "Bearer "))
                .is_none()
        );
        assert!(
            BearerCarrier
                .extract(&with_header(header::AUTHORIZATION, "abc.def.ghi"))
                .is_none()
        );
    }

    #[test]
    fn test_cookie_extracts_named_cookie() {
        let carrier = CookieCarrier::new("access_token");
        let headers = with_header(header::COOKIE, "theme=dark; access_token=abc.def.ghi");
        assert_eq!(carrier.extract(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_ignores_other_cookies() {
        let carrier = CookieCarrier::new("access_token");
        assert!(carrier.extract(&with_header(header::COOKIE, "session=xyz")).is_none());
        assert!(carrier.extract(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_carriers_are_independent() {
        let headers = with_header(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert!(CookieCarrier::new("access_token").extract(&headers).is_none());

        let headers = with_header(header::COOKIE, "access_token=abc.def.ghi");
        assert!(BearerCarrier.extract(&headers).is_none());
    }
}
