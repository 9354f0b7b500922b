use serde::Serialize;

/// Username of the bootstrap administrator.
pub const ROOT_USERNAME: &str = "root";

/// The authenticated identity behind a request.
///
/// Rebuilt from the store on every request, so flag changes take effect
/// without revoking tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i32,
    pub username: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl Principal {
    /// Fills the identity fields of the current request span.
    pub fn record_in_span(&self) {
        let span = tracing::Span::current();
        span.record("user_id", self.id);
        span.record("superuser", self.is_superuser);
    }
}
