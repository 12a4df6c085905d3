//! Default User-Agent string for outbound requests.
//!
//! Single source for the UA format so downloads and queries identify the
//! tool the same way.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/fetchkit";

/// Default User-Agent for downloads and queries.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fetchkit/{version} (+{PROJECT_UA_URL})")
}
