//! The User-Agent string sent with every repository request.

/// Project URL for User-Agent identification (RFC 9308 good citizenship).
const PROJECT_UA_URL: &str = "https://github.com/fierce/plugin-mirror";

/// Default User-Agent (identifies the tool and its version).
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("plugin-mirror/{version} (repository-mirror; +{PROJECT_UA_URL})")
}
