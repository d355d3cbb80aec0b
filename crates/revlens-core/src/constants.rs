//! Application-wide constants
//!
//! Tunables and external-contract strings shared by the pipeline and the
//! GitLab source.

use std::time::Duration;

/// Page size used when the caller asks for every item (no explicit pagination)
pub const UNBOUNDED_PAGE_SIZE: u32 = 100;

/// First page number of the backend's 1-based pagination
pub const FIRST_PAGE: u32 = 1;

// Project cache
pub const PROJECT_CACHE_TTL: Duration = Duration::from_secs(60 * 60); // 1 hour
pub const PROJECT_CACHE_CAPACITY: usize = 100;

/// Username of the distinguished actor for platform-authored notes
pub const SYSTEM_USERNAME: &str = "system";

/// Suffix appended to a note's event id to form its resolution companion
pub const RESOLVED_ID_SUFFIX: &str = "!resolved";

// Phrases GitLab writes into system notes. These are an external contract:
// if GitLab changes its wording, only `pipeline::history::classify` and these
// constants need to change.
pub const APPROVED_PHRASE: &str = "approved this merge request";
pub const UNAPPROVED_PHRASE: &str = "unapproved this merge request";

/// `service.name` reported with exported spans
pub const SERVICE_NAME: &str = "revlens";

/// Default request timeout for the GitLab HTTP client
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// Environment variables read by `CoreConfig::from_env` and `tracing_setup`
pub mod env {
    pub const BASE_URL: &str = "REVLENS_GITLAB_BASE_URL";
    pub const TOKEN: &str = "REVLENS_GITLAB_TOKEN";
    pub const PER_PAGE: &str = "REVLENS_PER_PAGE";
    pub const REQUEST_TIMEOUT_SECS: &str = "REVLENS_REQUEST_TIMEOUT_SECS";
    pub const LOG: &str = "REVLENS_LOG";
    pub const LOG_FILE: &str = "REVLENS_LOG_FILE";
    /// Full OTLP/HTTP traces URL, e.g. `http://localhost:4318/v1/traces`
    pub const OTLP_ENDPOINT: &str = "REVLENS_OTLP_ENDPOINT";
}
