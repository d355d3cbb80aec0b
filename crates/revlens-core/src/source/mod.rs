//! Activity source: the remote code-review API the pipeline reads from.
//!
//! The pipeline only sees the raw shapes below. Implementations translate
//! their wire format into them and report failures as `anyhow` errors, which
//! the pipeline wraps with the identifying context (item, page, project).

pub mod gitlab;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{ItemRef, ListItemsRequest, Project, User};

pub use gitlab::GitLabSource;

/// Read-only operations the pipeline consumes.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// One page of items matching the server-side criteria.
    async fn list_items(&self, req: &ListItemsRequest) -> anyhow::Result<Vec<RawItem>>;

    async fn get_approvals(&self, item: ItemRef) -> anyhow::Result<ApprovalState>;

    /// Every note on the item, in no particular order.
    async fn list_activity_records(&self, item: ItemRef) -> anyhow::Result<Vec<ActivityRecord>>;

    async fn get_project(&self, project_id: u64) -> anyhow::Result<Project>;

    async fn get_current_user(&self) -> anyhow::Result<User>;
}

/// A merge request as listed by the backend, before aggregation.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub project_id: u64,
    pub number: u64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub author: User,
    /// May contain comma-joined entries
    pub labels: Vec<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub assignees: Vec<User>,
    pub reviewers: Vec<User>,
    /// Backend state string (`opened`, `closed`, `merged`, `locked`)
    pub state: String,
    pub draft: bool,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl RawItem {
    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            project_id: self.project_id,
            number: self.number,
        }
    }
}

/// Approval state for one item as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalState {
    pub approved_by: Vec<User>,
    /// Whether the approval rules are satisfied
    pub approved: bool,
    pub approvals_required: u32,
}

/// File position a review note is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePosition {
    pub new_path: String,
    pub new_line: u32,
}

/// A note, comment, or system message on an item.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub id: u64,
    pub body: String,
    pub author: User,
    pub created_at: DateTime<Utc>,
    /// Written by the platform rather than a person
    pub system: bool,
    /// Part of a resolvable discussion
    pub resolvable: bool,
    pub resolved: bool,
    pub resolved_by: Option<User>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub position: Option<NotePosition>,
}
