use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::comment::CommentThread;
use super::event::Event;
use super::project::Project;
use super::user::User;

/// Lifecycle state of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Draft,
    Open,
    Closed,
    Merged,
}

impl ItemState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "merged" => Some(Self::Merged),
            _ => None,
        }
    }
}

/// Address of one item in the backend: project id plus project-scoped number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub project_id: u64,
    pub number: u64,
}

impl std::fmt::Display for ItemRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}", self.project_id, self.number)
    }
}

/// Approval state as reported by the backend. Policy is never recomputed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalSummary {
    /// Reviewers whose approval was requested
    pub requested_from: Vec<User>,
    /// Users who approved
    pub by: Vec<User>,
    pub satisfies_rules: bool,
    pub required: u32,
}

impl ApprovalSummary {
    pub fn approved_by(&self, user: &User) -> bool {
        self.by.iter().any(|u| u.username == user.username)
    }

    pub fn requested_from(&self, user: &User) -> bool {
        self.requested_from
            .iter()
            .any(|u| u.username == user.username)
    }
}

/// A fully assembled merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub url: String,
    pub number: u64,
    pub project: Project,
    pub title: String,
    pub body: String,
    pub author: User,
    pub labels: Vec<String>,
    pub source_branch: String,
    pub target_branch: String,
    pub assignees: Vec<User>,
    pub approvals: ApprovalSummary,
    /// Events ascending by timestamp
    pub history: Vec<Event>,
    pub threads: Vec<CommentThread>,
    pub state: ItemState,
    pub created_at: DateTime<Utc>,
    /// Merge time for merged items, close time for closed ones
    pub closed_at: Option<DateTime<Utc>>,
}
