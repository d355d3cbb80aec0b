use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

/// A normalized fact about an item, derived from one raw activity record.
///
/// Equality covers every field; two records that normalize to the same event
/// collapse into one when the history is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub actor: User,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// Position key (`path:line`) for comment events, empty otherwise
    pub object_id: String,
    pub object_type: Option<ObjectType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// New thread root
    Commented,
    /// Continuation of a thread whose root was already seen
    Replied,
    ThreadResolved,
    Approved,
    Unapproved,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Commented => "commented",
            Self::Replied => "replied",
            Self::ThreadResolved => "resolved",
            Self::Approved => "approved",
            Self::Unapproved => "unapproved",
        }
    }

    pub fn is_thread_event(&self) -> bool {
        matches!(self, Self::Commented | Self::Replied | Self::ThreadResolved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Comment,
}
