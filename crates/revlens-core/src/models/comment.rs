use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

/// One node of a review thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: User,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
}

/// A chain of comments anchored to one review position.
///
/// The chain is stored as an ordered sequence: `comments[0]` is the root and
/// the reply following `comments[i]` is `comments[i + 1]`. The sequence is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    /// Position key (`path:line`) the thread is anchored to
    pub object_id: String,
    comments: Vec<Comment>,
}

impl CommentThread {
    pub fn new(object_id: impl Into<String>, author: User, created_at: DateTime<Utc>) -> Self {
        Self {
            object_id: object_id.into(),
            comments: vec![Comment {
                author,
                created_at,
                resolved: false,
            }],
        }
    }

    pub fn root(&self) -> &Comment {
        &self.comments[0]
    }

    /// Last comment in the chain (the root if there are no replies).
    pub fn last(&self) -> &Comment {
        &self.comments[self.comments.len() - 1]
    }

    /// The reply following the comment at `index`, if any.
    pub fn next(&self, index: usize) -> Option<&Comment> {
        self.comments.get(index + 1)
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn replies(&self) -> &[Comment] {
        &self.comments[1..]
    }

    pub fn author(&self) -> &User {
        &self.root().author
    }

    /// A thread counts as resolved when its root is resolved.
    pub fn is_resolved(&self) -> bool {
        self.root().resolved
    }

    pub(crate) fn push_reply(&mut self, author: User, created_at: DateTime<Utc>) {
        self.comments.push(Comment {
            author,
            created_at,
            resolved: false,
        });
    }

    /// Mark every node from root through tail resolved.
    pub(crate) fn resolve(&mut self) {
        for comment in &mut self.comments {
            comment.resolved = true;
        }
    }
}
