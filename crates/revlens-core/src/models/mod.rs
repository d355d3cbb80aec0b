pub mod comment;
pub mod event;
pub mod item;
pub mod project;
pub mod query;
pub mod user;

pub use comment::{Comment, CommentThread};
pub use event::{Event, EventKind, ObjectType};
pub use item::{ApprovalSummary, Item, ItemRef, ItemState};
pub use project::Project;
pub use query::{Filter, ListItemsRequest, ListQuery, Pagination, Sort, SortBy, SortOrder, TriState};
pub use user::{User, SYSTEM_USER};
