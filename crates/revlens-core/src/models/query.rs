use serde::{Deserialize, Serialize};

use super::item::ItemState;

/// Three-valued filter option: unset means "do not filter on this".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriState {
    #[default]
    Unset,
    True,
    False,
}

impl TriState {
    /// Parse a command-line style value: "true", "false", or anything else as unset.
    pub fn from_flag(value: &str) -> Self {
        match value {
            "true" => Self::True,
            "false" => Self::False,
            _ => Self::Unset,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::True => Some(true),
            Self::False => Some(false),
        }
    }

    /// Flip true and false; unset stays unset.
    pub fn negate(self) -> Self {
        match self {
            Self::Unset => Self::Unset,
            Self::True => Self::False,
            Self::False => Self::True,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

/// Include/exclude lists for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter<T> {
    pub include: Vec<T>,
    pub exclude: Vec<T>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl<T> Filter<T> {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    CreatedAt,
    UpdatedAt,
    Title,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// None leaves ordering to the backend
    pub by: Option<SortBy>,
    pub order: Option<SortOrder>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Both bounds given: fetch exactly this page instead of scanning everything.
    pub fn is_explicit(&self) -> bool {
        self.page != 0 && self.per_page != 0
    }
}

/// Criteria the backend can apply server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemsRequest {
    pub state: Option<ItemState>,
    pub labels: Filter<String>,
    pub sort: Sort,
    pub pagination: Pagination,
}

/// Full query: backend criteria plus filters applied after aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub backend: ListItemsRequest,
    pub approved_by_me: TriState,
    /// Hide items where I own an unresolved thread and spoke last
    pub without_my_unresolved_threads: bool,
    pub satisfies_approval_rules: TriState,
    pub authors: Filter<String>,
    pub project_paths: Filter<String>,
}

impl ListQuery {
    /// Reject queries that would scan every merge request visible to the token.
    ///
    /// At least one filter the backend can reduce on (state, labels, authors)
    /// or explicit pagination has to be present.
    pub fn validate(&self) -> Result<(), String> {
        let filters = [
            ("state", self.backend.state.is_some()),
            ("labels", !self.backend.labels.is_empty()),
            ("authors", !self.authors.is_empty()),
            ("pagination", self.backend.pagination.is_explicit()),
        ];

        if filters.iter().any(|(_, present)| *present) {
            return Ok(());
        }

        let names: Vec<&str> = filters.iter().map(|(name, _)| *name).collect();
        Err(format!(
            "at least one backend-side filter must be present, available filters: {}",
            names.join(", ")
        ))
    }
}
