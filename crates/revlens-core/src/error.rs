/// Errors that can occur while listing and assembling review items.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// A call to the activity source failed.
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: anyhow::Error,
    },
    /// A page of an unbounded scan failed.
    #[error("at page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: Box<ReviewError>,
    },
    /// Assembling one item failed; the whole list fails with it.
    #[error("load item {url}: {source}")]
    Item {
        url: String,
        #[source]
        source: Box<ReviewError>,
    },
    #[error("invalid query: {0}")]
    Validation(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("operation cancelled")]
    Cancelled,
}

impl ReviewError {
    pub fn transport(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// True if this error, or the error it wraps, is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Page { source, .. } | Self::Item { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Page number of the failed page, if this failure came from a paginated scan.
    pub fn failed_page(&self) -> Option<u32> {
        match self {
            Self::Page { page, .. } => Some(*page),
            Self::Item { source, .. } => source.failed_page(),
            _ => None,
        }
    }
}
