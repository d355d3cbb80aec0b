use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub url: String,
    pub name: String,
    /// Namespace-qualified path, e.g. `group/sub/repo`
    pub full_path: String,
}
