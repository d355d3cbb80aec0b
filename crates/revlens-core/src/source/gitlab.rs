//! GitLab REST (v4) implementation of `ActivitySource`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{ActivityRecord, ActivitySource, ApprovalState, NotePosition, RawItem};
use crate::config::CoreConfig;
use crate::constants::{FIRST_PAGE, UNBOUNDED_PAGE_SIZE};
use crate::error::ReviewError;
use crate::models::{ItemRef, ItemState, ListItemsRequest, Project, User};
use crate::pipeline::list_all;

const API_PREFIX: &str = "/api/v4";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

#[derive(Debug, Deserialize)]
struct UserDto {
    username: String,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        User::new(dto.username)
    }
}

#[derive(Debug, Deserialize)]
struct MergeRequestDto {
    iid: u64,
    project_id: u64,
    web_url: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    author: UserDto,
    #[serde(default)]
    labels: Vec<String>,
    source_branch: String,
    target_branch: String,
    #[serde(default)]
    assignees: Vec<UserDto>,
    #[serde(default)]
    reviewers: Vec<UserDto>,
    state: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    work_in_progress: bool,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
}

impl From<MergeRequestDto> for RawItem {
    fn from(mr: MergeRequestDto) -> Self {
        RawItem {
            project_id: mr.project_id,
            number: mr.iid,
            url: mr.web_url,
            title: mr.title,
            description: mr.description.unwrap_or_default(),
            author: mr.author.into(),
            labels: mr.labels,
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            assignees: mr.assignees.into_iter().map(User::from).collect(),
            reviewers: mr.reviewers.into_iter().map(User::from).collect(),
            state: mr.state,
            draft: mr.draft || mr.work_in_progress,
            created_at: mr.created_at,
            closed_at: mr.closed_at,
            merged_at: mr.merged_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApproverDto {
    user: UserDto,
}

#[derive(Debug, Deserialize)]
struct ApprovalsDto {
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    approvals_required: u32,
    #[serde(default)]
    approved_by: Vec<ApproverDto>,
}

impl From<ApprovalsDto> for ApprovalState {
    fn from(dto: ApprovalsDto) -> Self {
        ApprovalState {
            approved_by: dto.approved_by.into_iter().map(|a| a.user.into()).collect(),
            approved: dto.approved,
            approvals_required: dto.approvals_required,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PositionDto {
    #[serde(default)]
    new_path: Option<String>,
    /// Null for notes on removed lines
    #[serde(default)]
    new_line: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct NoteDto {
    id: u64,
    #[serde(default)]
    body: String,
    author: UserDto,
    created_at: DateTime<Utc>,
    #[serde(default)]
    system: bool,
    #[serde(default)]
    resolvable: bool,
    #[serde(default)]
    resolved: bool,
    #[serde(default)]
    resolved_by: Option<UserDto>,
    #[serde(default)]
    resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    position: Option<PositionDto>,
}

impl From<NoteDto> for ActivityRecord {
    fn from(note: NoteDto) -> Self {
        ActivityRecord {
            id: note.id,
            body: note.body,
            author: note.author.into(),
            created_at: note.created_at,
            system: note.system,
            resolvable: note.resolvable,
            resolved: note.resolved,
            resolved_by: note.resolved_by.map(User::from),
            resolved_at: note.resolved_at,
            position: note.position.map(|p| NotePosition {
                new_path: p.new_path.unwrap_or_default(),
                new_line: p.new_line.unwrap_or_default(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectDto {
    id: u64,
    web_url: String,
    name: String,
    path_with_namespace: String,
}

impl From<ProjectDto> for Project {
    fn from(dto: ProjectDto) -> Self {
        Project {
            id: dto.id.to_string(),
            url: dto.web_url,
            name: dto.name,
            full_path: dto.path_with_namespace,
        }
    }
}

/// Query parameters for the global merge request listing.
///
/// Drafts are only listed when asked for by state.
fn list_params(req: &ListItemsRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![("scope", "all".to_string())];

    if !req.labels.include.is_empty() {
        params.push(("labels", req.labels.include.join(",")));
    }
    if !req.labels.exclude.is_empty() {
        params.push(("not[labels]", req.labels.exclude.join(",")));
    }
    if let Some(by) = req.sort.by {
        params.push(("order_by", by.as_str().to_string()));
    }
    if let Some(order) = req.sort.order {
        params.push(("sort", order.as_str().to_string()));
    }

    match req.state {
        Some(ItemState::Draft) => params.push(("wip", "yes".to_string())),
        state => {
            params.push(("wip", "no".to_string()));
            let wire = match state {
                Some(ItemState::Open) => Some("opened"),
                Some(ItemState::Closed) => Some("closed"),
                Some(ItemState::Merged) => Some("merged"),
                _ => None,
            };
            if let Some(wire) = wire {
                params.push(("state", wire.to_string()));
            }
        }
    }

    if req.pagination.page != 0 {
        params.push(("page", req.pagination.page.to_string()));
    }
    if req.pagination.per_page != 0 {
        params.push(("per_page", req.pagination.per_page.to_string()));
    }

    params
}

/// GitLab client authenticated with a personal access token.
pub struct GitLabSource {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl GitLabSource {
    pub fn new(config: &CoreConfig) -> Result<Self, ReviewError> {
        let base = config.base_url.trim_end_matches('/');
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ReviewError::Configuration(format!(
                "gitlab base url must be http(s), got {:?}",
                config.base_url
            )));
        }
        if config.token.is_empty() {
            return Err(ReviewError::Configuration(
                "gitlab token is empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ReviewError::Configuration(format!("build http client: {e}")))?;

        Ok(Self {
            api_base: format!("{base}{API_PREFIX}"),
            token: config.token.clone(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.api_base, path);
        debug!(%url, "gitlab request");

        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {path}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("GitLab API error ({}): {}", status, error_text);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response from {path}"))?;

        serde_json::from_str(&body).with_context(|| format!("Failed to parse response from {path}"))
    }
}

#[async_trait]
impl ActivitySource for GitLabSource {
    async fn list_items(&self, req: &ListItemsRequest) -> Result<Vec<RawItem>> {
        let mrs: Vec<MergeRequestDto> = self.get_json("/merge_requests", &list_params(req)).await?;
        Ok(mrs.into_iter().map(RawItem::from).collect())
    }

    async fn get_approvals(&self, item: ItemRef) -> Result<ApprovalState> {
        let path = format!(
            "/projects/{}/merge_requests/{}/approvals",
            item.project_id, item.number
        );
        let approvals: ApprovalsDto = self.get_json(&path, &[]).await?;
        Ok(approvals.into())
    }

    async fn list_activity_records(&self, item: ItemRef) -> Result<Vec<ActivityRecord>> {
        let path = format!(
            "/projects/{}/merge_requests/{}/notes",
            item.project_id, item.number
        );
        let path = &path;

        let notes: Vec<NoteDto> = list_all(FIRST_PAGE, |page| async move {
            let params = [
                ("page", page.to_string()),
                ("per_page", UNBOUNDED_PAGE_SIZE.to_string()),
            ];
            self.get_json::<Vec<NoteDto>>(path, &params)
                .await
                .map_err(|e| ReviewError::transport(format!("notes page {page}"), e))
        })
        .await?;

        Ok(notes.into_iter().map(ActivityRecord::from).collect())
    }

    async fn get_project(&self, project_id: u64) -> Result<Project> {
        let project: ProjectDto = self.get_json(&format!("/projects/{project_id}"), &[]).await?;
        Ok(project.into())
    }

    async fn get_current_user(&self) -> Result<User> {
        let user: UserDto = self.get_json("/user", &[]).await?;
        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Filter, Pagination, Sort, SortBy, SortOrder};

    fn param<'a>(params: &'a [(&str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_list_params_open_with_labels() {
        let req = ListItemsRequest {
            state: Some(ItemState::Open),
            labels: Filter {
                include: vec!["bug".to_string(), "backend".to_string()],
                exclude: vec!["wontfix".to_string()],
            },
            sort: Sort {
                by: Some(SortBy::UpdatedAt),
                order: Some(SortOrder::Desc),
            },
            pagination: Pagination::new(2, 20),
        };

        let params = list_params(&req);

        assert_eq!(param(&params, "scope"), Some("all"));
        assert_eq!(param(&params, "state"), Some("opened"));
        assert_eq!(param(&params, "wip"), Some("no"));
        assert_eq!(param(&params, "labels"), Some("bug,backend"));
        assert_eq!(param(&params, "not[labels]"), Some("wontfix"));
        assert_eq!(param(&params, "order_by"), Some("updated_at"));
        assert_eq!(param(&params, "sort"), Some("desc"));
        assert_eq!(param(&params, "page"), Some("2"));
        assert_eq!(param(&params, "per_page"), Some("20"));
    }

    #[test]
    fn test_list_params_draft_has_no_state() {
        let req = ListItemsRequest {
            state: Some(ItemState::Draft),
            ..Default::default()
        };

        let params = list_params(&req);

        assert_eq!(param(&params, "wip"), Some("yes"));
        assert_eq!(param(&params, "state"), None);
        assert_eq!(param(&params, "labels"), None);
        assert_eq!(param(&params, "page"), None);
    }

    #[test]
    fn test_merge_request_parsed() {
        let json = r#"{
            "iid": 12,
            "project_id": 3,
            "web_url": "https://gitlab.example/team/api/-/merge_requests/12",
            "title": "Add retries",
            "description": null,
            "author": {"id": 1, "username": "alice"},
            "labels": ["bug,backend"],
            "source_branch": "retries",
            "target_branch": "main",
            "assignees": [{"username": "bob"}],
            "reviewers": [{"username": "carol"}],
            "state": "merged",
            "draft": false,
            "work_in_progress": false,
            "created_at": "2024-03-01T10:00:00Z",
            "closed_at": null,
            "merged_at": "2024-03-02T10:00:00.000Z"
        }"#;

        let mr: MergeRequestDto = serde_json::from_str(json).unwrap();
        let raw = RawItem::from(mr);

        assert_eq!(raw.item_ref(), ItemRef { project_id: 3, number: 12 });
        assert_eq!(raw.author.username, "alice");
        assert_eq!(raw.reviewers[0].username, "carol");
        assert!(raw.description.is_empty());
        assert!(raw.merged_at.is_some());
        assert_eq!(raw.labels, vec!["bug,backend"]);
    }

    #[test]
    fn test_note_with_removed_line_position() {
        let json = r#"{
            "id": 99,
            "body": "nit",
            "author": {"username": "bob"},
            "created_at": "2024-03-01T10:00:00Z",
            "system": false,
            "resolvable": true,
            "resolved": true,
            "resolved_by": {"username": "alice"},
            "resolved_at": "2024-03-01T11:00:00Z",
            "position": {"new_path": "a.go", "new_line": null, "old_line": 7}
        }"#;

        let note: NoteDto = serde_json::from_str(json).unwrap();
        let record = ActivityRecord::from(note);

        let position = record.position.unwrap();
        assert_eq!(position.new_path, "a.go");
        assert_eq!(position.new_line, 0);
        assert_eq!(record.resolved_by.unwrap().username, "alice");
    }

    #[test]
    fn test_approvals_parsed() {
        let json = r#"{
            "approved": true,
            "approvals_required": 2,
            "approved_by": [{"user": {"username": "carol"}}]
        }"#;

        let approvals: ApprovalsDto = serde_json::from_str(json).unwrap();
        let state = ApprovalState::from(approvals);

        assert!(state.approved);
        assert_eq!(state.approvals_required, 2);
        assert_eq!(state.approved_by, vec![User::new("carol")]);
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = CoreConfig::new("gitlab.example", "glpat-123");
        let err = GitLabSource::new(&config).err().unwrap();
        assert!(matches!(err, ReviewError::Configuration(_)));

        let config = CoreConfig::new("https://gitlab.example/", "glpat-123");
        let source = GitLabSource::new(&config).unwrap();
        assert_eq!(source.api_base, "https://gitlab.example/api/v4");
    }
}
