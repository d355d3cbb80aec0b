//! Shared fixtures for unit tests: an in-memory activity source and builders
//! for raw records, items, and threads.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::models::{
    ApprovalSummary, CommentThread, Item, ItemRef, ItemState, ListItemsRequest, Project, User,
};
use crate::source::{ActivityRecord, ActivitySource, ApprovalState, NotePosition, RawItem};

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A resolvable review note, optionally anchored to `(path, line)`.
pub fn note(id: u64, author: &str, secs: i64, position: Option<(&str, u32)>) -> ActivityRecord {
    ActivityRecord {
        id,
        body: format!("note {id}"),
        author: User::new(author),
        created_at: at(secs),
        system: false,
        resolvable: true,
        resolved: false,
        resolved_by: None,
        resolved_at: None,
        position: position.map(|(path, line)| NotePosition {
            new_path: path.to_string(),
            new_line: line,
        }),
    }
}

pub fn resolved(mut record: ActivityRecord, resolver: &str, secs: i64) -> ActivityRecord {
    record.resolved = true;
    record.resolved_by = Some(User::new(resolver));
    record.resolved_at = Some(at(secs));
    record
}

pub fn system_note(id: u64, author: &str, secs: i64, body: &str) -> ActivityRecord {
    ActivityRecord {
        id,
        body: body.to_string(),
        author: User::new(author),
        created_at: at(secs),
        system: true,
        resolvable: false,
        resolved: false,
        resolved_by: None,
        resolved_at: None,
        position: None,
    }
}

pub fn raw_item(project_id: u64, number: u64, author: &str) -> RawItem {
    RawItem {
        project_id,
        number,
        url: format!("https://gitlab.example/group/p{project_id}/-/merge_requests/{number}"),
        title: format!("change {number}"),
        description: String::new(),
        author: User::new(author),
        labels: Vec::new(),
        source_branch: format!("feature-{number}"),
        target_branch: "main".to_string(),
        assignees: Vec::new(),
        reviewers: Vec::new(),
        state: "opened".to_string(),
        draft: false,
        created_at: at(0),
        closed_at: None,
        merged_at: None,
    }
}

/// An assembled item with no history; `url` doubles as its identity in asserts.
pub fn item(url: &str, author: &str) -> Item {
    Item {
        url: url.to_string(),
        number: 1,
        project: Project::default(),
        title: String::new(),
        body: String::new(),
        author: User::new(author),
        labels: Vec::new(),
        source_branch: String::new(),
        target_branch: String::new(),
        assignees: Vec::new(),
        approvals: ApprovalSummary::default(),
        history: Vec::new(),
        threads: Vec::new(),
        state: ItemState::Open,
        created_at: at(0),
        closed_at: None,
    }
}

/// A thread whose first entry is the root and the rest its replies in order.
pub fn thread(comments: &[(&str, i64)], resolved: bool) -> CommentThread {
    let (root_author, root_secs) = comments[0];
    let mut thread = CommentThread::new("a.go:1", User::new(root_author), at(root_secs));
    for &(author, secs) in &comments[1..] {
        thread.push_reply(User::new(author), at(secs));
    }
    if resolved {
        thread.resolve();
    }
    thread
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListItems,
    GetApprovals,
    ListNotes,
    GetProject,
    CurrentUser,
}

/// In-memory source. Pages are 1-based; pages past the configured ones are
/// empty.
pub struct FakeSource {
    me: User,
    pages: Vec<Vec<RawItem>>,
    notes: HashMap<ItemRef, Vec<ActivityRecord>>,
    approvals: HashMap<ItemRef, ApprovalState>,
    /// `(op, key)` pairs that fail: page for listing, number for per-item
    /// calls, project id for project lookups
    failures: HashSet<(Op, u64)>,
    delay: Option<Duration>,
    op_delays: HashMap<Op, Duration>,
    calls: Mutex<HashMap<Op, usize>>,
    /// Calls that got past their delay
    completed: Mutex<HashMap<Op, usize>>,
    page_sizes: Mutex<Vec<u32>>,
}

impl FakeSource {
    pub fn new(me: &str) -> Self {
        Self {
            me: User::new(me),
            pages: Vec::new(),
            notes: HashMap::new(),
            approvals: HashMap::new(),
            failures: HashSet::new(),
            delay: None,
            op_delays: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            completed: Mutex::new(HashMap::new()),
            page_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pages(mut self, pages: Vec<Vec<RawItem>>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_notes(mut self, project_id: u64, number: u64, notes: Vec<ActivityRecord>) -> Self {
        self.notes.insert(ItemRef { project_id, number }, notes);
        self
    }

    pub fn with_approvals(
        mut self,
        project_id: u64,
        number: u64,
        approved_by: &[&str],
        approved: bool,
        required: u32,
    ) -> Self {
        self.approvals.insert(
            ItemRef { project_id, number },
            ApprovalState {
                approved_by: approved_by.iter().map(|u| User::new(*u)).collect(),
                approved,
                approvals_required: required,
            },
        );
        self
    }

    pub fn failing(mut self, op: Op, key: u64) -> Self {
        self.failures.insert((op, key));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay for one operation only; takes precedence over `with_delay`.
    pub fn with_op_delay(mut self, op: Op, delay: Duration) -> Self {
        self.op_delays.insert(op, delay);
        self
    }

    pub fn calls(&self, op: Op) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn completed(&self, op: Op) -> usize {
        self.completed.lock().get(&op).copied().unwrap_or(0)
    }

    pub fn seen_page_sizes(&self) -> Vec<u32> {
        self.page_sizes.lock().clone()
    }

    async fn enter(&self, op: Op, key: u64) -> anyhow::Result<()> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        if let Some(delay) = self.op_delays.get(&op).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        *self.completed.lock().entry(op).or_insert(0) += 1;
        if self.failures.contains(&(op, key)) {
            return Err(anyhow!("{op:?} {key} failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivitySource for FakeSource {
    async fn list_items(&self, req: &ListItemsRequest) -> anyhow::Result<Vec<RawItem>> {
        let page = req.pagination.page;
        self.page_sizes.lock().push(req.pagination.per_page);
        self.enter(Op::ListItems, u64::from(page)).await?;

        let index = (page as usize).saturating_sub(1);
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn get_approvals(&self, item: ItemRef) -> anyhow::Result<ApprovalState> {
        self.enter(Op::GetApprovals, item.number).await?;
        Ok(self.approvals.get(&item).cloned().unwrap_or_default())
    }

    async fn list_activity_records(&self, item: ItemRef) -> anyhow::Result<Vec<ActivityRecord>> {
        self.enter(Op::ListNotes, item.number).await?;
        Ok(self.notes.get(&item).cloned().unwrap_or_default())
    }

    async fn get_project(&self, project_id: u64) -> anyhow::Result<Project> {
        self.enter(Op::GetProject, project_id).await?;
        Ok(Project {
            id: project_id.to_string(),
            url: format!("https://gitlab.example/group/p{project_id}"),
            name: format!("p{project_id}"),
            full_path: format!("group/p{project_id}"),
        })
    }

    async fn get_current_user(&self) -> anyhow::Result<User> {
        self.enter(Op::CurrentUser, 0).await?;
        Ok(self.me.clone())
    }
}
