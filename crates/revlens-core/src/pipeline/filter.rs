//! Post-aggregation filters.
//!
//! Steps run in a fixed order, each narrowing the running set. Unset options
//! are skipped entirely. Once the set is empty no further step runs.

use tracing::{debug, field, info_span};

use crate::models::{CommentThread, Filter, Item, ListQuery, User};

pub struct FilterPipeline<'a> {
    query: &'a ListQuery,
    me: &'a User,
}

impl<'a> FilterPipeline<'a> {
    pub fn new(query: &'a ListQuery, me: &'a User) -> Self {
        Self { query, me }
    }

    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        let me = self.me;
        let q = self.query;
        let mut items = items;

        if let Some(want) = q.approved_by_me.as_bool() {
            items = step(items, "approved by me", |item| {
                item.approvals.approved_by(me) == want
            });
        }

        if q.without_my_unresolved_threads {
            items = step(items, "without my unresolved threads", |item| {
                !item.threads.iter().any(|t| awaits_my_followup(t, me))
            });
        }

        if let Some(want) = q.satisfies_approval_rules.as_bool() {
            items = step(items, "satisfies approval rules", |item| {
                satisfies_approval_rules(item, me, want)
            });
        }

        items = by_membership(items, "authors", &q.authors, |item| {
            item.author.username.as_str()
        });
        items = by_membership(items, "project paths", &q.project_paths, |item| {
            item.project.full_path.as_str()
        });

        items
    }
}

/// A thread I started, still unresolved, where I also wrote the last comment.
///
/// If someone else answered last the thread is waiting on me, so it does not
/// count.
pub fn awaits_my_followup(thread: &CommentThread, me: &User) -> bool {
    let mine = thread.author().username == me.username;
    let last_mine = thread.last().author.username == me.username;
    mine && !thread.is_resolved() && last_mine
}

/// Whether the item counts as satisfying its approval rules for me.
///
/// The backend's flag is taken as is, except that a review requested from me
/// that I have not given overrides it to "not satisfied": the item still
/// needs my attention however many others approved.
pub fn effectively_satisfied(item: &Item, me: &User) -> bool {
    let waiting_on_me = item.approvals.requested_from(me) && !item.approvals.approved_by(me);
    item.approvals.satisfies_rules && !waiting_on_me
}

pub fn satisfies_approval_rules(item: &Item, me: &User, want: bool) -> bool {
    effectively_satisfied(item, me) == want
}

fn by_membership<F>(items: Vec<Item>, name: &str, filter: &Filter<String>, key: F) -> Vec<Item>
where
    F: Fn(&Item) -> &str,
{
    let mut items = items;

    if !filter.include.is_empty() {
        items = step(items, &format!("{name} include"), |item| {
            filter.include.iter().any(|v| v == key(item))
        });
    }

    if !filter.exclude.is_empty() {
        items = step(items, &format!("{name} exclude"), |item| {
            !filter.exclude.iter().any(|v| v == key(item))
        });
    }

    items
}

fn step<F>(items: Vec<Item>, name: &str, keep: F) -> Vec<Item>
where
    F: Fn(&Item) -> bool,
{
    if items.is_empty() {
        return items;
    }

    let span = info_span!(
        "filter",
        filter = name,
        remaining = field::Empty,
        filtered_urls = field::Empty
    );
    let _guard = span.enter();

    let (kept, dropped): (Vec<Item>, Vec<Item>) = items.into_iter().partition(|item| keep(item));
    let urls: Vec<&str> = dropped.iter().map(|i| i.url.as_str()).collect();

    span.record("remaining", kept.len());
    span.record("filtered_urls", field::debug(&urls));
    if !urls.is_empty() {
        debug!(filter = name, remaining = kept.len(), dropped = ?urls, "filtered items");
    }

    kept
}
