//! Activity event assembly.
//!
//! Turns the unordered notes of one item into a deduplicated event log sorted
//! ascending by timestamp.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::guarded;
use crate::constants::{APPROVED_PHRASE, RESOLVED_ID_SUFFIX, UNAPPROVED_PHRASE};
use crate::error::ReviewError;
use crate::models::{Event, EventKind, ItemRef, ObjectType, User};
use crate::source::{ActivityRecord, ActivitySource};

/// What a raw record turns into, before thread bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Approval or unapproval system note
    Approval(EventKind),
    /// Note in a resolvable discussion
    Thread,
    /// Anything else (plain system notes, non-review comments)
    Discard,
}

/// Classify a record by its body and discussion flags.
///
/// GitLab's phrasing is an external contract; this is the only place that
/// depends on it. The unapproved phrase contains the approved one, so it is
/// checked first.
pub fn classify(record: &ActivityRecord) -> Classification {
    if record.body.contains(UNAPPROVED_PHRASE) {
        return Classification::Approval(EventKind::Unapproved);
    }
    if record.body.contains(APPROVED_PHRASE) {
        return Classification::Approval(EventKind::Approved);
    }
    if record.resolvable {
        return Classification::Thread;
    }
    Classification::Discard
}

/// Position key of the thread a record belongs to: `path:line`, or empty when
/// the note is not attached to a file line.
pub fn position_key(record: &ActivityRecord) -> String {
    match &record.position {
        Some(pos) => format!("{}:{}", pos.new_path, pos.new_line),
        None => String::new(),
    }
}

fn actor_of(record: &ActivityRecord) -> User {
    if record.system {
        User::system()
    } else {
        record.author.clone()
    }
}

/// Events produced by one record. Empty means the record was discarded.
///
/// `roots` holds the position keys already seen as thread roots.
fn transform_record(roots: &HashSet<String>, record: &ActivityRecord) -> Vec<Event> {
    let id = record.id.to_string();
    let actor = actor_of(record);

    let kind = match classify(record) {
        Classification::Approval(kind) => {
            return vec![Event {
                id,
                actor,
                timestamp: record.created_at,
                kind,
                object_id: String::new(),
                object_type: None,
            }];
        }
        Classification::Discard => return Vec::new(),
        Classification::Thread => EventKind::Commented,
    };

    let object_id = position_key(record);
    let kind = if roots.contains(&object_id) {
        EventKind::Replied
    } else {
        kind
    };

    let mut events = vec![Event {
        id: id.clone(),
        actor,
        timestamp: record.created_at,
        kind,
        object_id: object_id.clone(),
        object_type: Some(ObjectType::Comment),
    }];

    if record.resolved {
        events.push(Event {
            id: format!("{id}{RESOLVED_ID_SUFFIX}"),
            actor: record
                .resolved_by
                .clone()
                .unwrap_or_else(|| actor_of(record)),
            timestamp: record.resolved_at.unwrap_or(record.created_at),
            kind: EventKind::ThreadResolved,
            object_id,
            object_type: Some(ObjectType::Comment),
        });
    }

    events
}

/// Build the ordered, deduplicated event log from raw records.
pub fn assemble_history(mut records: Vec<ActivityRecord>) -> Vec<Event> {
    // the backend does not guarantee order; ids break timestamp ties
    records.sort_by_key(|r| (r.created_at, r.id));

    let mut roots: HashSet<String> = HashSet::new();
    let mut seen: HashSet<Event> = HashSet::new();
    let mut events: Vec<Event> = Vec::new();
    let mut discarded = 0usize;

    for record in &records {
        let produced = transform_record(&roots, record);
        if produced.is_empty() {
            discarded += 1;
            continue;
        }

        for event in produced {
            if event.kind == EventKind::Commented {
                roots.insert(event.object_id.clone());
            }
            if seen.insert(event.clone()) {
                events.push(event);
            }
        }
    }

    // stable: ties keep production order, so a root stays ahead of its
    // same-instant replies and resolution
    events.sort_by_key(|e| e.timestamp);

    debug!(
        records = records.len(),
        events = events.len(),
        discarded,
        "assembled history"
    );

    events
}

/// Fetch the item's notes and assemble its history.
#[instrument(skip(source, cancel), fields(item = %item))]
pub async fn load_history<S>(
    source: &S,
    item: ItemRef,
    cancel: &CancellationToken,
) -> Result<Vec<Event>, ReviewError>
where
    S: ActivitySource + ?Sized,
{
    let records = guarded(
        cancel,
        format!("list notes of {item}"),
        source.list_activity_records(item),
    )
    .await?;

    Ok(assemble_history(records))
}
