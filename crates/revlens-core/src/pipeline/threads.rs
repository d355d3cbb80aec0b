use std::collections::HashMap;

use tracing::warn;

use crate::models::{CommentThread, Event, EventKind};

/// A reply or resolution that points at a thread with no known root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadDiagnostic {
    pub event_id: String,
    pub kind: EventKind,
    pub object_id: String,
}

impl std::fmt::Display for ThreadDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} event {} references unknown thread {:?}",
            self.kind.label(),
            self.event_id,
            self.object_id
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThreadSet {
    /// One chain per thread root, in order of first appearance
    pub threads: Vec<CommentThread>,
    /// Skipped events; reconstruction continues past them
    pub diagnostics: Vec<ThreadDiagnostic>,
}

/// Rebuild comment chains from a history sorted ascending by timestamp.
pub fn build_threads(history: &[Event]) -> ThreadSet {
    let mut threads: Vec<CommentThread> = Vec::new();
    let mut by_object: HashMap<&str, usize> = HashMap::new();
    let mut diagnostics = Vec::new();

    for event in history {
        match event.kind {
            EventKind::Commented => {
                let thread = CommentThread::new(
                    event.object_id.clone(),
                    event.actor.clone(),
                    event.timestamp,
                );
                // a second root on the same position starts that thread over
                match by_object.get(event.object_id.as_str()) {
                    Some(&idx) => threads[idx] = thread,
                    None => {
                        by_object.insert(event.object_id.as_str(), threads.len());
                        threads.push(thread);
                    }
                }
            }
            EventKind::Replied | EventKind::ThreadResolved => {
                let Some(&idx) = by_object.get(event.object_id.as_str()) else {
                    let diagnostic = ThreadDiagnostic {
                        event_id: event.id.clone(),
                        kind: event.kind,
                        object_id: event.object_id.clone(),
                    };
                    warn!("{diagnostic}");
                    diagnostics.push(diagnostic);
                    continue;
                };

                if event.kind == EventKind::Replied {
                    threads[idx].push_reply(event.actor.clone(), event.timestamp);
                } else {
                    threads[idx].resolve();
                }
            }
            EventKind::Approved | EventKind::Unapproved => {}
        }
    }

    ThreadSet {
        threads,
        diagnostics,
    }
}
