//! Local copy of the validated set, used to turn cache updates into changes.

use std::collections::BTreeSet;

use crate::event::{Action, RouteOrigin, ValidationEvent};

/// Route origins currently announced to the sink.
#[derive(Debug, Default)]
pub struct PrefixTable {
    entries: BTreeSet<RouteOrigin>,
}

impl PrefixTable {
    /// Number of records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no record is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies one incremental change, returning it if the table changed.
    ///
    /// Duplicate announcements and withdrawals of unknown records yield `None`.
    pub fn apply(&mut self, action: Action, origin: RouteOrigin) -> Option<ValidationEvent> {
        let changed = match action {
            Action::Announce => self.entries.insert(origin),
            Action::Withdraw => self.entries.remove(&origin),
        };
        changed.then_some(ValidationEvent { origin, action })
    }

    /// Replaces the table with a full snapshot.
    ///
    /// Returns withdrawals for records missing from the snapshot, then
    /// announcements for new records in snapshot order.
    pub fn replace(&mut self, snapshot: &[RouteOrigin]) -> Vec<ValidationEvent> {
        let incoming: BTreeSet<RouteOrigin> = snapshot.iter().copied().collect();
        let mut changes: Vec<ValidationEvent> = self
            .entries
            .difference(&incoming)
            .copied()
            .map(ValidationEvent::withdraw)
            .collect();
        let mut announced = BTreeSet::new();
        changes.extend(
            snapshot
                .iter()
                .copied()
                .filter(|origin| !self.entries.contains(origin) && announced.insert(*origin))
                .map(ValidationEvent::announce),
        );
        self.entries = incoming;
        changes
    }
}
