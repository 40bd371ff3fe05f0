//! New-incident detection across polling cycles.

use rescue_map_models::{IncidentStatus, MISSING_LABEL, Snapshot};
use std::collections::HashSet;

use crate::DashboardEvent;

/// Detects newly appeared pending incidents.
///
/// The seen set grows monotonically for the session and is never
/// pruned; membership alone decides whether an id alerts, so an
/// incident that somehow reverts to pending never re-alerts.
#[derive(Debug, Default)]
pub struct ChangeNotifier {
    seen: HashSet<i64>,
}

impl ChangeNotifier {
    /// Creates a notifier with an empty seen set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans a snapshot and returns one [`DashboardEvent::NewIncident`]
    /// per pending incident whose id has not been seen this session.
    pub fn scan(&mut self, snapshot: &Snapshot) -> Vec<DashboardEvent> {
        let mut events = Vec::new();
        for incident in &snapshot.incidents {
            if incident.status == IncidentStatus::Pending && self.seen.insert(incident.id) {
                events.push(DashboardEvent::NewIncident {
                    id: incident.id,
                    type_label: snapshot.type_label(incident).to_owned(),
                    reporter: incident
                        .reporter
                        .as_ref()
                        .map_or(MISSING_LABEL, |reporter| reporter.name.as_str())
                        .to_owned(),
                });
            }
        }
        events
    }

    /// Number of distinct incident ids alerted so far.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}
