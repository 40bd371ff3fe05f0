//! Operator-facing event stream.
//!
//! Everything the engine needs to surface — new pending incidents,
//! failed cycles, failed mutations — flows through one channel as plain
//! data; the presentation layer decides how to show it.

/// One operator-facing event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    /// A pending incident appeared that was never seen this session.
    /// Emitted at most once per incident id.
    NewIncident {
        /// Incident identifier.
        id: i64,
        /// Displayed type label.
        type_label: String,
        /// Reporter display name, or the missing-value label.
        reporter: String,
    },

    /// A reconciliation cycle finished and the view was refreshed.
    CycleCompleted {
        /// Incidents in the new snapshot.
        incidents: usize,
        /// Of which still active.
        active: usize,
        /// Units currently available.
        available_units: usize,
    },

    /// A reconciliation cycle failed; the previous view is retained.
    CycleFailed {
        /// Human-readable failure description.
        error: String,
    },

    /// A status mutation was rejected; a forced re-sync follows so the
    /// view reflects the server's authoritative state.
    MutationFailed {
        /// What was attempted (e.g. "assign unit").
        action: String,
        /// Human-readable failure description.
        error: String,
    },
}
