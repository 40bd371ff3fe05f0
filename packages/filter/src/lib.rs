#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Predicate filtering of incident snapshots into view sets.
//!
//! Filtering is pure and order-preserving: surviving incidents keep
//! their relative snapshot order, which is what lets the view
//! synchronizer re-attach hover state by key after an upsert pass.

use rescue_map_models::{Catalogs, Incident, IncidentStatus, Snapshot, ViewSet};

/// Composable display filter.
///
/// All three clauses must match (logical AND). `None` for status or
/// type means "all"; empty text always matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    /// Free-text term, matched case-insensitively against the reporter
    /// name and the incident-type label *as displayed* (the catalog
    /// description, falling back to the unknown label) — not against
    /// internal enum keys.
    pub text: String,
    /// Status clause; `None` matches every status.
    pub status: Option<IncidentStatus>,
    /// Type clause; `None` matches every type.
    pub type_id: Option<i64>,
}

impl Predicate {
    /// The all-pass predicate.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether one incident satisfies every clause.
    #[must_use]
    pub fn matches(&self, incident: &Incident, catalogs: &Catalogs) -> bool {
        if let Some(status) = self.status {
            if incident.status != status {
                return false;
            }
        }
        if let Some(type_id) = self.type_id {
            if incident.type_id != type_id {
                return false;
            }
        }
        if self.text.is_empty() {
            return true;
        }

        let needle = self.text.to_lowercase();
        let type_label = catalogs.type_label(incident.type_id).to_lowercase();
        if type_label.contains(&needle) {
            return true;
        }
        incident
            .reporter
            .as_ref()
            .is_some_and(|reporter| reporter.name.to_lowercase().contains(&needle))
    }
}

/// Filters a snapshot into a [`ViewSet`].
#[must_use]
pub fn filter(snapshot: &Snapshot, predicate: &Predicate) -> ViewSet {
    filter_incidents(&snapshot.incidents, &snapshot.catalogs, predicate)
}

/// Filters an incident sequence against catalogs.
///
/// Idempotent: filtering an already-filtered set with the same
/// predicate returns the same set.
#[must_use]
pub fn filter_incidents(
    incidents: &[Incident],
    catalogs: &Catalogs,
    predicate: &Predicate,
) -> ViewSet {
    ViewSet {
        incidents: incidents
            .iter()
            .filter(|incident| predicate.matches(incident, catalogs))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_map_models::{Coordinate, IncidentTypeEntry, Reporter};

    fn incident(id: i64, type_id: i64, status: IncidentStatus, reporter: Option<&str>) -> Incident {
        Incident {
            id,
            type_id,
            status,
            coordinate: Some(Coordinate::new(13.7, -89.2)),
            timestamp: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            reporter: reporter.map(|name| Reporter {
                user_id: id,
                name: name.to_owned(),
            }),
            assigned_unit: None,
        }
    }

    fn catalogs() -> Catalogs {
        Catalogs {
            incident_types: vec![
                IncidentTypeEntry {
                    type_id: 1,
                    description: "Colisión".to_owned(),
                },
                IncidentTypeEntry {
                    type_id: 2,
                    description: "Incendio".to_owned(),
                },
            ],
            kin: vec![],
        }
    }

    fn snapshot(incidents: Vec<Incident>) -> Snapshot {
        Snapshot {
            incidents,
            units: vec![],
            catalogs: catalogs(),
        }
    }

    #[test]
    fn empty_predicate_passes_everything_in_order() {
        let snapshot = snapshot(vec![
            incident(3, 1, IncidentStatus::Pending, None),
            incident(1, 2, IncidentStatus::Resolved, None),
            incident(2, 1, IncidentStatus::EnRoute, None),
        ]);
        let view = filter(&snapshot, &Predicate::any());
        let ids: Vec<_> = view.incidents.iter().map(|i| i.id).collect();
        assert_eq!(ids, [3, 1, 2]);
    }

    #[test]
    fn clauses_combine_with_and() {
        let snapshot = snapshot(vec![
            incident(1, 2, IncidentStatus::Pending, None),
            incident(2, 2, IncidentStatus::Resolved, None),
            incident(3, 1, IncidentStatus::Pending, None),
        ]);
        let predicate = Predicate {
            text: String::new(),
            status: Some(IncidentStatus::Pending),
            type_id: Some(2),
        };
        let view = filter(&snapshot, &predicate);
        assert_eq!(view.len(), 1);
        assert_eq!(view.incidents[0].id, 1);
    }

    #[test]
    fn text_matches_displayed_label_case_insensitively() {
        let snapshot = snapshot(vec![
            incident(1, 2, IncidentStatus::Pending, None),
            incident(2, 1, IncidentStatus::Pending, None),
        ]);
        let predicate = Predicate {
            text: "incen".to_owned(),
            ..Predicate::default()
        };
        let view = filter(&snapshot, &predicate);
        assert_eq!(view.len(), 1);
        assert_eq!(view.incidents[0].type_id, 2);
    }

    #[test]
    fn text_matches_reporter_name_not_translated_labels() {
        // "fire" is not a substring of the displayed label "Incendio",
        // so only the reporter whose name contains it matches.
        let snapshot = snapshot(vec![
            incident(1, 2, IncidentStatus::Pending, None),
            incident(2, 1, IncidentStatus::Pending, Some("firefighter fan")),
        ]);
        let predicate = Predicate {
            text: "fire".to_owned(),
            ..Predicate::default()
        };
        let view = filter(&snapshot, &predicate);
        assert_eq!(view.len(), 1);
        assert_eq!(view.incidents[0].id, 2);
    }

    #[test]
    fn unknown_type_matches_the_fallback_label() {
        let snapshot = snapshot(vec![incident(1, 99, IncidentStatus::Pending, None)]);
        let predicate = Predicate {
            text: "desconocido".to_owned(),
            ..Predicate::default()
        };
        assert_eq!(filter(&snapshot, &predicate).len(), 1);
    }

    #[test]
    fn filtering_is_idempotent() {
        let snapshot = snapshot(vec![
            incident(1, 2, IncidentStatus::Pending, Some("Ana")),
            incident(2, 1, IncidentStatus::Resolved, Some("Berta")),
            incident(3, 2, IncidentStatus::EnRoute, None),
        ]);
        let predicate = Predicate {
            text: "a".to_owned(),
            status: None,
            type_id: Some(2),
        };
        let once = filter(&snapshot, &predicate);
        let twice = filter_incidents(&once.incidents, &snapshot.catalogs, &predicate);
        assert_eq!(once, twice);
    }
}
