//! View synchronizer: keyed projections of the filtered view set.
//!
//! Both renderings — spatial markers and table rows — are keyed by
//! incident id. Each cycle recreates the entities (never mutates them
//! in place), so hover state is re-attached by key after every upsert
//! pass. Interaction is asymmetric by contract: clicking a marker
//! focuses the matching row, clicking a row only highlights the marker.

use chrono::{DateTime, Utc};
use rescue_map_models::{Coordinate, IncidentStatus, Snapshot, ViewSet};
use std::collections::BTreeMap;

/// Visual class of an incident marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Red marker: awaiting a unit.
    Pending,
    /// Orange marker: unit en route.
    EnRoute,
}

/// One spatial marker for an active incident.
///
/// Resolved incidents and incidents without a coordinate draw no
/// marker.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentMarker {
    /// Incident id — the key shared with the table row.
    pub key: i64,
    /// Marker position.
    pub coordinate: Coordinate,
    /// Visual class.
    pub kind: MarkerKind,
    /// Popup label (displayed incident type).
    pub label: String,
}

/// One spatial marker for a response unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitMarker {
    /// Unit id.
    pub key: i64,
    /// Marker position.
    pub coordinate: Coordinate,
    /// Unit display name.
    pub name: String,
    /// Derived availability this cycle.
    pub available: bool,
}

/// One table row for an incident in the current view set.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Incident id — the key shared with the marker.
    pub key: i64,
    /// Displayed type label.
    pub type_label: String,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// Reporter display name, when known.
    pub reporter: Option<String>,
    /// Reporter user id, when known (drives the detail link).
    pub reporter_id: Option<i64>,
    /// Assigned unit display name, when assigned and known.
    pub unit_name: Option<String>,
    /// Creation time (source reference clock).
    pub timestamp: DateTime<Utc>,
}

/// Navigation produced by a marker click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    /// Scroll/focus the table row with this key.
    FocusRow(i64),
}

/// Keys that changed in one upsert pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDiff {
    /// Marker keys no longer present; the renderer removes these.
    pub removed_markers: Vec<i64>,
    /// Row keys no longer present.
    pub removed_rows: Vec<i64>,
}

/// The two synchronized keyed collections plus the hover relation.
#[derive(Debug, Default)]
pub struct ViewState {
    markers: BTreeMap<i64, IncidentMarker>,
    unit_markers: BTreeMap<i64, UnitMarker>,
    rows: Vec<TableRow>,
    hovered: Option<i64>,
}

impl ViewState {
    /// Creates an empty view state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects a view set onto both renderings, diffing against the
    /// previous key set.
    ///
    /// Hover survives the pass when its key survives; otherwise it is
    /// cleared.
    pub fn apply(&mut self, view: &ViewSet, snapshot: &Snapshot) -> ViewDiff {
        let mut markers = BTreeMap::new();
        let mut rows = Vec::with_capacity(view.incidents.len());
        for incident in &view.incidents {
            if incident.is_active() {
                if let Some(coordinate) = incident.coordinate {
                    markers.insert(
                        incident.id,
                        IncidentMarker {
                            key: incident.id,
                            coordinate,
                            kind: if incident.status == IncidentStatus::EnRoute {
                                MarkerKind::EnRoute
                            } else {
                                MarkerKind::Pending
                            },
                            label: snapshot.type_label(incident).to_owned(),
                        },
                    );
                }
            }
            rows.push(TableRow {
                key: incident.id,
                type_label: snapshot.type_label(incident).to_owned(),
                status: incident.status,
                reporter: incident
                    .reporter
                    .as_ref()
                    .map(|reporter| reporter.name.clone()),
                reporter_id: incident.reporter.as_ref().map(|reporter| reporter.user_id),
                unit_name: incident
                    .assigned_unit
                    .and_then(|unit_id| snapshot.unit(unit_id))
                    .map(|unit| unit.name.clone()),
                timestamp: incident.timestamp,
            });
        }

        let diff = ViewDiff {
            removed_markers: self
                .markers
                .keys()
                .filter(|key| !markers.contains_key(key))
                .copied()
                .collect(),
            removed_rows: self
                .rows
                .iter()
                .map(|row| row.key)
                .filter(|key| !rows.iter().any(|row| row.key == *key))
                .collect(),
        };

        self.markers = markers;
        self.rows = rows;
        self.unit_markers = snapshot
            .units
            .iter()
            .map(|unit| {
                (
                    unit.id,
                    UnitMarker {
                        key: unit.id,
                        coordinate: unit.coordinate,
                        name: unit.name.clone(),
                        available: unit.is_available(),
                    },
                )
            })
            .collect();

        // Re-establish the hover relation on the recreated entities.
        self.hovered = self.hovered.filter(|key| self.contains_key(*key));
        diff
    }

    fn contains_key(&self, key: i64) -> bool {
        self.markers.contains_key(&key) || self.rows.iter().any(|row| row.key == key)
    }

    /// Current incident markers, keyed by incident id.
    #[must_use]
    pub const fn markers(&self) -> &BTreeMap<i64, IncidentMarker> {
        &self.markers
    }

    /// Current unit markers, keyed by unit id.
    #[must_use]
    pub const fn unit_markers(&self) -> &BTreeMap<i64, UnitMarker> {
        &self.unit_markers
    }

    /// Current table rows in view order.
    #[must_use]
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Hovers the entity with this key (from either side of the
    /// relation); both projections highlight it.
    pub fn hover(&mut self, key: i64) {
        if self.contains_key(key) {
            self.hovered = Some(key);
        }
    }

    /// Clears the hover relation.
    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// The currently hovered key, if any.
    #[must_use]
    pub const fn hovered(&self) -> Option<i64> {
        self.hovered
    }

    /// Whether the entity with this key is highlighted.
    #[must_use]
    pub fn is_highlighted(&self, key: i64) -> bool {
        self.hovered == Some(key)
    }

    /// Marker click: highlights and asks the renderer to focus the
    /// matching row.
    pub fn click_marker(&mut self, key: i64) -> Option<ViewAction> {
        self.hover(key);
        self.rows
            .iter()
            .any(|row| row.key == key)
            .then_some(ViewAction::FocusRow(key))
    }

    /// Row click: passive highlight only, no navigation.
    pub fn click_row(&mut self, key: i64) {
        self.hover(key);
    }
}
