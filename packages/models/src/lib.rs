#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Core data model for the rescue map dashboard engine.
//!
//! Defines the incident, response-unit, and catalog types that every
//! reconciliation cycle produces, plus the analytics result types derived
//! from them. All entities live for exactly one polling cycle; a new
//! [`Snapshot`] fully replaces the previous one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Fallback label for an incident type that is missing from the catalogs.
pub const UNKNOWN_TYPE_LABEL: &str = "Desconocido";

/// Fallback label for an absent optional value ("N/A" in operator views).
pub const MISSING_LABEL: &str = "N/A";

/// Lifecycle status of an incident.
///
/// Wire format is the remote service's numeric code (1/2/3); display
/// labels are the service's status strings. The offline report schema
/// additionally uses `resuelto` for resolved incidents, which
/// [`std::str::FromStr`] accepts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum IncidentStatus {
    /// Reported, no unit assigned yet.
    #[strum(serialize = "accidente")]
    Pending = 1,
    /// A response unit has been dispatched.
    #[strum(serialize = "en_camino")]
    EnRoute = 2,
    /// Attended and closed; any unit assignment is released.
    #[strum(to_string = "atendido", serialize = "resuelto")]
    Resolved = 3,
}

impl IncidentStatus {
    /// Returns the numeric wire code of this status.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<IncidentStatus> for u8 {
    fn from(status: IncidentStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for IncidentStatus {
    type Error = InvalidStatusError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Pending),
            2 => Ok(Self::EnRoute),
            3 => Ok(Self::Resolved),
            _ => Err(InvalidStatusError { value }),
        }
    }
}

/// Error returned when a numeric status code is outside 1-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid incident status code {value}: expected 1-3")]
pub struct InvalidStatusError {
    /// The invalid code that was provided.
    pub value: u8,
}

/// A WGS84 geocoordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate from decimal degrees.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// The person who reported an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    /// Stable user identifier on the remote service.
    pub user_id: i64,
    /// Display name.
    pub name: String,
}

/// An emergency incident as reconciled from the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Stable incident identifier; the key shared by map markers and
    /// table rows.
    pub id: i64,
    /// Reference into the incident-type catalog.
    pub type_id: i64,
    /// Lifecycle status.
    pub status: IncidentStatus,
    /// Report location. `None` when the reporting device sent no fix.
    pub coordinate: Option<Coordinate>,
    /// Creation time in the source's reference clock (epoch seconds on
    /// the wire), *not* the operator's local clock.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Reporting user, when the service resolved one.
    pub reporter: Option<Reporter>,
    /// Assigned response unit. Must be `None` while status is
    /// [`IncidentStatus::Pending`]; cleared again on resolution.
    pub assigned_unit: Option<i64>,
}

impl Incident {
    /// Whether this incident still needs attention (not yet resolved).
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.status, IncidentStatus::Resolved)
    }
}

/// A response unit as listed by the remote service, before its live
/// workload statistic has been joined in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUnit {
    /// Stable unit identifier.
    pub id: i64,
    /// Display name (e.g. "Unidad Central").
    pub name: String,
    /// Station location.
    pub coordinate: Coordinate,
}

/// Live workload statistic for one unit, fetched per cycle from a
/// separate endpoint than the base unit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitStats {
    /// Number of incidents currently assigned and unresolved.
    pub active_incidents: u32,
}

/// A response unit annotated with its freshly fetched active-incident
/// count.
///
/// Availability is never stored; it is recomputed each cycle from the
/// count, because the statistics endpoint may race the base unit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Stable unit identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Station location.
    pub coordinate: Coordinate,
    /// Active-incident count for this cycle. Defaults to 0 when the
    /// statistics fetch for this unit failed.
    pub active_incidents: u32,
}

impl Unit {
    /// Joins a base unit with its per-cycle statistic.
    #[must_use]
    pub fn from_base(base: BaseUnit, active_incidents: u32) -> Self {
        Self {
            id: base.id,
            name: base.name,
            coordinate: base.coordinate,
            active_incidents,
        }
    }

    /// Derived availability: a unit with zero active incidents.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.active_incidents == 0
    }
}

/// One incident-type catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentTypeEntry {
    /// Catalog key referenced by [`Incident::type_id`].
    pub type_id: i64,
    /// Displayed label (e.g. "Incendio").
    pub description: String,
}

/// One kinship catalog entry (used when rendering emergency contacts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KinEntry {
    /// Catalog key referenced by [`EmergencyContact::kin`].
    pub kin_id: i64,
    /// Displayed label (e.g. "Madre").
    pub kin_name: String,
}

/// Slowly-changing reference tables, fetched once per refresh cycle and
/// reused from the previous cycle when a catalog fetch fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalogs {
    /// Incident-type labels in catalog order.
    pub incident_types: Vec<IncidentTypeEntry>,
    /// Kinship labels in catalog order.
    pub kin: Vec<KinEntry>,
}

impl Catalogs {
    /// Displayed label for an incident type, falling back to
    /// [`UNKNOWN_TYPE_LABEL`] for unknown keys.
    #[must_use]
    pub fn type_label(&self, type_id: i64) -> &str {
        self.incident_types
            .iter()
            .find(|entry| entry.type_id == type_id)
            .map_or(UNKNOWN_TYPE_LABEL, |entry| entry.description.as_str())
    }

    /// Displayed label for a kinship key, falling back to
    /// [`MISSING_LABEL`] for unknown keys.
    #[must_use]
    pub fn kin_label(&self, kin_id: i64) -> &str {
        self.kin
            .iter()
            .find(|entry| entry.kin_id == kin_id)
            .map_or(MISSING_LABEL, |entry| entry.kin_name.as_str())
    }
}

/// A medical condition on a reporter's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalCondition {
    /// Displayed description.
    pub description: String,
}

/// An emergency contact on a reporter's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    /// Contact display name.
    pub contact_name: String,
    /// Contact phone number.
    pub contact_phone: String,
    /// Kinship catalog key.
    pub kin: i64,
}

/// Full user profile behind a reporter reference, fetched on demand for
/// the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable user identifier.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Phone number, when registered.
    pub phone: Option<String>,
    /// Registered medical conditions.
    #[serde(default)]
    pub conditions: Vec<MedicalCondition>,
    /// Registered emergency contacts.
    #[serde(default)]
    pub emergency_contacts: Vec<EmergencyContact>,
}

/// One fully joined, immutable view of incidents, units, and catalogs
/// for a single polling cycle.
///
/// Sequence order is source order; nothing is re-sorted. A new snapshot
/// fully replaces the previous one — there is no incremental patching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Incidents in source order.
    pub incidents: Vec<Incident>,
    /// Units in source order, each annotated with this cycle's
    /// active-incident count.
    pub units: Vec<Unit>,
    /// Reference tables for this cycle.
    pub catalogs: Catalogs,
}

impl Snapshot {
    /// Displayed type label for an incident in this snapshot.
    #[must_use]
    pub fn type_label(&self, incident: &Incident) -> &str {
        self.catalogs.type_label(incident.type_id)
    }

    /// Looks up a unit by identifier.
    #[must_use]
    pub fn unit(&self, unit_id: i64) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == unit_id)
    }
}

/// A filtered projection of a snapshot's incidents for display.
///
/// Purely derived; relative incident order matches the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSet {
    /// Surviving incidents in snapshot order.
    pub incidents: Vec<Incident>,
}

impl ViewSet {
    /// Number of incidents in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}

/// Headline counts over one snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewMetrics {
    /// All incidents in the snapshot.
    pub total: usize,
    /// Incidents not yet resolved.
    pub active: usize,
    /// Resolved incidents.
    pub resolved: usize,
    /// Incidents with a unit en route.
    pub in_progress: usize,
    /// Active incidents still awaiting a unit (`active - in_progress`).
    pub pending: usize,
    /// Units with zero active incidents.
    pub available_units: usize,
    /// Units with at least one active incident.
    pub busy_units: usize,
    /// All units in the snapshot.
    pub total_units: usize,
}

/// Incident counts for the standard reporting windows, evaluated in the
/// operator's configured timezone offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalStats {
    /// Incidents created since the start of the local day.
    pub today: usize,
    /// Incidents created within the trailing seven days.
    pub week: usize,
    /// Incidents created since the start of the local month.
    pub month: usize,
}

/// One row of the incident-type distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDistributionEntry {
    /// Displayed type label.
    pub label: String,
    /// Incidents of this type.
    pub count: usize,
    /// Share of all incidents, rounded to one decimal.
    pub percentage: f64,
}

/// Per-unit resolution efficiency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitEfficiencyEntry {
    /// Unit identifier.
    pub unit_id: i64,
    /// Unit display name.
    pub name: String,
    /// Incidents ever assigned to this unit (within the snapshot).
    pub total: usize,
    /// Assigned incidents that were resolved.
    pub resolved: usize,
    /// Active-incident count this cycle.
    pub active: u32,
    /// `resolved / total * 100`, one decimal; 0 when nothing assigned.
    pub efficiency: f64,
}

/// One hour-of-day bucket of the creation-time histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyBucket {
    /// Local hour of day, 0-23.
    pub hour: u8,
    /// Incidents created in this hour.
    pub count: usize,
}

/// A geographic density bucket: coordinates rounded to two decimal
/// degrees, keyed to an incident count.
///
/// Derived from the full incident set, never the filtered view, so the
/// heatmap reflects all history regardless of active filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatZone {
    /// Rounded latitude.
    pub lat: f64,
    /// Rounded longitude.
    pub lon: f64,
    /// Incidents inside this zone.
    pub count: usize,
}

/// The closest available unit to a target coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestUnit {
    /// Unit identifier.
    pub unit_id: i64,
    /// Unit display name.
    pub name: String,
    /// Great-circle distance to the target, in kilometres.
    pub distance_km: f64,
}

/// Bundle of the standard analytics queries, stamped with its
/// generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    /// When this report was generated (source reference clock).
    pub generated: DateTime<Utc>,
    /// Headline counts.
    pub overview: OverviewMetrics,
    /// Reporting-window counts.
    pub temporal: TemporalStats,
    /// Type distribution, descending by count.
    pub type_distribution: Vec<TypeDistributionEntry>,
    /// Unit efficiency ranking, descending.
    pub unit_efficiency: Vec<UnitEfficiencyEntry>,
}
