#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::cargo_common_metadata,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

//! Pure analytics queries over incident snapshots.
//!
//! Every function here is side-effect-free over a [`Snapshot`]; the
//! aggregate queries intentionally read the full incident set, never the
//! filtered view, so dashboards reflect all history regardless of
//! active search filters.
//!
//! There is deliberately no response-time metric: the data model
//! carries no resolved-at timestamp, so one cannot be computed honestly.

pub mod geo;

use chrono::{DateTime, Datelike as _, Duration, FixedOffset, Timelike as _, Utc};
use rescue_map_models::{
    Coordinate, HeatZone, HourlyBucket, IncidentStatus, NearestUnit, OverviewMetrics, Snapshot,
    SummaryReport, TemporalStats, TypeDistributionEntry, UNKNOWN_TYPE_LABEL, UnitEfficiencyEntry,
};
use std::collections::{BTreeMap, HashMap};

/// Number of buckets in the hourly histogram.
pub const HOURS_PER_DAY: usize = 24;

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Headline counts: incident totals by status and unit availability.
///
/// `pending` is derived as `active - in_progress` for any snapshot.
#[must_use]
pub fn overview(snapshot: &Snapshot) -> OverviewMetrics {
    let total = snapshot.incidents.len();
    let resolved = snapshot
        .incidents
        .iter()
        .filter(|i| i.status == IncidentStatus::Resolved)
        .count();
    let in_progress = snapshot
        .incidents
        .iter()
        .filter(|i| i.status == IncidentStatus::EnRoute)
        .count();
    let active = total - resolved;

    let available_units = snapshot.units.iter().filter(|u| u.is_available()).count();

    OverviewMetrics {
        total,
        active,
        resolved,
        in_progress,
        pending: active - in_progress,
        available_units,
        busy_units: snapshot.units.len() - available_units,
        total_units: snapshot.units.len(),
    }
}

/// Incident counts for today, the trailing week, and the current month.
///
/// Calendar boundaries are evaluated in the operator's configured
/// offset `tz`, not the host timezone — incidents are timestamped in
/// the source's reference clock.
#[must_use]
pub fn temporal_stats(snapshot: &Snapshot, now: DateTime<Utc>, tz: FixedOffset) -> TemporalStats {
    let now_local = now.with_timezone(&tz);
    let week_ago = now - Duration::days(7);

    let mut stats = TemporalStats::default();
    for incident in &snapshot.incidents {
        if incident.timestamp >= now {
            continue;
        }
        let local = incident.timestamp.with_timezone(&tz);
        if local.date_naive() == now_local.date_naive() {
            stats.today += 1;
        }
        if incident.timestamp >= week_ago {
            stats.week += 1;
        }
        if local.year() == now_local.year() && local.month() == now_local.month() {
            stats.month += 1;
        }
    }
    stats
}

/// Distribution of incidents by displayed type label.
///
/// Percentages are `count / total * 100` rounded to one decimal. Sorted
/// descending by count; ties retain catalog order, with the unknown
/// bucket last. Empty when the snapshot has no incidents.
#[must_use]
pub fn type_distribution(snapshot: &Snapshot) -> Vec<TypeDistributionEntry> {
    let total = snapshot.incidents.len();
    if total == 0 {
        return vec![];
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for incident in &snapshot.incidents {
        *counts.entry(snapshot.type_label(incident)).or_default() += 1;
    }

    let mut entries = Vec::new();
    for catalog_entry in &snapshot.catalogs.incident_types {
        if let Some(count) = counts.remove(catalog_entry.description.as_str()) {
            entries.push(TypeDistributionEntry {
                label: catalog_entry.description.clone(),
                count,
                percentage: round_one_decimal(count as f64 / total as f64 * 100.0),
            });
        }
    }
    if let Some(count) = counts.remove(UNKNOWN_TYPE_LABEL) {
        entries.push(TypeDistributionEntry {
            label: UNKNOWN_TYPE_LABEL.to_owned(),
            count,
            percentage: round_one_decimal(count as f64 / total as f64 * 100.0),
        });
    }

    // Stable sort keeps catalog order among equal counts.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// Per-unit resolution efficiency, ranked descending.
///
/// Efficiency is `resolved-assigned / total-assigned * 100` (one
/// decimal), 0 for units with nothing assigned. Ties keep the unit's
/// natural (source) order.
#[must_use]
pub fn unit_efficiency(snapshot: &Snapshot) -> Vec<UnitEfficiencyEntry> {
    let mut entries: Vec<UnitEfficiencyEntry> = snapshot
        .units
        .iter()
        .map(|unit| {
            let assigned: Vec<_> = snapshot
                .incidents
                .iter()
                .filter(|i| i.assigned_unit == Some(unit.id))
                .collect();
            let resolved = assigned
                .iter()
                .filter(|i| i.status == IncidentStatus::Resolved)
                .count();
            let total = assigned.len();
            let efficiency = if total == 0 {
                0.0
            } else {
                round_one_decimal(resolved as f64 / total as f64 * 100.0)
            };
            UnitEfficiencyEntry {
                unit_id: unit.id,
                name: unit.name.clone(),
                total,
                resolved,
                active: unit.active_incidents,
                efficiency,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.efficiency.total_cmp(&a.efficiency));
    entries
}

/// Histogram of incident creation times by local hour of day.
///
/// Always produces exactly 24 buckets, even when every count is zero.
#[must_use]
pub fn hourly_histogram(snapshot: &Snapshot, tz: FixedOffset) -> Vec<HourlyBucket> {
    let mut counts = [0_usize; HOURS_PER_DAY];
    for incident in &snapshot.incidents {
        let hour = incident.timestamp.with_timezone(&tz).hour() as usize;
        counts[hour] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(hour, &count)| HourlyBucket {
            hour: hour as u8,
            count,
        })
        .collect()
}

/// Geographic density buckets: coordinates rounded to two decimal
/// degrees, ranked descending by count.
///
/// Returns the full ranked set; consumers truncate to their own top-N.
/// Incidents without a coordinate are excluded.
#[must_use]
pub fn heat_zones(snapshot: &Snapshot) -> Vec<HeatZone> {
    let mut zones: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for incident in &snapshot.incidents {
        if let Some(coordinate) = incident.coordinate {
            let key = (
                (coordinate.lat * 100.0).round() as i64,
                (coordinate.lon * 100.0).round() as i64,
            );
            *zones.entry(key).or_default() += 1;
        }
    }

    let mut ranked: Vec<HeatZone> = zones
        .into_iter()
        .map(|((lat, lon), count)| HeatZone {
            lat: lat as f64 / 100.0,
            lon: lon as f64 / 100.0,
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// The closest available unit to `target` by great-circle distance.
///
/// Only units with zero active incidents qualify. Returns `None` when
/// no unit is available — never an occupied unit, never an error.
#[must_use]
pub fn nearest_available_unit(snapshot: &Snapshot, target: Coordinate) -> Option<NearestUnit> {
    snapshot
        .units
        .iter()
        .filter(|unit| unit.is_available())
        .map(|unit| NearestUnit {
            unit_id: unit.id,
            name: unit.name.clone(),
            distance_km: geo::haversine_km(target, unit.coordinate),
        })
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
}

/// Bundles the standard queries into one report.
#[must_use]
pub fn summary_report(snapshot: &Snapshot, now: DateTime<Utc>, tz: FixedOffset) -> SummaryReport {
    SummaryReport {
        generated: now,
        overview: overview(snapshot),
        temporal: temporal_stats(snapshot, now, tz),
        type_distribution: type_distribution(snapshot),
        unit_efficiency: unit_efficiency(snapshot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescue_map_models::{BaseUnit, Catalogs, Incident, IncidentTypeEntry, Unit};

    const TS: i64 = 1_700_000_000;

    fn tz() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    fn at(epoch: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(epoch, 0).unwrap()
    }

    fn incident(id: i64, type_id: i64, status: IncidentStatus, epoch: i64) -> Incident {
        Incident {
            id,
            type_id,
            status,
            coordinate: Some(Coordinate::new(13.7, -89.2)),
            timestamp: at(epoch),
            reporter: None,
            assigned_unit: None,
        }
    }

    fn unit(id: i64, name: &str, active: u32, lat: f64, lon: f64) -> Unit {
        Unit::from_base(
            BaseUnit {
                id,
                name: name.to_owned(),
                coordinate: Coordinate::new(lat, lon),
            },
            active,
        )
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

    fn snapshot(incidents: Vec<Incident>, units: Vec<Unit>) -> Snapshot {
        Snapshot {
            incidents,
            units,
            catalogs: catalogs(),
        }
    }

    #[test]
    fn overview_matches_the_reference_scenario() {
        // incidents = [{id:1, status:Pending}], units = [{A, active:0}, {B, active:2}]
        let snapshot = snapshot(
            vec![incident(1, 1, IncidentStatus::Pending, TS)],
            vec![
                unit(1, "A", 0, 13.70, -89.20),
                unit(2, "B", 2, 13.71, -89.21),
            ],
        );
        let metrics = overview(&snapshot);
        assert_eq!(metrics.total, 1);
        assert_eq!(metrics.active, 1);
        assert_eq!(metrics.resolved, 0);
        assert_eq!(metrics.available_units, 1);
        assert_eq!(metrics.busy_units, 1);
    }

    #[test]
    fn pending_equals_active_minus_in_progress() {
        let snapshot = snapshot(
            vec![
                incident(1, 1, IncidentStatus::Pending, TS),
                incident(2, 1, IncidentStatus::EnRoute, TS),
                incident(3, 2, IncidentStatus::EnRoute, TS),
                incident(4, 2, IncidentStatus::Resolved, TS),
            ],
            vec![],
        );
        let metrics = overview(&snapshot);
        assert_eq!(metrics.pending, metrics.active - metrics.in_progress);
        assert_eq!(metrics.pending, 1);
    }

    #[test]
    fn distribution_percentages_sum_to_roughly_100() {
        let snapshot = snapshot(
            vec![
                incident(1, 1, IncidentStatus::Pending, TS),
                incident(2, 1, IncidentStatus::Pending, TS),
                incident(3, 2, IncidentStatus::Pending, TS),
            ],
            vec![],
        );
        let distribution = type_distribution(&snapshot);
        let sum: f64 = distribution.iter().map(|e| e.percentage).sum();
        assert!((sum - 100.0).abs() < 0.2, "percentages summed to {sum}");
        assert_eq!(distribution[0].label, "Colisión");
        assert_eq!(distribution[0].count, 2);
        assert!((distribution[0].percentage - 66.7).abs() < f64::EPSILON);
    }

    #[test]
    fn distribution_ties_retain_catalog_order_and_unknowns_group() {
        let snapshot = snapshot(
            vec![
                incident(1, 2, IncidentStatus::Pending, TS),
                incident(2, 1, IncidentStatus::Pending, TS),
                incident(3, 99, IncidentStatus::Pending, TS),
            ],
            vec![],
        );
        let distribution = type_distribution(&snapshot);
        let labels: Vec<_> = distribution.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, ["Colisión", "Incendio", UNKNOWN_TYPE_LABEL]);
    }

    #[test]
    fn distribution_is_empty_without_incidents() {
        assert!(type_distribution(&snapshot(vec![], vec![])).is_empty());
    }

    #[test]
    fn efficiency_ranks_descending_with_zero_for_idle_units() {
        let mut resolved = incident(1, 1, IncidentStatus::Resolved, TS);
        resolved.assigned_unit = Some(1);
        let mut en_route = incident(2, 1, IncidentStatus::EnRoute, TS);
        en_route.assigned_unit = Some(1);
        let mut done = incident(3, 2, IncidentStatus::Resolved, TS);
        done.assigned_unit = Some(2);

        let snapshot = snapshot(
            vec![resolved, en_route, done],
            vec![
                unit(1, "Alfa", 1, 13.70, -89.20),
                unit(2, "Bravo", 0, 13.71, -89.21),
                unit(3, "Charlie", 0, 13.72, -89.22),
            ],
        );
        let ranking = unit_efficiency(&snapshot);
        let names: Vec<_> = ranking.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Bravo", "Alfa", "Charlie"]);
        assert!((ranking[0].efficiency - 100.0).abs() < f64::EPSILON);
        assert!((ranking[1].efficiency - 50.0).abs() < f64::EPSILON);
        assert!((ranking[2].efficiency - 0.0).abs() < f64::EPSILON);
        assert_eq!(ranking[2].total, 0);
    }

    #[test]
    fn hourly_histogram_has_24_buckets_summing_to_total() {
        let snapshot = snapshot(
            vec![
                incident(1, 1, IncidentStatus::Pending, TS),
                incident(2, 1, IncidentStatus::Pending, TS + 3600),
                incident(3, 1, IncidentStatus::Pending, TS + 7200),
            ],
            vec![],
        );
        let histogram = hourly_histogram(&snapshot, tz());
        assert_eq!(histogram.len(), HOURS_PER_DAY);
        let sum: usize = histogram.iter().map(|b| b.count).sum();
        assert_eq!(sum, 3);
        for (index, bucket) in histogram.iter().enumerate() {
            assert_eq!(usize::from(bucket.hour), index);
        }
    }

    #[test]
    fn hourly_histogram_uses_the_configured_offset() {
        // 1700000000 is 22:13:20 UTC, which is 16:13:20 at UTC-6.
        let snapshot = snapshot(vec![incident(1, 1, IncidentStatus::Pending, TS)], vec![]);
        let histogram = hourly_histogram(&snapshot, tz());
        assert_eq!(histogram[16].count, 1);
        assert_eq!(histogram[22].count, 0);
    }

    #[test]
    fn temporal_stats_bucket_by_local_calendar() {
        let now = at(TS);
        let snapshot = snapshot(
            vec![
                // Two hours before "now": today, week, month.
                incident(1, 1, IncidentStatus::Pending, TS - 2 * 3600),
                // Three days before: week and month, not today.
                incident(2, 1, IncidentStatus::Pending, TS - 3 * 86_400),
                // Ten days before: same month (Nov 4 vs Nov 14 local), not week.
                incident(3, 1, IncidentStatus::Pending, TS - 10 * 86_400),
                // Sixty days before: none.
                incident(4, 1, IncidentStatus::Pending, TS - 60 * 86_400),
                // In the future: never counted.
                incident(5, 1, IncidentStatus::Pending, TS + 3600),
            ],
            vec![],
        );
        let stats = temporal_stats(&snapshot, now, tz());
        assert_eq!(stats.today, 1);
        assert_eq!(stats.week, 2);
        assert_eq!(stats.month, 3);
    }

    #[test]
    fn heat_zones_round_to_two_decimals_and_rank_by_count() {
        let mut incidents = vec![
            incident(1, 1, IncidentStatus::Pending, TS),
            incident(2, 1, IncidentStatus::Pending, TS),
            incident(3, 1, IncidentStatus::Pending, TS),
        ];
        incidents[0].coordinate = Some(Coordinate::new(13.701, -89.199));
        incidents[1].coordinate = Some(Coordinate::new(13.699, -89.201));
        incidents[2].coordinate = Some(Coordinate::new(14.5, -88.0));
        let mut no_fix = incident(4, 1, IncidentStatus::Pending, TS);
        no_fix.coordinate = None;
        incidents.push(no_fix);

        let zones = heat_zones(&snapshot(incidents, vec![]));
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].count, 2);
        assert!((zones[0].lat - 13.70).abs() < f64::EPSILON);
        assert!((zones[0].lon - -89.20).abs() < f64::EPSILON);
    }

    #[test]
    fn nearest_unit_skips_occupied_units() {
        // Occupied unit B sits right on the target; available A is far.
        let snapshot = snapshot(
            vec![],
            vec![
                unit(1, "A", 0, 14.00, -89.00),
                unit(2, "B", 2, 13.70, -89.20),
            ],
        );
        let nearest = nearest_available_unit(&snapshot, Coordinate::new(13.70, -89.20)).unwrap();
        assert_eq!(nearest.unit_id, 1);
        assert!(nearest.distance_km > 1.0);
    }

    #[test]
    fn nearest_unit_is_none_when_all_are_busy() {
        let snapshot = snapshot(
            vec![],
            vec![
                unit(1, "A", 1, 13.70, -89.20),
                unit(2, "B", 3, 13.71, -89.21),
            ],
        );
        assert!(nearest_available_unit(&snapshot, Coordinate::new(13.70, -89.20)).is_none());
    }

    #[test]
    fn summary_report_carries_the_generation_time() {
        let now = at(TS);
        let report = summary_report(
            &snapshot(vec![incident(1, 1, IncidentStatus::Pending, TS - 60)], vec![]),
            now,
            tz(),
        );
        assert_eq!(report.generated, now);
        assert_eq!(report.overview.total, 1);
        assert_eq!(report.type_distribution.len(), 1);
    }
}
