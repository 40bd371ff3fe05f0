#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot builder: one reconciliation fetch per polling cycle.
//!
//! Fans out the three primary fetches (incidents, base units, catalogs)
//! in parallel so wall-clock latency is bounded by the slowest single
//! call, then joins each unit with its live workload statistic. The
//! result is an immutable [`Snapshot`] that fully replaces the previous
//! one.

use futures::future::join_all;
use rescue_map_api::{ApiError, RemoteApi};
use rescue_map_models::{Catalogs, Snapshot, Unit};

/// Errors that abort a reconciliation cycle.
///
/// Only the primary incident and unit feeds are fatal; catalog and
/// per-unit statistic failures are recovered locally so the dashboard
/// stays live.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The incident feed could not be fetched.
    #[error("incident feed unavailable: {0}")]
    Incidents(#[source] ApiError),

    /// The unit feed could not be fetched.
    #[error("unit feed unavailable: {0}")]
    Units(#[source] ApiError),
}

/// Builds one [`Snapshot`] per cycle, caching the slowly-changing
/// catalogs across cycles.
///
/// The catalogs are re-fetched every cycle but a failed catalog fetch
/// reuses the previous cycle's tables — type labels degrade to the
/// unknown fallback instead of taking the dashboard down.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    catalogs: Catalogs,
}

impl SnapshotBuilder {
    /// Creates a builder with empty catalogs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently fetched catalogs.
    #[must_use]
    pub const fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Fetches everything and joins it into a snapshot.
    ///
    /// Per-unit statistic failures are non-fatal: the affected unit gets
    /// `active_incidents = 0` (treated as available) rather than
    /// aborting the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the incident or unit feed fails; the
    /// caller must keep the previously rendered view in that case.
    pub async fn build(&mut self, api: &dyn RemoteApi) -> Result<Snapshot, SnapshotError> {
        let (incidents, base_units, incident_types, kin) = futures::join!(
            api.list_incidents(),
            api.list_units(),
            api.catalog_incident_types(),
            api.catalog_kin(),
        );

        let incidents = incidents.map_err(SnapshotError::Incidents)?;
        let base_units = base_units.map_err(SnapshotError::Units)?;

        match incident_types {
            Ok(entries) => self.catalogs.incident_types = entries,
            Err(err) => {
                log::warn!("incident-type catalog fetch failed, reusing previous tables: {err}");
            }
        }
        match kin {
            Ok(entries) => self.catalogs.kin = entries,
            Err(err) => {
                log::warn!("kin catalog fetch failed, reusing previous tables: {err}");
            }
        }

        let stats = join_all(base_units.iter().map(|unit| api.unit_stats(unit.id))).await;
        let units = base_units
            .into_iter()
            .zip(stats)
            .map(|(base, stat)| match stat {
                Ok(stat) => Unit::from_base(base, stat.active_incidents),
                Err(err) => {
                    log::warn!(
                        "stats fetch for unit {} ({}) failed, assuming available: {err}",
                        base.id,
                        base.name
                    );
                    Unit::from_base(base, 0)
                }
            })
            .collect();

        Ok(Snapshot {
            incidents,
            units,
            catalogs: self.catalogs.clone(),
        })
    }
}
