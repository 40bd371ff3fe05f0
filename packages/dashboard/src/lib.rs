#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline driver for the rescue map dashboard engine.
//!
//! Owns one [`DashboardContext`] per dashboard session: API client,
//! current snapshot, filter predicate, view state, change notifier, and
//! the operator event channel — explicit state with an explicit
//! lifecycle, created at dashboard start and discarded at teardown.
//! Every cycle runs fetch → join → filter → analyze → project, and user
//! mutations force an extra out-of-band cycle so the view always
//! reflects the server's authoritative state.

pub mod config;
pub mod events;
pub mod notify;
pub mod scheduler;
pub mod view;

pub use config::DashboardConfig;
pub use events::DashboardEvent;
pub use notify::ChangeNotifier;
pub use scheduler::Scheduler;
pub use view::ViewState;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rescue_map_api::{ApiError, IncidentUpdate, NewUnit, RemoteApi};
use rescue_map_filter::Predicate;
use rescue_map_models::{Incident, Snapshot, SummaryReport, UserProfile, ViewSet};
use rescue_map_offline::OfflineError;
use rescue_map_snapshot::{SnapshotBuilder, SnapshotError};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Errors surfaced by the pipeline driver.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// A required environment variable is absent.
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    /// The configured timezone offset is out of range.
    #[error("invalid timezone offset: {hours} hours")]
    InvalidOffset {
        /// The rejected offset.
        hours: i32,
    },

    /// The reconciliation cycle failed; the previous view is retained.
    #[error("reconciliation cycle failed: {0}")]
    Cycle(#[from] SnapshotError),

    /// A direct remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Report export failed.
    #[error(transparent)]
    Export(#[from] OfflineError),
}

/// Per-session dashboard state and pipeline entry points.
pub struct DashboardContext {
    api: Arc<dyn RemoteApi>,
    config: DashboardConfig,
    builder: SnapshotBuilder,
    snapshot: Option<Snapshot>,
    view_set: ViewSet,
    predicate: Predicate,
    view: ViewState,
    notifier: ChangeNotifier,
    events: mpsc::UnboundedSender<DashboardEvent>,
}

impl DashboardContext {
    /// Creates a context and the receiving end of its event stream.
    #[must_use]
    pub fn new(
        api: Arc<dyn RemoteApi>,
        config: DashboardConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DashboardEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                api,
                config,
                builder: SnapshotBuilder::new(),
                snapshot: None,
                view_set: ViewSet::default(),
                predicate: Predicate::any(),
                view: ViewState::new(),
                notifier: ChangeNotifier::new(),
                events,
            },
            receiver,
        )
    }

    fn emit(&self, event: DashboardEvent) {
        if self.events.send(event).is_err() {
            log::debug!("event receiver closed, dropping event");
        }
    }

    /// Runs one full reconciliation cycle:
    /// fetch → join → filter → analyze → project → notify.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Cycle`] when a primary fetch failed;
    /// the previous snapshot and view stay rendered.
    pub async fn run_cycle(&mut self) -> Result<(), DashboardError> {
        match self.builder.build(self.api.as_ref()).await {
            Ok(snapshot) => {
                self.view_set = rescue_map_filter::filter(&snapshot, &self.predicate);
                self.view.apply(&self.view_set, &snapshot);
                for event in self.notifier.scan(&snapshot) {
                    self.emit(event);
                }

                let metrics = rescue_map_analytics::overview(&snapshot);
                log::debug!(
                    "cycle complete: {} incidents ({} active), {}/{} units available",
                    metrics.total,
                    metrics.active,
                    metrics.available_units,
                    metrics.total_units
                );
                self.emit(DashboardEvent::CycleCompleted {
                    incidents: metrics.total,
                    active: metrics.active,
                    available_units: metrics.available_units,
                });
                self.snapshot = Some(snapshot);
                Ok(())
            }
            Err(err) => {
                log::error!("reconciliation cycle failed, keeping previous view: {err}");
                self.emit(DashboardEvent::CycleFailed {
                    error: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Replaces the filter predicate and re-projects the current
    /// snapshot immediately, without waiting for the next poll.
    pub fn set_predicate(&mut self, predicate: Predicate) {
        self.predicate = predicate;
        if let Some(snapshot) = &self.snapshot {
            self.view_set = rescue_map_filter::filter(snapshot, &self.predicate);
            self.view.apply(&self.view_set, snapshot);
        }
    }

    /// Dispatches a unit to an incident, then forces a re-sync.
    ///
    /// # Errors
    ///
    /// Returns the mutation failure (also surfaced on the event
    /// stream); the forced re-sync runs regardless.
    pub async fn assign_unit(&mut self, incident_id: i64, unit_id: i64) -> Result<(), DashboardError> {
        let result = self
            .api
            .update_incident(incident_id, &IncidentUpdate::assign(unit_id))
            .await;
        self.finish_mutation("assign unit", result).await
    }

    /// Marks an incident attended (clearing its assignment), then
    /// forces a re-sync.
    ///
    /// # Errors
    ///
    /// Returns the mutation failure; the forced re-sync runs regardless.
    pub async fn mark_resolved(&mut self, incident_id: i64) -> Result<(), DashboardError> {
        let result = self
            .api
            .update_incident(incident_id, &IncidentUpdate::resolved())
            .await;
        self.finish_mutation("mark resolved", result).await
    }

    /// Deletes an incident, then forces a re-sync.
    ///
    /// # Errors
    ///
    /// Returns the mutation failure; the forced re-sync runs regardless.
    pub async fn delete_incident(&mut self, incident_id: i64) -> Result<(), DashboardError> {
        let result = self.api.delete_incident(incident_id).await;
        self.finish_mutation("delete incident", result).await
    }

    /// Registers a new response unit, then forces a re-sync.
    ///
    /// # Errors
    ///
    /// Returns the mutation failure; the forced re-sync runs regardless.
    pub async fn create_unit(&mut self, unit: NewUnit) -> Result<(), DashboardError> {
        let result = self.api.create_unit(&unit).await;
        self.finish_mutation("create unit", result).await
    }

    /// Deletes every incident in the current snapshot, then forces a
    /// re-sync.
    ///
    /// # Errors
    ///
    /// Returns the first delete failure; the forced re-sync runs
    /// regardless.
    pub async fn clear_all_incidents(&mut self) -> Result<(), DashboardError> {
        let ids: Vec<i64> = self
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.incidents.iter().map(|i| i.id).collect())
            .unwrap_or_default();
        let total = ids.len();
        let results = join_all(ids.into_iter().map(|id| {
            let api = Arc::clone(&self.api);
            async move { api.delete_incident(id).await }
        }))
        .await;

        let result = match results.into_iter().find(|result| result.is_err()) {
            Some(Err(err)) => {
                log::warn!("clearing {total} incidents: at least one delete failed: {err}");
                Err(err)
            }
            _ => Ok(()),
        };
        self.finish_mutation("clear incidents", result).await
    }

    /// The view always reflects the server's authoritative state: the
    /// forced cycle runs whether or not the mutation succeeded, and the
    /// mutation failure wins over any re-sync failure.
    async fn finish_mutation(
        &mut self,
        action: &str,
        result: Result<(), ApiError>,
    ) -> Result<(), DashboardError> {
        if let Err(err) = &result {
            log::warn!("{action} failed: {err}");
            self.emit(DashboardEvent::MutationFailed {
                action: action.to_owned(),
                error: err.to_string(),
            });
        }
        let sync = self.run_cycle().await;
        result?;
        sync
    }

    /// Fetches one incident's full details for the detail view.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Api`] when the fetch fails.
    pub async fn incident_details(&self, incident_id: i64) -> Result<Incident, DashboardError> {
        Ok(self.api.get_incident(incident_id).await?)
    }

    /// Fetches the profile behind a reporter reference.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Api`] when the fetch fails.
    pub async fn user_details(&self, user_id: i64) -> Result<UserProfile, DashboardError> {
        Ok(self.api.get_user(user_id).await?)
    }

    /// The last successfully reconciled snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// The current filtered view set.
    #[must_use]
    pub const fn view_set(&self) -> &ViewSet {
        &self.view_set
    }

    /// The synchronized marker/row projections.
    #[must_use]
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    /// Mutable access to the projections for hover/click interactions.
    pub const fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Summary analytics over the current snapshot, in the configured
    /// offset. `None` before the first successful cycle.
    #[must_use]
    pub fn summary(&self, now: DateTime<Utc>) -> Option<SummaryReport> {
        self.snapshot
            .as_ref()
            .map(|snapshot| rescue_map_analytics::summary_report(snapshot, now, self.config.tz))
    }

    /// Exports the current view set as a CSV report. `None` before the
    /// first successful cycle.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Export`] when rendering fails.
    pub fn export_report(&self) -> Result<Option<String>, DashboardError> {
        self.snapshot
            .as_ref()
            .map(|snapshot| {
                rescue_map_offline::export::export_report(&self.view_set, snapshot, self.config.tz)
            })
            .transpose()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rescue_map_models::{
        BaseUnit, Coordinate, IncidentStatus, IncidentTypeEntry, KinEntry, UnitStats,
    };
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn incident(id: i64) -> Incident {
        Incident {
            id,
            type_id: 1,
            status: IncidentStatus::Pending,
            coordinate: Some(Coordinate::new(13.7, -89.2)),
            timestamp: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            reporter: None,
            assigned_unit: None,
        }
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            url: "http://test/".to_owned(),
        }
    }

    /// Fake service with scripted incident feeds and failure switches.
    #[derive(Default)]
    struct FakeApi {
        feeds: StdMutex<Vec<Result<Vec<Incident>, ()>>>,
        list_calls: AtomicUsize,
        fail_updates: bool,
        deletes: AtomicUsize,
    }

    impl FakeApi {
        fn with_feeds(feeds: Vec<Result<Vec<Incident>, ()>>) -> Self {
            Self {
                feeds: StdMutex::new(feeds),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl RemoteApi for FakeApi {
        async fn list_incidents(&self) -> Result<Vec<Incident>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let mut feeds = self.feeds.lock().unwrap();
            let next = if feeds.len() > 1 {
                feeds.remove(0)
            } else {
                feeds.first().cloned().unwrap_or(Ok(vec![]))
            };
            next.map_err(|()| server_error())
        }

        async fn list_units(&self) -> Result<Vec<BaseUnit>, ApiError> {
            Ok(vec![])
        }

        async fn unit_stats(&self, _unit_id: i64) -> Result<UnitStats, ApiError> {
            Ok(UnitStats {
                active_incidents: 0,
            })
        }

        async fn catalog_incident_types(&self) -> Result<Vec<IncidentTypeEntry>, ApiError> {
            Ok(vec![])
        }

        async fn catalog_kin(&self) -> Result<Vec<KinEntry>, ApiError> {
            Ok(vec![])
        }

        async fn get_incident(&self, id: i64) -> Result<Incident, ApiError> {
            Ok(incident(id))
        }

        async fn get_user(&self, _id: i64) -> Result<UserProfile, ApiError> {
            Err(server_error())
        }

        async fn update_incident(
            &self,
            _id: i64,
            _update: &IncidentUpdate,
        ) -> Result<(), ApiError> {
            if self.fail_updates {
                return Err(server_error());
            }
            Ok(())
        }

        async fn delete_incident(&self, _id: i64) -> Result<(), ApiError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn create_unit(&self, _unit: &NewUnit) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn context(api: Arc<FakeApi>) -> (DashboardContext, mpsc::UnboundedReceiver<DashboardEvent>) {
        DashboardContext::new(api, DashboardConfig::new("http://test", "key"))
    }

    #[tokio::test]
    async fn failed_cycle_retains_the_previous_snapshot_and_view() {
        let api = Arc::new(FakeApi::with_feeds(vec![
            Ok(vec![incident(1)]),
            Err(()),
        ]));
        let (mut ctx, mut events) = context(Arc::clone(&api));

        ctx.run_cycle().await.unwrap();
        assert_eq!(ctx.snapshot().unwrap().incidents.len(), 1);
        assert_eq!(ctx.view().rows().len(), 1);

        let result = ctx.run_cycle().await;
        assert!(matches!(result, Err(DashboardError::Cycle(_))));
        // Prior state survives the transient failure.
        assert_eq!(ctx.snapshot().unwrap().incidents.len(), 1);
        assert_eq!(ctx.view().rows().len(), 1);

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, DashboardEvent::CycleFailed { .. }) {
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn failed_mutation_still_forces_a_resync() {
        let api = Arc::new(FakeApi {
            feeds: StdMutex::new(vec![Ok(vec![incident(1)])]),
            fail_updates: true,
            ..FakeApi::default()
        });
        let (mut ctx, mut events) = context(Arc::clone(&api));
        ctx.run_cycle().await.unwrap();
        let polls_before = api.list_calls.load(Ordering::SeqCst);

        let result = ctx.assign_unit(1, 4).await;
        assert!(matches!(result, Err(DashboardError::Api(_))));
        assert!(api.list_calls.load(Ordering::SeqCst) > polls_before);

        let mut saw_mutation_failure = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, DashboardEvent::MutationFailed { .. }) {
                saw_mutation_failure = true;
            }
        }
        assert!(saw_mutation_failure);
    }

    #[tokio::test]
    async fn clear_all_deletes_every_current_incident() {
        let api = Arc::new(FakeApi::with_feeds(vec![Ok(vec![
            incident(1),
            incident(2),
            incident(3),
        ])]));
        let (mut ctx, _events) = context(Arc::clone(&api));
        ctx.run_cycle().await.unwrap();

        ctx.clear_all_incidents().await.unwrap();
        assert_eq!(api.deletes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn predicate_change_reprojects_without_a_poll() {
        let api = Arc::new(FakeApi::with_feeds(vec![Ok(vec![
            incident(1),
            incident(2),
        ])]));
        let (mut ctx, _events) = context(Arc::clone(&api));
        ctx.run_cycle().await.unwrap();
        let polls = api.list_calls.load(Ordering::SeqCst);

        ctx.set_predicate(Predicate {
            status: Some(IncidentStatus::Resolved),
            ..Predicate::default()
        });
        assert!(ctx.view_set().is_empty());
        assert_eq!(ctx.view().rows().len(), 0);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test]
    async fn scheduler_skips_a_tick_while_a_cycle_holds_the_lock() {
        let api = Arc::new(FakeApi::default());
        let (ctx, _events) = context(api);
        let ctx = Arc::new(tokio::sync::Mutex::new(ctx));
        let scheduler = Scheduler::new(Arc::clone(&ctx), std::time::Duration::from_secs(5));

        let guard = ctx.lock().await;
        assert!(!scheduler.tick().await);
        drop(guard);
        assert!(scheduler.tick().await);
    }
}
