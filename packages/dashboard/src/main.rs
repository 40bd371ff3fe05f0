#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

use std::sync::Arc;

use rescue_map_api::HttpApi;
use rescue_map_dashboard::{DashboardConfig, DashboardContext, DashboardError, Scheduler};

#[tokio::main]
async fn main() -> Result<(), DashboardError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = DashboardConfig::from_env()?;
    let api = Arc::new(HttpApi::new(&config.api_base_url, &config.api_key)?);
    let analytics_interval = config.analytics_interval;
    let poll_interval = config.poll_interval;

    let (ctx, mut events) = DashboardContext::new(api, config);
    let ctx = Arc::new(tokio::sync::Mutex::new(ctx));

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                rescue_map_dashboard::DashboardEvent::NewIncident {
                    id,
                    type_label,
                    reporter,
                } => {
                    log::info!("new incident #{id}: {type_label} (reported by {reporter})");
                }
                rescue_map_dashboard::DashboardEvent::CycleCompleted {
                    incidents,
                    active,
                    available_units,
                } => {
                    log::info!(
                        "view refreshed: {incidents} incidents, {active} active, {available_units} units available"
                    );
                }
                rescue_map_dashboard::DashboardEvent::CycleFailed { error } => {
                    log::warn!("refresh failed, previous view retained: {error}");
                }
                rescue_map_dashboard::DashboardEvent::MutationFailed { action, error } => {
                    log::warn!("{action} rejected by the service: {error}");
                }
            }
        }
    });

    {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(analytics_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let ctx = ctx.lock().await;
                if let Some(report) = ctx.summary(chrono::Utc::now()) {
                    log::info!(
                        "analytics: {} incidents today, {} this week, {} this month",
                        report.temporal.today,
                        report.temporal.week,
                        report.temporal.month
                    );
                }
            }
        });
    }

    Scheduler::new(ctx, poll_interval).run().await;
    Ok(())
}
