//! Time-driven reconciliation of appointment state.
//!
//! A pass scans every appointment, recomputes the state of slot-holding ones
//! from the current date, persists all changes in a single batch, and then
//! mirrors appointments that just entered `planned` to the external calendar.
//! Each transition is a pure function of `now`, so processing order is
//! irrelevant and a repeated pass with the same `now` changes nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::appointment::AppointmentState;
use crate::clock::Clock;
use crate::config::Config;
use crate::directory::{AppointmentTypeDirectory, CareDirectory};
use crate::error::Result;
use crate::store::{AppointmentStore, StateChange};
use crate::sync::{build_draft, CalendarSyncGateway};

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    /// Appointments examined.
    pub scanned: usize,
    /// State changes persisted.
    pub transitioned: usize,
    /// Appointments that entered `planned` this pass.
    pub entered_planned: usize,
    /// Successful calendar upserts.
    pub synced: usize,
    /// Failed calendar upserts (logged, not retried within the pass).
    pub sync_failures: usize,
}

/// Periodic state advancement over the whole appointment store.
pub struct Reconciler {
    store: Arc<dyn AppointmentStore>,
    directory: Arc<dyn CareDirectory>,
    types: Arc<dyn AppointmentTypeDirectory>,
    gateway: Arc<dyn CalendarSyncGateway>,
    default_duration_minutes: u32,
    timezone: String,
}

impl Reconciler {
    /// Create a reconciler over the given collaborators.
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        directory: Arc<dyn CareDirectory>,
        types: Arc<dyn AppointmentTypeDirectory>,
        gateway: Arc<dyn CalendarSyncGateway>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            directory,
            types,
            gateway,
            default_duration_minutes: config.scheduling.default_duration_minutes,
            timezone: config.calendar.timezone.clone(),
        }
    }

    /// Run one reconciliation pass against the given instant.
    ///
    /// Pending and terminal appointments are never touched. Calendar
    /// propagation happens after the batch write and is detected against the
    /// state persisted *before* this pass, so a sync is attempted at most
    /// once per transition into `planned`; a failed upsert is not retried
    /// until some later pass produces that transition again.
    pub async fn reconcile_all(&self, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
        let today = now.date_naive();
        let appointments = self.store.list_all().await?;

        let mut outcome = ReconcileOutcome {
            scanned: appointments.len(),
            ..Default::default()
        };

        let mut changes = Vec::new();
        let mut to_sync = Vec::new();
        for appointment in appointments {
            let Some(next) = appointment.reconciled_state(today) else {
                continue;
            };
            debug!(
                "appointment {} ({} {}): {} -> {}",
                appointment.id, appointment.date, appointment.time, appointment.state, next
            );
            changes.push(StateChange {
                id: appointment.id,
                state: next,
            });
            if next == AppointmentState::Planned {
                // reconciled_state only reports changes, so the persisted
                // pre-pass state necessarily differed from planned.
                let mut entering = appointment;
                entering.state = next;
                to_sync.push(entering);
            }
        }

        outcome.transitioned = self.store.apply_states(&changes).await?;

        for appointment in to_sync {
            outcome.entered_planned += 1;
            let draft = match build_draft(
                &appointment,
                self.directory.as_ref(),
                self.types.as_ref(),
                self.default_duration_minutes,
                &self.timezone,
            )
            .await
            {
                Ok(draft) => draft,
                Err(err) => {
                    warn!(
                        "could not build calendar event for appointment {}: {}",
                        appointment.id, err
                    );
                    outcome.sync_failures += 1;
                    continue;
                }
            };

            match self.gateway.upsert(&draft).await {
                Ok(()) => outcome.synced += 1,
                Err(err) => {
                    warn!(
                        "calendar sync failed for appointment {}: {}",
                        appointment.id, err
                    );
                    outcome.sync_failures += 1;
                }
            }
        }

        info!(
            "reconciliation pass: {} scanned, {} transitioned, {} synced, {} sync failures",
            outcome.scanned, outcome.transitioned, outcome.synced, outcome.sync_failures
        );
        Ok(outcome)
    }
}

/// Background task driving fixed-interval reconciliation passes.
///
/// A pass runs to completion before the next tick is honored, so passes
/// never overlap.
pub async fn run_reconciler_loop(
    reconciler: Arc<Reconciler>,
    clock: Arc<dyn Clock>,
    interval: std::time::Duration,
) {
    info!(
        "reconciler started ({}s interval)",
        interval.as_secs()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = reconciler.reconcile_all(clock.now()).await {
            error!("reconciliation pass failed: {}", err);
        }
    }
}
