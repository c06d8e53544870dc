// ── Polling cycle engine ──
//
// Single owner of the router session, the device inventory and the sinks.
// Cycles run strictly one after another on the caller's task; the only
// suspension between them is the scheduled wait, which races the
// cancellation token.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fritzha_api::SessionClient;

use crate::config::{DeviceConfig, PollerConfig};
use crate::error::CoreError;
use crate::inventory::{Inventory, ReconcileReport};
use crate::schedule::next_cycle_delay;
use crate::sink::MeasurementSink;

/// Pause before the next attempt after the router was unreachable.
pub const RETRY_PAUSE: Duration = Duration::from_secs(2);

/// How [`Poller::run`] behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Run exactly one cycle, then return.
    pub once: bool,
    /// Running unattended: per-cycle progress is logged at debug level.
    pub service: bool,
}

/// Running totals since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Cycles attempted.
    pub cycles: u64,
    /// Cycles that ended in an ignorable error.
    pub failures: u64,
}

/// Result of one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub measured_at: DateTime<Utc>,
    /// Inventory devices present in this cycle's device list.
    pub updated: usize,
    /// Devices handed to the sinks.
    pub published: usize,
}

/// What the loop does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextCycle {
    /// Wait for the next aligned cycle time.
    Scheduled,
    /// Retry after [`RETRY_PAUSE`]; the router was unreachable.
    Retry,
}

pub struct Poller {
    session: SessionClient,
    inventory: Inventory,
    sinks: Vec<Box<dyn MeasurementSink>>,
    interval_secs: u64,
    report: ReconcileReport,
    stats: PollStats,
}

impl Poller {
    /// Log in, build the inventory and match it against `config.devices`.
    ///
    /// On failure the session is logged off and `sinks` are closed before
    /// the error is returned.
    pub async fn start(
        config: &PollerConfig,
        mut sinks: Vec<Box<dyn MeasurementSink>>,
    ) -> Result<Self, CoreError> {
        let router = &config.router;
        let session = match SessionClient::new(
            router.url.as_str(),
            router.username.clone(),
            router.password.clone(),
            &router.transport,
        ) {
            Ok(session) => session,
            Err(e) => {
                close_sinks(&mut sinks).await;
                return Err(e.into());
            }
        };
        Self::from_session(session, config.interval_secs, &config.devices, sinks).await
    }

    /// Like [`start`](Self::start), with a caller-built session client.
    pub async fn from_session(
        mut session: SessionClient,
        interval_secs: u64,
        devices: &[DeviceConfig],
        mut sinks: Vec<Box<dyn MeasurementSink>>,
    ) -> Result<Self, CoreError> {
        match connect(&mut session, devices).await {
            Ok((inventory, report)) => {
                info!(
                    devices = inventory.len(),
                    monitored = inventory.devices().iter().filter(|d| d.is_monitored).count(),
                    sinks = sinks.len(),
                    "poller started"
                );
                Ok(Self {
                    session,
                    inventory,
                    sinks,
                    interval_secs,
                    report,
                    stats: PollStats::default(),
                })
            }
            Err(e) => {
                session.logoff().await;
                close_sinks(&mut sinks).await;
                Err(e)
            }
        }
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Configuration mismatches found at start.
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.report
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    // ── Cycles ───────────────────────────────────────────────────────

    /// Run one measurement round.
    ///
    /// An empty answer from the router usually means the session expired:
    /// log in again and retry once before giving up on the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CoreError> {
        self.inventory.begin_cycle();
        let measured_at = Utc::now();

        let list = if let Some(list) = self.session.get_device_list().await? {
            list
        } else {
            debug!("device list request returned nothing, renewing session");
            self.session.login().await?;
            self.session
                .get_device_list()
                .await?
                .ok_or_else(|| CoreError::CycleFailed {
                    message: "no device list even after renewing the session".into(),
                })?
        };

        let updated = self.inventory.apply_measurements(&list, measured_at);

        let devices = self.inventory.publishable();
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(measured_at, &devices).await {
                warn!(sink = sink.name(), error = %e, "publish failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        Ok(CycleReport {
            measured_at,
            updated,
            published: devices.len(),
        })
    }

    /// Count and log a cycle outcome and decide how the loop continues.
    ///
    /// Fatal errors are handed back unchanged.
    pub fn on_cycle_result(
        &mut self,
        result: Result<CycleReport, CoreError>,
        service: bool,
    ) -> Result<NextCycle, CoreError> {
        self.stats.cycles += 1;
        match result {
            Ok(report) => {
                if service {
                    debug!(
                        cycle = self.stats.cycles,
                        updated = report.updated,
                        published = report.published,
                        "measurement cycle complete"
                    );
                } else {
                    info!(
                        cycle = self.stats.cycles,
                        updated = report.updated,
                        published = report.published,
                        "measurement cycle complete"
                    );
                }
                Ok(NextCycle::Scheduled)
            }
            Err(e @ CoreError::Connection { .. }) => {
                self.stats.failures += 1;
                error!(
                    error = %e,
                    failures = self.stats.failures,
                    "router unreachable, retrying"
                );
                Ok(NextCycle::Retry)
            }
            // The router answered; only delivery failed. Keep the cadence.
            Err(e @ CoreError::Sink { .. }) => {
                self.stats.failures += 1;
                error!(
                    error = %e,
                    failures = self.stats.failures,
                    "measurement cycle failed"
                );
                Ok(NextCycle::Scheduled)
            }
            Err(e) => {
                error!(error = %e, fatal = true, "measurement cycle failed");
                Err(e)
            }
        }
    }

    /// Run cycles until `cancel` fires, a fatal error occurs, or after the
    /// first cycle when `options.once` is set.
    ///
    /// Outside single-cycle mode even the first cycle waits for the next
    /// boundary. Does not release anything; call [`close`](Self::close)
    /// afterwards on every path.
    pub async fn run(
        &mut self,
        options: RunOptions,
        cancel: &CancellationToken,
    ) -> Result<PollStats, CoreError> {
        let mut wait = (!options.once).then_some(NextCycle::Scheduled);
        loop {
            if let Some(next) = wait {
                let delay = match next {
                    NextCycle::Scheduled => next_cycle_delay(self.interval_secs, &Local::now()),
                    NextCycle::Retry => RETRY_PAUSE,
                };
                debug!(delay_ms = delay.as_millis(), "waiting for next cycle");

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                result = self.run_cycle() => result,
            };
            let next = self.on_cycle_result(result, options.service)?;
            if options.once {
                break;
            }
            wait = Some(next);
        }

        debug!(cycles = self.stats.cycles, failures = self.stats.failures, "polling stopped");
        Ok(self.stats)
    }

    /// Log off the router and close every sink. Best effort.
    pub async fn close(mut self) {
        self.session.logoff().await;
        close_sinks(&mut self.sinks).await;
    }
}

async fn connect(
    session: &mut SessionClient,
    devices: &[DeviceConfig],
) -> Result<(Inventory, ReconcileReport), CoreError> {
    session.login().await?;
    let mut inventory = Inventory::sync(session).await?;
    let report = inventory.reconcile(devices);
    if !report.orphaned.is_empty() || !report.unconfigured.is_empty() {
        warn!(
            orphaned = report.orphaned.len(),
            unconfigured = report.unconfigured.len(),
            "device configuration does not match the router"
        );
    }
    Ok((inventory, report))
}

async fn close_sinks(sinks: &mut [Box<dyn MeasurementSink>]) {
    for sink in sinks {
        if let Err(e) = sink.close().await {
            warn!(sink = sink.name(), error = %e, "closing sink failed");
        }
    }
}

