use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{ClientError, RemoteServiceClient};
use crate::config::MonitorConfig;
use crate::status::{ConnectionStatus, HealthResponse, MonitorPhase, ProbeStats};

/// Tracks reachability of one remote service.
///
/// Probes run on a fixed schedule once [`start`](Self::start) is called and on
/// demand through [`retry`](Self::retry). Every update replaces the whole
/// [`ConnectionStatus`]; readers only ever see complete snapshots.
pub struct ConnectivityMonitor<C: RemoteServiceClient + 'static> {
    inner: Arc<Inner<C>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<C> {
    client: C,
    config: MonitorConfig,
    shared: Mutex<Shared>,
    publisher: watch::Sender<ConnectionStatus>,
}

struct Shared {
    status: ConnectionStatus,
    in_flight: u32,
    // Bumped by stop(); scheduled probes from an older timer never begin.
    epoch: u64,
    // Set by start() so the phase leaves Uninitialized before the first tick.
    activated: bool,
    stats: ProbeStats,
}

impl<C: RemoteServiceClient + 'static> ConnectivityMonitor<C> {
    pub fn new(client: C, config: MonitorConfig) -> Self {
        let status = ConnectionStatus::default();
        let (publisher, _) = watch::channel(status.clone());

        Self {
            inner: Arc::new(Inner {
                client,
                config,
                shared: Mutex::new(Shared {
                    status,
                    in_flight: 0,
                    epoch: 0,
                    activated: false,
                    stats: ProbeStats::default(),
                }),
                publisher,
            }),
            timer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &C {
        &self.inner.client
    }

    /// Probes now and then every `probe_interval` until [`stop`](Self::stop).
    ///
    /// Must be called from within a Tokio runtime. A second call while the
    /// schedule is active does nothing.
    pub fn start(&self) {
        let mut timer = lock(&self.timer);
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("monitor already running");
            return;
        }

        let epoch = {
            let mut shared = self.inner.lock();
            shared.activated = true;
            shared.epoch
        };
        let period = self.inner.config.probe_interval.max(Duration::from_millis(1));
        let inner = Arc::clone(&self.inner);

        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let inner = Arc::clone(&inner);
                // Detached so aborting the timer never cuts off a request mid-flight.
                tokio::spawn(async move {
                    inner.scheduled_probe(epoch).await;
                });
            }
        }));

        info!(interval_ms = %period.as_millis(), "connectivity monitor started");
    }

    /// Cancels the schedule. Safe to call when not running.
    ///
    /// A probe already in flight may still land its result; no scheduled
    /// probe begins after this returns.
    pub fn stop(&self) {
        let mut timer = lock(&self.timer);
        self.inner.lock().epoch += 1;

        if let Some(handle) = timer.take() {
            handle.abort();
            info!("connectivity monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.timer)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Runs one probe immediately, outside the schedule, and returns the
    /// snapshot it produced. Overlapping probes are allowed; the last one to
    /// complete decides the visible status.
    pub async fn retry(&self) -> ConnectionStatus {
        self.inner.begin().run().await
    }

    pub async fn check_connection(&self) -> ConnectionStatus {
        self.retry().await
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status.clone()
    }

    /// Receiver notified on every snapshot replacement.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.publisher.subscribe()
    }

    pub fn phase(&self) -> MonitorPhase {
        let shared = self.inner.lock();
        if !shared.activated && shared.stats.probes_started == 0 {
            MonitorPhase::Uninitialized
        } else if shared.status.is_loading {
            MonitorPhase::Loading
        } else if shared.status.is_connected {
            MonitorPhase::Connected
        } else {
            MonitorPhase::Disconnected
        }
    }

    pub fn stats(&self) -> ProbeStats {
        self.inner.lock().stats.clone()
    }

    #[cfg(test)]
    pub(crate) fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Runs what a timer tick armed under `epoch` runs.
    #[cfg(test)]
    pub(crate) async fn scheduled_probe(&self, epoch: u64) -> Option<ConnectionStatus> {
        self.inner.scheduled_probe(epoch).await
    }
}

impl<C: RemoteServiceClient + 'static> Drop for ConnectivityMonitor<C> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }
}

impl<C> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }

    fn abandon(&self) {
        let mut shared = self.lock();
        shared.in_flight = shared.in_flight.saturating_sub(1);
        shared.status.is_loading = shared.in_flight > 0;
        self.publisher.send_replace(shared.status.clone());
        debug!("probe abandoned before completion");
    }
}

impl<C: RemoteServiceClient> Inner<C> {
    async fn scheduled_probe(&self, epoch: u64) -> Option<ConnectionStatus> {
        let guard = self.begin_scheduled(epoch)?;
        Some(guard.run().await)
    }

    fn begin(&self) -> ProbeGuard<'_, C> {
        let mut shared = self.lock();
        self.mark_in_flight(&mut shared)
    }

    /// Begins only if no stop() happened since the timer was armed; the
    /// check and the in-flight mark share one lock acquisition.
    fn begin_scheduled(&self, epoch: u64) -> Option<ProbeGuard<'_, C>> {
        let mut shared = self.lock();
        if epoch != shared.epoch {
            shared.stats.probes_skipped += 1;
            debug!("skipping probe scheduled before stop");
            return None;
        }
        Some(self.mark_in_flight(&mut shared))
    }

    fn mark_in_flight(&self, shared: &mut Shared) -> ProbeGuard<'_, C> {
        shared.in_flight += 1;
        shared.stats.probes_started += 1;
        shared.status = shared.status.loading();
        self.publisher.send_replace(shared.status.clone());
        debug!(in_flight = shared.in_flight, "probe started");

        ProbeGuard {
            inner: self,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(
        &self,
        outcome: Result<HealthResponse, ClientError>,
        rtt: Duration,
    ) -> ConnectionStatus {
        let mut shared = self.lock();
        shared.in_flight = shared.in_flight.saturating_sub(1);
        let still_loading = shared.in_flight > 0;

        let now = Utc::now();
        let at = match shared.status.last_checked {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        let was_connected = shared.status.is_connected;
        shared.stats.last_rtt_ms = Some(rtt.as_millis());

        let next = match outcome {
            Ok(health) => {
                shared.stats.probes_ok += 1;
                if !was_connected {
                    info!(status = %health.status, remote_ts = %health.timestamp, "service reachable");
                }
                ConnectionStatus::connected(at, still_loading)
            }
            Err(err) => {
                shared.stats.probes_failed += 1;
                warn!(error = %err, "health probe failed");
                ConnectionStatus::disconnected(err.to_string(), at, still_loading)
            }
        };

        shared.status = next.clone();
        self.publisher.send_replace(next.clone());
        next
    }
}

/// An in-flight probe. Dropping it unfinished (the caller's future was
/// cancelled) releases its share of the loading flag.
struct ProbeGuard<'a, C> {
    inner: &'a Inner<C>,
    started: Instant,
    finished: bool,
}

impl<C: RemoteServiceClient> ProbeGuard<'_, C> {
    async fn run(mut self) -> ConnectionStatus {
        let outcome = self.inner.client.health_check().await;
        self.finished = true;
        self.inner.finish(outcome, self.started.elapsed())
    }
}

impl<C> Drop for ProbeGuard<'_, C> {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.abandon();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
