//! Fixed-period poll sampler.
//!
//! Fires every four seconds (by default). On each tick, if the
//! connection is up, no earlier tick is still sampling, and the channel
//! guard is free, one sampling task is spawned that holds the channel
//! for a fixed sequence of round trips: both aggregated snapshots plus
//! every setpoint/mode state the presentation layer displays. A busy
//! channel means the tick is skipped outright -- missed ticks are never
//! queued or retried; sampling is best-effort.
//!
//! Results are delivered through a `watch` channel tagged with a
//! monotonically increasing tick sequence; a result from an earlier
//! tick never overwrites a later tick's already-delivered result.
//!
//! Independently of per-tick delivery, the sampler appends one record
//! to the trailing-window safety log when at least the configured
//! interval (default 600 s) has elapsed since the last one. Shutdown is
//! graceful: cancellation waits for the in-flight iteration, including
//! its log write, so no half-written record is left behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use phytolib_core::error::Result;
use phytolib_core::types::{
    LightMode, PumpSnapshot, ReactorMode, ScheduleTime, SensorSensitivity, SensorSnapshot,
};
use phytolib_telemetry::{LogRecord, TelemetryStore};

use crate::commands;
use crate::guard::ChannelHold;
use crate::reactor::Algaemist;

/// Default poll cadence.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(4);

/// Default minimum spacing between safety-log records.
pub const DEFAULT_SAFETY_LOG_INTERVAL: Duration = Duration::from_secs(600);

/// Default trailing window of the safety log.
pub const DEFAULT_SAFETY_LOG_WINDOW: Duration = Duration::from_secs(72 * 3600);

/// Timing configuration for the poll sampler.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Poll cadence.
    pub period: Duration,
    /// Minimum spacing between safety-log appends.
    pub safety_log_interval: Duration,
    /// Trailing retention window of the safety log.
    pub safety_log_window: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            period: DEFAULT_PERIOD,
            safety_log_interval: DEFAULT_SAFETY_LOG_INTERVAL,
            safety_log_window: DEFAULT_SAFETY_LOG_WINDOW,
        }
    }
}

/// The composite result of one sampling tick.
///
/// Individual fields are `None` when their round trip failed; a failed
/// read never aborts the rest of the tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    /// Tick sequence number, monotonically increasing per sampled tick.
    pub seq: u64,
    /// Aggregated sensor snapshot.
    pub sensors: Option<SensorSnapshot>,
    /// Aggregated pump snapshot.
    pub pumps: Option<PumpSnapshot>,
    /// Day temperature setpoint.
    pub temp_setpoint: Option<f64>,
    /// Temperature control state.
    pub temp_control_on: Option<bool>,
    /// pH setpoint.
    pub ph_setpoint: Option<f64>,
    /// pH control state.
    pub ph_control_on: Option<bool>,
    /// pH probe correction factor.
    pub ph_correction: Option<f64>,
    /// Light brightness.
    pub brightness: Option<f64>,
    /// Light control mode.
    pub light_mode: Option<LightMode>,
    /// Light ON schedule time.
    pub light_on: Option<ScheduleTime>,
    /// Light OFF schedule time.
    pub light_off: Option<ScheduleTime>,
    /// Secondary light sensor sensitivity.
    pub sensitivity: Option<SensorSensitivity>,
    /// Turbidity setpoint.
    pub turb_setpoint: Option<f64>,
    /// Reactor operating mode.
    pub reactor_mode: Option<ReactorMode>,
}

/// Handle to the running sampler task.
pub struct PollSampler {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    updates: watch::Receiver<Option<PollUpdate>>,
}

impl PollSampler {
    /// Spawn the sampler for `reactor`, logging its safety trail to
    /// `store`.
    pub fn spawn(
        reactor: Arc<Algaemist>,
        store: Arc<TelemetryStore>,
        config: SamplerConfig,
    ) -> Self {
        let (tx, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(reactor, store, config, tx, cancel.clone()));
        PollSampler {
            cancel,
            task,
            updates: rx,
        }
    }

    /// A receiver of the latest delivered [`PollUpdate`].
    pub fn updates(&self) -> watch::Receiver<Option<PollUpdate>> {
        self.updates.clone()
    }

    /// Stop the sampler, waiting for the in-flight iteration (reads and
    /// log write) to finish. No mid-write interruption.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

async fn run(
    reactor: Arc<Algaemist>,
    store: Arc<TelemetryStore>,
    config: SamplerConfig,
    tx: watch::Sender<Option<PollUpdate>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(config.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut seq: u64 = 0;
    let mut last_safety_log: Option<tokio::time::Instant> = None;
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                if let Some(task) = in_flight.take() {
                    let _ = task.await;
                }
                debug!("poll sampler cancelled");
                break;
            }

            _ = interval.tick() => {
                if let Some(task) = &in_flight {
                    if !task.is_finished() {
                        debug!("previous sample still running, skipping tick");
                        continue;
                    }
                }
                if !reactor.is_connected() {
                    continue;
                }
                // The whole tick samples under one hold; a busy channel
                // means skip, never queue.
                let Some(hold) = reactor.guard().try_hold() else {
                    debug!("channel held, skipping poll tick");
                    continue;
                };

                seq += 1;
                let do_log = last_safety_log
                    .is_none_or(|t| t.elapsed() >= config.safety_log_interval);
                if do_log {
                    last_safety_log = Some(tokio::time::Instant::now());
                }

                in_flight = Some(tokio::spawn(sample_tick(
                    reactor.clone(),
                    store.clone(),
                    tx.clone(),
                    hold,
                    seq,
                    do_log,
                    config.safety_log_window,
                )));
            }
        }
    }
}

/// One sampling iteration: the fixed sequence of round trips, delivery,
/// and (when due) the safety-log append.
async fn sample_tick(
    reactor: Arc<Algaemist>,
    store: Arc<TelemetryStore>,
    tx: watch::Sender<Option<PollUpdate>>,
    mut hold: ChannelHold,
    seq: u64,
    do_log: bool,
    window: Duration,
) {
    let addr = reactor.address();

    let sensors = reactor.read_sensors_with(&mut hold).await;
    let pumps = reactor.read_pumps_with(&mut hold).await;
    let temp_setpoint = reactor
        .read_float_with(&mut hold, &commands::cmd_read_temp_setpoint(addr), 'r', "temperature setpoint")
        .await;
    let temp_control_on = reactor
        .read_bool_with(&mut hold, &commands::cmd_read_temp_control(addr), 'r', "temperature control state")
        .await;
    let ph_setpoint = reactor
        .read_float_with(&mut hold, &commands::cmd_read_ph_setpoint(addr), 'p', "pH setpoint")
        .await;
    let ph_control_on = reactor
        .read_bool_with(&mut hold, &commands::cmd_read_ph_control(addr), 'p', "pH control state")
        .await;
    let ph_correction = reactor
        .read_float_with(&mut hold, &commands::cmd_read_ph_correction(addr), 'p', "pH correction")
        .await;
    let brightness = reactor
        .read_float_with(&mut hold, &commands::cmd_read_brightness(addr), 'b', "brightness")
        .await;
    let light_mode = parsed(
        reactor
            .exchange_with(&mut hold, &commands::cmd_read_light_mode(addr), "light mode")
            .await,
        commands::parse_light_mode,
        "light mode",
    );
    let light_on = parsed(
        reactor
            .exchange_with(&mut hold, &commands::cmd_read_light_on_time(addr), "light ON time")
            .await,
        |line| commands::parse_schedule(line, 'n'),
        "light ON time",
    );
    let light_off = parsed(
        reactor
            .exchange_with(&mut hold, &commands::cmd_read_light_off_time(addr), "light OFF time")
            .await,
        |line| commands::parse_schedule(line, 'k'),
        "light OFF time",
    );
    let sensitivity = parsed(
        reactor
            .exchange_with(&mut hold, &commands::cmd_read_sensitivity(addr), "sensitivity")
            .await,
        commands::parse_sensitivity,
        "sensitivity",
    );
    let turb_setpoint = reactor
        .read_float_with(&mut hold, &commands::cmd_read_turbidity_setpoint(addr), 'u', "turbidity setpoint")
        .await;
    let reactor_mode = parsed(
        reactor
            .exchange_with(&mut hold, &commands::cmd_read_reactor_mode(addr), "reactor mode")
            .await,
        commands::parse_reactor_mode,
        "reactor mode",
    );

    // Release the channel before delivery and disk I/O.
    drop(hold);

    let update = PollUpdate {
        seq,
        sensors,
        pumps,
        temp_setpoint,
        temp_control_on,
        ph_setpoint,
        ph_control_on,
        ph_correction,
        brightness,
        light_mode,
        light_on,
        light_off,
        sensitivity,
        turb_setpoint,
        reactor_mode,
    };

    deliver(&tx, update);

    if do_log {
        match (sensors, pumps) {
            (Some(sensors), Some(pumps)) => {
                let record = LogRecord::now(sensors, pumps, None);
                let store = store.clone();
                match tokio::task::spawn_blocking(move || store.windowed_append(&record, window))
                    .await
                {
                    Ok(Ok(())) => debug!("safety log record appended"),
                    Ok(Err(e)) => warn!(error = %e, "failed to append safety log record"),
                    Err(e) => warn!(error = %e, "safety log task failed"),
                }
            }
            _ => warn!("safety log skipped: snapshot read failed"),
        }
    }
}

/// Hand a finished update to the watch channel unless a later tick has
/// already been delivered.
fn deliver(tx: &watch::Sender<Option<PollUpdate>>, update: PollUpdate) {
    tx.send_if_modified(|current| match current {
        Some(delivered) if delivered.seq >= update.seq => {
            debug!(
                stale = update.seq,
                delivered = delivered.seq,
                "dropping stale poll result"
            );
            false
        }
        _ => {
            *current = Some(update);
            true
        }
    });
}

fn parsed<T>(
    line: Option<String>,
    parse: impl FnOnce(&str) -> Result<T>,
    what: &str,
) -> Option<T> {
    let line = line?;
    match parse(&line) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(command = what, error = %e, "failed to parse reply");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AlgaemistBuilder;
    use phytolib_core::types::DeviceAddress;
    use phytolib_test_harness::MockTransport;

    fn addr() -> DeviceAddress {
        DeviceAddress::new(21).unwrap()
    }

    /// Pre-load one full tick worth of expectations, in the fixed
    /// sampling order.
    fn expect_tick(mock: &mut MockTransport) {
        mock.expect(b"/21x0000", b"x21.5;7.20;300.0;310.0;50.0;12.0\n");
        mock.expect(b"/21q0000", b"q10.0;20.0;0.0;5.0\n");
        mock.expect(b"/21r0000", b"r21.0\n");
        mock.expect(b"/21r0003", b"r1\n");
        mock.expect(b"/21p0000", b"p7.5\n");
        mock.expect(b"/21p0003", b"p0\n");
        mock.expect(b"/21p0005", b"p1.02\n");
        mock.expect(b"/21b0000", b"b80.0\n");
        mock.expect(b"/21o0000", b"o2\n");
        mock.expect(b"/21n0000", b"n730\n");
        mock.expect(b"/21k0000", b"k2230\n");
        mock.expect(b"/21s0000", b"s1\n");
        mock.expect(b"/21u0000", b"u150.0\n");
        mock.expect(b"/21m0000", b"m0000^2\n");
    }

    async fn reactor_with(mock: MockTransport) -> Arc<Algaemist> {
        let reactor = AlgaemistBuilder::new(addr())
            .settle_delay(Duration::from_millis(1))
            .sync_clock(false)
            .connect_with_transport(Box::new(mock))
            .await
            .unwrap();
        Arc::new(reactor)
    }

    fn test_config() -> SamplerConfig {
        SamplerConfig {
            period: Duration::from_millis(50),
            safety_log_interval: Duration::from_secs(600),
            safety_log_window: DEFAULT_SAFETY_LOG_WINDOW,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tick_delivers_composite_update() {
        let mut mock = MockTransport::new();
        expect_tick(&mut mock);
        let reactor = reactor_with(mock).await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TelemetryStore::new(dir.path().join("safety.csv")));
        let sampler = PollSampler::spawn(reactor, store, test_config());
        let mut updates = sampler.updates();

        updates
            .wait_for(|u| u.is_some())
            .await
            .expect("sampler delivered no update");
        let update = updates.borrow().clone().unwrap();

        assert_eq!(update.seq, 1);
        assert_eq!(update.sensors.unwrap().temp_c, 21.5);
        assert_eq!(update.pumps.unwrap().turb_pump, 5.0);
        assert_eq!(update.temp_setpoint, Some(21.0));
        assert_eq!(update.temp_control_on, Some(true));
        assert_eq!(update.ph_setpoint, Some(7.5));
        assert_eq!(update.ph_control_on, Some(false));
        assert_eq!(update.light_mode, Some(LightMode::Timed));
        assert_eq!(update.light_on, Some(ScheduleTime::new(7, 30).unwrap()));
        assert_eq!(update.light_off, Some(ScheduleTime::new(22, 30).unwrap()));
        assert_eq!(update.sensitivity, Some(SensorSensitivity::High));
        assert_eq!(update.turb_setpoint, Some(150.0));
        assert_eq!(update.reactor_mode, Some(ReactorMode::Chemostat));

        sampler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_appends_safety_log_record() {
        let mut mock = MockTransport::new();
        expect_tick(&mut mock);
        let reactor = reactor_with(mock).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("safety.csv");
        let store = Arc::new(TelemetryStore::new(&path));
        let sampler = PollSampler::spawn(reactor, store, test_config());
        let mut updates = sampler.updates();

        updates.wait_for(|u| u.is_some()).await.unwrap();
        sampler.shutdown().await;

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2, "header plus one safety record");
        assert!(lines[1].contains("21.5"));
    }

    #[tokio::test(start_paused = true)]
    async fn busy_channel_skips_tick_without_traffic() {
        let mut mock = MockTransport::new();
        expect_tick(&mut mock);
        let reactor = reactor_with(mock).await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(TelemetryStore::new(dir.path().join("safety.csv")));

        // Hold the channel so the first ticks must be skipped.
        let hold = reactor.guard().try_hold().unwrap();
        let sampler = PollSampler::spawn(reactor.clone(), store, test_config());
        let mut updates = sampler.updates();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(updates.borrow().is_none(), "skipped ticks must not sample");

        // Released: the next tick samples normally and gets seq 1.
        drop(hold);
        updates.wait_for(|u| u.is_some()).await.unwrap();
        assert_eq!(updates.borrow().as_ref().unwrap().seq, 1);

        sampler.shutdown().await;
    }

    #[test]
    fn stale_result_never_overwrites_newer_delivery() {
        let (tx, rx) = watch::channel(None);
        let newer = PollUpdate {
            seq: 5,
            sensors: None,
            pumps: None,
            temp_setpoint: Some(20.0),
            temp_control_on: None,
            ph_setpoint: None,
            ph_control_on: None,
            ph_correction: None,
            brightness: None,
            light_mode: None,
            light_on: None,
            light_off: None,
            sensitivity: None,
            turb_setpoint: None,
            reactor_mode: None,
        };
        let stale = PollUpdate {
            seq: 4,
            temp_setpoint: Some(99.0),
            ..newer.clone()
        };

        deliver(&tx, newer);
        deliver(&tx, stale);

        let delivered = rx.borrow().clone().unwrap();
        assert_eq!(delivered.seq, 5);
        assert_eq!(delivered.temp_setpoint, Some(20.0));
    }
}
