//! Algaemist -- the typed command client for one reactor unit.
//!
//! One operation per device capability, built from the codec
//! ([`crate::commands`]) and the channel guard ([`crate::guard`]).
//!
//! # Failure contract
//!
//! Getters return `Option`: a transport failure, a silent device, or a
//! malformed reply is logged and surfaced as `None`, never as an error
//! the caller must unwind. Setters return `bool`: success means the
//! reply carried the opcode's completion sentinel; everything else is
//! logged, reported as `false`, and -- for sentinel failures -- emitted
//! as an operator-facing [`Alert::CommandRejected`]. One failed poll or
//! one garbled reply never destabilizes the caller.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::broadcast;
use tracing::{info, warn};

use phytolib_core::error::Result;
use phytolib_core::events::{Alert, ReactorEvent};
use phytolib_core::types::{
    DeviceAddress, LightMode, LightRange, PhPumpSource, PumpSnapshot, ReactorMode, ScheduleTime,
    SensorSensitivity, SensorSnapshot,
};
use phytolib_telemetry::{LogRecord, TelemetryStore};

use crate::commands;
use crate::guard::{ChannelGuard, ChannelHold};
use crate::retry;

/// A connected Algaemist reactor.
///
/// Constructed via [`AlgaemistBuilder`](crate::builder::AlgaemistBuilder).
/// All communication goes through the [`ChannelGuard`] provided at build
/// time, so the client is cheap to share behind an `Arc`.
pub struct Algaemist {
    /// Current device address; updated by a successful re-address.
    address: AtomicU8,
    guard: ChannelGuard,
    event_tx: broadcast::Sender<ReactorEvent>,
}

impl Algaemist {
    pub(crate) fn new(address: DeviceAddress, guard: ChannelGuard) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Algaemist {
            address: AtomicU8::new(address.value()),
            guard,
            event_tx,
        }
    }

    /// The unit's current device address.
    pub fn address(&self) -> DeviceAddress {
        DeviceAddress::new(self.address.load(Ordering::SeqCst))
            .expect("stored address is always valid")
    }

    /// Whether the serial channel is believed connected.
    pub fn is_connected(&self) -> bool {
        self.guard.is_connected()
    }

    /// The channel guard, for contention probes and whole-tick holds.
    pub fn guard(&self) -> &ChannelGuard {
        &self.guard
    }

    /// Subscribe to connection events and operator alerts.
    pub fn subscribe(&self) -> broadcast::Receiver<ReactorEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: ReactorEvent) {
        // Nobody listening is fine; alerts are best-effort broadcast.
        let _ = self.event_tx.send(event);
    }

    /// Close the channel and notify subscribers.
    pub async fn disconnect(&self) {
        if let Err(e) = self.guard.close().await {
            warn!(error = %e, "error while closing channel");
        }
        self.emit(ReactorEvent::Disconnected);
        info!("disconnected");
    }

    /// Run `op` under the busy-retry policy: while the channel is held,
    /// the attempt is rescheduled after a fixed delay up to a bounded
    /// number of tries; exhaustion yields [`Error::Busy`] and exactly
    /// one [`Alert::BusyTimeout`].
    pub async fn with_busy_retry<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        retry::with_busy_retry(&self.guard, what, op)
            .await
            .map_err(|e| {
                self.emit(ReactorEvent::Alert(Alert::BusyTimeout {
                    command: what.to_string(),
                }));
                e
            })
    }

    // -----------------------------------------------------------------
    // Generic exchange helpers
    // -----------------------------------------------------------------

    async fn hold_connected(&self, what: &str) -> Option<ChannelHold> {
        if !self.guard.is_connected() {
            warn!(command = what, "command issued while not connected");
            return None;
        }
        Some(self.guard.hold().await)
    }

    pub(crate) async fn exchange_with(
        &self,
        hold: &mut ChannelHold,
        frame: &[u8],
        what: &str,
    ) -> Option<String> {
        match hold.transaction(frame, true, None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(command = what, error = %e, "transaction failed");
                None
            }
        }
    }

    pub(crate) async fn read_float_with(
        &self,
        hold: &mut ChannelHold,
        frame: &[u8],
        opcode: char,
        what: &str,
    ) -> Option<f64> {
        let line = self.exchange_with(hold, frame, what).await?;
        self.ok_or_log(commands::parse_float(&line, opcode), what)
    }

    pub(crate) async fn read_bool_with(
        &self,
        hold: &mut ChannelHold,
        frame: &[u8],
        opcode: char,
        what: &str,
    ) -> Option<bool> {
        let line = self.exchange_with(hold, frame, what).await?;
        self.ok_or_log(commands::parse_bool(&line, opcode), what)
    }

    pub(crate) async fn read_sensors_with(&self, hold: &mut ChannelHold) -> Option<SensorSnapshot> {
        let frame = commands::cmd_read_all_sensors(self.address());
        let line = self.exchange_with(hold, &frame, "read sensors").await?;
        self.ok_or_log(commands::parse_sensor_snapshot(&line), "read sensors")
    }

    pub(crate) async fn read_pumps_with(&self, hold: &mut ChannelHold) -> Option<PumpSnapshot> {
        let frame = commands::cmd_read_all_pumps(self.address());
        let line = self.exchange_with(hold, &frame, "read pumps").await?;
        self.ok_or_log(commands::parse_pump_snapshot(&line), "read pumps")
    }

    fn ok_or_log<T>(&self, parsed: Result<T>, what: &str) -> Option<T> {
        match parsed {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(command = what, error = %e, "failed to parse reply");
                None
            }
        }
    }

    async fn read_float(&self, frame: Vec<u8>, opcode: char, what: &str) -> Option<f64> {
        let mut hold = self.hold_connected(what).await?;
        self.read_float_with(&mut hold, &frame, opcode, what).await
    }

    async fn read_bool(&self, frame: Vec<u8>, opcode: char, what: &str) -> Option<bool> {
        let mut hold = self.hold_connected(what).await?;
        self.read_bool_with(&mut hold, &frame, opcode, what).await
    }

    async fn read_line(&self, frame: Vec<u8>, what: &str) -> Option<String> {
        let mut hold = self.hold_connected(what).await?;
        self.exchange_with(&mut hold, &frame, what).await
    }

    /// Send a write command and interpret its completion sentinel.
    async fn set_op(&self, frame: Vec<u8>, sentinel: &str, what: &str) -> bool {
        let Some(mut hold) = self.hold_connected(what).await else {
            return false;
        };
        let Some(reply) = self.exchange_with(&mut hold, &frame, what).await else {
            return false;
        };
        match crate::protocol::check_ack(&reply, sentinel) {
            Ok(()) => true,
            Err(e) => {
                warn!(command = what, error = %e, "device refused command");
                self.emit(ReactorEvent::Alert(Alert::CommandRejected {
                    command: what.to_string(),
                }));
                false
            }
        }
    }

    // -----------------------------------------------------------------
    // pH
    // -----------------------------------------------------------------

    /// Read the pH setpoint.
    pub async fn get_ph_setpoint(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_ph_setpoint(self.address()), 'p', "pH setpoint")
            .await
    }

    /// Read the current pH value.
    pub async fn get_ph_value(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_ph_value(self.address()), 'p', "pH value")
            .await
    }

    /// Read the pH CO2 dosing pump power.
    pub async fn get_ph_co2_power(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_ph_co2_power(self.address()), 'p', "pH CO2 power")
            .await
    }

    /// Read whether pH control is active.
    pub async fn get_ph_control_on(&self) -> Option<bool> {
        self.read_bool(commands::cmd_read_ph_control(self.address()), 'p', "pH control state")
            .await
    }

    /// Read the pH base pump power.
    pub async fn get_ph_base_power(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_ph_base_power(self.address()), 'p', "pH base power")
            .await
    }

    /// Read the pH probe correction factor.
    pub async fn get_ph_correction(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_ph_correction(self.address()), 'p', "pH correction")
            .await
    }

    /// Set the pH setpoint (clamped to 2.0–12.0, one-decimal precision).
    pub async fn set_ph(&self, value: f64) -> bool {
        self.set_op(
            commands::cmd_set_ph(self.address(), value),
            crate::protocol::ACK_OK,
            "set pH",
        )
        .await
    }

    /// Select the external pH pump source (base or acid).
    pub async fn set_ph_pump_source(&self, source: PhPumpSource) -> bool {
        self.set_op(
            commands::cmd_set_ph_pump_source(self.address(), source),
            crate::protocol::ACK_OK,
            "set pH pump source",
        )
        .await
    }

    // -----------------------------------------------------------------
    // Temperature
    // -----------------------------------------------------------------

    /// Read the day temperature setpoint.
    pub async fn get_temp_setpoint(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_temp_setpoint(self.address()), 'r', "temperature setpoint")
            .await
    }

    /// Read the current culture temperature.
    pub async fn get_temp_value(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_temp_value(self.address()), 'r', "temperature value")
            .await
    }

    /// Read the heater power.
    pub async fn get_heater_power(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_heater_power(self.address()), 'r', "heater power")
            .await
    }

    /// Read whether temperature control is active.
    pub async fn is_temp_control_on(&self) -> Option<bool> {
        self.read_bool(commands::cmd_read_temp_control(self.address()), 'r', "temperature control state")
            .await
    }

    /// Read the cooler power.
    pub async fn get_cooler_power(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_cooler_power(self.address()), 'r', "cooler power")
            .await
    }

    /// Set the day temperature setpoint (clamped to 0.0–45.0 °C).
    ///
    /// The firmware acknowledges this command with `"??"` where every
    /// other setter answers `"OK"`; success is judged against that token.
    pub async fn set_temp_day(&self, value: f64) -> bool {
        self.set_op(
            commands::cmd_set_temp_day(self.address(), value),
            crate::protocol::ACK_TEMP_DAY,
            "set day temperature",
        )
        .await
    }

    /// Set the night temperature setpoint (clamped to 0.0–45.0 °C).
    pub async fn set_temp_night(&self, value: f64) -> bool {
        self.set_op(
            commands::cmd_set_temp_night(self.address(), value),
            crate::protocol::ACK_OK,
            "set night temperature",
        )
        .await
    }

    // -----------------------------------------------------------------
    // Turbidity / chemostat
    // -----------------------------------------------------------------

    /// Read the turbidity setpoint.
    pub async fn get_turbidity_setpoint(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_turbidity_setpoint(self.address()), 'u', "turbidity setpoint")
            .await
    }

    /// Read the secondary light sensor value.
    pub async fn get_secondary_light(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_secondary_light(self.address()), 'u', "secondary light value")
            .await
    }

    /// Read the turbidity pump power.
    pub async fn get_turb_pump_power(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_turb_pump_power(self.address()), 'u', "turbidity pump power")
            .await
    }

    /// Read whether turbidity control is active.
    pub async fn is_turb_control_on(&self) -> Option<bool> {
        self.read_bool(commands::cmd_read_turb_control(self.address()), 'u', "turbidity control state")
            .await
    }

    /// Set the turbidity setpoint (clamped to 0–850).
    pub async fn set_turbidity(&self, setpoint: u16) -> bool {
        self.set_op(
            commands::cmd_set_turbidity(self.address(), setpoint),
            crate::protocol::ACK_OK,
            "set turbidity",
        )
        .await
    }

    /// Set the chemostat dilution setpoint (clamped to 0–100 %).
    pub async fn set_chemostat(&self, percent: u16) -> bool {
        self.set_op(
            commands::cmd_set_chemostat(self.address(), percent),
            crate::protocol::ACK_OK,
            "set chemostat",
        )
        .await
    }

    // -----------------------------------------------------------------
    // Light
    // -----------------------------------------------------------------

    /// Read the light brightness.
    pub async fn get_brightness(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_brightness(self.address()), 'b', "brightness")
            .await
    }

    /// Read the primary light sensor value.
    pub async fn get_primary_light(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_primary_light(self.address()), 'l', "primary light value")
            .await
    }

    /// Read the light control mode.
    pub async fn get_light_mode(&self) -> Option<LightMode> {
        let what = "light mode";
        let line = self
            .read_line(commands::cmd_read_light_mode(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_light_mode(&line), what)
    }

    /// Read the light ON schedule time.
    pub async fn get_light_on_time(&self) -> Option<ScheduleTime> {
        let what = "light ON time";
        let line = self
            .read_line(commands::cmd_read_light_on_time(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_schedule(&line, 'n'), what)
    }

    /// Read the light OFF schedule time.
    pub async fn get_light_off_time(&self) -> Option<ScheduleTime> {
        let what = "light OFF time";
        let line = self
            .read_line(commands::cmd_read_light_off_time(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_schedule(&line, 'k'), what)
    }

    /// Read the secondary light sensor sensitivity.
    pub async fn get_sensitivity(&self) -> Option<SensorSensitivity> {
        let what = "secondary light sensitivity";
        let line = self
            .read_line(commands::cmd_read_sensitivity(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_sensitivity(&line), what)
    }

    /// Set the light brightness (clamped to 0–100 %).
    pub async fn set_brightness(&self, percent: u16) -> bool {
        self.set_op(
            commands::cmd_set_brightness(self.address(), percent),
            crate::protocol::ACK_OK,
            "set brightness",
        )
        .await
    }

    /// Set the light ON schedule time.
    pub async fn set_light_on_time(&self, time: ScheduleTime) -> bool {
        self.set_op(
            commands::cmd_set_light_on_time(self.address(), time),
            crate::protocol::ACK_OK,
            "set light ON time",
        )
        .await
    }

    /// Set the light OFF schedule time.
    pub async fn set_light_off_time(&self, time: ScheduleTime) -> bool {
        self.set_op(
            commands::cmd_set_light_off_time(self.address(), time),
            crate::protocol::ACK_OK,
            "set light OFF time",
        )
        .await
    }

    /// Set the light control mode.
    pub async fn set_light_mode(&self, mode: LightMode) -> bool {
        self.set_op(
            commands::cmd_set_light_mode(self.address(), mode),
            crate::protocol::ACK_OK,
            "set light mode",
        )
        .await
    }

    /// Set the primary light sensor range.
    pub async fn set_light_range(&self, range: LightRange) -> bool {
        self.set_op(
            commands::cmd_set_light_range(self.address(), range),
            crate::protocol::ACK_OK,
            "set light range",
        )
        .await
    }

    /// Set the secondary light sensor sensitivity.
    pub async fn set_sensitivity(&self, sensitivity: SensorSensitivity) -> bool {
        self.set_op(
            commands::cmd_set_sensitivity(self.address(), sensitivity),
            crate::protocol::ACK_OK,
            "set secondary light sensitivity",
        )
        .await
    }

    // -----------------------------------------------------------------
    // Gas flow
    // -----------------------------------------------------------------

    /// Read the air flow rate.
    pub async fn get_air_flow(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_air_flow(self.address()), 'f', "air flow")
            .await
    }

    /// Read the CO2 flow rate.
    pub async fn get_co2_flow(&self) -> Option<f64> {
        self.read_float(commands::cmd_read_co2_flow(self.address()), 'f', "CO2 flow")
            .await
    }

    // -----------------------------------------------------------------
    // Reactor mode / misc device control
    // -----------------------------------------------------------------

    /// Read the reactor operating mode.
    ///
    /// The reply separates the value with `^` instead of the opcode
    /// letter; the parser honors that quirk.
    pub async fn get_reactor_mode(&self) -> Option<ReactorMode> {
        let what = "reactor mode";
        let line = self
            .read_line(commands::cmd_read_reactor_mode(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_reactor_mode(&line), what)
    }

    /// Set the reactor operating mode.
    pub async fn set_reactor_mode(&self, mode: ReactorMode) -> bool {
        self.set_op(
            commands::cmd_set_reactor_mode(self.address(), mode),
            crate::protocol::ACK_OK,
            "set reactor mode",
        )
        .await
    }

    /// Switch off all master modes (broadcast to unit `00`).
    pub async fn master_off(&self) -> bool {
        self.set_op(commands::cmd_master_off(), crate::protocol::ACK_OK, "master off")
            .await
    }

    /// Set the anti-foam timer: dosing interval and runtime (0–99 each).
    pub async fn set_anti_foam(&self, interval: u8, runtime: u8) -> bool {
        self.set_op(
            commands::cmd_set_anti_foam(self.address(), interval, runtime),
            crate::protocol::ACK_OK,
            "set anti-foam timer",
        )
        .await
    }

    /// Set the measuring filter cycle count (clamped to 1–16).
    pub async fn set_filter_cycles(&self, cycles: u16) -> bool {
        self.set_op(
            commands::cmd_set_filter_cycles(self.address(), cycles),
            crate::protocol::ACK_OK,
            "set filter cycles",
        )
        .await
    }

    /// Reset the communication controller.
    pub async fn reset_communication(&self) -> bool {
        self.set_op(
            commands::cmd_reset_communication(self.address()),
            crate::protocol::ACK_OK,
            "reset communication",
        )
        .await
    }

    /// Switch the audible alarm on or off.
    pub async fn set_alarm(&self, on: bool) -> bool {
        self.set_op(
            commands::cmd_set_alarm(self.address(), on),
            crate::protocol::ACK_OK,
            "set audible alarm",
        )
        .await
    }

    /// Set the device clock (hours and minutes).
    pub async fn set_time(&self, time: ScheduleTime) -> bool {
        self.set_op(
            commands::cmd_set_time(self.address(), time),
            crate::protocol::ACK_OK,
            "set device time",
        )
        .await
    }

    /// Change the device address. On success the client's stored
    /// address is updated so subsequent commands reach the unit.
    pub async fn change_address(&self, new_addr: DeviceAddress) -> bool {
        let ok = self
            .set_op(
                commands::cmd_set_address(self.address(), new_addr),
                crate::protocol::ACK_OK,
                "change address",
            )
            .await;
        if ok {
            self.address.store(new_addr.value(), Ordering::SeqCst);
            info!(address = %new_addr, "device address changed");
        }
        ok
    }

    // -----------------------------------------------------------------
    // Device info
    // -----------------------------------------------------------------

    /// Read the device error code.
    pub async fn get_error_code(&self) -> Option<u16> {
        let what = "error code";
        let line = self
            .read_line(commands::cmd_read_error_code(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_u16(&line, 'e'), what)
    }

    /// Read the system info string.
    pub async fn get_system_info(&self) -> Option<String> {
        let what = "system info";
        let line = self
            .read_line(commands::cmd_read_system_info(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_text(&line, 'i'), what)
    }

    /// Read the board version string.
    pub async fn get_board_version(&self) -> Option<String> {
        let what = "board version";
        let line = self
            .read_line(commands::cmd_read_board_version(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_text(&line, 'i'), what)
    }

    /// Read the communication protocol version string.
    pub async fn get_comm_version(&self) -> Option<String> {
        let what = "communication version";
        let line = self
            .read_line(commands::cmd_read_comm_version(self.address()), what)
            .await?;
        self.ok_or_log(commands::parse_text(&line, 'v'), what)
    }

    // -----------------------------------------------------------------
    // Aggregated reads and manual logging
    // -----------------------------------------------------------------

    /// Read all six sensor channels in one round trip.
    pub async fn read_all_sensors(&self) -> Option<SensorSnapshot> {
        let mut hold = self.hold_connected("read sensors").await?;
        self.read_sensors_with(&mut hold).await
    }

    /// Read all four pump powers in one round trip.
    pub async fn read_all_pumps(&self) -> Option<PumpSnapshot> {
        let mut hold = self.hold_connected("read pumps").await?;
        self.read_pumps_with(&mut hold).await
    }

    /// Read both snapshots and append them to `store` with an optional
    /// comment. Returns `false` when either read fails; nothing partial
    /// is ever written.
    pub async fn log_current_values(
        &self,
        store: &TelemetryStore,
        comment: Option<String>,
    ) -> bool {
        let Some(mut hold) = self.hold_connected("manual log").await else {
            return false;
        };
        let sensors = self.read_sensors_with(&mut hold).await;
        let pumps = self.read_pumps_with(&mut hold).await;
        drop(hold);

        let (Some(sensors), Some(pumps)) = (sensors, pumps) else {
            warn!("manual log skipped: snapshot read failed");
            return false;
        };
        match store.append(&LogRecord::now(sensors, pumps, comment)) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to append manual log record");
                false
            }
        }
    }
}
