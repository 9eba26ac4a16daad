//! Core types used throughout phytolib.
//!
//! These types describe reactor state in engineering units, independent of
//! the wire encoding. The Algaemist backend converts between these and the
//! fixed-width ASCII payloads of the device protocol.

use std::fmt;

use crate::error::Error;

/// Address of one reactor unit on the serial link.
///
/// Valid addresses are 0–99 and are encoded as two zero-padded decimal
/// digits in every command frame. The address is stable for the lifetime
/// of a connection unless an explicit re-address command succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Create a `DeviceAddress` from a raw value.
    ///
    /// Returns [`Error::InvalidParameter`] for values above 99.
    pub fn new(addr: u8) -> Result<Self, Error> {
        if addr > 99 {
            return Err(Error::InvalidParameter(format!(
                "device address {addr} out of range 0-99"
            )));
        }
        Ok(DeviceAddress(addr))
    }

    /// Return the raw numeric address.
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// One point-in-time aggregated read of the reactor's sensor channels.
///
/// All six values are returned by the device in a single round trip as a
/// semicolon-delimited list. Snapshots are transient: they are recreated
/// on every poll and persisted only through the telemetry log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Culture temperature in °C.
    pub temp_c: f64,
    /// Culture pH.
    pub ph: f64,
    /// Primary light sensor reading.
    pub light_primary: f64,
    /// Secondary light sensor reading.
    pub light_secondary: f64,
    /// Air flow rate.
    pub air_flow: f64,
    /// CO2 flow rate.
    pub co2_flow: f64,
}

/// One point-in-time aggregated read of the reactor's pump powers.
///
/// All values are power percentages, returned in a single round trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpSnapshot {
    /// CO2 dosing pump power.
    pub co2_pump: f64,
    /// Heater pump power.
    pub heater_pump: f64,
    /// Cooler pump power.
    pub cooler_pump: f64,
    /// Turbidity (dilution) pump power.
    pub turb_pump: f64,
}

/// A time of day used by the light on/off schedule and the device clock.
///
/// Encoded on the wire as `HHMM`. Replies may drop leading zeros, so the
/// decoder re-pads before splitting the digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    /// Hour, 0–23.
    pub hour: u8,
    /// Minute, 0–59.
    pub minute: u8,
}

impl ScheduleTime {
    /// Create a `ScheduleTime`, validating the hour and minute ranges.
    pub fn new(hour: u8, minute: u8) -> Result<Self, Error> {
        if hour > 23 || minute > 59 {
            return Err(Error::InvalidParameter(format!(
                "invalid schedule time {hour:02}:{minute:02}"
            )));
        }
        Ok(ScheduleTime { hour, minute })
    }

    /// Parse a `HHMM` wire value. Leading zeros may be absent in replies
    /// (`"730"` means 07:30), so the input is left-padded to four digits.
    pub fn from_wire(s: &str) -> Result<Self, Error> {
        let digits = s.trim();
        if digits.is_empty() || digits.len() > 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Parse(format!("invalid HHMM value {s:?}")));
        }
        let padded = format!("{digits:0>4}");
        let hour: u8 = padded[..2].parse().map_err(|_| {
            Error::Parse(format!("invalid HHMM value {s:?}"))
        })?;
        let minute: u8 = padded[2..].parse().map_err(|_| {
            Error::Parse(format!("invalid HHMM value {s:?}"))
        })?;
        ScheduleTime::new(hour, minute).map_err(|_| Error::Parse(format!("invalid HHMM value {s:?}")))
    }

    /// Format as the four-digit `HHMM` wire payload.
    pub fn wire(&self) -> String {
        format!("{:02}{:02}", self.hour, self.minute)
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Light control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightMode {
    /// Light continuously on at the configured brightness.
    Continuous,
    /// Light follows the on/off schedule.
    Timed,
    /// Light follows a sinusoidal day curve.
    Sinus,
}

impl LightMode {
    /// The wire code for this mode.
    pub fn code(&self) -> u16 {
        match self {
            LightMode::Continuous => 1,
            LightMode::Timed => 2,
            LightMode::Sinus => 3,
        }
    }
}

impl TryFrom<u16> for LightMode {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Error> {
        match code {
            1 => Ok(LightMode::Continuous),
            2 => Ok(LightMode::Timed),
            3 => Ok(LightMode::Sinus),
            other => Err(Error::Parse(format!("unknown light mode {other}"))),
        }
    }
}

impl fmt::Display for LightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LightMode::Continuous => "continuous",
            LightMode::Timed => "timed",
            LightMode::Sinus => "sinus",
        };
        write!(f, "{s}")
    }
}

/// Reactor operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorMode {
    /// Hold turbidity at the setpoint.
    Turbidostat,
    /// Turbidostat, active only during the light schedule.
    TimedTurbidostat,
    /// Constant dilution at the chemostat setpoint.
    Chemostat,
    /// Chemostat, active only during the light schedule.
    TimedChemostat,
}

impl ReactorMode {
    /// The wire code for this mode.
    pub fn code(&self) -> u16 {
        match self {
            ReactorMode::Turbidostat => 0,
            ReactorMode::TimedTurbidostat => 1,
            ReactorMode::Chemostat => 2,
            ReactorMode::TimedChemostat => 3,
        }
    }
}

impl TryFrom<u16> for ReactorMode {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Error> {
        match code {
            0 => Ok(ReactorMode::Turbidostat),
            1 => Ok(ReactorMode::TimedTurbidostat),
            2 => Ok(ReactorMode::Chemostat),
            3 => Ok(ReactorMode::TimedChemostat),
            other => Err(Error::Parse(format!("unknown reactor mode {other}"))),
        }
    }
}

impl fmt::Display for ReactorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReactorMode::Turbidostat => "turbidostat",
            ReactorMode::TimedTurbidostat => "timed turbidostat",
            ReactorMode::Chemostat => "chemostat",
            ReactorMode::TimedChemostat => "timed chemostat",
        };
        write!(f, "{s}")
    }
}

/// Primary light sensor range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightRange {
    /// High-intensity range.
    High,
    /// Low-intensity range.
    Low,
}

impl LightRange {
    /// The wire code for this range.
    pub fn code(&self) -> u16 {
        match self {
            LightRange::High => 0,
            LightRange::Low => 1,
        }
    }
}

/// Secondary light sensor sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorSensitivity {
    /// Low sensitivity.
    Low,
    /// High sensitivity.
    High,
}

impl SensorSensitivity {
    /// The wire code for this sensitivity.
    pub fn code(&self) -> u16 {
        match self {
            SensorSensitivity::Low => 0,
            SensorSensitivity::High => 1,
        }
    }
}

impl TryFrom<u16> for SensorSensitivity {
    type Error = Error;

    fn try_from(code: u16) -> Result<Self, Error> {
        match code {
            0 => Ok(SensorSensitivity::Low),
            1 => Ok(SensorSensitivity::High),
            other => Err(Error::Parse(format!("unknown sensitivity {other}"))),
        }
    }
}

/// Source selection for the external pH pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhPumpSource {
    /// Dose base to raise pH.
    Base,
    /// Dose acid to lower pH.
    Acid,
}

impl PhPumpSource {
    /// The wire code for this source.
    pub fn code(&self) -> u16 {
        match self {
            PhPumpSource::Base => 0,
            PhPumpSource::Acid => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_address_formats_two_digits() {
        let addr = DeviceAddress::new(7).unwrap();
        assert_eq!(addr.to_string(), "07");
        assert_eq!(addr.value(), 7);
    }

    #[test]
    fn device_address_rejects_out_of_range() {
        assert!(DeviceAddress::new(100).is_err());
        assert!(DeviceAddress::new(99).is_ok());
    }

    #[test]
    fn schedule_time_wire_round_trip() {
        let t = ScheduleTime::new(7, 30).unwrap();
        assert_eq!(t.wire(), "0730");
        assert_eq!(ScheduleTime::from_wire("0730").unwrap(), t);
    }

    #[test]
    fn schedule_time_pads_short_replies() {
        // The device drops leading zeros: "730" means 07:30.
        let t = ScheduleTime::from_wire("730").unwrap();
        assert_eq!(t, ScheduleTime::new(7, 30).unwrap());
        let midnight = ScheduleTime::from_wire("0").unwrap();
        assert_eq!(midnight, ScheduleTime::new(0, 0).unwrap());
    }

    #[test]
    fn schedule_time_rejects_garbage() {
        assert!(ScheduleTime::from_wire("25xx").is_err());
        assert!(ScheduleTime::from_wire("").is_err());
        assert!(ScheduleTime::from_wire("2760").is_err());
    }

    #[test]
    fn schedule_time_display() {
        let t = ScheduleTime::new(9, 5).unwrap();
        assert_eq!(t.to_string(), "09:05");
    }

    #[test]
    fn light_mode_codes_round_trip() {
        for mode in [LightMode::Continuous, LightMode::Timed, LightMode::Sinus] {
            assert_eq!(LightMode::try_from(mode.code()).unwrap(), mode);
        }
        assert!(LightMode::try_from(0).is_err());
    }

    #[test]
    fn reactor_mode_codes_round_trip() {
        for mode in [
            ReactorMode::Turbidostat,
            ReactorMode::TimedTurbidostat,
            ReactorMode::Chemostat,
            ReactorMode::TimedChemostat,
        ] {
            assert_eq!(ReactorMode::try_from(mode.code()).unwrap(), mode);
        }
        assert!(ReactorMode::try_from(4).is_err());
    }
}
