//! Algaemist command builders and reply parsers.
//!
//! One builder per device capability. All functions are pure -- they
//! produce or consume byte vectors / string slices without performing
//! any I/O. The channel guard sends the bytes and feeds the reply line
//! back into the parsers.
//!
//! # Domain clamping
//!
//! Every setter clamps its input to the documented domain before
//! encoding; out-of-range values silently saturate rather than fail.
//! The scaled setters (pH, temperature) additionally round to one
//! decimal and encode the value multiplied by ten:
//!
//! | Setter            | Domain    | Encoding                  |
//! |-------------------|-----------|---------------------------|
//! | pH setpoint       | 2.0–12.0  | ×10, 4 digits (`P0075`)   |
//! | day temperature   | 0.0–45.0  | ×10, 4 digits (`R0105`)   |
//! | night temperature | 0.0–45.0  | ×10, `1` + 3 digits (`R1105`) |
//! | brightness        | 0–100     | 4 digits                  |
//! | turbidity         | 0–850     | 4 digits                  |
//! | chemostat         | 0–100     | 4 digits                  |
//! | filter cycles     | 1–16      | 4 digits                  |
//! | anti-foam timer   | 0–99 each | 2 digits interval + 2 digits runtime |

use phytolib_core::error::Result;
use phytolib_core::types::{
    DeviceAddress, LightMode, LightRange, PhPumpSource, PumpSnapshot, ReactorMode, ScheduleTime,
    SensorSensitivity, SensorSnapshot,
};

use crate::protocol::{self, encode_frame, MODE_SEPARATOR};

// ---------------------------------------------------------------
// Domain clamps
// ---------------------------------------------------------------

/// pH setpoint domain.
pub const PH_MIN: f64 = 2.0;
/// pH setpoint domain.
pub const PH_MAX: f64 = 12.0;
/// Temperature setpoint domain, °C (day and night share it).
pub const TEMP_MIN: f64 = 0.0;
/// Temperature setpoint domain, °C.
pub const TEMP_MAX: f64 = 45.0;
/// Turbidity setpoint domain.
pub const TURBIDITY_MAX: u16 = 850;
/// Brightness / chemostat percentage domain.
pub const PERCENT_MAX: u16 = 100;
/// Measuring filter cycle domain.
pub const FILTER_CYCLES_MIN: u16 = 1;
/// Measuring filter cycle domain.
pub const FILTER_CYCLES_MAX: u16 = 16;

/// Clamp a pH value to its domain and round to one decimal.
pub fn clamp_ph(value: f64) -> f64 {
    round_tenth(value.clamp(PH_MIN, PH_MAX))
}

/// Clamp a temperature value to its domain and round to one decimal.
pub fn clamp_temp(value: f64) -> f64 {
    round_tenth(value.clamp(TEMP_MIN, TEMP_MAX))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A clamped one-decimal value in wire tenths (`7.5` -> `75`).
fn tenths(clamped: f64) -> u16 {
    (clamped * 10.0).round() as u16
}

// ---------------------------------------------------------------
// Read command builders
// ---------------------------------------------------------------

fn read_frame(addr: DeviceAddress, opcode: char, channel: u16) -> Vec<u8> {
    encode_frame(addr, opcode, &format!("{channel:04}"))
}

/// Build a "read pH setpoint" command (`p`, channel 0).
pub fn cmd_read_ph_setpoint(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'p', 0)
}

/// Build a "read pH value" command (`p`, channel 1).
pub fn cmd_read_ph_value(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'p', 1)
}

/// Build a "read pH CO2 pump power" command (`p`, channel 2).
pub fn cmd_read_ph_co2_power(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'p', 2)
}

/// Build a "read pH control state" command (`p`, channel 3).
pub fn cmd_read_ph_control(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'p', 3)
}

/// Build a "read pH base pump power" command (`p`, channel 4).
pub fn cmd_read_ph_base_power(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'p', 4)
}

/// Build a "read pH correction factor" command (`p`, channel 5).
pub fn cmd_read_ph_correction(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'p', 5)
}

/// Build a "read day temperature setpoint" command (`r`, channel 0).
pub fn cmd_read_temp_setpoint(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'r', 0)
}

/// Build a "read temperature value" command (`r`, channel 1).
pub fn cmd_read_temp_value(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'r', 1)
}

/// Build a "read heater power" command (`r`, channel 2).
pub fn cmd_read_heater_power(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'r', 2)
}

/// Build a "read temperature control state" command (`r`, channel 3).
pub fn cmd_read_temp_control(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'r', 3)
}

/// Build a "read cooler power" command (`r`, channel 4).
pub fn cmd_read_cooler_power(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'r', 4)
}

/// Build a "read secondary light sensitivity" command (`s`, channel 0).
pub fn cmd_read_sensitivity(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 's', 0)
}

/// Build a "read turbidity setpoint" command (`u`, channel 0).
pub fn cmd_read_turbidity_setpoint(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'u', 0)
}

/// Build a "read secondary light value" command (`u`, channel 1).
pub fn cmd_read_secondary_light(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'u', 1)
}

/// Build a "read turbidity pump power" command (`u`, channel 2).
pub fn cmd_read_turb_pump_power(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'u', 2)
}

/// Build a "read turbidity control state" command (`u`, channel 3).
pub fn cmd_read_turb_control(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'u', 3)
}

/// Build a "read error code" command (`e`, channel 0).
pub fn cmd_read_error_code(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'e', 0)
}

/// Build a "read system info" command (`i`, channel 0).
pub fn cmd_read_system_info(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'i', 0)
}

/// Build a "read board version" command (`i`, channel 1).
pub fn cmd_read_board_version(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'i', 1)
}

/// Build a "read air flow" command (`f`, channel 1).
pub fn cmd_read_air_flow(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'f', 1)
}

/// Build a "read CO2 flow" command (`f`, channel 2).
pub fn cmd_read_co2_flow(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'f', 2)
}

/// Build a "read brightness" command (`b`, channel 0).
pub fn cmd_read_brightness(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'b', 0)
}

/// Build a "read primary light value" command (`l`, channel 0).
pub fn cmd_read_primary_light(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'l', 0)
}

/// Build a "read light mode" command (`o`, channel 0).
pub fn cmd_read_light_mode(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'o', 0)
}

/// Build a "read light ON time" command (`n`, channel 0).
pub fn cmd_read_light_on_time(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'n', 0)
}

/// Build a "read light OFF time" command (`k`, channel 0).
pub fn cmd_read_light_off_time(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'k', 0)
}

/// Build a "read communication version" command (`v`, channel 0).
pub fn cmd_read_comm_version(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'v', 0)
}

/// Build a "read reactor mode" command (`m`, channel 0).
///
/// The reply separates the value with `^` rather than the opcode
/// letter; parse it with [`parse_reactor_mode`].
pub fn cmd_read_reactor_mode(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'm', 0)
}

/// Build a "read all sensors" command (`x`, channel 0). One round trip
/// returns all six sensor channels.
pub fn cmd_read_all_sensors(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'x', 0)
}

/// Build a "read all pumps" command (`q`, channel 0). One round trip
/// returns all four pump powers.
pub fn cmd_read_all_pumps(addr: DeviceAddress) -> Vec<u8> {
    read_frame(addr, 'q', 0)
}

// ---------------------------------------------------------------
// Write command builders
// ---------------------------------------------------------------

/// Build a "set pH setpoint" command (`P`).
///
/// The value is clamped to 2.0–12.0, rounded to one decimal, and
/// encoded ×10: `set pH 7.5` -> `P0075`.
pub fn cmd_set_ph(addr: DeviceAddress, ph: f64) -> Vec<u8> {
    encode_frame(addr, 'P', &format!("{:04}", tenths(clamp_ph(ph))))
}

/// Build a "set day temperature setpoint" command (`R`).
///
/// Clamped to 0.0–45.0 °C, ×10: `10.5 °C` -> `R0105`. The firmware
/// acknowledges this one with [`protocol::ACK_TEMP_DAY`], not `OK`.
pub fn cmd_set_temp_day(addr: DeviceAddress, temp_c: f64) -> Vec<u8> {
    encode_frame(addr, 'R', &format!("{:04}", tenths(clamp_temp(temp_c))))
}

/// Build a "set night temperature setpoint" command (`R1`).
///
/// Same domain as the day setter, but the payload leads with the night
/// channel selector digit and carries the value in three digits:
/// `10.5 °C` -> `R1105`.
pub fn cmd_set_temp_night(addr: DeviceAddress, temp_c: f64) -> Vec<u8> {
    encode_frame(addr, 'R', &format!("1{:03}", tenths(clamp_temp(temp_c))))
}

/// Build a "set brightness" command (`B`), percent clamped to 0–100.
pub fn cmd_set_brightness(addr: DeviceAddress, percent: u16) -> Vec<u8> {
    encode_frame(addr, 'B', &format!("{:04}", percent.min(PERCENT_MAX)))
}

/// Build a "set light ON time" command (`N`), payload `HHMM`.
pub fn cmd_set_light_on_time(addr: DeviceAddress, time: ScheduleTime) -> Vec<u8> {
    encode_frame(addr, 'N', &time.wire())
}

/// Build a "set light OFF time" command (`K`), payload `HHMM`.
pub fn cmd_set_light_off_time(addr: DeviceAddress, time: ScheduleTime) -> Vec<u8> {
    encode_frame(addr, 'K', &time.wire())
}

/// Build a "set light mode" command (`O`).
pub fn cmd_set_light_mode(addr: DeviceAddress, mode: LightMode) -> Vec<u8> {
    encode_frame(addr, 'O', &format!("{:04}", mode.code()))
}

/// Build a "set light range" command (`L`).
pub fn cmd_set_light_range(addr: DeviceAddress, range: LightRange) -> Vec<u8> {
    encode_frame(addr, 'L', &format!("{:04}", range.code()))
}

/// Build a "set secondary light sensitivity" command (`S`).
pub fn cmd_set_sensitivity(addr: DeviceAddress, sensitivity: SensorSensitivity) -> Vec<u8> {
    encode_frame(addr, 'S', &format!("{:04}", sensitivity.code()))
}

/// Build a "set turbidity setpoint" command (`U`), clamped to 0–850.
pub fn cmd_set_turbidity(addr: DeviceAddress, setpoint: u16) -> Vec<u8> {
    encode_frame(addr, 'U', &format!("{:04}", setpoint.min(TURBIDITY_MAX)))
}

/// Build a "set chemostat setpoint" command (`C`), percent clamped to 0–100.
pub fn cmd_set_chemostat(addr: DeviceAddress, percent: u16) -> Vec<u8> {
    encode_frame(addr, 'C', &format!("{:04}", percent.min(PERCENT_MAX)))
}

/// Build a "select external pH pump source" command (`E`).
pub fn cmd_set_ph_pump_source(addr: DeviceAddress, source: PhPumpSource) -> Vec<u8> {
    encode_frame(addr, 'E', &format!("{:04}", source.code()))
}

/// Build a "set anti-foam timer" command (`F`).
///
/// The payload splits into two two-digit groups: dosing interval and
/// runtime, each clamped to 0–99.
pub fn cmd_set_anti_foam(addr: DeviceAddress, interval: u8, runtime: u8) -> Vec<u8> {
    encode_frame(
        addr,
        'F',
        &format!("{:02}{:02}", interval.min(99), runtime.min(99)),
    )
}

/// Build a "set reactor mode" command (`M`).
pub fn cmd_set_reactor_mode(addr: DeviceAddress, mode: ReactorMode) -> Vec<u8> {
    encode_frame(addr, 'M', &format!("{:04}", mode.code()))
}

/// Build a "set measuring filter cycles" command (`Q`), clamped to 1–16.
pub fn cmd_set_filter_cycles(addr: DeviceAddress, cycles: u16) -> Vec<u8> {
    let clamped = cycles.clamp(FILTER_CYCLES_MIN, FILTER_CYCLES_MAX);
    encode_frame(addr, 'Q', &format!("{clamped:04}"))
}

/// Build a "reset communication controller" command (`!`).
pub fn cmd_reset_communication(addr: DeviceAddress) -> Vec<u8> {
    encode_frame(addr, '!', "0000")
}

/// Build a "set audible alarm" command (`@`).
pub fn cmd_set_alarm(addr: DeviceAddress, on: bool) -> Vec<u8> {
    encode_frame(addr, '@', if on { "0001" } else { "0000" })
}

/// Build a "set device time" command (`T`), payload `HHMM`.
pub fn cmd_set_time(addr: DeviceAddress, time: ScheduleTime) -> Vec<u8> {
    encode_frame(addr, 'T', &time.wire())
}

/// Build a "change device address" command (`A`).
pub fn cmd_set_address(addr: DeviceAddress, new_addr: DeviceAddress) -> Vec<u8> {
    encode_frame(addr, 'A', &format!("{:04}", new_addr.value()))
}

/// Build the "switch off all master modes" command (`^`).
///
/// This command always addresses unit `00` regardless of the configured
/// device address -- a broadcast-style master reset.
pub fn cmd_master_off() -> Vec<u8> {
    let broadcast = DeviceAddress::new(0).expect("address 0 is valid");
    encode_frame(broadcast, '^', "0000")
}

// ---------------------------------------------------------------
// Reply parsers
// ---------------------------------------------------------------

/// Parse a float reply for the given opcode letter.
pub fn parse_float(line: &str, opcode: char) -> Result<f64> {
    protocol::parse_value(line, opcode)
}

/// Parse an integer reply for the given opcode letter.
pub fn parse_u16(line: &str, opcode: char) -> Result<u16> {
    protocol::parse_value(line, opcode)
}

/// Parse a control-state reply (0 = off, anything else = on).
pub fn parse_bool(line: &str, opcode: char) -> Result<bool> {
    let v: u16 = protocol::parse_value(line, opcode)?;
    Ok(v != 0)
}

/// Parse a free-text reply (system info, versions).
pub fn parse_text(line: &str, opcode: char) -> Result<String> {
    Ok(protocol::strip_echo(line, opcode)?.trim().to_string())
}

/// Parse a light-schedule reply (`HHMM`, leading zeros may be absent).
pub fn parse_schedule(line: &str, opcode: char) -> Result<ScheduleTime> {
    ScheduleTime::from_wire(protocol::strip_echo(line, opcode)?)
}

/// Parse a light-mode reply.
pub fn parse_light_mode(line: &str) -> Result<LightMode> {
    LightMode::try_from(parse_u16(line, 'o')?)
}

/// Parse a reactor-mode reply.
///
/// The value follows a `^` separator instead of the opcode letter.
pub fn parse_reactor_mode(line: &str) -> Result<ReactorMode> {
    let code: u16 = protocol::parse_value(line, MODE_SEPARATOR)?;
    ReactorMode::try_from(code)
}

/// Parse a secondary-light-sensitivity reply.
pub fn parse_sensitivity(line: &str) -> Result<SensorSensitivity> {
    SensorSensitivity::try_from(parse_u16(line, 's')?)
}

/// Parse an aggregated sensor reply: six `;`-delimited fields in the
/// order `temp;pH;light_prim;light_sec;air;co2`.
pub fn parse_sensor_snapshot(line: &str) -> Result<SensorSnapshot> {
    let fields = protocol::split_fields(line, 'x', 6)?;
    Ok(SensorSnapshot {
        temp_c: parse_field(fields[0], line)?,
        ph: parse_field(fields[1], line)?,
        light_primary: parse_field(fields[2], line)?,
        light_secondary: parse_field(fields[3], line)?,
        air_flow: parse_field(fields[4], line)?,
        co2_flow: parse_field(fields[5], line)?,
    })
}

/// Parse an aggregated pump reply: four `;`-delimited fields in the
/// order `co2;heater;cooler;turb`.
pub fn parse_pump_snapshot(line: &str) -> Result<PumpSnapshot> {
    let fields = protocol::split_fields(line, 'q', 4)?;
    Ok(PumpSnapshot {
        co2_pump: parse_field(fields[0], line)?,
        heater_pump: parse_field(fields[1], line)?,
        cooler_pump: parse_field(fields[2], line)?,
        turb_pump: parse_field(fields[3], line)?,
    })
}

fn parse_field(field: &str, line: &str) -> Result<f64> {
    field.parse().map_err(|_| {
        phytolib_core::error::Error::Parse(format!(
            "could not parse field {field:?} in reply {line:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{check_ack, ACK_OK, ACK_TEMP_DAY};

    fn addr() -> DeviceAddress {
        DeviceAddress::new(21).unwrap()
    }

    // -----------------------------------------------------------------
    // Scaled setters
    // -----------------------------------------------------------------

    #[test]
    fn set_ph_encodes_tenths() {
        assert_eq!(cmd_set_ph(addr(), 7.5), b"/21P0075");
    }

    #[test]
    fn set_ph_clamps_to_domain() {
        assert_eq!(cmd_set_ph(addr(), 99.0), b"/21P0120");
        assert_eq!(cmd_set_ph(addr(), -3.0), b"/21P0020");
    }

    #[test]
    fn set_ph_rounds_to_one_decimal() {
        assert_eq!(cmd_set_ph(addr(), 7.04), b"/21P0070");
        assert_eq!(cmd_set_ph(addr(), 7.06), b"/21P0071");
    }

    #[test]
    fn set_temp_day_encodes_four_digits() {
        let frame = cmd_set_temp_day(addr(), 10.5);
        assert_eq!(frame, b"/21R0105");
        assert!(frame.ends_with(b"0105"));
    }

    #[test]
    fn set_temp_night_leads_with_selector_digit() {
        assert_eq!(cmd_set_temp_night(addr(), 10.5), b"/21R1105");
    }

    #[test]
    fn day_and_night_setters_differ_in_sentinel() {
        // The day setter alone expects "??".
        assert!(check_ack("/21R0105??", ACK_TEMP_DAY).is_ok());
        assert!(check_ack("/21R1105OK", ACK_OK).is_ok());
        assert!(check_ack("/21R0105OK", ACK_TEMP_DAY).is_err());
    }

    #[test]
    fn clamp_then_encode_round_trips_for_scaled_opcodes() {
        // decode(encode(clamp(v))) == clamp(v) for all permitted inputs.
        for raw in [-5.0, 2.0, 2.34, 7.5, 11.96, 12.0, 40.0] {
            let clamped = clamp_ph(raw);
            let frame = cmd_set_ph(addr(), raw);
            let payload = std::str::from_utf8(&frame[4..]).unwrap();
            let decoded: f64 = payload.parse::<u16>().unwrap() as f64 / 10.0;
            assert_eq!(decoded, clamped, "raw input {raw}");
        }
        for raw in [-1.0, 0.0, 10.5, 21.33, 45.0, 88.8] {
            let clamped = clamp_temp(raw);
            let frame = cmd_set_temp_day(addr(), raw);
            let payload = std::str::from_utf8(&frame[4..]).unwrap();
            let decoded: f64 = payload.parse::<u16>().unwrap() as f64 / 10.0;
            assert_eq!(decoded, clamped, "raw input {raw}");
        }
    }

    // -----------------------------------------------------------------
    // Clamped integer setters
    // -----------------------------------------------------------------

    #[test]
    fn set_brightness_clamps_percent() {
        assert_eq!(cmd_set_brightness(addr(), 50), b"/21B0050");
        assert_eq!(cmd_set_brightness(addr(), 150), b"/21B0100");
    }

    #[test]
    fn set_turbidity_clamps_to_850() {
        assert_eq!(cmd_set_turbidity(addr(), 150), b"/21U0150");
        assert_eq!(cmd_set_turbidity(addr(), 2000), b"/21U0850");
    }

    #[test]
    fn set_filter_cycles_clamps_low_and_high() {
        assert_eq!(cmd_set_filter_cycles(addr(), 0), b"/21Q0001");
        assert_eq!(cmd_set_filter_cycles(addr(), 8), b"/21Q0008");
        assert_eq!(cmd_set_filter_cycles(addr(), 99), b"/21Q0016");
    }

    #[test]
    fn set_anti_foam_splits_interval_and_runtime() {
        assert_eq!(cmd_set_anti_foam(addr(), 15, 3), b"/21F1503");
        assert_eq!(cmd_set_anti_foam(addr(), 250, 250), b"/21F9999");
    }

    // -----------------------------------------------------------------
    // Mode / schedule / misc setters
    // -----------------------------------------------------------------

    #[test]
    fn set_light_mode_uses_wire_code() {
        assert_eq!(cmd_set_light_mode(addr(), LightMode::Timed), b"/21O0002");
    }

    #[test]
    fn set_reactor_mode_uses_wire_code() {
        assert_eq!(
            cmd_set_reactor_mode(addr(), ReactorMode::Chemostat),
            b"/21M0002"
        );
    }

    #[test]
    fn set_schedule_times_encode_hhmm() {
        let t = ScheduleTime::new(7, 30).unwrap();
        assert_eq!(cmd_set_light_on_time(addr(), t), b"/21N0730");
        assert_eq!(cmd_set_light_off_time(addr(), t), b"/21K0730");
        assert_eq!(cmd_set_time(addr(), t), b"/21T0730");
    }

    #[test]
    fn set_address_encodes_new_address() {
        let new = DeviceAddress::new(42).unwrap();
        assert_eq!(cmd_set_address(addr(), new), b"/21A0042");
    }

    #[test]
    fn master_off_addresses_unit_zero() {
        assert_eq!(cmd_master_off(), b"/00^0000");
    }

    #[test]
    fn alarm_and_reset_frames() {
        assert_eq!(cmd_set_alarm(addr(), true), b"/21@0001");
        assert_eq!(cmd_set_alarm(addr(), false), b"/21@0000");
        assert_eq!(cmd_reset_communication(addr()), b"/21!0000");
    }

    // -----------------------------------------------------------------
    // Read builders
    // -----------------------------------------------------------------

    #[test]
    fn read_builders_select_subchannels() {
        assert_eq!(cmd_read_ph_setpoint(addr()), b"/21p0000");
        assert_eq!(cmd_read_ph_correction(addr()), b"/21p0005");
        assert_eq!(cmd_read_cooler_power(addr()), b"/21r0004");
        assert_eq!(cmd_read_air_flow(addr()), b"/21f0001");
        assert_eq!(cmd_read_co2_flow(addr()), b"/21f0002");
        assert_eq!(cmd_read_all_sensors(addr()), b"/21x0000");
        assert_eq!(cmd_read_all_pumps(addr()), b"/21q0000");
    }

    // -----------------------------------------------------------------
    // Parsers
    // -----------------------------------------------------------------

    #[test]
    fn parse_sensor_snapshot_six_fields() {
        let snap = parse_sensor_snapshot("/21x0000x21.5;7.20;300.0;310.0;50.0;12.0").unwrap();
        assert_eq!(
            snap,
            SensorSnapshot {
                temp_c: 21.5,
                ph: 7.2,
                light_primary: 300.0,
                light_secondary: 310.0,
                air_flow: 50.0,
                co2_flow: 12.0,
            }
        );
    }

    #[test]
    fn parse_sensor_snapshot_five_fields_is_error() {
        // Never a partially-filled snapshot.
        let r = parse_sensor_snapshot("/21x0000x21.5;7.20;300.0;310.0;50.0");
        assert!(r.is_err());
    }

    #[test]
    fn parse_pump_snapshot_four_fields() {
        let snap = parse_pump_snapshot("/21q0000q10.0;20.0;0.0;5.0").unwrap();
        assert_eq!(
            snap,
            PumpSnapshot {
                co2_pump: 10.0,
                heater_pump: 20.0,
                cooler_pump: 0.0,
                turb_pump: 5.0,
            }
        );
    }

    #[test]
    fn parse_reactor_mode_uses_caret() {
        assert_eq!(
            parse_reactor_mode("/21m0000^2").unwrap(),
            ReactorMode::Chemostat
        );
        // The standard opcode-letter split must not be accepted here.
        assert!(parse_reactor_mode("/21m0000m2").is_err());
    }

    #[test]
    fn parse_bool_zero_and_nonzero() {
        assert!(!parse_bool("/21p0003p0", 'p').unwrap());
        assert!(parse_bool("/21p0003p1", 'p').unwrap());
    }

    #[test]
    fn parse_schedule_pads_leading_zeros() {
        let t = parse_schedule("/21n0000n730", 'n').unwrap();
        assert_eq!(t, ScheduleTime::new(7, 30).unwrap());
    }
}
