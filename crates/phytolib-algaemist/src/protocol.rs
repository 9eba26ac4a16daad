//! Algaemist wire-protocol encoder/decoder.
//!
//! The device speaks a compact fixed-width ASCII protocol over the
//! serial link:
//!
//! # Command format
//!
//! ```text
//! /<AA><o><nnnn>
//! ```
//!
//! - `/`: frame lead-in.
//! - `AA`: two-digit zero-padded device address.
//! - `o`: single-character opcode. Lowercase opcodes read, uppercase
//!   (plus `!`, `@`, `^`) write.
//! - `nnnn`: four-digit zero-padded decimal payload. Read commands use
//!   it as a sub-channel selector; some write commands split it into a
//!   selector digit plus a three-digit value.
//!
//! # Response format
//!
//! One ASCII line. Read replies echo the command and append the value
//! after a repeated opcode letter (`/21p0000p07.5`), so the value is
//! everything after the *last* occurrence of the opcode. The
//! reactor-mode reply deviates and separates the value with `^` instead
//! of the opcode letter -- a firmware fact this module reproduces rather
//! than normalizes.
//!
//! Write replies end with a two-character completion sentinel, `"OK"`
//! for every setter except the daytime-temperature command, which the
//! firmware acknowledges with `"??"` (see [`check_ack`]).

use bytes::{BufMut, BytesMut};

use phytolib_core::error::{Error, Result};
use phytolib_core::types::DeviceAddress;

/// Frame lead-in byte.
pub const FRAME_LEAD: u8 = b'/';

/// Completion sentinel carried by nearly every write reply.
pub const ACK_OK: &str = "OK";

/// Completion sentinel of the daytime-temperature setter.
///
/// The firmware answers this one command with `"??"` where every other
/// setter answers `"OK"`. Open question whether that is intentional;
/// reproduced exactly until confirmed against the physical device.
pub const ACK_TEMP_DAY: &str = "??";

/// Separator used by the reactor-mode reply instead of the opcode letter.
pub const MODE_SEPARATOR: char = '^';

/// Field separator of aggregated replies.
pub const FIELD_SEPARATOR: char = ';';

/// Encode one command frame: `/` + 2-digit address + opcode + payload.
///
/// The payload must already be the fixed-width digit group(s) produced
/// by the builders in [`crate::commands`]; this function only assembles
/// the frame.
///
/// # Example
///
/// ```
/// use phytolib_algaemist::protocol::encode_frame;
/// use phytolib_core::types::DeviceAddress;
///
/// let addr = DeviceAddress::new(21).unwrap();
/// assert_eq!(encode_frame(addr, 'P', "0075"), b"/21P0075");
/// ```
pub fn encode_frame(address: DeviceAddress, opcode: char, payload: &str) -> Vec<u8> {
    debug_assert_eq!(payload.len(), 4, "payload must be exactly four characters");
    let mut buf = BytesMut::with_capacity(2 + 1 + 1 + payload.len());
    buf.put_u8(FRAME_LEAD);
    buf.put_slice(address.to_string().as_bytes());
    let mut opcode_utf8 = [0u8; 4];
    buf.put_slice(opcode.encode_utf8(&mut opcode_utf8).as_bytes());
    buf.put_slice(payload.as_bytes());
    buf.to_vec()
}

/// Return the part of a reply after the last occurrence of `sep`.
///
/// Read replies echo the full command before the value, so everything up
/// to and including the final separator (conventionally the opcode
/// letter; `^` for the reactor-mode reply) is stripped.
pub fn strip_echo(line: &str, sep: char) -> Result<&str> {
    match line.rfind(sep) {
        Some(pos) => Ok(&line[pos + sep.len_utf8()..]),
        None => Err(Error::Parse(format!(
            "reply {line:?} does not contain separator {sep:?}"
        ))),
    }
}

/// Strip the echo and parse the remainder as a single value.
pub fn parse_value<T: std::str::FromStr>(line: &str, sep: char) -> Result<T> {
    let raw = strip_echo(line, sep)?.trim();
    raw.parse().map_err(|_| {
        Error::Parse(format!("could not parse value {raw:?} from reply {line:?}"))
    })
}

/// Strip the echo and split the remainder into exactly `expected`
/// semicolon-delimited fields.
///
/// Fewer fields than expected is a [`Error::Parse`] -- aggregated reads
/// never yield a partial record. Extra trailing fields are ignored.
pub fn split_fields(line: &str, sep: char, expected: usize) -> Result<Vec<&str>> {
    let raw = strip_echo(line, sep)?;
    let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).map(str::trim).collect();
    if fields.len() < expected {
        return Err(Error::Parse(format!(
            "expected {expected} fields, got {} in reply {line:?}",
            fields.len()
        )));
    }
    Ok(fields[..expected].to_vec())
}

/// Check a write reply's completion sentinel.
///
/// Success is defined by the reply's trailing two characters equalling
/// the opcode's documented token. Anything else -- including an empty
/// reply -- is a rejection carrying the reply verbatim.
pub fn check_ack(line: &str, sentinel: &str) -> Result<()> {
    let trimmed = line.trim_end();
    if trimmed.len() >= sentinel.len() && trimmed.ends_with(sentinel) {
        Ok(())
    } else {
        Err(Error::Rejected(line.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> DeviceAddress {
        DeviceAddress::new(21).unwrap()
    }

    // -----------------------------------------------------------------
    // encode_frame
    // -----------------------------------------------------------------

    #[test]
    fn encode_read_frame() {
        assert_eq!(encode_frame(addr(), 'p', "0000"), b"/21p0000");
    }

    #[test]
    fn encode_pads_single_digit_address() {
        let a = DeviceAddress::new(3).unwrap();
        assert_eq!(encode_frame(a, 'x', "0000"), b"/03x0000");
    }

    #[test]
    fn encode_symbol_opcodes() {
        assert_eq!(encode_frame(addr(), '!', "0000"), b"/21!0000");
        assert_eq!(encode_frame(addr(), '@', "0001"), b"/21@0001");
    }

    // -----------------------------------------------------------------
    // strip_echo / parse_value
    // -----------------------------------------------------------------

    #[test]
    fn strip_echo_takes_remainder_after_last_separator() {
        // The echo itself contains the opcode letter; only the last
        // occurrence separates the value.
        assert_eq!(strip_echo("/21p0000p07.5", 'p').unwrap(), "07.5");
    }

    #[test]
    fn strip_echo_missing_separator_is_parse_error() {
        assert!(matches!(
            strip_echo("/21r0000", 'p'),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn parse_value_float() {
        let v: f64 = parse_value("/21r0001r21.5", 'r').unwrap();
        assert_eq!(v, 21.5);
    }

    #[test]
    fn parse_value_mode_uses_caret_separator() {
        let v: u16 = parse_value("/21m0000^2", MODE_SEPARATOR).unwrap();
        assert_eq!(v, 2);
    }

    #[test]
    fn parse_value_garbage_is_parse_error() {
        let r: Result<f64> = parse_value("/21r0001rers", 'r');
        assert!(matches!(r, Err(Error::Parse(_))));
    }

    // -----------------------------------------------------------------
    // split_fields
    // -----------------------------------------------------------------

    #[test]
    fn split_fields_exact_count() {
        let fields = split_fields("x21.5;7.20;300.0;310.0;50.0;12.0", 'x', 6).unwrap();
        assert_eq!(fields, vec!["21.5", "7.20", "300.0", "310.0", "50.0", "12.0"]);
    }

    #[test]
    fn split_fields_too_few_is_parse_error() {
        let r = split_fields("x21.5;7.20;300.0;310.0;50.0", 'x', 6);
        assert!(matches!(r, Err(Error::Parse(_))));
    }

    #[test]
    fn split_fields_ignores_extra_trailing_fields() {
        let fields = split_fields("q1.0;2.0;3.0;4.0;junk", 'q', 4).unwrap();
        assert_eq!(fields, vec!["1.0", "2.0", "3.0", "4.0"]);
    }

    // -----------------------------------------------------------------
    // check_ack
    // -----------------------------------------------------------------

    #[test]
    fn ack_ok_trailing_token() {
        assert!(check_ack("/21P0075OK", ACK_OK).is_ok());
    }

    #[test]
    fn ack_wrong_token_is_rejected() {
        assert!(matches!(
            check_ack("/21P0075NO", ACK_OK),
            Err(Error::Rejected(_))
        ));
    }

    #[test]
    fn ack_day_temperature_uses_question_marks() {
        assert!(check_ack("/21R0105??", ACK_TEMP_DAY).is_ok());
        // The same reply must fail the default token check.
        assert!(check_ack("/21R0105??", ACK_OK).is_err());
    }

    #[test]
    fn ack_empty_reply_is_rejected() {
        assert!(matches!(check_ack("", ACK_OK), Err(Error::Rejected(_))));
    }
}
