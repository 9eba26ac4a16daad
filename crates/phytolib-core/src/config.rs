//! Config-store seam for persisted user values.
//!
//! A small set of named values (the night temperature setpoint, the
//! chemostat target, the device address) is persisted by the application
//! and read once at connect time for initial display. The store itself is
//! an external collaborator; this module defines only the seam the
//! library calls through.

/// Well-known key: secondary (night) temperature setpoint, °C.
pub const KEY_NIGHT_TEMP_SETPOINT: &str = "night_temp_sp2";

/// Well-known key: chemostat dilution setpoint, percent.
pub const KEY_CHEMOSTAT_SETPOINT: &str = "chemostat_setpoint";

/// Well-known key: configured reactor device address.
pub const KEY_REACTOR_ADDRESS: &str = "reactor_addr";

/// Named persisted values supplied by the embedding application.
///
/// Implementations are expected to be cheap to read; the library queries
/// the store once at connect time and after user edits, never in the
/// polling hot path.
pub trait ConfigStore: Send + Sync {
    /// Read a named value, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Persist a named value.
    fn set(&mut self, key: &str, value: &str);

    /// Read a named value and parse it as `f64`.
    ///
    /// Unparseable values are treated as absent.
    fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key)?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapStore(HashMap<String, String>);

    impl ConfigStore for MapStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set(&mut self, key: &str, value: &str) {
            self.0.insert(key.to_string(), value.to_string());
        }
    }

    #[test]
    fn get_f64_parses_stored_values() {
        let mut store = MapStore(HashMap::new());
        store.set(KEY_NIGHT_TEMP_SETPOINT, "18.5");
        store.set(KEY_CHEMOSTAT_SETPOINT, "not a number");

        assert_eq!(store.get_f64(KEY_NIGHT_TEMP_SETPOINT), Some(18.5));
        assert_eq!(store.get_f64(KEY_CHEMOSTAT_SETPOINT), None);
        assert_eq!(store.get_f64(KEY_REACTOR_ADDRESS), None);
    }
}
