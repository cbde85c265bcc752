// ── Fireplace control commands ──
//
// One table drives everything: per-command value bounds and the wire names
// used by each transport. Local and cloud disagree on some names (the local
// firmware takes `flame_height`, the relay takes `height`), so both are kept
// here rather than scattered across the clients.

use strum::{EnumIter, IntoStaticStr};

use crate::error::Error;

/// A logical fireplace command, range-checked before it is put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FireplaceCommand {
    Power,
    Pilot,
    Beep,
    Light,
    FlameHeight,
    FanSpeed,
    /// Thermostat setpoint in hundredths of a degree Celsius (0 disables).
    ThermostatSetpoint,
    /// Sleep timer in seconds, multiples of 60 (0 disables).
    TimeRemaining,
    SoftReset,
}

impl FireplaceCommand {
    /// Inclusive `[min, max]` bounds for the command value.
    pub const fn bounds(self) -> (u16, u16) {
        match self {
            Self::Power | Self::Pilot => (0, 1),
            Self::Beep | Self::SoftReset => (1, 1),
            Self::Light => (0, 3),
            Self::FlameHeight | Self::FanSpeed => (0, 4),
            Self::ThermostatSetpoint => (0, 3700),
            Self::TimeRemaining => (0, 10800),
        }
    }

    /// Field name used by the local device firmware.
    pub const fn local_name(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Pilot => "pilot",
            Self::Beep => "beep",
            Self::Light => "light",
            Self::FlameHeight => "flame_height",
            Self::FanSpeed => "fan_speed",
            Self::ThermostatSetpoint => "thermostat_setpoint",
            Self::TimeRemaining => "time_remaining",
            Self::SoftReset => "soft_reset",
        }
    }

    /// Field name used by the cloud relay.
    pub const fn cloud_name(self) -> &'static str {
        match self {
            Self::FlameHeight => "height",
            Self::FanSpeed => "fanspeed",
            other => other.local_name(),
        }
    }

    /// The command name used in error messages (`POWER`, `FLAME_HEIGHT`, …).
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Validate `value` against this command's bounds.
    ///
    /// Runs identically regardless of transport, before any network I/O.
    pub fn range_check(self, value: u16) -> Result<(), Error> {
        let (min, max) = self.bounds();
        if value < min || value > max {
            return Err(Error::OutOfRange {
                field: self.name(),
                min,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn bounds_match_vendor_table() {
        assert_eq!(FireplaceCommand::Power.bounds(), (0, 1));
        assert_eq!(FireplaceCommand::Pilot.bounds(), (0, 1));
        assert_eq!(FireplaceCommand::Beep.bounds(), (1, 1));
        assert_eq!(FireplaceCommand::Light.bounds(), (0, 3));
        assert_eq!(FireplaceCommand::FlameHeight.bounds(), (0, 4));
        assert_eq!(FireplaceCommand::FanSpeed.bounds(), (0, 4));
        assert_eq!(FireplaceCommand::ThermostatSetpoint.bounds(), (0, 3700));
        assert_eq!(FireplaceCommand::TimeRemaining.bounds(), (0, 10800));
        assert_eq!(FireplaceCommand::SoftReset.bounds(), (1, 1));
    }

    #[test]
    fn wire_names_diverge_where_documented() {
        assert_eq!(FireplaceCommand::FlameHeight.local_name(), "flame_height");
        assert_eq!(FireplaceCommand::FlameHeight.cloud_name(), "height");
        assert_eq!(FireplaceCommand::FanSpeed.local_name(), "fan_speed");
        assert_eq!(FireplaceCommand::FanSpeed.cloud_name(), "fanspeed");
        // Everything else is identical on both transports.
        for cmd in FireplaceCommand::iter() {
            if !matches!(
                cmd,
                FireplaceCommand::FlameHeight | FireplaceCommand::FanSpeed
            ) {
                assert_eq!(cmd.local_name(), cmd.cloud_name());
            }
        }
    }

    #[test]
    fn range_check_rejects_out_of_bounds() {
        let err = FireplaceCommand::FlameHeight.range_check(5).unwrap_err();
        match err {
            Error::OutOfRange { field, min, max } => {
                assert_eq!(field, "FLAME_HEIGHT");
                assert_eq!((min, max), (0, 4));
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }

        // Beep only accepts exactly 1.
        assert!(FireplaceCommand::Beep.range_check(0).is_err());
        assert!(FireplaceCommand::Beep.range_check(1).is_ok());
        assert!(FireplaceCommand::Beep.range_check(2).is_err());
    }

    #[test]
    fn range_check_accepts_boundaries() {
        for cmd in FireplaceCommand::iter() {
            let (min, max) = cmd.bounds();
            assert!(cmd.range_check(min).is_ok());
            assert!(cmd.range_check(max).is_ok());
            assert!(cmd.range_check(max + 1).is_err());
        }
    }
}
