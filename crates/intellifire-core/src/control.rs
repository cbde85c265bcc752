// ── High-level command helpers ──
//
// Thin wrappers over `send_command` that encode the vendor semantics:
// thermostat setpoints travel as hundredths of a degree Celsius, the sleep
// timer as seconds, and turning the thermostat back on restores the last
// setpoint it was turned off at.

use std::sync::atomic::Ordering;

use intellifire_api::FireplaceCommand;

use crate::error::CoreError;
use crate::fireplace::UnifiedFireplace;

impl UnifiedFireplace {
    pub async fn flame_on(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::Power, 1).await
    }

    pub async fn flame_off(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::Power, 0).await
    }

    pub async fn pilot_on(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::Pilot, 1).await
    }

    pub async fn pilot_off(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::Pilot, 0).await
    }

    /// Light level 0 (off) to 3.
    pub async fn set_lights(&self, level: u16) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::Light, level).await
    }

    /// Flame height 0 (lowest) to 4.
    pub async fn set_flame_height(&self, height: u16) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::FlameHeight, height).await
    }

    /// Fan speed 0 (off) to 4.
    pub async fn set_fan_speed(&self, speed: u16) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::FanSpeed, speed).await
    }

    pub async fn fan_off(&self) -> Result<(), CoreError> {
        self.set_fan_speed(0).await
    }

    /// Set the thermostat in whole degrees Celsius (wire unit is
    /// hundredths of a degree).
    pub async fn set_thermostat_c(&self, temp_c: u16) -> Result<(), CoreError> {
        self.set_raw_thermostat_setpoint(temp_c.saturating_mul(100)).await
    }

    /// Set the thermostat in whole degrees Fahrenheit, rounded to the
    /// nearest degree Celsius.
    pub async fn set_thermostat_f(&self, temp_f: u16) -> Result<(), CoreError> {
        let delta = u32::from(temp_f.saturating_sub(32));
        // round(delta * 5 / 9) in integer arithmetic
        let celsius = (delta * 10 + 9) / 18;
        self.set_thermostat_c(u16::try_from(celsius).unwrap_or(u16::MAX))
            .await
    }

    /// Set the raw setpoint (hundredths of a degree Celsius, 0 disables).
    pub async fn set_raw_thermostat_setpoint(&self, raw: u16) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::ThermostatSetpoint, raw)
            .await?;
        if raw != 0 {
            self.remembered_setpoint.store(raw, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Re-enable the thermostat at the setpoint it was last turned off at
    /// (21.00 °C when none was ever set).
    pub async fn turn_on_thermostat(&self) -> Result<(), CoreError> {
        let raw = self.remembered_setpoint.load(Ordering::Relaxed);
        self.set_raw_thermostat_setpoint(raw).await
    }

    /// Disable the thermostat, remembering the current setpoint for
    /// [`turn_on_thermostat`](Self::turn_on_thermostat).
    pub async fn turn_off_thermostat(&self) -> Result<(), CoreError> {
        let current = self.data().raw_thermostat_setpoint;
        if current != 0 {
            self.remembered_setpoint.store(current, Ordering::Relaxed);
        }
        self.send_command(FireplaceCommand::ThermostatSetpoint, 0)
            .await
    }

    /// Arm the sleep timer, 1 to 180 minutes.
    pub async fn set_sleep_timer(&self, minutes: u16) -> Result<(), CoreError> {
        self.send_command(
            FireplaceCommand::TimeRemaining,
            minutes.saturating_mul(60),
        )
        .await
    }

    pub async fn stop_sleep_timer(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::TimeRemaining, 0).await
    }

    /// Make the appliance beep once.
    pub async fn beep(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::Beep, 1).await
    }

    /// Soft-reset the control module.
    pub async fn soft_reset(&self) -> Result<(), CoreError> {
        self.send_command(FireplaceCommand::SoftReset, 1).await
    }
}
