// ── Wire and domain models ──
//
// `PollData` is the one snapshot type both transports produce. The local
// firmware and the cloud relay use different field names for the same data
// (`height` vs `flameheight`, `remote_uptime` vs `uptime`), handled with
// serde aliases. The relay also stringifies numbers ("temperature":"22"
// where the device sends 22), so every numeric field deserializes through a
// tolerant number-or-string path.

use std::fmt::Display;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::command::FireplaceCommand;

// ── Tolerant deserializers ──────────────────────────────────────────

fn num<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr<T> {
        Num(T),
        Str(String),
    }

    match NumOrStr::<T>::deserialize(deserializer)? {
        NumOrStr::Num(n) => Ok(n),
        NumOrStr::Str(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Num(i64),
        Str(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Num(n) => Ok(n != 0),
        Flag::Str(s) => {
            let n: i64 = s.trim().parse().map_err(de::Error::custom)?;
            Ok(n != 0)
        }
    }
}

fn num_list<'de, D>(deserializer: D) -> Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(u16),
        Str(String),
    }

    let raw = Vec::<NumOrStr>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|v| match v {
            NumOrStr::Num(n) => Ok(n),
            NumOrStr::Str(s) => s.trim().parse().map_err(de::Error::custom),
        })
        .collect()
}

// ── Defaults ────────────────────────────────────────────────────────

fn default_unset() -> String {
    "unset".into()
}

fn default_ipv4() -> String {
    "127.0.0.1".into()
}

fn default_setpoint() -> u16 {
    2200
}

fn default_temperature() -> i16 {
    18
}

// ── PollData ────────────────────────────────────────────────────────

/// One full device-state snapshot, replaced wholesale on every successful
/// poll.
///
/// The default value is the "unset" sentinel, recognizable by
/// `serial == "unset"` (local) and `ipv4_address == "127.0.0.1"` (cloud);
/// see [`PollData::is_initialized`]. Snapshots are never merged field by
/// field; the only point mutation is the optimistic patch applied through
/// [`PollData::with_command_applied`] right after a successful command send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct PollData {
    #[serde(default, deserialize_with = "num")]
    pub battery: u16,
    #[serde(default = "default_unset")]
    pub brand: String,
    #[serde(
        default,
        alias = "remote_connection_quality",
        deserialize_with = "num"
    )]
    pub connection_quality: u32,
    #[serde(default, alias = "remote_downtime", deserialize_with = "num")]
    pub downtime: u32,
    #[serde(default, deserialize_with = "num")]
    pub ecm_latency: u32,
    #[serde(default, deserialize_with = "num_list")]
    pub errors: Vec<u16>,
    #[serde(default, deserialize_with = "num")]
    pub fanspeed: u8,
    #[serde(default, alias = "height", deserialize_with = "num")]
    pub flameheight: u8,
    #[serde(default = "default_unset", alias = "firmware_version_string")]
    pub fw_ver_str: String,
    #[serde(default = "default_unset", alias = "firmware_version")]
    pub fw_version: String,
    #[serde(default, alias = "feature_fan", deserialize_with = "flag")]
    pub has_fan: bool,
    #[serde(default, alias = "feature_light", deserialize_with = "flag")]
    pub has_light: bool,
    #[serde(default, alias = "power_vent", deserialize_with = "flag")]
    pub has_power_vent: bool,
    #[serde(default, alias = "feature_thermostat", deserialize_with = "flag")]
    pub has_thermostat: bool,
    #[serde(default = "default_ipv4")]
    pub ipv4_address: String,
    #[serde(default, alias = "hot", deserialize_with = "flag")]
    pub is_hot: bool,
    #[serde(default, alias = "power", deserialize_with = "flag")]
    pub is_on: bool,
    #[serde(default, alias = "light", deserialize_with = "num")]
    pub light_level: u8,
    /// Not available from the local endpoint.
    #[serde(default = "default_unset")]
    pub name: String,
    #[serde(default, alias = "pilot", deserialize_with = "flag")]
    pub pilot_on: bool,
    #[serde(default, deserialize_with = "num")]
    pub prepurge: u32,
    /// Thermostat setpoint in hundredths of a degree Celsius.
    #[serde(
        default = "default_setpoint",
        alias = "setpoint",
        deserialize_with = "num"
    )]
    pub raw_thermostat_setpoint: u16,
    /// Not available from the cloud endpoint.
    #[serde(default = "default_unset")]
    pub serial: String,
    #[serde(
        default = "default_temperature",
        alias = "temperature",
        deserialize_with = "num"
    )]
    pub temperature_c: i16,
    #[serde(default, alias = "thermostat", deserialize_with = "flag")]
    pub thermostat_on: bool,
    #[serde(default, alias = "timer", deserialize_with = "flag")]
    pub timer_on: bool,
    #[serde(default, alias = "timeremaining", deserialize_with = "num")]
    pub timeremaining_s: u32,
    #[serde(default, alias = "remote_uptime", deserialize_with = "num")]
    pub uptime: u32,
}

impl Default for PollData {
    fn default() -> Self {
        Self {
            battery: 0,
            brand: default_unset(),
            connection_quality: 0,
            downtime: 0,
            ecm_latency: 0,
            errors: Vec::new(),
            fanspeed: 0,
            flameheight: 0,
            fw_ver_str: default_unset(),
            fw_version: default_unset(),
            has_fan: false,
            has_light: false,
            has_power_vent: false,
            has_thermostat: false,
            ipv4_address: default_ipv4(),
            is_hot: false,
            is_on: false,
            light_level: 0,
            name: default_unset(),
            pilot_on: false,
            prepurge: 0,
            raw_thermostat_setpoint: default_setpoint(),
            serial: default_unset(),
            temperature_c: default_temperature(),
            thermostat_on: false,
            timer_on: false,
            timeremaining_s: 0,
            uptime: 0,
        }
    }
}

impl PollData {
    /// Whether this snapshot came from an actual poll, as opposed to the
    /// default "unset" sentinel. The local endpoint always carries a serial,
    /// the cloud endpoint always carries a real LAN address.
    pub fn is_initialized(&self) -> bool {
        self.serial != "unset" || self.ipv4_address != "127.0.0.1"
    }

    /// Room temperature in Fahrenheit.
    pub fn temperature_f(&self) -> f64 {
        f64::from(self.temperature_c) * 9.0 / 5.0 + 32.0
    }

    /// Thermostat setpoint in Celsius.
    pub fn thermostat_setpoint_c(&self) -> f64 {
        f64::from(self.raw_thermostat_setpoint) / 100.0
    }

    /// Thermostat setpoint in Fahrenheit.
    pub fn thermostat_setpoint_f(&self) -> f64 {
        self.thermostat_setpoint_c() * 9.0 / 5.0 + 32.0
    }

    /// Raw error codes resolved to [`ErrorCode`]s; unknown codes are
    /// dropped.
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors
            .iter()
            .filter_map(|&c| ErrorCode::from_code(c))
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Copy of this snapshot with the optimistic effect of a just-accepted
    /// command applied, so readers see the new value ahead of the next real
    /// poll. The next successful poll replaces it wholesale.
    pub fn with_command_applied(&self, command: FireplaceCommand, value: u16) -> Self {
        let mut next = self.clone();
        match command {
            FireplaceCommand::Power => next.is_on = value != 0,
            FireplaceCommand::Pilot => next.pilot_on = value != 0,
            FireplaceCommand::Light => next.light_level = value.min(3) as u8,
            FireplaceCommand::FlameHeight => next.flameheight = value.min(4) as u8,
            FireplaceCommand::FanSpeed => next.fanspeed = value.min(4) as u8,
            FireplaceCommand::ThermostatSetpoint => {
                next.raw_thermostat_setpoint = value;
                next.thermostat_on = value != 0;
            }
            FireplaceCommand::TimeRemaining => {
                next.timeremaining_s = u32::from(value);
                next.timer_on = value != 0;
            }
            // No observable state change.
            FireplaceCommand::Beep | FireplaceCommand::SoftReset => {}
        }
        next
    }
}

// ── Error codes ─────────────────────────────────────────────────────

/// Vendor-defined appliance error codes from the poll `errors` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PilotFlame,
    Flame,
    FanDelay,
    Maintenance,
    Disabled,
    Fan,
    Lights,
    Accessory,
    SoftLockOut,
    Offline,
    EcmOffline,
}

impl ErrorCode {
    /// Resolve a raw code. Codes 130 and 145 are firmware aliases for 2 and
    /// 129 respectively.
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            2 | 130 => Some(Self::PilotFlame),
            4 => Some(Self::Flame),
            6 => Some(Self::FanDelay),
            64 => Some(Self::Maintenance),
            129 | 145 => Some(Self::Disabled),
            132 => Some(Self::Fan),
            133 => Some(Self::Lights),
            134 => Some(Self::Accessory),
            144 => Some(Self::SoftLockOut),
            642 => Some(Self::Offline),
            3269 => Some(Self::EcmOffline),
            _ => None,
        }
    }

    /// Canonical numeric code.
    pub const fn code(self) -> u16 {
        match self {
            Self::PilotFlame => 2,
            Self::Flame => 4,
            Self::FanDelay => 6,
            Self::Maintenance => 64,
            Self::Disabled => 129,
            Self::Fan => 132,
            Self::Lights => 133,
            Self::Accessory => 134,
            Self::SoftLockOut => 144,
            Self::Offline => 642,
            Self::EcmOffline => 3269,
        }
    }

    /// The vendor's user-facing message for this code.
    pub const fn message(self) -> &'static str {
        match self {
            Self::PilotFlame => {
                "Pilot Flame Error: Your appliance has been safely disabled. \
                 Please contact your dealer and report this issue."
            }
            Self::Flame => {
                "Pilot Flame Error. Your appliance has been safely disabled. \
                 Please contact your dealer and report this issue."
            }
            Self::FanDelay => {
                "Fan Information: Fan will turn on within 3 minutes. \
                 Your appliance has a built-in delay that prevents the fan from \
                 operating within the first 3 minutes of turning on the appliance. \
                 This allows the air to be heated prior to circulation."
            }
            Self::Maintenance => {
                "Maintenance: Your appliance is due for a routine maintenance check. \
                 Please contact your dealer to ensure your appliance is operating at \
                 peak performance."
            }
            Self::Disabled => {
                "Appliance Safely Disabled: Your appliance has been disabled. \
                 Please contact your dealer and report this issue."
            }
            Self::Fan => {
                "Fan Error. Your appliance has detected that an accessory is not \
                 functional. Please contact your dealer and report this issue."
            }
            Self::Lights => {
                "Lights Error. Your appliance has detected that an accessory is not \
                 functional. Please contact your dealer and report this issue."
            }
            Self::Accessory => {
                "Your appliance has detected that an AUX port or accessory is not \
                 functional. Please contact your dealer and report this issue."
            }
            Self::SoftLockOut => {
                "Sorry your appliance did not start. Try again by pressing Flame ON."
            }
            Self::Offline => "Your appliance is currently offline.",
            Self::EcmOffline => "ECM is offline.",
        }
    }
}

// ── Modes ───────────────────────────────────────────────────────────

/// Which transport backs an operation. Read and control modes are selected
/// independently and may differ.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Local,
    Cloud,
    None,
}

/// How the cloud background loop polls: fixed cadence (`Short`) or the
/// server-side blocking long poll (`Long`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CloudPollMode {
    #[default]
    Short,
    Long,
}

// ── Credentials ─────────────────────────────────────────────────────

fn default_unset_uc() -> String {
    "UNSET".into()
}

/// Session cookie triple captured from a cloud login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookies {
    #[serde(default = "default_unset_uc")]
    pub user_id: String,
    #[serde(default = "default_unset_uc")]
    pub auth_cookie: String,
    #[serde(default = "default_unset_uc")]
    pub web_client_id: String,
}

impl Default for SessionCookies {
    fn default() -> Self {
        Self {
            user_id: default_unset_uc(),
            auth_cookie: default_unset_uc(),
            web_client_id: default_unset_uc(),
        }
    }
}

impl SessionCookies {
    /// Whether a real login populated these cookies.
    pub fn is_set(&self) -> bool {
        !self.user_id.is_empty()
            && self.user_id != "UNSET"
            && !self.auth_cookie.is_empty()
            && self.auth_cookie != "UNSET"
    }

    /// `(name, value)` pairs in the form the relay expects them.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("user", &self.user_id),
            ("auth_cookie", &self.auth_cookie),
            ("web_client_id", &self.web_client_id),
        ]
    }
}

/// Everything needed to reach one fireplace over both transports.
///
/// Immutable once constructed; replaced wholesale on re-login. Serializes to
/// the same flat JSON shape the vendor apps persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireplaceCredentials {
    #[serde(default = "default_unset_uc")]
    pub ip_address: String,
    /// Per-fireplace API key (hex), required for local control.
    #[serde(default = "default_unset_uc")]
    pub api_key: String,
    #[serde(default = "default_unset_uc")]
    pub serial: String,
    #[serde(flatten)]
    pub cookies: SessionCookies,
    #[serde(default)]
    pub read_mode: TransportMode,
    #[serde(default)]
    pub control_mode: TransportMode,
}

impl Default for FireplaceCredentials {
    fn default() -> Self {
        Self {
            ip_address: default_unset_uc(),
            api_key: default_unset_uc(),
            serial: default_unset_uc(),
            cookies: SessionCookies::default(),
            read_mode: TransportMode::default(),
            control_mode: TransportMode::default(),
        }
    }
}

// ── Cloud enumeration models ────────────────────────────────────────

/// One location from `GET /a/enumlocations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub location_id: String,
    pub location_name: String,
    #[serde(default)]
    pub wifi_essid: String,
    #[serde(default)]
    pub wifi_password: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default, deserialize_with = "num")]
    pub user_class: i32,
}

/// Response body of `GET /a/enumlocations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locations {
    pub locations: Vec<Location>,
    #[serde(default, deserialize_with = "num")]
    pub email_notifications_enabled: i32,
}

/// One fireplace from `GET /a/enumfireplaces`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFireplace {
    pub serial: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub name: String,
    pub apikey: String,
    #[serde(default)]
    pub power: String,
}

/// Response body of `GET /a/enumfireplaces?location_id=`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireplaceList {
    #[serde(default)]
    pub location_name: String,
    pub fireplaces: Vec<CloudFireplace>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // The local firmware sends real JSON numbers.
    const LOCAL_POLL: &str = r#"{
        "name": "",
        "serial": "ABCDE12345",
        "temperature": 17,
        "battery": 0,
        "pilot": 0,
        "light": 3,
        "height": 4,
        "fanspeed": 1,
        "hot": 0,
        "power": 1,
        "thermostat": 0,
        "setpoint": 0,
        "timer": 0,
        "timeremaining": 0,
        "prepurge": 0,
        "feature_light": 1,
        "feature_thermostat": 1,
        "power_vent": 0,
        "feature_fan": 1,
        "errors": [3269],
        "fw_version": "0x01000000",
        "fw_ver_str": "0.0.0.0",
        "downtime": 0,
        "uptime": 116,
        "connection_quality": 988451,
        "ecm_latency": 0,
        "ipv4_address": "192.168.1.80"
    }"#;

    // The cloud relay stringifies every number.
    const CLOUD_POLL: &str = r#"{
        "name": "undefined",
        "temperature": "22",
        "battery": "0",
        "pilot": "0",
        "light": "3",
        "height": "4",
        "fanspeed": "0",
        "hot": "0",
        "power": "0",
        "thermostat": "0",
        "setpoint": "0",
        "timer": "0",
        "timeremaining": "0",
        "prepurge": "0",
        "feature_light": "1",
        "feature_thermostat": "1",
        "power_vent": "0",
        "feature_fan": "1",
        "errors": [3269],
        "firmware_version": "0x01000000",
        "brand": "H&G"
    }"#;

    #[test]
    fn local_poll_parses() {
        let data: PollData = serde_json::from_str(LOCAL_POLL).unwrap();
        assert_eq!(data.serial, "ABCDE12345");
        assert_eq!(data.temperature_c, 17);
        assert_eq!(data.flameheight, 4);
        assert_eq!(data.fanspeed, 1);
        assert!(data.is_on);
        assert!(!data.pilot_on);
        assert!(data.has_light);
        assert!(!data.has_power_vent);
        assert_eq!(data.errors, vec![3269]);
        assert_eq!(data.ipv4_address, "192.168.1.80");
        assert!(data.is_initialized());
    }

    #[test]
    fn cloud_poll_parses_stringified_numbers() {
        let data: PollData = serde_json::from_str(CLOUD_POLL).unwrap();
        assert_eq!(data.temperature_c, 22);
        assert_eq!(data.flameheight, 4);
        assert_eq!(data.light_level, 3);
        assert!(!data.is_on);
        assert!(data.has_fan);
        assert_eq!(data.fw_version, "0x01000000");
        assert_eq!(data.brand, "H&G");
        // Cloud body has no serial, so the default sentinel remains.
        assert_eq!(data.serial, "unset");
    }

    #[test]
    fn default_snapshot_is_the_sentinel() {
        let data = PollData::default();
        assert_eq!(data.serial, "unset");
        assert_eq!(data.ipv4_address, "127.0.0.1");
        assert_eq!(data.raw_thermostat_setpoint, 2200);
        assert_eq!(data.temperature_c, 18);
        assert!(!data.is_initialized());
    }

    #[test]
    fn temperature_conversions() {
        let mut data = PollData::default();
        data.temperature_c = 20;
        data.raw_thermostat_setpoint = 2100;
        assert!((data.temperature_f() - 68.0).abs() < f64::EPSILON);
        assert!((data.thermostat_setpoint_c() - 21.0).abs() < f64::EPSILON);
        assert!((data.thermostat_setpoint_f() - 69.8).abs() < 1e-9);
    }

    #[test]
    fn optimistic_patch_per_command() {
        let base = PollData::default();

        let on = base.with_command_applied(FireplaceCommand::Power, 1);
        assert!(on.is_on);
        assert!(!base.is_on, "patch must not mutate the source snapshot");

        let lit = base.with_command_applied(FireplaceCommand::Light, 2);
        assert_eq!(lit.light_level, 2);

        let heat = base.with_command_applied(FireplaceCommand::ThermostatSetpoint, 2100);
        assert_eq!(heat.raw_thermostat_setpoint, 2100);
        assert!(heat.thermostat_on);

        let off = heat.with_command_applied(FireplaceCommand::ThermostatSetpoint, 0);
        assert!(!off.thermostat_on);

        let timed = base.with_command_applied(FireplaceCommand::TimeRemaining, 3600);
        assert_eq!(timed.timeremaining_s, 3600);
        assert!(timed.timer_on);

        // Beep has no observable state.
        assert_eq!(base.with_command_applied(FireplaceCommand::Beep, 1), base);
    }

    #[test]
    fn error_code_aliases_and_messages() {
        assert_eq!(ErrorCode::from_code(2), Some(ErrorCode::PilotFlame));
        assert_eq!(ErrorCode::from_code(130), Some(ErrorCode::PilotFlame));
        assert_eq!(ErrorCode::from_code(129), Some(ErrorCode::Disabled));
        assert_eq!(ErrorCode::from_code(145), Some(ErrorCode::Disabled));
        assert_eq!(ErrorCode::from_code(642), Some(ErrorCode::Offline));
        assert_eq!(ErrorCode::from_code(3269), Some(ErrorCode::EcmOffline));
        assert_eq!(ErrorCode::from_code(9999), None);

        assert_eq!(ErrorCode::EcmOffline.message(), "ECM is offline.");
        assert_eq!(
            ErrorCode::SoftLockOut.message(),
            "Sorry your appliance did not start. Try again by pressing Flame ON."
        );
        assert_eq!(ErrorCode::Offline.to_string(), "OFFLINE");
    }

    #[test]
    fn poll_error_codes_resolve() {
        let data: PollData = serde_json::from_str(CLOUD_POLL).unwrap();
        assert!(data.has_errors());
        assert_eq!(data.error_codes(), vec![ErrorCode::EcmOffline]);
    }

    #[test]
    fn credentials_round_trip_flat_json() {
        let creds = FireplaceCredentials {
            ip_address: "192.168.1.80".into(),
            api_key: "12345678deadbeef".into(),
            serial: "ABCDE12345".into(),
            cookies: SessionCookies {
                user_id: "user1".into(),
                auth_cookie: "cookie1".into(),
                web_client_id: "web1".into(),
            },
            read_mode: TransportMode::Local,
            control_mode: TransportMode::Cloud,
        };

        let json = serde_json::to_value(&creds).unwrap();
        // Cookie fields serialize flat, matching what the vendor apps persist.
        assert_eq!(json["user_id"], "user1");
        assert_eq!(json["read_mode"], "local");
        assert_eq!(json["control_mode"], "cloud");

        let back: FireplaceCredentials = serde_json::from_value(json).unwrap();
        assert_eq!(back, creds);
    }

    #[test]
    fn unset_cookies_are_not_set() {
        assert!(!SessionCookies::default().is_set());
        let real = SessionCookies {
            user_id: "u".into(),
            auth_cookie: "a".into(),
            web_client_id: "w".into(),
        };
        assert!(real.is_set());
    }
}
