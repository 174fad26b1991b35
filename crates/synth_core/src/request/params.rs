use serde::{Deserialize, Serialize};

/// Application-layer defaults for vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppDefaults {
    /// Application module type installed on every vehicle.
    pub typename: String,
    pub dest_address: String,
    pub dest_port: u16,
    /// Packet interval in seconds.
    pub send_interval_s: f64,
    pub packet_size_b: u32,
    pub tx_power_dbm: f64,
    pub mitigation: bool,
    pub reroute_on_attack: bool,
}

impl Default for AppDefaults {
    fn default() -> Self {
        Self {
            typename: "VoIPSender".to_string(),
            dest_address: "server".to_string(),
            dest_port: 3000,
            send_interval_s: 0.1,
            packet_size_b: 256,
            tx_power_dbm: 23.0,
            mitigation: false,
            reroute_on_attack: false,
        }
    }
}

/// Jammer mobility class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JammerKind {
    /// Airborne jammer with linear mobility.
    #[default]
    Mobile,
    /// Fixed jamming tower.
    Static,
}

/// Jamming behavior passed to the jammer application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JammingStrategy {
    #[default]
    Constant,
    Reactive,
    Random,
}

impl JammingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Reactive => "reactive",
            Self::Random => "random",
        }
    }
}

/// Request-level jammer defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JammingDefaults {
    pub kind: JammerKind,
    pub strategy: JammingStrategy,
    pub start_s: f64,
    pub stop_s: f64,
    pub power_dbm: f64,
    /// Only used by mobile jammers.
    pub speed_mps: f64,
    /// Only used by mobile jammers.
    pub altitude_m: f64,
}

impl Default for JammingDefaults {
    fn default() -> Self {
        Self {
            kind: JammerKind::Mobile,
            strategy: JammingStrategy::Constant,
            start_s: 20.0,
            stop_s: 100.0,
            power_dbm: 30.0,
            speed_mps: 10.0,
            altitude_m: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsuDefaults {
    pub tx_power_dbm: f64,
}

impl Default for RsuDefaults {
    fn default() -> Self {
        Self { tx_power_dbm: 30.0 }
    }
}

/// All request-level defaults, grouped per entity category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioDefaults {
    pub app: AppDefaults,
    pub jamming: JammingDefaults,
    pub rsu: RsuDefaults,
    pub gnb_tx_power_dbm: f64,
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            app: AppDefaults::default(),
            jamming: JammingDefaults::default(),
            rsu: RsuDefaults::default(),
            gnb_tx_power_dbm: 40.0,
        }
    }
}

/// Per-vehicle overrides. Unset fields fall back to [`AppDefaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_interval_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_size_b: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_power_dbm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<bool>,
}

/// Effective vehicle application settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSettings {
    pub send_interval_s: f64,
    pub packet_size_b: u32,
    pub tx_power_dbm: f64,
    pub mitigation: bool,
}

impl VehicleParams {
    pub fn resolve(&self, defaults: &AppDefaults) -> VehicleSettings {
        VehicleSettings {
            send_interval_s: self.send_interval_s.unwrap_or(defaults.send_interval_s),
            packet_size_b: self.packet_size_b.unwrap_or(defaults.packet_size_b),
            tx_power_dbm: self.tx_power_dbm.unwrap_or(defaults.tx_power_dbm),
            mitigation: self.mitigation.unwrap_or(defaults.mitigation),
        }
    }
}

impl VehicleSettings {
    pub fn from_defaults(defaults: &AppDefaults) -> Self {
        VehicleParams::default().resolve(defaults)
    }
}

/// Per-jammer overrides. Unset fields fall back to [`JammingDefaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JammerParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<JammerKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<JammingStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_dbm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
}

/// Effective jammer settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JammerSettings {
    pub kind: JammerKind,
    pub strategy: JammingStrategy,
    pub start_s: f64,
    pub stop_s: f64,
    pub power_dbm: f64,
    pub speed_mps: f64,
    pub altitude_m: f64,
}

impl JammerParams {
    pub fn resolve(&self, defaults: &JammingDefaults) -> JammerSettings {
        JammerSettings {
            kind: self.kind.unwrap_or(defaults.kind),
            strategy: self.strategy.unwrap_or(defaults.strategy),
            start_s: self.start_s.unwrap_or(defaults.start_s),
            stop_s: self.stop_s.unwrap_or(defaults.stop_s),
            power_dbm: self.power_dbm.unwrap_or(defaults.power_dbm),
            speed_mps: self.speed_mps.unwrap_or(defaults.speed_mps),
            altitude_m: defaults.altitude_m,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsuParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_power_dbm: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsuSettings {
    pub tx_power_dbm: f64,
}

impl RsuParams {
    pub fn resolve(&self, defaults: &RsuDefaults) -> RsuSettings {
        RsuSettings {
            tx_power_dbm: self.tx_power_dbm.unwrap_or(defaults.tx_power_dbm),
        }
    }
}
