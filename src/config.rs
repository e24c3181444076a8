//! Input-system configuration.
//!
//! Configuration can come from two places:
//! - a TOML document with an `[input]` table, deserialized with `serde`:
//!
//! ```toml
//! [input]
//! raw_input = true
//! xinput = true
//! force_feedback = true
//!
//! [[input.controller_signature]]
//! vid = 0x045e
//! pid = 0x028e
//!
//! [[input.controller_signature]]
//! path_contains = "IG_"
//! ```
//!
//! - any [`ConfigSource`] (the host's own config tree) through
//!   [`InputConfig::from_source`], using the keys `InputSystem`
//!   (`"dinput"`, `"xinput"`, `"rawinput"`), `RawInput`, `XInput` and `ForceFeedback`.
//!
//! The controller signature table decides which legacy joysticks are handed to the
//! controller backend. When none is configured, [`builtin_signatures`] is used.

use serde::{Deserialize, Serialize};

use crate::device::LegacyJoyInfo;
use crate::error::ConfigError;

/// Resolved input options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Use the raw event stream for keyboards and mice (multiple devices).
    pub raw_input: bool,
    /// Hand controller-compatible joysticks to the controller backend.
    pub xinput: bool,
    /// Allow force-feedback commands to reach devices.
    pub force_feedback: bool,
    /// Overrides the built-in signature table when non-empty.
    #[serde(rename = "controller_signature")]
    pub controller_signatures: Vec<ControllerSignature>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            raw_input: false,
            xinput: true,
            force_feedback: false,
            controller_signatures: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    input: InputConfig,
}

impl InputConfig {
    /// Parse the `[input]` table of a TOML document. A missing table yields defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let doc: Document = toml::from_str(s)?;
        doc.input.validate()?;
        Ok(doc.input)
    }

    /// Resolve options from a host configuration node.
    ///
    /// `InputSystem` selects a preset; `RawInput`/`XInput` then override the
    /// individual flags. Unknown `InputSystem` names leave the defaults alone.
    pub fn from_source(src: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(v) = src.value("InputSystem") {
            let name = v.as_str("InputSystem")?;
            if let Some((raw, xinput)) = preset(name) {
                cfg.raw_input = raw;
                cfg.xinput = xinput;
            } else {
                tracing::warn!(input_system = name, "unknown input system name; using defaults");
            }
        }
        if let Some(v) = src.value("RawInput") {
            cfg.raw_input = v.as_bool("RawInput")?;
        }
        if let Some(v) = src.value("XInput") {
            cfg.xinput = v.as_bool("XInput")?;
        }
        if let Some(v) = src.value("ForceFeedback") {
            cfg.force_feedback = v.as_bool("ForceFeedback")?;
        }
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (i, sig) in self.controller_signatures.iter().enumerate() {
            if sig.vid.is_none() && sig.path_contains.is_none() {
                return Err(ConfigError::EmptySignature(i));
            }
            if sig.pid.is_some() && sig.vid.is_none() {
                return Err(ConfigError::PidWithoutVid(i));
            }
        }
        Ok(())
    }

    /// The signature table in effect.
    pub fn signatures(&self) -> Vec<ControllerSignature> {
        if self.controller_signatures.is_empty() {
            builtin_signatures()
        } else {
            self.controller_signatures.clone()
        }
    }
}

/// `InputSystem` name → `(raw_input, xinput)`.
fn preset(name: &str) -> Option<(bool, bool)> {
    match name.to_ascii_lowercase().as_str() {
        "dinput" => Some((false, false)),
        "xinput" => Some((false, true)),
        "rawinput" => Some((true, false)),
        _ => None,
    }
}

/// A rule identifying a controller-compatible joystick.
///
/// Every field that is set must match. `pid` without `vid` is rejected at load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerSignature {
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    /// Case-insensitive substring of the device interface path.
    pub path_contains: Option<String>,
}

impl ControllerSignature {
    pub const fn vid_pid(vid: u16, pid: u16) -> Self {
        Self {
            vid: Some(vid),
            pid: Some(pid),
            path_contains: None,
        }
    }

    pub fn matches(&self, info: &LegacyJoyInfo) -> bool {
        if self.vid.is_none() && self.path_contains.is_none() {
            return false;
        }
        if let Some(vid) = self.vid {
            if vid != info.vendor_id {
                return false;
            }
        }
        if let Some(pid) = self.pid {
            if pid != info.product_id {
                return false;
            }
        }
        if let Some(marker) = &self.path_contains {
            let Some(path) = &info.path else {
                return false;
            };
            if !path
                .to_ascii_lowercase()
                .contains(&marker.to_ascii_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Whether any signature in `table` matches `info`.
pub fn is_controller(table: &[ControllerSignature], info: &LegacyJoyInfo) -> bool {
    table.iter().any(|s| s.matches(info))
}

/// Known controller-compatible devices.
///
/// `IG_` in an interface path marks the HID endpoint of an XInput device
/// ("interface group"); the vid/pid pairs cover drivers that hide the path.
pub fn builtin_signatures() -> Vec<ControllerSignature> {
    const MS: u16 = 0x045e;
    const LOGITECH: u16 = 0x046d;
    let mut out = vec![ControllerSignature {
        vid: None,
        pid: None,
        path_contains: Some("IG_".into()),
    }];
    out.extend(
        [
            (MS, 0x028e), // Xbox 360 Controller
            (MS, 0x028f), // Xbox 360 Wireless (play & charge)
            (MS, 0x0291), // Xbox 360 Wireless Receiver (3rd party)
            (MS, 0x02a1), // Xbox 360 Wireless Receiver
            (MS, 0x0719), // Xbox 360 Wireless Receiver
            (MS, 0x02d1), // Xbox One Controller
            (MS, 0x02dd), // Xbox One Controller (2015)
            (MS, 0x02e3), // Xbox One Elite
            (MS, 0x02ea), // Xbox One S
            (MS, 0x0b00), // Xbox Elite Series 2
            (MS, 0x0b12), // Xbox Series X|S
            (LOGITECH, 0xc21d), // F310 (XInput mode)
            (LOGITECH, 0xc21e), // F510 (XInput mode)
            (LOGITECH, 0xc21f), // F710 (XInput mode)
        ]
        .into_iter()
        .map(|(v, p)| ControllerSignature::vid_pid(v, p)),
    );
    out
}

/// A scalar read from a host configuration node.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConfigValue {
    fn as_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::Int(i) => Ok(*i != 0),
            ConfigValue::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::WrongType {
                    key: key.to_string(),
                    expected: "bool",
                }),
            },
        }
    }

    fn as_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self {
            ConfigValue::Str(s) => Ok(s),
            _ => Err(ConfigError::WrongType {
                key: key.to_string(),
                expected: "string",
            }),
        }
    }
}

/// Named key/value lookups over the host's configuration tree.
pub trait ConfigSource {
    fn value(&self, key: &str) -> Option<ConfigValue>;
}

impl ConfigSource for toml::Table {
    fn value(&self, key: &str) -> Option<ConfigValue> {
        match self.get(key)? {
            toml::Value::Boolean(b) => Some(ConfigValue::Bool(*b)),
            toml::Value::Integer(i) => Some(ConfigValue::Int(*i)),
            toml::Value::String(s) => Some(ConfigValue::Str(s.clone())),
            _ => None,
        }
    }
}

impl ConfigSource for std::collections::HashMap<String, String> {
    fn value(&self, key: &str) -> Option<ConfigValue> {
        self.get(key).map(|s| ConfigValue::Str(s.clone()))
    }
}
