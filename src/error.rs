//! Error types.
//!
//! Nothing in this crate is fatal to the host: every variant here describes a
//! degradation (fewer devices, stale state, ignored command) rather than a
//! reason to abort.

use thiserror::Error;

/// Failure reported by a single backend call.
///
/// Backends map their native status codes onto these variants so the poller and
/// the activation manager can decide between "skip this frame" and "re-claim".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Device (or controller slot) is not connected.
    #[error("device not connected")]
    NotConnected,

    /// The device lost its claim (focus change); it must be re-acquired.
    #[error("device input lost; re-acquire required")]
    InputLost,

    /// The claim was refused, usually because another process owns the device.
    #[error("access denied")]
    Denied,

    /// The backend does not implement the requested operation for this device.
    #[error("operation not supported by backend")]
    Unsupported,

    /// Native failure code.
    #[error("native call failed with code {0:#x}")]
    Os(u32),
}

/// Errors surfaced by [`InputSystem`](crate::InputSystem).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// No input backend could be bound. The system exposes zero devices.
    #[error("no usable input backend is available")]
    BackendUnavailable,

    /// A device could not be claimed; it reports stale state until the next activation.
    #[error("could not claim {device}: {reason}")]
    DeviceClaimFailed { device: String, reason: BackendError },

    /// A command addressed a capability the device does not have.
    #[error("{device} does not support {what}")]
    CapabilityUnsupported { device: String, what: &'static str },

    /// The backend rejected a force-feedback call.
    #[error("force feedback on {device} failed: {reason}")]
    EffectFailed { device: String, reason: BackendError },

    /// Every backend read failed this frame; the previous snapshot was kept.
    #[error("all backend polls failed; previous snapshot retained")]
    PollDegraded,

    /// Configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while resolving [`InputConfig`](crate::config::InputConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid TOML: {0}")]
    Parse(String),

    #[error("key `{key}` has the wrong type (expected {expected})")]
    WrongType { key: String, expected: &'static str },

    #[error("controller signature #{0} needs either `vid` or `path_contains`")]
    EmptySignature(usize),

    #[error("controller signature #{0} sets `pid` without `vid`")]
    PidWithoutVid(usize),
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e.message().to_string())
    }
}

pub type Result<T, E = InputError> = std::result::Result<T, E>;
