//! Multiplexed keyboard, mouse and joystick input for emulator front ends.
//!
//! [`InputSystem`] merges up to three backends (a raw per-device event stream, a
//! legacy polling API and a slot-based controller API) into one model of
//! keyboards, mice and joysticks, captured once per frame by
//! [`InputSystem::poll`].

pub mod backends;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod force_feedback;
pub mod host;
pub mod keys;
pub mod metadata;
pub mod normalize;
pub mod query;
pub mod snapshot;

mod activation;
mod enumerate;
mod manager;
mod poll;

pub use config::InputConfig;
pub use error::{BackendError, InputError};
pub use force_feedback::ForceFeedbackCmd;
pub use manager::*;
pub use metadata::*;
pub use normalize::{PovDir, AXIS_MAX, AXIS_MIN};
pub use query::DeviceSel;
