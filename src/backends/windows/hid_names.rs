//! HID product names and interface paths via `hidapi`.
//!
//! Raw Input and winmm only hand out opaque paths or driver names. The HID device
//! list gives human product strings for those paths, and the interface path of
//! each game controller, which carries the `IG_` marker for XInput-compatible
//! pads. DirectInput reports its own paths and uses these only as a fallback.

use std::collections::HashMap;

use hidapi::{DeviceInfo, HidApi};
use tracing::{debug, warn};

use crate::host::DeviceNamer;

/// Snapshot of the HID device list, taken once when the backends are bound.
#[derive(Debug, Default)]
pub struct HidCatalog {
    /// Lowercased interface path → product string.
    names: HashMap<String, String>,
    /// `(vid, pid)` → interface path of the first game-controller collection.
    controller_paths: HashMap<(u16, u16), String>,
}

/// Generic Desktop joystick, gamepad or multi-axis controller collections.
fn is_game_controller(info: &DeviceInfo) -> bool {
    info.usage_page() == 0x01 && matches!(info.usage(), 0x04 | 0x05 | 0x08)
}

impl HidCatalog {
    pub fn load() -> Self {
        let api = match HidApi::new() {
            Ok(api) => api,
            Err(e) => {
                warn!(error = %e, "hidapi unavailable; devices keep generic names");
                return Self::default();
            }
        };

        let mut catalog = Self::default();
        for info in api.device_list() {
            let path = info.path().to_string_lossy().to_string();
            if let Some(product) = info.product_string().filter(|s| !s.trim().is_empty()) {
                catalog.names.insert(path.to_lowercase(), product.trim().to_string());
            }
            if is_game_controller(info) {
                catalog
                    .controller_paths
                    .entry((info.vendor_id(), info.product_id()))
                    .or_insert(path);
            }
        }
        debug!(
            named = catalog.names.len(),
            controllers = catalog.controller_paths.len(),
            "hid catalog loaded"
        );
        catalog
    }

    /// Interface path of each game controller, by vendor/product pair.
    pub fn controller_paths(&self) -> HashMap<(u16, u16), String> {
        self.controller_paths.clone()
    }
}

impl DeviceNamer for HidCatalog {
    fn friendly_name(&self, path: &str) -> Option<String> {
        self.names.get(&path.to_lowercase()).cloned()
    }
}
