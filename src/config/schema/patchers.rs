use std::path::PathBuf;

use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;

/// Locations of the external patcher programs
///
/// Bare names are looked up in `PATH` when the patcher is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patchers {
    /// Floating IPS, applies `.ips` and `.bps` patches
    pub flips: PathBuf,

    /// UPS tool, applies `.ups` patches
    pub ups: PathBuf,

    /// xdelta3, applies `.xdelta` and `.vcdiff` patches
    pub xdelta: PathBuf
}

impl Default for Patchers {
    fn default() -> Self {
        let exe = |name: &str| if cfg!(windows) {
            PathBuf::from(format!("{name}.exe"))
        } else {
            PathBuf::from(name)
        };

        Self {
            flips: exe("flips"),
            ups: exe("ups"),
            xdelta: exe("xdelta3")
        }
    }
}

impl From<&JsonValue> for Patchers {
    fn from(value: &JsonValue) -> Self {
        let default = Self::default();

        Self {
            flips: value.get("flips")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(default.flips),

            ups: value.get("ups")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(default.ups),

            xdelta: value.get("xdelta")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(default.xdelta)
        }
    }
}
