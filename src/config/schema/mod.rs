use std::path::PathBuf;

use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;

use crate::consts;

pub mod base_roms;
pub mod patchers;

pub mod prelude {
    pub use super::Schema;
    pub use super::base_roms::BaseRoms;
    pub use super::patchers::Patchers;
}

use prelude::*;

/// Typed view over the settings document
///
/// Serializing `Schema::default()` gives the document written on first run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// GBA emulator executable
    pub emulator_path: PathBuf,

    /// NDS emulator executable
    pub nds_emulator_path: PathBuf,

    pub server_url: String,

    /// Downloaded patches, removed again after every install attempt
    pub patch_dir: PathBuf,

    pub box_art_dir: PathBuf,
    pub patched_roms_dir: PathBuf,

    pub base_roms: BaseRoms,
    pub patchers: Patchers,

    /// Request timeout in seconds
    pub request_timeout: u64
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            emulator_path: PathBuf::new(),
            nds_emulator_path: PathBuf::new(),
            server_url: consts::DEFAULT_SERVER_URL.to_string(),
            patch_dir: PathBuf::from("downloaded_patches"),
            box_art_dir: PathBuf::from("box_art"),
            patched_roms_dir: PathBuf::from("patched_roms"),
            base_roms: BaseRoms::default(),
            patchers: Patchers::default(),
            request_timeout: consts::DEFAULT_REQUEST_TIMEOUT
        }
    }
}

impl From<&JsonValue> for Schema {
    fn from(value: &JsonValue) -> Self {
        let default = Self::default();

        Self {
            emulator_path: value.get("emulator_path")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(default.emulator_path),

            nds_emulator_path: value.get("nds_emulator_path")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(default.nds_emulator_path),

            server_url: value.get("server_url")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or(default.server_url),

            patch_dir: value.get("patch_dir")
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.patch_dir),

            box_art_dir: value.get("box_art_dir")
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.box_art_dir),

            patched_roms_dir: value.get("patched_roms_dir")
                .and_then(|v| v.as_str())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(default.patched_roms_dir),

            base_roms: value.get("base_roms")
                .map(BaseRoms::from)
                .unwrap_or(default.base_roms),

            patchers: value.get("patchers")
                .map(Patchers::from)
                .unwrap_or(default.patchers),

            request_timeout: value.get("request_timeout")
                .and_then(|v| v.as_u64())
                .filter(|v| *v > 0)
                .unwrap_or(default.request_timeout)
        }
    }
}
