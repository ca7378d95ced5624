use std::path::PathBuf;

use cached::proc_macro::cached;

pub const FOLDER_NAME: &str = "romhack-launcher";

pub const CATALOG_FILE: &str = "hacks.json";

pub const DEFAULT_SERVER_URL: &str = "https://jarrowsmith123.github.io/RomHack-Launcher-Assets/";

/// Seconds before any catalog or artifact request is abandoned
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 15;

/// Get default launcher dir path
///
/// If `ROMHACK_LAUNCHER_FOLDER` variable is set, then its value will be returned.
/// Otherwise return `<data dir>/romhack-launcher`
#[cached(result = true)]
pub fn launcher_dir() -> anyhow::Result<PathBuf> {
    if let Ok(folder) = std::env::var("ROMHACK_LAUNCHER_FOLDER") {
        return Ok(folder.into());
    }

    dirs::data_dir()
        .map(|dir| dir.join(FOLDER_NAME))
        .ok_or_else(|| anyhow::anyhow!("Could not determine user data directory"))
}

/// Get launcher's config file path
#[cached(result = true)]
pub fn config_file() -> anyhow::Result<PathBuf> {
    launcher_dir().map(|dir| dir.join("config.json"))
}
