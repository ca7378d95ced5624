use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;

/// Base ROM ids the catalog is known to reference
pub const KNOWN_BASE_ROMS: &[&str] = &[
    // GBA
    "firered",
    "leafgreen",
    "emerald",
    "ruby",
    "sapphire",

    // NDS
    "diamond",
    "pearl",
    "platinum",
    "heartgold",
    "soulsilver",
    "black",
    "white",
    "black2",
    "white2"
];

/// User supplied base ROM locations, keyed by base ROM id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseRoms(pub BTreeMap<String, PathBuf>);

impl BaseRoms {
    /// Configured path for the base ROM, if it's set to something non-empty
    pub fn get(&self, base_rom_id: &str) -> Option<&PathBuf> {
        self.0.get(base_rom_id)
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl Default for BaseRoms {
    fn default() -> Self {
        Self(KNOWN_BASE_ROMS.iter()
            .map(|id| (id.to_string(), PathBuf::new()))
            .collect())
    }
}

impl From<&JsonValue> for BaseRoms {
    fn from(value: &JsonValue) -> Self {
        let mut roms = Self::default();

        if let Some(entries) = value.as_object() {
            for (id, path) in entries {
                if let Some(path) = path.as_str() {
                    roms.0.insert(id.clone(), PathBuf::from(path));
                }
            }
        }

        roms
    }
}
