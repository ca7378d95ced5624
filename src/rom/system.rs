use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::str::FromStr;

use enum_ordinalize::Ordinalize;
use serde::{Serialize, Deserialize};

/// Platform a hack targets, decides patcher and emulator conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinalize, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RomSystem {
    Gba,
    Nds
}

impl RomSystem {
    /// Identifier used by the catalog and the settings document
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gba => "gba",
            Self::Nds => "nds"
        }
    }

    #[inline]
    pub fn profile(&self) -> &'static SystemProfile {
        &PROFILES[self]
    }
}

impl std::fmt::Display for RomSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for RomSystem {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::VARIANTS.iter()
            .copied()
            .find(|system| system.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| anyhow::anyhow!("Unknown system: {value}"))
    }
}

impl TryFrom<String> for RomSystem {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RomSystem> for String {
    fn from(system: RomSystem) -> Self {
        system.as_str().to_string()
    }
}

/// How one family of patch files is applied
///
/// `args` is the argument vector passed to the program, where
/// `{patch}`, `{base}` and `{output}` are substituted with the paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatcherRule {
    /// Lowercase patch file extensions handled by the rule
    pub extensions: &'static [&'static str],

    /// Key under the `patchers` setting naming the executable
    pub program: &'static str,

    pub args: &'static [&'static str]
}

impl PatcherRule {
    pub fn handles(&self, extension: &str) -> bool {
        self.extensions.iter().any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Argument vector for the patcher invocation
    pub fn render_args(&self, patch: &Path, base: &Path, output: &Path) -> Vec<OsString> {
        self.args.iter()
            .map(|arg| match *arg {
                "{patch}" => patch.as_os_str().to_os_string(),
                "{base}" => base.as_os_str().to_os_string(),
                "{output}" => output.as_os_str().to_os_string(),
                arg => OsString::from(arg)
            })
            .collect()
    }
}

pub const FLIPS_APPLY: &[&str] = &["--apply", "{patch}", "{base}", "{output}"];
pub const UPS_APPLY: &[&str] = &["apply", "--base", "{base}", "--patch", "{patch}", "--output", "{output}"];
pub const XDELTA_DECODE: &[&str] = &["-d", "-f", "-s", "{base}", "{patch}", "{output}"];

/// Everything that differs between systems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemProfile {
    /// Extension of the patched ROM file, without the dot
    pub rom_extension: &'static str,

    /// Settings key holding the emulator executable
    pub emulator_key: &'static str,

    /// Checked in order, first rule handling the patch extension wins
    pub patchers: Vec<PatcherRule>
}

impl SystemProfile {
    pub fn patcher_for(&self, extension: &str) -> Option<&PatcherRule> {
        self.patchers.iter().find(|rule| rule.handles(extension))
    }
}

lazy_static::lazy_static! {
    static ref PROFILES: HashMap<RomSystem, SystemProfile> = HashMap::from([
        (RomSystem::Gba, SystemProfile {
            rom_extension: "gba",
            emulator_key: "emulator_path",
            patchers: vec![
                PatcherRule {
                    extensions: &["ups"],
                    program: "ups",
                    args: UPS_APPLY
                },
                PatcherRule {
                    extensions: &["ips", "bps"],
                    program: "flips",
                    args: FLIPS_APPLY
                }
            ]
        }),

        (RomSystem::Nds, SystemProfile {
            rom_extension: "nds",
            emulator_key: "nds_emulator_path",
            patchers: vec![
                PatcherRule {
                    extensions: &["ips", "bps"],
                    program: "flips",
                    args: FLIPS_APPLY
                },
                PatcherRule {
                    extensions: &["xdelta", "vcdiff"],
                    program: "xdelta",
                    args: XDELTA_DECODE
                }
            ]
        })
    ]);
}
