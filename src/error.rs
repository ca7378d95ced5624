use serde::{Serialize, Deserialize};

use crate::process::ProcessError;

/// Broad failure category reported to front ends next to the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Network,
    Filesystem,
    Process,
    NotFound
}

#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("Base ROM '{0}' not found or configured.")]
    BaseRomMissing(String),

    #[error("Emulator path not set in settings.")]
    EmulatorNotConfigured,

    #[error("Unsupported patch type '{extension}' for {name}.")]
    UnsupportedPatchType {
        name: String,
        extension: String
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to download patch file for {0}.")]
    DownloadFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("ROM for {0} is not installed.")]
    NotInstalled(String),

    #[error("ROM not found, nothing to delete.")]
    NothingToDelete,

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Patching for '{name}' failed: {source}")]
    PatchFailed {
        name: String,
        #[source]
        source: ProcessError
    },

    #[error("Patcher produced no output for '{0}'.")]
    OutputMissing(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Hack with ID '{0}' not found.")]
    NotFound(String)
}

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BaseRomMissing(_) |
            Self::EmulatorNotConfigured |
            Self::UnsupportedPatchType { .. } |
            Self::Config(_) => ErrorKind::Config,

            Self::DownloadFailed(_) |
            Self::Network(_) => ErrorKind::Network,

            Self::NotInstalled(_) |
            Self::NothingToDelete |
            Self::Filesystem(_) => ErrorKind::Filesystem,

            Self::PatchFailed { .. } |
            Self::OutputMissing(_) |
            Self::Process(_) => ErrorKind::Process,

            Self::NotFound(_) => ErrorKind::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_rom_message_names_the_rom() {
        let err = LauncherError::BaseRomMissing(String::from("emerald"));

        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("Base ROM 'emerald'"));
    }

    #[test]
    fn missing_output_is_a_process_failure() {
        let err = LauncherError::OutputMissing(String::from("Glazed"));

        assert_eq!(err.kind(), ErrorKind::Process);
        assert_eq!(err.to_string(), "Patcher produced no output for 'Glazed'.");
    }

    #[test]
    fn not_found_is_its_own_kind() {
        let err = LauncherError::NotFound(String::from("unknown_id"));

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_ne!(LauncherError::NotInstalled(String::from("x")).kind(), ErrorKind::NotFound);
    }
}
