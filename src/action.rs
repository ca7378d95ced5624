use std::path::PathBuf;

use serde::{Serialize, Deserialize};

use crate::error::{ErrorKind, LauncherError};

/// Outcome of a caller-facing operation, rendered directly by front ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,

    /// Location of the patched ROM after a successful install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patched_rom_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            patched_rom_path: None,
            error: None
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            patched_rom_path: None,
            error: Some(kind)
        }
    }

    pub fn with_patched_rom_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.patched_rom_path = Some(path.into());
        self
    }
}

impl From<LauncherError> for ActionResult {
    fn from(err: LauncherError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}

impl<T: Into<ActionResult>> From<Result<T, LauncherError>> for ActionResult {
    fn from(result: Result<T, LauncherError>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => err.into()
        }
    }
}
