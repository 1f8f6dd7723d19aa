use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::snapshot::ConsentSnapshot;
use crate::theme::Theme;

/// Everything the system has decided or stored on the user's behalf, in one
/// serializable value for the "export my data" action.
///
/// `to_json` is deterministic given equal state (fixed field order), and an
/// export re-imported through [`ExportBundle::from_json`] reproduces the
/// same consent and feature values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub consent: ConsentSnapshot,
    pub choice_made: bool,
    pub theme: Theme,
    pub compact_mode: bool,
}

impl ExportBundle {
    /// Serialize to the export JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("export bundle serialization cannot fail")
    }

    /// Parse an export JSON payload.
    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        serde_json::from_str(json).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}
