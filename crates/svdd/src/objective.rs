//! Loss objective selection.
//!
//! The objective decides both the training loss and whether the decision
//! radius is maintained. It deserializes from TOML as a kebab-case string:
//!
//! ```toml
//! objective = "soft-boundary"
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SvddError;

/// Deep SVDD training objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
    /// Minimize mean squared distance to the center. No radius.
    #[default]
    OneClass,
    /// Penalize representations outside a radius `R` re-estimated per batch.
    SoftBoundary,
}

impl Objective {
    /// Whether this objective maintains the decision radius.
    pub fn uses_radius(self) -> bool {
        matches!(self, Self::SoftBoundary)
    }

    /// Canonical string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneClass => "one-class",
            Self::SoftBoundary => "soft-boundary",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = SvddError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one-class" => Ok(Self::OneClass),
            "soft-boundary" => Ok(Self::SoftBoundary),
            other => Err(SvddError::UnknownObjective(other.to_string())),
        }
    }
}
