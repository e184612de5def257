//! Pipeline step names.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One selectable stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Write the quartet task file from the species list
    GenerateCombinations,
    /// Prune the tree collection for every task
    PruneTrees,
    /// Write one analysis config per pruned-tree file
    GenerateConfig,
    /// Run the external analysis over every config
    RunExternal,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::GenerateCombinations,
        Step::PruneTrees,
        Step::GenerateConfig,
        Step::RunExternal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::GenerateCombinations => "generate_combinations",
            Step::PruneTrees => "prune_trees",
            Step::GenerateConfig => "generate_config",
            Step::RunExternal => "run_external",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generate_combinations" => Ok(Step::GenerateCombinations),
            "prune_trees" => Ok(Step::PruneTrees),
            "generate_config" => Ok(Step::GenerateConfig),
            "run_external" | "run_quibl" => Ok(Step::RunExternal),
            _ => Err(ConfigError::UnknownStep(s.to_string())),
        }
    }
}
