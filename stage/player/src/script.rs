//! Action scripts
//!
//! A script is a TOML file listing characters and their queues:
//!
//! ```toml
//! [[character]]
//! id = "1"
//! actions = ["Move X by 50", "Say Hello", "Repeat"]
//!
//! [[character]]
//! id = "4"
//! name = "Owl"
//! start = [100.0, 50.0]
//! actions = ["Go to random position"]
//! ```
//!
//! Ids already on stage (the default cast) just get their queue set; new ids
//! are added. Action strings are kept verbatim, so a typo shows up as a
//! playback warning rather than a load error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stage_core::{Character, CharacterId, Position, Stage, StageError};

/// Errors from loading or applying a script
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Failed to read the script file
    #[error("Failed to read script at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse script: {0}")]
    Parse(#[from] toml::de::Error),

    /// The stage refused an entry
    #[error("Failed to apply script: {0}")]
    Stage(#[from] StageError),
}

/// One character entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptCharacter {
    /// Character id
    pub id: String,
    /// Display name for characters not in the cast (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,
    /// Starting position `[x, y]`
    #[serde(default)]
    pub start: Option<[f64; 2]>,
    /// Action blocks in order
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A parsed script
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Characters to set up
    #[serde(default, rename = "character")]
    pub characters: Vec<ScriptCharacter>,
}

impl Script {
    /// Parse a script from TOML text
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a script file
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let text = std::fs::read_to_string(path).map_err(|e| ScriptError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&text)
    }

    /// Put the script's characters and queues on `stage`
    pub fn apply(&self, stage: &Stage) -> Result<(), ScriptError> {
        for entry in &self.characters {
            let id = CharacterId::new(entry.id.as_str());
            if !stage.contains(&id) {
                let name = entry.name.clone().unwrap_or_else(|| entry.id.clone());
                stage.add_character(Character::new(entry.id.as_str(), name))?;
            }
            if let Some([x, y]) = entry.start {
                stage.set_position(&id, Position::new(x, y))?;
            }
            stage.set_action_queue(&id, entry.actions.iter().map(String::as_str))?;
            tracing::debug!(
                character = %id,
                actions = entry.actions.len(),
                "Script entry applied"
            );
        }
        Ok(())
    }
}
