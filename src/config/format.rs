//! Config file formats
//!
//! Each format turns file text into a generic data tree. Everything after
//! that (key search, task normalization) is format independent.

use crate::config::makefile;
use crate::error::{ConfigError, ConfigResult};
use serde_json::Value;
use std::path::Path;

/// A config file format that can be loaded into a data tree
pub trait Format: Sync {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Whether this format handles the given file name
    fn matches(&self, file_name: &str) -> bool;

    /// Parse file text into a data tree
    fn load(&self, text: &str) -> Result<Value, String>;
}

/// `*.toml` files
pub struct TomlFormat;

impl Format for TomlFormat {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(".toml")
    }

    fn load(&self, text: &str) -> Result<Value, String> {
        toml::from_str::<Value>(text).map_err(|e| e.to_string())
    }
}

/// `*.json` files
pub struct JsonFormat;

impl Format for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with(".json")
    }

    fn load(&self, text: &str) -> Result<Value, String> {
        serde_json::from_str::<Value>(text).map_err(|e| e.to_string())
    }
}

/// `Makefile` / `makefile`
pub struct MakefileFormat;

impl Format for MakefileFormat {
    fn name(&self) -> &'static str {
        "makefile"
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.ends_with("Makefile") || file_name.ends_with("makefile")
    }

    fn load(&self, text: &str) -> Result<Value, String> {
        Ok(makefile::loads(text))
    }
}

/// Known formats, checked in order
pub static FORMATS: &[&dyn Format] = &[&TomlFormat, &JsonFormat, &MakefileFormat];

/// Find the format for a path
pub fn format_for(path: &Path) -> ConfigResult<&'static dyn Format> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

    FORMATS
        .iter()
        .copied()
        .find(|f| f.matches(file_name))
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))
}

/// Load a file's text into a data tree with the matching format
pub fn load_value(path: &Path, text: &str) -> ConfigResult<Value> {
    let format = format_for(path)?;
    tracing::debug!(path = %path.display(), format = format.name(), "loading config");
    format.load(text).map_err(|error| ConfigError::Parse {
        path: path.to_path_buf(),
        error,
    })
}

/// Look up a dotted key (`tool.ds.scripts`) in a data tree
pub fn get_key<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(data, |current, part| current.as_object()?.get(part))
}
