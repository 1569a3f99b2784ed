// inject/src/options.rs

//! Container configuration.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Behavioural switches for a container tree.
///
/// Options are usually left at their defaults, but can be loaded from YAML:
///
/// ```yaml
/// detect_cycles: true
/// require_injectable: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerOptions {
  /// Fail with `Error::CircularDependency` when a token is requested again
  /// while its own factory is running. When disabled, such a cycle recurses
  /// until the stack overflows.
  pub detect_cycles: bool,
  /// Only construct classes whose declaration carries the injectable marker.
  pub require_injectable: bool,
}

impl Default for ContainerOptions {
  fn default() -> Self {
    Self {
      detect_cycles: true,
      require_injectable: false,
    }
  }
}

impl ContainerOptions {
  pub fn from_yaml_str(source: &str) -> Result<Self> {
    if source.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))
  }

  pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
    let source = std::fs::read_to_string(path)?;
    Self::from_yaml_str(&source)
  }
}
