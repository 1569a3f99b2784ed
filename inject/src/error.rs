// inject/src/error.rs

use thiserror::Error;

/// The main error type for the `fibre_inject` library.
#[derive(Debug, Error)]
pub enum Error {
  /// A dependency's declared type cannot be mapped to any token.
  #[error("Unsupported type ref: {0}")]
  UnsupportedType(String),

  /// No candidate token could be resolved and there was no default or optional escape.
  #[error("No provider for dependency: {0}")]
  MissingProvider(String),

  /// A value used where a constructor was expected cannot be constructed.
  #[error("Cannot construct {target}: {reason}")]
  Construction { target: String, reason: String },

  /// A token was requested again while its own factory was still running.
  #[error("Circular dependency detected while resolving: {0}")]
  CircularDependency(String),

  /// A resolved value does not have the type the caller asked for.
  #[error("Value provided for {token} is not a {expected}")]
  TypeMismatch { token: String, expected: &'static str },

  #[error("Invalid alteration of '{method}': {reason}")]
  Alteration { method: String, reason: String },

  /// A user supplied factory or hook reported a failure.
  #[error("Factory failed: {0}")]
  Factory(String),

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),
}

impl Error {
  /// Convenience constructor for failures raised inside user factories.
  pub fn factory(message: impl Into<String>) -> Self {
    Error::Factory(message.into())
  }
}

/// A specialized `Result` type for `fibre_inject` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
