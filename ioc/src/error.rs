use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the `fibre_ioc_config` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Failed to read '{}': {source}", path.display())]
  FileSystem {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse configuration file '{}': {message}", path.display())]
  ConfigParse { path: PathBuf, message: String },

  #[error("The service '{0}' was not defined")]
  ServiceNotFound(String),

  #[error("The class for the service '{id}' could not be found (source: {source_path})")]
  ClassNotFound { id: String, source_path: String },

  #[error("The constructor for the service '{0}' is not invocable")]
  InvalidConstructor(String),

  #[error("Circular reference to the service '{0}'")]
  CircularReference(String),

  #[error("Circular reference while interpolating parameter '{0}'")]
  ParameterCycle(String),

  #[error("Invalid service definition: {0}")]
  InvalidDefinition(String),

  #[error("Failed to wire the service '{id}': {source}")]
  Injection {
    id: String,
    #[source]
    source: InjectionError,
  },

  #[error("The service '{id}' is not of type {expected}")]
  TypeMismatch { id: String, expected: &'static str },
}

/// Errors raised while invoking a service class's constructor, methods or
/// property setters.
///
/// User-supplied constructors return this type; the container wraps it in
/// [`Error::Injection`] together with the id being built.
#[derive(Debug, Error)]
pub enum InjectionError {
  #[error("missing argument at position {0}")]
  MissingArgument(usize),

  #[error("argument at position {index} is not {expected}")]
  ArgumentType { index: usize, expected: &'static str },

  #[error("no method named '{0}'")]
  UnknownMethod(String),

  #[error("no property named '{0}'")]
  UnknownProperty(String),

  #[error("preconstructed values cannot receive method calls or properties")]
  Immutable,

  #[error("instance is not of type {0}")]
  TargetType(&'static str),

  #[error("{0}")]
  Custom(String),
}

impl InjectionError {
  /// Shorthand for an arbitrary constructor failure.
  pub fn custom(message: impl Into<String>) -> Self {
    InjectionError::Custom(message.into())
  }
}

/// A specialized `Result` type for `fibre_ioc_config` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
