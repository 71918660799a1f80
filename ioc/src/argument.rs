//! Argument references as written in a definition, and the values they
//! resolve to at construction time.

use crate::error::InjectionError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// A constructed service, shared between the container and its consumers.
pub type Instance = Arc<dyn Any + Send + Sync>;

const SERVICE_MARKER: char = '@';
const OPTIONAL_MARKER: &str = "@?";
const PARAMETER_MARKER: char = '%';

/// How a raw argument on a definition is to be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgumentReference {
  /// Passed through verbatim.
  Literal(Value),
  /// `%name%`: looked up in the parameter store.
  Parameter(String),
  /// `@id` or `@?id`: another service from the container.
  Service { id: String, optional: bool },
}

impl ArgumentReference {
  /// Classifies a raw configuration value.
  ///
  /// Non-strings are literals. Strings starting with `@` are service
  /// references (optional when they contain `@?`). A string that is exactly
  /// one `%placeholder%` is a parameter reference. Everything else is a
  /// literal string.
  pub fn classify(raw: Value) -> Self {
    let text = match raw {
      Value::String(text) => text,
      other => return ArgumentReference::Literal(other),
    };

    if text.starts_with(SERVICE_MARKER) {
      let optional = text.contains(OPTIONAL_MARKER);
      let id = text.strip_prefix(SERVICE_MARKER).unwrap_or(&text);
      let id = id.strip_prefix('?').unwrap_or(id);
      return ArgumentReference::Service {
        id: id.to_owned(),
        optional,
      };
    }

    if is_parameter_placeholder(&text) {
      return ArgumentReference::Parameter(text.replace(PARAMETER_MARKER, ""));
    }

    ArgumentReference::Literal(Value::String(text))
  }

  /// A required reference to the service `id`.
  pub fn service(id: impl Into<String>) -> Self {
    ArgumentReference::Service {
      id: id.into(),
      optional: false,
    }
  }

  /// An optional reference to the service `id`.
  pub fn optional_service(id: impl Into<String>) -> Self {
    ArgumentReference::Service {
      id: id.into(),
      optional: true,
    }
  }

  pub fn parameter(name: impl Into<String>) -> Self {
    ArgumentReference::Parameter(name.into())
  }
}

impl From<Value> for ArgumentReference {
  fn from(raw: Value) -> Self {
    ArgumentReference::classify(raw)
  }
}

impl From<&str> for ArgumentReference {
  fn from(raw: &str) -> Self {
    ArgumentReference::classify(Value::String(raw.to_owned()))
  }
}

// Matches `^%[^%]+%$`.
fn is_parameter_placeholder(text: &str) -> bool {
  text.len() > 2
    && text.starts_with(PARAMETER_MARKER)
    && text.ends_with(PARAMETER_MARKER)
    && !text[1..text.len() - 1].contains(PARAMETER_MARKER)
}

/// A resolved argument, ready to be handed to a constructor or setter.
#[derive(Debug, Clone)]
pub enum Argument {
  Value(Value),
  Service(Instance),
  /// An optional service reference whose target was not defined.
  Empty,
}

impl Argument {
  pub fn is_empty(&self) -> bool {
    matches!(self, Argument::Empty)
  }

  pub fn as_value(&self) -> Option<&Value> {
    match self {
      Argument::Value(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    self.as_value().and_then(Value::as_str)
  }

  pub fn as_instance(&self) -> Option<&Instance> {
    match self {
      Argument::Service(instance) => Some(instance),
      _ => None,
    }
  }

  /// Downcasts a service argument to its concrete type.
  pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    self
      .as_instance()
      .and_then(|instance| Arc::clone(instance).downcast::<T>().ok())
  }
}

/// The ordered arguments of one constructor or method invocation.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
  values: Vec<Argument>,
}

impl Arguments {
  pub fn new(values: Vec<Argument>) -> Self {
    Self { values }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&Argument> {
    self.values.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Argument> {
    self.values.iter()
  }

  pub fn into_vec(self) -> Vec<Argument> {
    self.values
  }

  /// The argument at `index`, failing if it was not supplied.
  pub fn required(&self, index: usize) -> Result<&Argument, InjectionError> {
    self
      .values
      .get(index)
      .ok_or(InjectionError::MissingArgument(index))
  }

  pub fn value(&self, index: usize) -> Result<&Value, InjectionError> {
    self
      .required(index)?
      .as_value()
      .ok_or(InjectionError::ArgumentType {
        index,
        expected: "a value",
      })
  }

  pub fn string(&self, index: usize) -> Result<String, InjectionError> {
    self
      .value(index)?
      .as_str()
      .map(str::to_owned)
      .ok_or(InjectionError::ArgumentType {
        index,
        expected: "a string",
      })
  }

  /// Deserializes a value argument into `T`.
  pub fn deserialize<T: DeserializeOwned>(&self, index: usize) -> Result<T, InjectionError> {
    let value = self.value(index)?.clone();
    serde_json::from_value(value).map_err(|_| InjectionError::ArgumentType {
      index,
      expected: std::any::type_name::<T>(),
    })
  }

  pub fn service<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, InjectionError> {
    self
      .required(index)?
      .service::<T>()
      .ok_or(InjectionError::ArgumentType {
        index,
        expected: std::any::type_name::<T>(),
      })
  }

  /// Like [`Arguments::service`], but an absent or empty argument is `None`.
  pub fn optional_service<T: Any + Send + Sync>(
    &self,
    index: usize,
  ) -> Result<Option<Arc<T>>, InjectionError> {
    match self.values.get(index) {
      None | Some(Argument::Empty) => Ok(None),
      Some(_) => self.service::<T>(index).map(Some),
    }
  }
}

impl From<Vec<Argument>> for Arguments {
  fn from(values: Vec<Argument>) -> Self {
    Self::new(values)
  }
}
