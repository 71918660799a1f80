//! Turns parsed configuration records into definitions and parameters.

use crate::container::Container;
use crate::definition::{ServiceDefinition, TagAttributes};
use crate::discovery::FileDescriptor;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// The parsed contents of one configuration file.
#[derive(Debug, Deserialize, PartialEq, Default)]
pub struct ConfigRecord {
  #[serde(default)]
  pub parameters: Map<String, Value>,
  #[serde(default)]
  pub services: BTreeMap<String, ServiceConfig>,
}

/// One entry of a record's `services` block.
#[derive(Debug, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
  #[serde(default)]
  pub class: Option<String>,
  #[serde(default)]
  pub constructor: Option<String>,
  #[serde(default)]
  pub arguments: Vec<Value>,
  /// `[[method, [args...]], [method], ...]`
  #[serde(default)]
  pub calls: Vec<CallConfig>,
  #[serde(default)]
  pub properties: Map<String, Value>,
  #[serde(default)]
  pub is_object: bool,
  #[serde(default)]
  pub is_singleton: bool,
  #[serde(default)]
  pub namespace: Option<String>,
  #[serde(default)]
  pub tags: BTreeMap<String, Vec<TagAttributes>>,
}

/// One `calls` entry. The argument list may be left out.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CallConfig {
  WithArguments(String, Vec<Value>),
  Bare((String,)),
}

impl CallConfig {
  pub fn into_parts(self) -> (String, Vec<Value>) {
    match self {
      CallConfig::WithArguments(method, arguments) => (method, arguments),
      CallConfig::Bare((method,)) => (method, Vec::new()),
    }
  }
}

/// Reads a configuration record from a path.
pub trait ConfigLoader: Send + Sync {
  fn load(&self, path: &Path) -> Result<ConfigRecord>;
}

/// [`ConfigLoader`] for JSON files on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonConfigLoader;

impl ConfigLoader for JsonConfigLoader {
  fn load(&self, path: &Path) -> Result<ConfigRecord> {
    let contents = fs::read_to_string(path).map_err(|source| Error::FileSystem {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&contents).map_err(|e| Error::ConfigParse {
      path: path.to_path_buf(),
      message: e.to_string(),
    })
  }
}

/// Applies one configuration file to `container`.
///
/// Parameters are always merged. Services are registered unless the file is
/// parameter-only, each replacing any earlier definition with the same id.
pub fn apply(descriptor: &FileDescriptor, loader: &dyn ConfigLoader, container: &Container) -> Result<()> {
  let record = loader.load(&descriptor.path)?;
  debug!(
    path = %descriptor.path.display(),
    parameters = record.parameters.len(),
    services = record.services.len(),
    "applying configuration file"
  );

  container.set_parameters(record.parameters);

  if descriptor.is_param_file {
    return Ok(());
  }

  for (id, config) in record.services {
    let definition = build_definition(config, &descriptor.directory).map_err(|e| match e {
      Error::InvalidDefinition(message) => Error::ConfigParse {
        path: descriptor.path.clone(),
        message: format!("service '{}': {}", id, message),
      },
      other => other,
    })?;
    container.set(id, definition);
  }

  Ok(())
}

/// Builds a definition from its configuration entry.
pub fn build_definition(config: ServiceConfig, directory: &Path) -> Result<ServiceDefinition> {
  let mut definition = match config.class {
    Some(class) => ServiceDefinition::new(class),
    None => ServiceDefinition::default(),
  };

  definition = definition
    .arguments(config.arguments)
    .singleton(config.is_singleton)
    .preconstructed(config.is_object)
    .root_directory(directory);

  if let Some(constructor) = config.constructor {
    definition = definition.factory_method(constructor);
  }
  if let Some(namespace) = config.namespace {
    definition = definition.namespace(namespace);
  }
  for (name, value) in config.properties {
    definition = definition.property(name, value);
  }

  definition.set_method_calls(config.calls.into_iter().map(CallConfig::into_parts))?;
  definition.set_tags(config.tags);

  Ok(definition)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::argument::ArgumentReference;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  #[test]
  fn maps_every_configuration_field() {
    let config: ServiceConfig = serde_json::from_value(json!({
      "class": "./Mailer",
      "constructor": "create",
      "arguments": ["@transport", "%sender%", 25],
      "calls": [["setLogger", ["@?logger"]]],
      "properties": { "retries": 3 },
      "isObject": false,
      "isSingleton": true,
      "namespace": "mail",
      "tags": { "listener": [{ "event": "boot" }] }
    }))
    .unwrap();

    let definition = build_definition(config, Path::new("/app/lib")).unwrap();

    assert_eq!(definition.source(), Some("./Mailer"));
    assert_eq!(definition.named_factory_method(), Some("create"));
    assert_eq!(
      definition.constructor_arguments(),
      &[
        ArgumentReference::service("transport"),
        ArgumentReference::parameter("sender"),
        ArgumentReference::Literal(json!(25)),
      ]
    );
    assert!(definition.has_method_call("setLogger"));
    assert_eq!(
      definition.method_calls()[0].arguments,
      vec![ArgumentReference::optional_service("logger")]
    );
    assert_eq!(
      definition.property_assignments(),
      &[("retries".to_owned(), ArgumentReference::Literal(json!(3)))]
    );
    assert!(definition.is_singleton());
    assert!(!definition.is_preconstructed());
    assert_eq!(definition.namespace_name(), Some("mail"));
    assert!(definition.has_tag("listener"));
    assert_eq!(definition.root_directory_path(), Some(Path::new("/app/lib")));
  }

  #[test]
  fn call_without_argument_list_takes_no_arguments() {
    let config: ServiceConfig = serde_json::from_value(json!({
      "class": "./Mailer",
      "calls": [["init"], ["setLogger", ["@?logger"]]]
    }))
    .unwrap();

    let definition = build_definition(config, Path::new("/app")).unwrap();
    let calls = definition.method_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].method, "init");
    assert!(calls[0].arguments.is_empty());
    assert_eq!(calls[1].method, "setLogger");
  }

  #[test]
  fn malformed_call_entry_is_rejected() {
    let parsed = serde_json::from_value::<ServiceConfig>(json!({
      "class": "./Mailer",
      "calls": [["init", [], "extra"]]
    }));
    assert!(parsed.is_err());
  }

  #[test]
  fn empty_method_name_is_rejected() {
    let config: ServiceConfig = serde_json::from_value(json!({
      "class": "./Mailer",
      "calls": [["", []]]
    }))
    .unwrap();
    assert!(matches!(
      build_definition(config, Path::new("/app")),
      Err(Error::InvalidDefinition(_))
    ));
  }
}
