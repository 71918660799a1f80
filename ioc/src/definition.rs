//! Service definitions: the build plan for one service.

use crate::argument::ArgumentReference;
use crate::class::Module;
use crate::core::ConstructionKind;
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Attributes attached to one occurrence of a tag.
pub type TagAttributes = Map<String, Value>;

/// A method to invoke on a freshly constructed service.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
  pub method: String,
  pub arguments: Vec<ArgumentReference>,
}

/// Describes how to construct and wire one service.
///
/// Everything except the resolved factory is fixed once the definition is
/// registered. The factory is loaded on first resolution and cached here.
#[derive(Debug, Clone, Default)]
pub struct ServiceDefinition {
  source: Option<String>,
  factory: OnceCell<ConstructionKind>,
  preloaded: Option<Module>,
  arguments: Vec<ArgumentReference>,
  calls: Vec<MethodCall>,
  properties: Vec<(String, ArgumentReference)>,
  singleton: bool,
  preconstructed: bool,
  factory_method: Option<String>,
  namespace: Option<String>,
  tags: BTreeMap<String, Vec<TagAttributes>>,
  root_directory: Option<PathBuf>,
}

impl ServiceDefinition {
  /// A definition whose module is loaded from `source` (a module path or a
  /// `%parameter%` holding one).
  pub fn new(source: impl Into<String>) -> Self {
    Self {
      source: Some(source.into()),
      ..Self::default()
    }
  }

  /// A definition whose module is already in hand, bypassing the loader.
  pub fn from_module(module: impl Into<Module>) -> Self {
    Self {
      preloaded: Some(module.into()),
      ..Self::default()
    }
  }

  // --- Builder-style setters ---

  pub fn argument(mut self, argument: impl Into<ArgumentReference>) -> Self {
    self.arguments.push(argument.into());
    self
  }

  pub fn arguments<I, A>(mut self, arguments: I) -> Self
  where
    I: IntoIterator<Item = A>,
    A: Into<ArgumentReference>,
  {
    self.arguments = arguments.into_iter().map(Into::into).collect();
    self
  }

  /// Adds a setter-injection call. See [`ServiceDefinition::add_method_call`].
  pub fn call<I, A>(mut self, method: &str, arguments: I) -> Result<Self>
  where
    I: IntoIterator<Item = A>,
    A: Into<ArgumentReference>,
  {
    self.add_method_call(method, arguments)?;
    Ok(self)
  }

  /// Assigns a property; a later assignment to the same name replaces it.
  pub fn property(mut self, name: impl Into<String>, value: impl Into<ArgumentReference>) -> Self {
    let name = name.into();
    let value = value.into();
    match self.properties.iter_mut().find(|(existing, _)| *existing == name) {
      Some(slot) => slot.1 = value,
      None => self.properties.push((name, value)),
    }
    self
  }

  pub fn singleton(mut self, singleton: bool) -> Self {
    self.singleton = singleton;
    self
  }

  /// Uses the loaded module itself as the instance, cached like a singleton.
  ///
  /// The module value is shared, so a preconstructed definition with method
  /// calls or properties fails to resolve with [`InjectionError::Immutable`].
  ///
  /// [`InjectionError::Immutable`]: crate::InjectionError::Immutable
  pub fn preconstructed(mut self, preconstructed: bool) -> Self {
    self.preconstructed = preconstructed;
    self
  }

  pub fn factory_method(mut self, name: impl Into<String>) -> Self {
    self.factory_method = Some(name.into());
    self
  }

  pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = Some(namespace.into());
    self
  }

  pub fn root_directory(mut self, directory: impl Into<PathBuf>) -> Self {
    self.root_directory = Some(directory.into());
    self
  }

  // --- Method calls ---

  /// Appends a call to `method` with `arguments`.
  ///
  /// Fails with [`Error::InvalidDefinition`] if `method` is empty.
  pub fn add_method_call<I, A>(&mut self, method: &str, arguments: I) -> Result<&mut Self>
  where
    I: IntoIterator<Item = A>,
    A: Into<ArgumentReference>,
  {
    if method.trim().is_empty() {
      return Err(Error::InvalidDefinition(
        "method name must be a non-empty string".to_owned(),
      ));
    }
    self.calls.push(MethodCall {
      method: method.to_owned(),
      arguments: arguments.into_iter().map(Into::into).collect(),
    });
    Ok(self)
  }

  /// Appends every `(method, arguments)` pair in order.
  pub fn set_method_calls<I>(&mut self, calls: I) -> Result<&mut Self>
  where
    I: IntoIterator<Item = (String, Vec<Value>)>,
  {
    for (method, arguments) in calls {
      self.add_method_call(&method, arguments)?;
    }
    Ok(self)
  }

  pub fn has_method_call(&self, method: &str) -> bool {
    self.calls.iter().any(|call| call.method == method)
  }

  // --- Tags ---

  pub fn add_tag(&mut self, name: impl Into<String>, attributes: TagAttributes) -> &mut Self {
    self.tags.entry(name.into()).or_default().push(attributes);
    self
  }

  pub fn set_tags(&mut self, tags: BTreeMap<String, Vec<TagAttributes>>) -> &mut Self {
    self.tags = tags;
    self
  }

  /// All attribute maps recorded for `name`; empty if the tag is absent.
  pub fn get_tag(&self, name: &str) -> &[TagAttributes] {
    self.tags.get(name).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn has_tag(&self, name: &str) -> bool {
    self.tags.contains_key(name)
  }

  pub fn clear_tag(&mut self, name: &str) -> &mut Self {
    self.tags.remove(name);
    self
  }

  pub fn tags(&self) -> &BTreeMap<String, Vec<TagAttributes>> {
    &self.tags
  }

  // --- Accessors ---

  pub fn source(&self) -> Option<&str> {
    self.source.as_deref()
  }

  pub fn constructor_arguments(&self) -> &[ArgumentReference] {
    &self.arguments
  }

  pub fn method_calls(&self) -> &[MethodCall] {
    &self.calls
  }

  pub fn property_assignments(&self) -> &[(String, ArgumentReference)] {
    &self.properties
  }

  pub fn is_singleton(&self) -> bool {
    self.singleton
  }

  pub fn is_preconstructed(&self) -> bool {
    self.preconstructed
  }

  /// Whether instances are kept in the container's instance cache.
  pub fn is_cached(&self) -> bool {
    self.singleton || self.preconstructed
  }

  pub fn named_factory_method(&self) -> Option<&str> {
    self.factory_method.as_deref()
  }

  pub fn namespace_name(&self) -> Option<&str> {
    self.namespace.as_deref()
  }

  /// The prefix applied to this definition's nested references.
  pub(crate) fn namespace_prefix(&self) -> String {
    match self.namespace.as_deref() {
      Some(ns) if !ns.is_empty() => format!("{}.", ns),
      _ => String::new(),
    }
  }

  pub fn root_directory_path(&self) -> Option<&Path> {
    self.root_directory.as_deref()
  }

  /// The construction kind, once the definition has been resolved.
  pub fn construction_kind(&self) -> Option<&ConstructionKind> {
    self.factory.get()
  }

  pub(crate) fn preloaded_module(&self) -> Option<&Module> {
    self.preloaded.as_ref()
  }

  pub(crate) fn factory_cell(&self) -> &OnceCell<ConstructionKind> {
    &self.factory
  }
}
