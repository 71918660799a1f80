//! Constructible service types and the loader that maps module paths to them.
//!
//! A [`ServiceClass`] bundles a typed constructor with a table of named
//! methods (setter injection) and named properties (property injection). The
//! tables are built once per type by [`ClassBuilder`], so the container never
//! has to guess at members by name at runtime beyond a map lookup.

use crate::argument::{Argument, Arguments, Instance};
use crate::error::InjectionError;
use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Object = Box<dyn Any + Send + Sync>;
type Constructor = Box<dyn Fn(Arguments) -> Result<Object, InjectionError> + Send + Sync>;
type MethodInvoker =
  Box<dyn Fn(&mut (dyn Any + Send + Sync), Arguments) -> Result<(), InjectionError> + Send + Sync>;
type PropertySetter =
  Box<dyn Fn(&mut (dyn Any + Send + Sync), Argument) -> Result<(), InjectionError> + Send + Sync>;

/// A constructible service type with its injection tables.
pub struct ServiceClass {
  type_name: &'static str,
  constructor: Constructor,
  methods: HashMap<String, MethodInvoker>,
  properties: HashMap<String, PropertySetter>,
}

impl ServiceClass {
  /// Starts building a class for `T` from its constructor.
  pub fn builder<T, F>(constructor: F) -> ClassBuilder<T>
  where
    T: Any + Send + Sync,
    F: Fn(Arguments) -> Result<T, InjectionError> + Send + Sync + 'static,
  {
    ClassBuilder {
      class: ServiceClass {
        type_name: std::any::type_name::<T>(),
        constructor: Box::new(move |args: Arguments| -> Result<Object, InjectionError> {
          Ok(Box::new(constructor(args)?))
        }),
        methods: HashMap::new(),
        properties: HashMap::new(),
      },
      _marker: std::marker::PhantomData,
    }
  }

  /// A class with only a constructor.
  pub fn new<T, F>(constructor: F) -> Arc<Self>
  where
    T: Any + Send + Sync,
    F: Fn(Arguments) -> Result<T, InjectionError> + Send + Sync + 'static,
  {
    Self::builder(constructor).build()
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn has_method(&self, name: &str) -> bool {
    self.methods.contains_key(name)
  }

  pub fn has_property(&self, name: &str) -> bool {
    self.properties.contains_key(name)
  }

  pub(crate) fn construct(&self, args: Arguments) -> Result<Object, InjectionError> {
    (self.constructor)(args)
  }

  pub(crate) fn invoke(
    &self,
    target: &mut (dyn Any + Send + Sync),
    method: &str,
    args: Arguments,
  ) -> Result<(), InjectionError> {
    let invoker = self
      .methods
      .get(method)
      .ok_or_else(|| InjectionError::UnknownMethod(method.to_owned()))?;
    invoker(target, args)
  }

  pub(crate) fn assign(
    &self,
    target: &mut (dyn Any + Send + Sync),
    property: &str,
    value: Argument,
  ) -> Result<(), InjectionError> {
    let setter = self
      .properties
      .get(property)
      .ok_or_else(|| InjectionError::UnknownProperty(property.to_owned()))?;
    setter(target, value)
  }
}

impl fmt::Debug for ServiceClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut methods: Vec<_> = self.methods.keys().collect();
    methods.sort();
    let mut properties: Vec<_> = self.properties.keys().collect();
    properties.sort();
    f.debug_struct("ServiceClass")
      .field("type_name", &self.type_name)
      .field("methods", &methods)
      .field("properties", &properties)
      .finish()
  }
}

/// Builds the method and property tables of a [`ServiceClass`] for `T`.
pub struct ClassBuilder<T> {
  class: ServiceClass,
  _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
  /// Registers a method callable from a definition's `calls` list.
  pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
  where
    F: Fn(&mut T, Arguments) -> Result<(), InjectionError> + Send + Sync + 'static,
  {
    let invoker: MethodInvoker =
      Box::new(move |target: &mut (dyn Any + Send + Sync), args: Arguments| {
        let target = target
          .downcast_mut::<T>()
          .ok_or(InjectionError::TargetType(std::any::type_name::<T>()))?;
        method(target, args)
      });
    self.class.methods.insert(name.into(), invoker);
    self
  }

  /// Registers a property assignable from a definition's `properties` map.
  pub fn property<F>(mut self, name: impl Into<String>, setter: F) -> Self
  where
    F: Fn(&mut T, Argument) -> Result<(), InjectionError> + Send + Sync + 'static,
  {
    let setter: PropertySetter =
      Box::new(move |target: &mut (dyn Any + Send + Sync), value: Argument| {
        let target = target
          .downcast_mut::<T>()
          .ok_or(InjectionError::TargetType(std::any::type_name::<T>()))?;
        setter(target, value)
      });
    self.class.properties.insert(name.into(), setter);
    self
  }

  pub fn build(self) -> Arc<ServiceClass> {
    Arc::new(self.class)
  }
}

/// A loaded module exposing named factory members.
#[derive(Debug, Clone, Default)]
pub struct ModuleObject {
  members: HashMap<String, Arc<ServiceClass>>,
}

impl ModuleObject {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_member(mut self, name: impl Into<String>, class: Arc<ServiceClass>) -> Self {
    self.members.insert(name.into(), class);
    self
  }

  pub fn member(&self, name: &str) -> Option<&Arc<ServiceClass>> {
    self.members.get(name)
  }
}

/// Whatever a [`ModuleLoader`] hands back for a path.
#[derive(Debug, Clone)]
pub enum Module {
  /// Directly invocable as a constructor.
  Class(Arc<ServiceClass>),
  /// Not invocable itself, but exposes named factory members.
  Object(ModuleObject),
  /// A ready-made value.
  Value(Instance),
}

impl Module {
  /// Wraps an arbitrary value as a module.
  pub fn value<T: Any + Send + Sync>(value: T) -> Self {
    Module::Value(Arc::new(value))
  }

  /// The module used as an instance in its own right.
  ///
  /// A `Value` module is its value; class and object modules are handed out
  /// as the `Module` itself.
  pub fn into_instance(self) -> Instance {
    match self {
      Module::Value(instance) => instance,
      other => Arc::new(other),
    }
  }
}

impl From<Arc<ServiceClass>> for Module {
  fn from(class: Arc<ServiceClass>) -> Self {
    Module::Class(class)
  }
}

impl From<ModuleObject> for Module {
  fn from(object: ModuleObject) -> Self {
    Module::Object(object)
  }
}

/// Resolves a module path to a loaded module.
pub trait ModuleLoader: Send + Sync {
  /// Returns `None` when nothing is registered under `path`.
  fn load(&self, path: &Path) -> Option<Module>;
}

/// The default [`ModuleLoader`]: an in-process table of modules keyed by path.
///
/// Relative sources in a definition are joined onto the directory of the
/// configuration file that declared them, so modules registered for such
/// definitions should use the same absolute path. Bare names (e.g. a
/// package-style name like `"mailer"`) are looked up verbatim.
#[derive(Default)]
pub struct ModuleRegistry {
  modules: DashMap<PathBuf, Module>,
}

impl ModuleRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn register(&self, path: impl Into<PathBuf>, module: impl Into<Module>) {
    self.modules.insert(path.into(), module.into());
  }

  pub fn with(self, path: impl Into<PathBuf>, module: impl Into<Module>) -> Self {
    self.register(path, module);
    self
  }

  pub fn len(&self) -> usize {
    self.modules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.modules.is_empty()
  }
}

impl ModuleLoader for ModuleRegistry {
  fn load(&self, path: &Path) -> Option<Module> {
    self.modules.get(path).map(|entry| entry.value().clone())
  }
}

impl fmt::Debug for ModuleRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ModuleRegistry")
      .field("modules", &self.modules.len())
      .finish_non_exhaustive()
  }
}
