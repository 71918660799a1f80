//! The main `Container` struct and its resolution engine.

use crate::argument::{Argument, ArgumentReference, Arguments, Instance};
use crate::class::{Module, ModuleLoader};
use crate::core::{ConstructionKind, ConstructionStack};
use crate::definition::{ServiceDefinition, TagAttributes};
use crate::error::{Error, InjectionError, Result};
use crate::parameters::ParameterStore;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// The Inversion of Control (IoC) container.
///
/// Holds service definitions, parameters and the cache of shared instances.
/// Services are built lazily on [`Container::get`]; singleton and
/// preconstructed services are built at most once and cached for the
/// container's lifetime.
pub struct Container {
  root: PathBuf,
  loader: Arc<dyn ModuleLoader>,
  definitions: DashMap<String, Arc<ServiceDefinition>>,
  instances: DashMap<String, Instance>,
  parameters: ParameterStore,
}

impl Container {
  /// Creates an empty container rooted at `root`, loading modules through
  /// `loader`.
  pub fn new(root: impl Into<PathBuf>, loader: Arc<dyn ModuleLoader>) -> Self {
    Self {
      root: root.into(),
      loader,
      definitions: DashMap::new(),
      instances: DashMap::new(),
      parameters: ParameterStore::new(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  // --- Definitions ---

  /// Registers `definition` under `id`, replacing any previous definition.
  pub fn set(&self, id: impl Into<String>, definition: ServiceDefinition) {
    let id = id.into();
    trace!(service = %id, "registering definition");
    self.definitions.insert(id, Arc::new(definition));
  }

  pub fn has(&self, id: &str) -> bool {
    self.definitions.contains_key(id)
  }

  pub fn definition(&self, id: &str) -> Option<Arc<ServiceDefinition>> {
    self.definitions.get(id).map(|entry| Arc::clone(entry.value()))
  }

  /// Ids of every definition carrying `tag`, with the tag's attributes,
  /// sorted by id.
  pub fn tagged(&self, tag: &str) -> Vec<(String, Vec<TagAttributes>)> {
    let mut tagged: Vec<_> = self
      .definitions
      .iter()
      .filter(|entry| entry.value().has_tag(tag))
      .map(|entry| (entry.key().clone(), entry.value().get_tag(tag).to_vec()))
      .collect();
    tagged.sort_by(|a, b| a.0.cmp(&b.0));
    tagged
  }

  // --- Parameters ---

  pub fn get_parameter(&self, name: &str) -> Result<Option<Value>> {
    self.parameters.get(name)
  }

  /// Looks up `namespace + name`, falling back to `name`.
  pub fn get_parameter_in(&self, name: &str, namespace: &str) -> Result<Option<Value>> {
    self.parameters.get_in(name, namespace)
  }

  pub fn set_parameter(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
    self.parameters.set(name, value);
    self
  }

  pub fn has_parameter(&self, name: &str) -> bool {
    self.parameters.has(name)
  }

  pub fn set_parameters(&self, parameters: Map<String, Value>) -> &Self {
    self.parameters.set_all(parameters);
    self
  }

  /// Every parameter, interpolated.
  pub fn parameter_bag(&self) -> Result<Map<String, Value>> {
    self.parameters.bag()
  }

  pub fn parameters(&self) -> &ParameterStore {
    &self.parameters
  }

  // --- Resolution ---

  /// Resolves the service `id`, constructing it if needed.
  pub fn get(&self, id: &str) -> Result<Instance> {
    self
      .resolve(id, false, ConstructionStack::default(), "")?
      .ok_or_else(|| Error::ServiceNotFound(id.to_owned()))
  }

  /// Resolves the service `id` and downcasts it to `T`.
  pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
    self.get(id)?.downcast::<T>().map_err(|_| Error::TypeMismatch {
      id: id.to_owned(),
      expected: std::any::type_name::<T>(),
    })
  }

  /// Resolves `id`, returning `None` instead of failing if it is undefined.
  pub fn get_optional(&self, id: &str) -> Result<Option<Instance>> {
    self.resolve(id, true, ConstructionStack::default(), "")
  }

  fn resolve(
    &self,
    id: &str,
    optional: bool,
    mut stack: ConstructionStack,
    ns: &str,
  ) -> Result<Option<Instance>> {
    // Prefer the namespaced definition, fall back to the bare id.
    let Some((key, definition)) = self.lookup_definition(id, ns) else {
      if optional {
        trace!(service = %id, "optional service not defined");
        return Ok(None);
      }
      return Err(Error::ServiceNotFound(id.to_owned()));
    };

    if definition.is_cached() {
      if let Some(instance) = self.cached(&key) {
        return Ok(Some(instance));
      }
    }

    let namespace = definition.namespace_prefix();
    let kind = self.construction_kind(&key, &definition, &namespace)?;

    stack.enter(&key)?;
    debug!(service = %key, kind = ?kind, "constructing service");

    let arguments =
      self.resolve_arguments(definition.constructor_arguments(), &stack, &namespace)?;

    let instance = match kind {
      ConstructionKind::PreconstructedValue(value) => {
        if !definition.method_calls().is_empty() || !definition.property_assignments().is_empty() {
          return Err(injection(&key, InjectionError::Immutable));
        }
        value
      }
      ConstructionKind::DirectConstructor(ref class)
      | ConstructionKind::NamedFactoryMethod { ref class, .. } => {
        let mut object = class
          .construct(arguments)
          .map_err(|source| injection(&key, source))?;

        for call in definition.method_calls() {
          let args = self.resolve_arguments(&call.arguments, &stack, &namespace)?;
          class
            .invoke(&mut *object, &call.method, args)
            .map_err(|source| injection(&key, source))?;
        }

        for (name, reference) in definition.property_assignments() {
          let value = self.resolve_argument(reference, &stack, &namespace)?;
          class
            .assign(&mut *object, name, value)
            .map_err(|source| injection(&key, source))?;
        }

        Instance::from(object)
      }
    };

    if definition.is_cached() {
      // A concurrent resolution may have cached first; keep that one.
      let cached = self
        .instances
        .entry(key)
        .or_insert(instance)
        .value()
        .clone();
      return Ok(Some(cached));
    }

    Ok(Some(instance))
  }

  fn lookup_definition(&self, id: &str, ns: &str) -> Option<(String, Arc<ServiceDefinition>)> {
    if !ns.is_empty() {
      let namespaced = format!("{}{}", ns, id);
      if let Some(definition) = self.definition(&namespaced) {
        return Some((namespaced, definition));
      }
    }
    self
      .definition(id)
      .map(|definition| (id.to_owned(), definition))
  }

  fn cached(&self, key: &str) -> Option<Instance> {
    self.instances.get(key).map(|entry| Arc::clone(entry.value()))
  }

  /// Loads the definition's module on first use and decides how it is
  /// invoked. The result is cached on the definition.
  fn construction_kind(
    &self,
    key: &str,
    definition: &ServiceDefinition,
    namespace: &str,
  ) -> Result<ConstructionKind> {
    definition
      .factory_cell()
      .get_or_try_init(|| {
        let module = match definition.preloaded_module() {
          Some(module) => module.clone(),
          None => self.load_module(key, definition, namespace)?,
        };
        classify_module(key, definition, module)
      })
      .cloned()
  }

  fn load_module(&self, key: &str, definition: &ServiceDefinition, namespace: &str) -> Result<Module> {
    let not_found = |source_path: &str| Error::ClassNotFound {
      id: key.to_owned(),
      source_path: source_path.to_owned(),
    };

    let source = definition.source().ok_or_else(|| not_found(""))?;
    let path = match ArgumentReference::classify(Value::String(source.to_owned())) {
      ArgumentReference::Parameter(name) => match self.parameters.get_in(&name, namespace)? {
        Some(Value::String(path)) if !path.is_empty() => path,
        _ => return Err(not_found(source)),
      },
      _ => source.to_owned(),
    };

    let root = definition.root_directory_path().unwrap_or(&self.root);
    let path = module_path(root, &path);
    debug!(service = %key, path = %path.display(), "loading module");

    self
      .loader
      .load(&path)
      .ok_or_else(|| not_found(&path.to_string_lossy()))
  }

  fn resolve_arguments(
    &self,
    references: &[ArgumentReference],
    stack: &ConstructionStack,
    ns: &str,
  ) -> Result<Arguments> {
    references
      .iter()
      .map(|reference| self.resolve_argument(reference, stack, ns))
      .collect::<Result<Vec<_>>>()
      .map(Arguments::new)
  }

  fn resolve_argument(
    &self,
    reference: &ArgumentReference,
    stack: &ConstructionStack,
    ns: &str,
  ) -> Result<Argument> {
    match reference {
      ArgumentReference::Literal(value) => Ok(Argument::Value(value.clone())),
      ArgumentReference::Parameter(name) => Ok(Argument::Value(
        self.parameters.get_in(name, ns)?.unwrap_or(Value::Null),
      )),
      ArgumentReference::Service { id, optional } => {
        // Reuse live instances, namespaced key first.
        let live = self
          .cached(&format!("{}{}", ns, id))
          .or_else(|| self.cached(id));
        if let Some(instance) = live {
          return Ok(Argument::Service(instance));
        }

        Ok(
          self
            .resolve(id, *optional, stack.branch(), ns)?
            .map_or(Argument::Empty, Argument::Service),
        )
      }
    }
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("root", &self.root)
      .field("definitions", &self.definitions.len())
      .field("instances", &self.instances.len())
      .field("parameters", &self.parameters.len())
      .finish_non_exhaustive()
  }
}

fn injection(key: &str, source: InjectionError) -> Error {
  Error::Injection {
    id: key.to_owned(),
    source,
  }
}

/// Decides how a loaded module is invoked.
///
/// Invalid combinations fail even when the service was referenced as
/// optional.
fn classify_module(key: &str, definition: &ServiceDefinition, module: Module) -> Result<ConstructionKind> {
  if definition.is_preconstructed() {
    return Ok(ConstructionKind::PreconstructedValue(module.into_instance()));
  }

  match (definition.named_factory_method(), module) {
    (Some(name), Module::Object(object)) => match object.member(name) {
      Some(class) => Ok(ConstructionKind::NamedFactoryMethod {
        class: Arc::clone(class),
        name: name.to_owned(),
      }),
      None => Err(Error::InvalidConstructor(key.to_owned())),
    },
    (Some(_), _) => Err(Error::InvalidConstructor(key.to_owned())),
    (None, Module::Class(class)) => Ok(ConstructionKind::DirectConstructor(class)),
    (None, _) => Err(Error::InvalidConstructor(key.to_owned())),
  }
}

/// Turns a definition source into a loader path.
///
/// `./x` and `../x` are relative to `root`; anything else (absolute paths,
/// bare module names) is passed through.
pub(crate) fn module_path(root: &Path, source: &str) -> PathBuf {
  let source = match source.strip_prefix("../") {
    Some(rest) => format!("./../{}", rest),
    None => source.to_owned(),
  };

  match source.strip_prefix("./") {
    Some(relative) => normalize(&root.join(relative)),
    None => PathBuf::from(source),
  }
}

// Lexical normalization: drops `.` and folds `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !normalized.pop() {
          normalized.push(component);
        }
      }
      other => normalized.push(other),
    }
  }
  normalized
}
