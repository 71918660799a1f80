//! Core, non-public data structures for the resolution engine.

use crate::argument::Instance;
use crate::class::ServiceClass;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// The set of service keys under construction on one resolution path.
///
/// Each descent into a nested argument receives its own copy, so sibling
/// branches never see each other's in-flight keys while every branch still
/// sees its ancestors.
#[derive(Clone, Default)]
pub(crate) struct ConstructionStack {
  keys: HashSet<String>,
}

impl ConstructionStack {
  /// Marks `key` as under construction, failing if it already is.
  pub(crate) fn enter(&mut self, key: &str) -> Result<()> {
    // `insert` returns `false` if the value was already present.
    if !self.keys.insert(key.to_owned()) {
      return Err(Error::CircularReference(key.to_owned()));
    }
    Ok(())
  }

  /// A copy for descending into a nested argument.
  pub(crate) fn branch(&self) -> Self {
    self.clone()
  }
}

impl fmt::Debug for ConstructionStack {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut keys: Vec<_> = self.keys.iter().collect();
    keys.sort();
    write!(f, "ConstructionStack({:?})", keys)
  }
}

/// How a definition's loaded module is turned into an instance.
///
/// Chosen once, the first time a definition is resolved, and never
/// re-inferred afterwards.
#[derive(Clone)]
pub enum ConstructionKind {
  DirectConstructor(Arc<ServiceClass>),
  NamedFactoryMethod {
    class: Arc<ServiceClass>,
    name: String,
  },
  PreconstructedValue(Instance),
}

impl fmt::Debug for ConstructionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConstructionKind::DirectConstructor(class) => {
        write!(f, "DirectConstructor({})", class.type_name())
      }
      ConstructionKind::NamedFactoryMethod { class, name } => {
        write!(f, "NamedFactoryMethod({}::{})", class.type_name(), name)
      }
      ConstructionKind::PreconstructedValue(_) => write!(f, "PreconstructedValue"),
    }
  }
}
