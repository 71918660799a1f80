//! Named configuration values with namespaced lookup and `%name%`
//! interpolation.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"%([A-Za-z0-9_.\-]+)%").unwrap());

// Upper bound on whole-string passes; only reachable when substitutions keep
// synthesizing new tokens out of their surroundings.
const MAX_INTERPOLATION_PASSES: usize = 64;

/// Holds the container's parameters.
///
/// Reads return interpolated copies, so a caller mutating a returned value
/// never affects the stored original.
#[derive(Debug, Default)]
pub struct ParameterStore {
  values: RwLock<HashMap<String, Value>>,
}

impl ParameterStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Looks up `name` without a namespace.
  pub fn get(&self, name: &str) -> Result<Option<Value>> {
    self.get_in(name, "")
  }

  /// Looks up `namespace + name`, falling back to the bare `name`.
  pub fn get_in(&self, name: &str, namespace: &str) -> Result<Option<Value>> {
    let qualified = format!("{}{}", namespace, name);
    let found = {
      let values = self.values.read();
      match values.get(&qualified) {
        Some(value) => Some((qualified, value.clone())),
        None => values.get(name).map(|value| (name.to_owned(), value.clone())),
      }
    };

    match found {
      Some((key, value)) => {
        let mut visiting = vec![key];
        self.fill_value(value, &mut visiting).map(Some)
      }
      None => Ok(None),
    }
  }

  pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) {
    self.values.write().insert(name.into(), value.into());
  }

  /// Sets every entry of `parameters`, overwriting existing names.
  pub fn set_all(&self, parameters: Map<String, Value>) {
    let mut values = self.values.write();
    for (name, value) in parameters {
      values.insert(name, value);
    }
  }

  pub fn has(&self, name: &str) -> bool {
    self.values.read().contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.values.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.read().is_empty()
  }

  /// Every parameter, interpolated.
  pub fn bag(&self) -> Result<Map<String, Value>> {
    let mut names: Vec<String> = self.values.read().keys().cloned().collect();
    names.sort();

    let mut bag = Map::new();
    for name in names {
      if let Some(value) = self.get(&name)? {
        bag.insert(name, value);
      }
    }
    Ok(bag)
  }

  /// Interpolates every `%name%` token in `text`.
  pub fn fill(&self, text: &str) -> Result<String> {
    self.fill_string(text, &mut Vec::new())
  }

  // Deep copy with string leaves interpolated.
  fn fill_value(&self, value: Value, visiting: &mut Vec<String>) -> Result<Value> {
    Ok(match value {
      Value::String(text) => Value::String(self.fill_string(&text, visiting)?),
      Value::Array(items) => Value::Array(
        items
          .into_iter()
          .map(|item| self.fill_value(item, visiting))
          .collect::<Result<_>>()?,
      ),
      Value::Object(entries) => Value::Object(
        entries
          .into_iter()
          .map(|(key, item)| Ok((key, self.fill_value(item, visiting)?)))
          .collect::<Result<_>>()?,
      ),
      scalar => scalar,
    })
  }

  fn fill_string(&self, text: &str, visiting: &mut Vec<String>) -> Result<String> {
    let mut current = text.to_owned();

    for _ in 0..MAX_INTERPOLATION_PASSES {
      if !PLACEHOLDER.is_match(&current) {
        return Ok(current);
      }

      let mut next = String::with_capacity(current.len());
      let mut last = 0;
      for captures in PLACEHOLDER.captures_iter(&current) {
        let (Some(token), Some(name)) = (captures.get(0), captures.get(1)) else {
          continue;
        };
        next.push_str(&current[last..token.start()]);
        match self.lookup_text(name.as_str(), visiting)? {
          Some(replacement) => next.push_str(&replacement),
          None => next.push_str(token.as_str()),
        }
        last = token.end();
      }
      next.push_str(&current[last..]);

      if next == current {
        return Ok(current);
      }
      current = next;
    }

    Err(Error::ParameterCycle(text.to_owned()))
  }

  // The string form of a bare lookup of `name`, itself fully interpolated.
  fn lookup_text(&self, name: &str, visiting: &mut Vec<String>) -> Result<Option<String>> {
    if visiting.iter().any(|seen| seen == name) {
      return Err(Error::ParameterCycle(name.to_owned()));
    }

    let Some(raw) = self.values.read().get(name).cloned() else {
      return Ok(None);
    };

    visiting.push(name.to_owned());
    let filled = self.fill_value(raw, visiting);
    visiting.pop();

    Ok(Some(match filled? {
      Value::String(text) => text,
      other => other.to_string(),
    }))
  }
}
