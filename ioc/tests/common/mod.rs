#![allow(dead_code)]

use fibre_ioc_config::{Arguments, Container, InjectionError, ModuleRegistry, ServiceClass};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// --- Test Fixtures ---

pub struct NameService {
  pub name: String,
}

pub struct Greeter {
  pub name: Arc<NameService>,
  pub greeting: String,
  pub suffix: String,
}

impl Greeter {
  pub fn greet(&self) -> String {
    format!("{} {}{}", self.greeting, self.name.name, self.suffix)
  }
}

/// A service that can point at other nodes through every injection style.
pub struct Node {
  pub label: String,
  pub next: Option<Arc<Node>>,
  pub peer: Option<Arc<Node>>,
  pub child: Option<Arc<Node>>,
}

pub fn name_service_class() -> Arc<ServiceClass> {
  ServiceClass::new(|args: Arguments| {
    Ok(NameService {
      name: args.string(0)?,
    })
  })
}

pub fn greeter_class() -> Arc<ServiceClass> {
  ServiceClass::builder(|args: Arguments| {
    Ok(Greeter {
      name: args.service::<NameService>(0)?,
      greeting: args.string(1)?,
      suffix: String::new(),
    })
  })
  .method("setSuffix", |greeter: &mut Greeter, args: Arguments| {
    greeter.suffix = args.string(0)?;
    Ok(())
  })
  .property("greeting", |greeter: &mut Greeter, value| {
    greeter.greeting = value
      .as_str()
      .ok_or_else(|| InjectionError::custom("greeting must be a string"))?
      .to_owned();
    Ok(())
  })
  .build()
}

/// Constructor args: `(label, next?)`. Method `setPeer(peer?)`, property `child`.
pub fn node_class() -> Arc<ServiceClass> {
  ServiceClass::builder(|args: Arguments| {
    Ok(Node {
      label: args.string(0)?,
      next: args.optional_service::<Node>(1)?,
      peer: None,
      child: None,
    })
  })
  .method("setPeer", |node: &mut Node, args: Arguments| {
    node.peer = args.optional_service::<Node>(0)?;
    Ok(())
  })
  .property("child", |node: &mut Node, value| {
    node.child = value.service::<Node>();
    Ok(())
  })
  .build()
}

/// A class whose constructor bumps `counter` every time it runs.
pub fn counting_class(counter: Arc<AtomicUsize>) -> Arc<ServiceClass> {
  ServiceClass::new(move |_args: Arguments| Ok(counter.fetch_add(1, Ordering::SeqCst)))
}

pub fn registry() -> ModuleRegistry {
  ModuleRegistry::new()
    .with("/app/NameService", name_service_class())
    .with("/app/Greeter", greeter_class())
    .with("/app/Node", node_class())
}

pub fn container() -> Container {
  Container::new("/app", Arc::new(registry()))
}
