mod common;

use common::{container, counting_class, greeter_class, name_service_class, Greeter, NameService, Node};
use fibre_ioc_config::{
  Argument, Arguments, ConstructionKind, Container, Error, InjectionError, Module, ModuleObject,
  ModuleRegistry, ServiceClass, ServiceDefinition,
};
use serde_json::json;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;

fn node(label: &str) -> ServiceDefinition {
  ServiceDefinition::new("./Node").argument(label)
}

/// Accepts any arguments and keeps them; `attach` appends more.
fn holder_class() -> Arc<ServiceClass> {
  ServiceClass::builder(|args: Arguments| Ok(args.into_vec()))
    .method("attach", |held: &mut Vec<Argument>, args: Arguments| {
      held.extend(args.into_vec());
      Ok(())
    })
    .build()
}

// --- Circular references ---

#[test]
fn test_circular_constructor_reference() {
  let container = container();
  container.set("a", node("a").argument("@b"));
  container.set("b", node("b").argument("@a"));

  assert!(matches!(
    container.get("a"),
    Err(Error::CircularReference(id)) if id == "a"
  ));
}

#[test]
fn test_circular_reference_through_method_call_even_if_optional() {
  let container = container();
  container.set("narcissus", node("n").call("setPeer", ["@?narcissus"]).unwrap());

  assert!(matches!(
    container.get("narcissus"),
    Err(Error::CircularReference(id)) if id == "narcissus"
  ));
}

#[test]
fn test_transitive_circular_reference_through_property() {
  let container = container();
  container.set("first", node("1").property("child", "@second"));
  container.set("second", node("2").argument("@third"));
  container.set("third", node("3").call("setPeer", ["@first"]).unwrap());

  assert!(matches!(
    container.get("first"),
    Err(Error::CircularReference(id)) if id == "first"
  ));
}

#[test]
fn test_shared_dependency_is_not_a_cycle() {
  let container = container();
  container.set("base", node("base").singleton(true));
  container.set("left", node("left").argument("@base"));
  container.set("right", node("right").argument("@base"));
  container.set(
    "top",
    node("top")
      .argument("@left")
      .call("setPeer", ["@right"])
      .unwrap(),
  );

  let top = container.get_as::<Node>("top").unwrap();
  let left = top.next.as_ref().unwrap();
  let right = top.peer.as_ref().unwrap();

  assert!(Arc::ptr_eq(
    left.next.as_ref().unwrap(),
    right.next.as_ref().unwrap()
  ));
  assert!(Arc::ptr_eq(
    left.next.as_ref().unwrap(),
    &container.get_as::<Node>("base").unwrap()
  ));
}

#[test]
fn test_sibling_branches_do_not_see_each_other() {
  // Without caching, `base` is built once per branch; neither sees the other.
  let container = container();
  container.set("base", node("base"));
  container.set("pair", node("pair").argument("@base").property("child", "@base"));

  let pair = container.get_as::<Node>("pair").unwrap();
  assert_eq!(pair.next.as_ref().unwrap().label, "base");
  assert!(!Arc::ptr_eq(
    pair.next.as_ref().unwrap(),
    pair.child.as_ref().unwrap()
  ));
}

// --- Loading the constructible ---

#[test]
fn test_namespaced_service_lookup_prefers_namespace() {
  let container = container();
  container.set("transport", ServiceDefinition::new("./NameService").argument("global"));
  container.set(
    "mail.transport",
    ServiceDefinition::new("./NameService").argument("scoped"),
  );
  container.set(
    "mailer",
    ServiceDefinition::new("./Greeter")
      .arguments(["@transport", "hi"])
      .namespace("mail"),
  );
  container.set(
    "plain",
    ServiceDefinition::new("./Greeter").arguments(["@transport", "hi"]),
  );

  assert_eq!(container.get_as::<Greeter>("mailer").unwrap().greet(), "hi scoped");
  assert_eq!(container.get_as::<Greeter>("plain").unwrap().greet(), "hi global");
}

#[test]
fn test_namespace_falls_back_to_bare_service_and_parameter() {
  let container = container();
  container.set_parameter("greeting", "hello");
  container.set_parameter("mail.greeting", "dear");
  container.set("name", ServiceDefinition::new("./NameService").argument("ann"));
  container.set(
    "mailer",
    ServiceDefinition::new("./Greeter")
      .arguments(["@name", "%greeting%"])
      .namespace("mail"),
  );

  assert_eq!(container.get_as::<Greeter>("mailer").unwrap().greet(), "dear ann");
}

#[test]
fn test_class_path_from_parameter() {
  let container = container();
  container.set_parameter("name_class", "./NameService");
  container.set_parameter("custom.name_class", "./Greeter");

  container.set(
    "plain",
    ServiceDefinition::new("%name_class%").argument("zed"),
  );
  assert_eq!(container.get_as::<NameService>("plain").unwrap().name, "zed");

  // The service's own namespace is consulted for its class parameter.
  container.set(
    "scoped",
    ServiceDefinition::new("%name_class%")
      .arguments(["@plain", "yo"])
      .namespace("custom"),
  );
  assert_eq!(container.get_as::<Greeter>("scoped").unwrap().greet(), "yo zed");
}

#[test]
fn test_missing_class_fails() {
  let container = container();
  container.set("ghost", ServiceDefinition::new("./Ghost"));
  container.set("unset", ServiceDefinition::new("%ghost_class%"));
  container.set("sourceless", ServiceDefinition::default());

  for id in ["ghost", "unset", "sourceless"] {
    assert!(
      matches!(container.get(id), Err(Error::ClassNotFound { .. })),
      "{id} should fail with ClassNotFound"
    );
  }
}

#[test]
fn test_relative_sources_resolve_against_root_directory() {
  let modules = ModuleRegistry::new()
    .with("/app/lib/NameService", name_service_class())
    .with("/app/shared/NameService", name_service_class())
    .with("name-service", name_service_class());
  let container = Container::new("/app", Arc::new(modules));

  container.set(
    "local",
    ServiceDefinition::new("./NameService")
      .root_directory("/app/lib")
      .argument("local"),
  );
  container.set(
    "sibling",
    ServiceDefinition::new("../shared/NameService")
      .root_directory("/app/lib")
      .argument("sibling"),
  );
  container.set(
    "package",
    ServiceDefinition::new("name-service")
      .root_directory("/app/lib")
      .argument("package"),
  );

  for id in ["local", "sibling", "package"] {
    assert_eq!(container.get_as::<NameService>(id).unwrap().name, id);
  }
}

#[test]
fn test_uninvocable_module_fails_even_when_optional() {
  let modules = common::registry().with("/app/Five", Module::value(5_u32));
  let container = Container::new("/app", Arc::new(modules));
  container.set("five", ServiceDefinition::new("./Five"));
  container.set("holder", node("h").argument("@?five"));

  assert!(matches!(
    container.get("five"),
    Err(Error::InvalidConstructor(id)) if id == "five"
  ));
  assert!(matches!(
    container.get("holder"),
    Err(Error::InvalidConstructor(id)) if id == "five"
  ));
}

#[test]
fn test_preconstructed_value_is_the_instance() {
  let settings = Arc::new(String::from("settings"));
  let modules = ModuleRegistry::new().with("/app/Settings", Module::Value(settings.clone()));
  let container = Container::new("/app", Arc::new(modules));
  container.set(
    "settings",
    ServiceDefinition::new("./Settings").preconstructed(true),
  );

  let first = container.get_as::<String>("settings").unwrap();
  let second = container.get_as::<String>("settings").unwrap();
  assert!(Arc::ptr_eq(&first, &settings));
  assert!(Arc::ptr_eq(&first, &second));
  assert!(matches!(
    container.definition("settings").unwrap().construction_kind(),
    Some(ConstructionKind::PreconstructedValue(_))
  ));
}

#[test]
fn test_preconstructed_value_rejects_injection() {
  let modules = ModuleRegistry::new().with("/app/Settings", Module::value(String::from("s")));
  let container = Container::new("/app", Arc::new(modules));
  container.set(
    "settings",
    ServiceDefinition::new("./Settings")
      .preconstructed(true)
      .property("mode", "fast"),
  );

  assert!(matches!(
    container.get("settings"),
    Err(Error::Injection {
      source: InjectionError::Immutable,
      ..
    })
  ));
}

#[test]
fn test_named_factory_method() {
  let shouting = ServiceClass::new(|args: Arguments| {
    Ok(NameService {
      name: args.string(0)?.to_uppercase(),
    })
  });
  let modules = ModuleRegistry::new().with(
    "/app/Names",
    ModuleObject::new().with_member("shouting", shouting),
  );
  let container = Container::new("/app", Arc::new(modules));

  container.set(
    "loud",
    ServiceDefinition::new("./Names")
      .factory_method("shouting")
      .argument("quiet"),
  );
  container.set(
    "unknown",
    ServiceDefinition::new("./Names").factory_method("whispering"),
  );
  container.set("direct", ServiceDefinition::new("./Names"));

  assert_eq!(container.get_as::<NameService>("loud").unwrap().name, "QUIET");
  assert!(matches!(
    container.get("unknown"),
    Err(Error::InvalidConstructor(_))
  ));
  assert!(matches!(
    container.get("direct"),
    Err(Error::InvalidConstructor(_))
  ));
}

#[test]
fn test_preloaded_module_bypasses_loader() {
  let container = Container::new("/app", Arc::new(ModuleRegistry::new()));
  container.set(
    "name",
    ServiceDefinition::from_module(name_service_class()).argument("inline"),
  );
  container.set(
    "greeter",
    ServiceDefinition::from_module(greeter_class()).arguments(["@name", "hi"]),
  );

  assert_eq!(container.get_as::<Greeter>("greeter").unwrap().greet(), "hi inline");
}

// --- Failure semantics ---

#[test]
fn test_unknown_member_is_an_injection_error() {
  let container = container();
  container.set("n", node("n").call("setColour", ["red"]).unwrap());
  container.set("m", node("m").property("colour", "red"));

  assert!(matches!(
    container.get("n"),
    Err(Error::Injection { id, source: InjectionError::UnknownMethod(m) }) if id == "n" && m == "setColour"
  ));
  assert!(matches!(
    container.get("m"),
    Err(Error::Injection { source: InjectionError::UnknownProperty(_), .. })
  ));
}

#[test]
fn test_completed_singletons_survive_a_failed_resolution() {
  let counter = Arc::new(AtomicUsize::new(0));
  let modules = ModuleRegistry::new()
    .with("/app/Counter", counting_class(counter.clone()))
    .with("/app/Holder", holder_class());
  let container = Container::new("/app", Arc::new(modules));

  container.set("counted", ServiceDefinition::new("./Counter").singleton(true));
  container.set(
    "pair",
    ServiceDefinition::new("./Holder")
      .argument("@counted")
      .call("attach", ["@missing"])
      .unwrap(),
  );

  assert!(matches!(
    container.get("pair"),
    Err(Error::ServiceNotFound(id)) if id == "missing"
  ));

  // `counted` finished before the failure and stays cached.
  container.get("counted").unwrap();
  assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_overwriting_registration_is_successful() {
  let container = container();
  container.set("who", ServiceDefinition::new("./NameService").argument("first"));
  assert!(container.has("who"));
  container.set("who", ServiceDefinition::new("./NameService").argument("second"));

  assert_eq!(container.get_as::<NameService>("who").unwrap().name, "second");
}

#[test]
fn test_tagged_services() {
  let container = container();
  let mut listener = node("listener");
  listener.add_tag("event", json!({ "on": "boot" }).as_object().cloned().unwrap());
  container.set("listener", listener);
  container.set("quiet", node("quiet"));

  let tagged = container.tagged("event");
  assert_eq!(tagged.len(), 1);
  assert_eq!(tagged[0].0, "listener");
  assert_eq!(tagged[0].1[0]["on"], json!("boot"));
}

// --- Concurrency ---

#[test]
fn test_singleton_is_shared_under_concurrency() {
  let counter = Arc::new(AtomicUsize::new(0));
  let modules = ModuleRegistry::new().with("/app/Counter", counting_class(counter));
  let container = Container::new("/app", Arc::new(modules));
  container.set("shared", ServiceDefinition::new("./Counter").singleton(true));

  let resolved: Vec<_> = thread::scope(|s| {
    let handles: Vec<_> = (0..16)
      .map(|_| s.spawn(|| container.get("shared").unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  for instance in &resolved {
    assert!(Arc::ptr_eq(instance, &resolved[0]));
  }
}
