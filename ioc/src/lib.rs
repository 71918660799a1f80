//! # Fibre IoC Config
//!
//! A configuration-driven Inversion of Control (IoC) container for Rust.
//!
//! Service graphs are described in `services.json` files spread through a
//! project tree. The container builder discovers those files, applies them in
//! a deterministic precedence order, and the resulting [`Container`] builds
//! and wires services lazily when they are requested.
//!
//! ## Core Concepts
//!
//! - **Definition**: the build plan for one service: which module to load,
//!   constructor arguments, setter calls and property assignments.
//! - **Arguments**: `"@id"` references another service (`"@?id"` if it is
//!   optional), `"%name%"` a parameter; anything else is a literal.
//! - **Parameters**: named values; strings may embed `%other%` tokens that
//!   are interpolated on read.
//! - **Classes**: a [`ServiceClass`] pairs a typed constructor with the
//!   methods and properties a definition may inject through. A
//!   [`ModuleLoader`] maps the `class` path of a definition to one.
//! - **Precedence**: deeper files are applied first so files nearer the root
//!   win; `services_<env>.json` files override base files; `parameters.json`
//!   files are applied last.
//!
//! ## Quick Start
//!
//! ```
//! use fibre_ioc_config::{Arguments, Container, ModuleRegistry, ServiceClass, ServiceDefinition};
//! use std::sync::Arc;
//!
//! struct Greeter {
//!   greeting: String,
//!   suffix: String,
//! }
//!
//! let modules = ModuleRegistry::new().with(
//!   "/app/Greeter",
//!   ServiceClass::builder(|args: Arguments| {
//!     Ok(Greeter { greeting: args.string(0)?, suffix: String::new() })
//!   })
//!   .method("setSuffix", |greeter: &mut Greeter, args: Arguments| {
//!     greeter.suffix = args.string(0)?;
//!     Ok(())
//!   })
//!   .build(),
//! );
//!
//! let container = Container::new("/app", Arc::new(modules));
//! container.set_parameter("greeting", "hello");
//! container.set(
//!   "greeter",
//!   ServiceDefinition::new("./Greeter")
//!     .argument("%greeting%")
//!     .call("setSuffix", ["!"])
//!     .unwrap(),
//! );
//!
//! let greeter = container.get_as::<Greeter>("greeter").unwrap();
//! assert_eq!(format!("{}{}", greeter.greeting, greeter.suffix), "hello!");
//! ```

mod argument;
mod builder;
mod class;
mod compiler;
mod container;
mod core;
mod definition;
mod discovery;
mod error;
mod merge;
mod parameters;

pub use argument::{Argument, ArgumentReference, Arguments, Instance};
pub use builder::{build_container, BuildOptions, ContainerBuilder};
pub use class::{ClassBuilder, Module, ModuleLoader, ModuleObject, ModuleRegistry, ServiceClass};
pub use compiler::{
  apply, build_definition, CallConfig, ConfigLoader, ConfigRecord, JsonConfigLoader, ServiceConfig,
};
pub use container::Container;
pub use crate::core::ConstructionKind;
pub use definition::{MethodCall, ServiceDefinition, TagAttributes};
pub use discovery::{discover, DiscoveryOptions, FileDescriptor, FileKind, FileSystem, OsFileSystem};
pub use error::{Error, InjectionError, Result};
pub use merge::order;
pub use parameters::ParameterStore;
