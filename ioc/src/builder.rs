use crate::class::ModuleLoader;
use crate::compiler::{self, ConfigLoader, JsonConfigLoader};
use crate::container::Container;
use crate::discovery::{self, DiscoveryOptions, FileSystem, OsFileSystem};
use crate::error::Result;
use crate::merge;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

/// Options recognized by [`build_container`].
pub type BuildOptions = DiscoveryOptions;

/// A builder for creating a [`Container`] from the configuration files under
/// a root directory.
pub struct ContainerBuilder {
  options: BuildOptions,
  fs: Arc<dyn FileSystem>,
  config_loader: Arc<dyn ConfigLoader>,
  module_loader: Arc<dyn ModuleLoader>,
}

impl fmt::Debug for ContainerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerBuilder")
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

impl ContainerBuilder {
  /// Starts a builder whose services are loaded through `module_loader`.
  pub fn new(module_loader: Arc<dyn ModuleLoader>) -> Self {
    Self {
      options: BuildOptions::default(),
      fs: Arc::new(OsFileSystem),
      config_loader: Arc::new(JsonConfigLoader),
      module_loader,
    }
  }

  /// Replaces all options at once.
  pub fn options(mut self, options: BuildOptions) -> Self {
    self.options = options;
    self
  }

  /// Enables `services_<env>.json` overrides for `env`.
  pub fn env(mut self, env: impl Into<String>) -> Self {
    self.options.env = Some(env.into());
    self
  }

  /// Whether directories matching the dependency directory are skipped.
  pub fn ignore_dependency_directory(mut self, ignore: bool) -> Self {
    self.options.ignore_dependency_directory = ignore;
    self
  }

  pub fn dependency_directory(mut self, name: impl Into<String>) -> Self {
    self.options.dependency_directory = name.into();
    self
  }

  pub fn service_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.options.service_suffix = suffix.into();
    self
  }

  pub fn parameter_suffix(mut self, suffix: impl Into<String>) -> Self {
    self.options.parameter_suffix = suffix.into();
    self
  }

  /// Uses a custom filesystem for discovery.
  pub fn file_system<F: FileSystem + 'static>(mut self, fs: F) -> Self {
    self.fs = Arc::new(fs);
    self
  }

  /// Uses a custom reader for configuration files.
  pub fn config_loader<L: ConfigLoader + 'static>(mut self, loader: L) -> Self {
    self.config_loader = Arc::new(loader);
    self
  }

  /// Discovers, orders and applies every configuration file under `root`.
  pub fn build(&self, root: impl AsRef<Path>) -> Result<Container> {
    let root = root.as_ref();
    let container = Container::new(root, Arc::clone(&self.module_loader));

    let files = discovery::discover(self.fs.as_ref(), root, &self.options)?;
    let files = merge::order(files);

    // Apply in sorted order; later files take precedence.
    for file in &files {
      compiler::apply(file, self.config_loader.as_ref(), &container)?;
    }

    debug!(root = %root.display(), files = files.len(), "container built");
    Ok(container)
  }
}

/// Builds a container from the configuration files under `root`.
pub fn build_container(
  root: impl AsRef<Path>,
  options: BuildOptions,
  module_loader: Arc<dyn ModuleLoader>,
) -> Result<Container> {
  ContainerBuilder::new(module_loader).options(options).build(root)
}
