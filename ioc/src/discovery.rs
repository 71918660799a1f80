//! Finds configuration files beneath a root directory.

use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

/// What a path on the filesystem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  Directory,
  File,
  Other,
}

/// The filesystem primitives discovery is built on.
pub trait FileSystem: Send + Sync {
  /// Names of the entries directly inside `path`, exactly as stored.
  fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;
  fn stat(&self, path: &Path) -> io::Result<FileKind>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
  fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path)? {
      names.push(entry?.file_name());
    }
    Ok(names)
  }

  fn stat(&self, path: &Path) -> io::Result<FileKind> {
    let metadata = fs::metadata(path)?;
    Ok(if metadata.is_dir() {
      FileKind::Directory
    } else if metadata.is_file() {
      FileKind::File
    } else {
      FileKind::Other
    })
  }
}

/// A configuration file found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
  pub path: PathBuf,
  /// The directory containing the file.
  pub directory: PathBuf,
  /// Depth below the root; files directly in the root are at level 0.
  pub level: usize,
  pub is_env_file: bool,
  pub is_param_file: bool,
}

/// Which files count as configuration, and where not to look.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
  /// Environment name; enables `services_<env>.json` overrides.
  pub env: Option<String>,
  /// Skip directories whose path contains `dependency_directory`.
  pub ignore_dependency_directory: bool,
  pub dependency_directory: String,
  pub service_suffix: String,
  pub parameter_suffix: String,
}

impl Default for DiscoveryOptions {
  fn default() -> Self {
    Self {
      env: None,
      ignore_dependency_directory: true,
      dependency_directory: "node_modules".to_string(),
      service_suffix: "services.json".to_string(),
      parameter_suffix: "parameters.json".to_string(),
    }
  }
}

impl DiscoveryOptions {
  /// The environment override suffix, e.g. `services_dev.json`.
  fn env_suffix(&self) -> Option<String> {
    let env = self.env.as_deref().filter(|env| !env.is_empty())?;
    let stem = self
      .service_suffix
      .strip_suffix(".json")
      .unwrap_or(&self.service_suffix);
    Some(format!("{}_{}.json", stem, env))
  }

  fn is_excluded(&self, root: &Path, directory: &Path) -> bool {
    if !self.ignore_dependency_directory || self.dependency_directory.is_empty() {
      return false;
    }
    let relative = directory.strip_prefix(root).unwrap_or(directory);
    relative
      .to_string_lossy()
      .contains(self.dependency_directory.as_str())
  }
}

/// Recursively collects configuration files under `root`.
///
/// Entries of each directory are visited in name order, so the result is
/// deterministic. Any I/O failure aborts discovery.
pub fn discover(
  fs: &dyn FileSystem,
  root: &Path,
  options: &DiscoveryOptions,
) -> Result<Vec<FileDescriptor>> {
  let env_suffix = options.env_suffix();
  let mut found = Vec::new();
  visit(fs, root, root, 0, options, env_suffix.as_deref(), &mut found)?;
  trace!(root = %root.display(), files = found.len(), "discovery finished");
  Ok(found)
}

fn visit(
  fs: &dyn FileSystem,
  root: &Path,
  directory: &Path,
  level: usize,
  options: &DiscoveryOptions,
  env_suffix: Option<&str>,
  found: &mut Vec<FileDescriptor>,
) -> Result<()> {
  let mut names = fs.list_dir(directory).map_err(|source| Error::FileSystem {
    path: directory.to_path_buf(),
    source,
  })?;
  names.sort();

  for name in names {
    let path = directory.join(&name);
    let kind = fs.stat(&path).map_err(|source| Error::FileSystem {
      path: path.clone(),
      source,
    })?;

    match kind {
      FileKind::Directory => {
        if options.is_excluded(root, &path) {
          trace!(path = %path.display(), "skipping dependency directory");
          continue;
        }
        visit(fs, root, &path, level + 1, options, env_suffix, found)?;
      }
      FileKind::File => {
        // Names that are not UTF-8 cannot match any configuration suffix.
        let Some(name) = name.to_str() else {
          trace!(path = %path.display(), "skipping non UTF-8 file name");
          continue;
        };
        let is_base = name.ends_with(options.service_suffix.as_str());
        let is_param = !is_base && name.ends_with(options.parameter_suffix.as_str());
        let is_env = !is_base && !is_param && env_suffix.is_some_and(|suffix| name.ends_with(suffix));

        if is_base || is_param || is_env {
          trace!(path = %path.display(), level, is_env, is_param, "found configuration file");
          found.push(FileDescriptor {
            path,
            directory: directory.to_path_buf(),
            level,
            is_env_file: is_env,
            is_param_file: is_param,
          });
        }
      }
      FileKind::Other => {}
    }
  }

  Ok(())
}
