//! Orders discovered configuration files for application.
//!
//! Later files win. Base definitions are applied deepest first so that files
//! nearer the root override library defaults; environment overrides follow
//! regardless of depth; parameter-only files come last.

use crate::discovery::FileDescriptor;
use tracing::debug;

/// Sorts `descriptors` into application order:
/// base (deep → shallow), then environment (deep → shallow), then
/// parameter-only (deep → shallow). Ties keep discovery order.
pub fn order(descriptors: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
  let mut base = Vec::new();
  let mut env = Vec::new();
  let mut params = Vec::new();

  for descriptor in descriptors {
    if descriptor.is_param_file {
      params.push(descriptor);
    } else if descriptor.is_env_file {
      env.push(descriptor);
    } else {
      base.push(descriptor);
    }
  }

  for bucket in [&mut base, &mut env, &mut params] {
    bucket.sort_by(|a, b| b.level.cmp(&a.level));
  }

  debug!(
    base = base.len(),
    env = env.len(),
    params = params.len(),
    "ordered configuration files"
  );

  base.into_iter().chain(env).chain(params).collect()
}
