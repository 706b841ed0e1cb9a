// src/config.rs

//! Run configuration resolved once at the orchestration boundary.
//!
//! The pipeline itself never reads the process environment; everything it
//! needs is harvested here before a run starts and passed down explicitly.

use std::env;
use std::path::PathBuf;

/// Environment variable prefix recognized for engine build-argument
/// overrides. `ARG_GOFMT_IMAGE=x` becomes `--build-arg=GOFMT_IMAGE=x`.
pub const BUILD_ARG_PREFIX: &str = "ARG_";

/// Configuration for a single pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Explicit path to the build engine executable. When unset the
    /// engine is resolved from `PATH`.
    pub engine: Option<PathBuf>,
    /// `KEY=VALUE` build-argument overrides forwarded to the engine
    pub build_args: Vec<String>,
}

impl RunConfig {
    /// Harvest build-argument overrides from the process environment
    pub fn from_env() -> Self {
        Self {
            engine: None,
            build_args: build_args_from(env::vars()),
        }
    }

    /// Use a specific engine executable instead of searching `PATH`
    pub fn with_engine(mut self, exe: impl Into<PathBuf>) -> Self {
        self.engine = Some(exe.into());
        self
    }
}

/// Collect `ARG_`-prefixed variables as `KEY=VALUE` overrides, sorted for
/// reproducible engine invocations.
fn build_args_from(vars: impl Iterator<Item = (String, String)>) -> Vec<String> {
    let mut args: Vec<String> = vars
        .filter_map(|(key, value)| {
            key.strip_prefix(BUILD_ARG_PREFIX)
                .map(|name| format!("{name}={value}"))
        })
        .collect();
    args.sort();
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_strip_the_prefix() {
        let vars = vec![
            ("ARG_GOFMT_IMAGE".to_string(), "docker.io/library/hello-world".to_string()),
            ("HOME".to_string(), "/root".to_string()),
            ("ARG_YAPF_VERSION".to_string(), "0.31.0".to_string()),
        ];
        let args = build_args_from(vars.into_iter());
        assert_eq!(
            args,
            vec![
                "GOFMT_IMAGE=docker.io/library/hello-world".to_string(),
                "YAPF_VERSION=0.31.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_unrelated_vars_are_ignored() {
        let vars = vec![
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("ARGUMENTS".to_string(), "no underscore after ARG".to_string()),
        ];
        let args = build_args_from(vars.into_iter());
        assert!(args.is_empty());
    }

    #[test]
    fn test_values_keep_their_equals_signs() {
        let vars = vec![("ARG_X".to_string(), "a=b".to_string())];
        assert_eq!(build_args_from(vars.into_iter()), vec!["X=a=b".to_string()]);
    }
}
