//! Raw action inputs and CI context
//!
//! Inputs arrive as `INPUT_<NAME>` environment variables. They are read once
//! into an [`Inputs`] value and never looked up again.

use std::fmt;

/// Prefix the CI platform puts in front of every action input.
pub const INPUT_PREFIX: &str = "INPUT_";

/// A value that must never show up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Recognized action inputs. Absent and empty values are both `None`.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub appendix_file: Option<String>,
    pub image_name: Option<String>,
    pub docker_username: Option<String>,
    pub docker_password: Option<Secret>,
    pub docker_registry: Option<String>,
    pub notebook_user: Option<String>,
    pub mybinderorg_tag: Option<String>,
    pub binder_cache: Option<String>,
    pub repo_dir: Option<String>,
    pub no_push: Option<String>,
    pub latest_tag_off: Option<String>,
    pub additional_tag: Option<String>,
}

impl Inputs {
    /// Read every input from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(format!("{INPUT_PREFIX}{name}")).ok())
    }

    /// Read every input through `lookup`, which receives the bare option
    /// name (e.g. `IMAGE_NAME`).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            appendix_file: get("APPENDIX_FILE"),
            image_name: get("IMAGE_NAME"),
            docker_username: get("DOCKER_USERNAME"),
            docker_password: get("DOCKER_PASSWORD").map(Secret::new),
            docker_registry: get("DOCKER_REGISTRY"),
            notebook_user: get("NOTEBOOK_USER"),
            mybinderorg_tag: get("MYBINDERORG_TAG"),
            binder_cache: get("BINDER_CACHE"),
            repo_dir: get("REPO_DIR"),
            no_push: get("NO_PUSH"),
            latest_tag_off: get("LATEST_TAG_OFF"),
            additional_tag: get("ADDITIONAL_TAG"),
        }
    }
}

/// Values supplied by the CI platform itself rather than by the workflow
/// author.
#[derive(Debug, Clone, Default)]
pub struct CiContext {
    /// `owner/name`
    pub repository: Option<String>,
    pub sha: Option<String>,
    pub actor: Option<String>,
}

impl CiContext {
    pub fn new(
        repository: Option<String>,
        sha: Option<String>,
        actor: Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            repository: non_empty(repository),
            sha: non_empty(sha),
            actor: non_empty(actor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_inputs_are_absent() {
        let inputs = Inputs::from_lookup(lookup(&[("IMAGE_NAME", ""), ("REPO_DIR", "")]));
        assert!(inputs.image_name.is_none());
        assert!(inputs.repo_dir.is_none());
    }

    #[test]
    fn test_from_env_uses_input_prefix() {
        temp_env::with_vars(
            [
                ("INPUT_IMAGE_NAME", Some("org/image")),
                ("INPUT_NO_PUSH", Some("true")),
                ("IMAGE_NAME", Some("ignored/unprefixed")),
                ("INPUT_DOCKER_REGISTRY", None),
            ],
            || {
                let inputs = Inputs::from_env();
                assert_eq!(inputs.image_name.as_deref(), Some("org/image"));
                assert_eq!(inputs.no_push.as_deref(), Some("true"));
                assert!(inputs.docker_registry.is_none());
            },
        );
    }

    #[test]
    fn test_password_is_redacted_in_debug() {
        let inputs = Inputs::from_lookup(lookup(&[("DOCKER_PASSWORD", "hunter2")]));
        let debug = format!("{:?}", inputs);
        assert!(!debug.contains("hunter2"));
        assert_eq!(
            inputs.docker_password.as_ref().map(Secret::expose),
            Some("hunter2")
        );
    }

    #[test]
    fn test_ci_context_drops_empty_values() {
        let ctx = CiContext::new(Some("o/r".into()), Some(String::new()), None);
        assert_eq!(ctx.repository.as_deref(), Some("o/r"));
        assert!(ctx.sha.is_none());
        assert!(ctx.actor.is_none());
    }
}
