//! Build plan derivation
//!
//! Turns [`Inputs`] and [`CiContext`] into the immutable [`BuildPlan`] the
//! rest of the run works from. The only side effect is reading the appendix
//! file when one is named.

use crate::error::{ConfigError, Result};
use crate::inputs::{CiContext, Inputs, Secret};
use serde::Serialize;
use std::path::PathBuf;

/// User the image is built for when the caller does not choose one, and the
/// only user hosted binder environments accept.
pub const DEFAULT_NOTEBOOK_USER: &str = "jovyan";

/// Tag pushed alongside the commit tag unless turned off.
pub const LATEST_TAG: &str = "latest";

/// Length of the commit prefix used as the primary tag.
pub const SHA_TAG_LEN: usize = 12;

/// Registry login details. Only present when both halves were supplied.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Secret,
}

/// Everything the pipeline needs, derived once per run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Raw contents of the appendix file
    pub appendix: Option<String>,
    /// Lowercase, namespace-qualified, optionally registry-prefixed, untagged
    pub image_name: String,
    pub notebook_user: String,
    pub repo_dir: String,
    /// `image_name:<sha12>`
    pub full_image_name: String,
    pub push: bool,
    pub additional_tags: Vec<String>,
    pub registry: Option<String>,
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl BuildPlan {
    /// Derive the plan.
    pub fn resolve(inputs: &Inputs, ctx: &CiContext) -> Result<Self> {
        let appendix = read_appendix(inputs.appendix_file.as_deref())?;

        let repository = ctx
            .repository
            .as_deref()
            .ok_or(ConfigError::MissingContext("GITHUB_REPOSITORY"))?;
        let repo_name = repo_name(repository)?;

        let image_name = image_name(inputs, ctx, repo_name)?;
        let notebook_user = notebook_user(inputs);

        let repo_dir = inputs
            .repo_dir
            .clone()
            .unwrap_or_else(|| format!("/home/{}", notebook_user));

        let sha = ctx
            .sha
            .as_deref()
            .ok_or(ConfigError::MissingContext("GITHUB_SHA"))?;
        let full_image_name = format!("{}:{}", image_name, short_sha(sha)?);

        let push = inputs.no_push.is_none();

        let mut additional_tags = Vec::new();
        if inputs.latest_tag_off.is_none() {
            additional_tags.push(LATEST_TAG.to_string());
        }
        if let Some(tag) = &inputs.additional_tag {
            additional_tags.push(tag.clone());
        }

        let credentials = match (&inputs.docker_username, &inputs.docker_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        let plan = Self {
            appendix,
            image_name,
            notebook_user,
            repo_dir,
            full_image_name,
            push,
            additional_tags,
            registry: inputs.docker_registry.clone(),
            credentials,
        };

        tracing::debug!(
            image = %plan.full_image_name,
            user = %plan.notebook_user,
            push = plan.push,
            "resolved build plan"
        );

        Ok(plan)
    }

    /// `image_name:tag`
    pub fn tagged(&self, tag: &str) -> String {
        format!("{}:{}", self.image_name, tag)
    }
}

fn read_appendix(path: Option<&str>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };

    std::fs::read_to_string(path)
        .map(Some)
        .map_err(|source| ConfigError::AppendixUnreadable {
            path: PathBuf::from(path),
            source,
        })
}

/// `owner/name` -> `name`
fn repo_name(repository: &str) -> Result<&str> {
    match repository.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ConfigError::InvalidRepository(repository.to_string())),
    }
}

fn image_name(inputs: &Inputs, ctx: &CiContext, repo_name: &str) -> Result<String> {
    let base = match (&inputs.image_name, &inputs.docker_username) {
        (Some(name), _) => name.clone(),
        (None, Some(username)) => format!("{}/{}", username, repo_name),
        (None, None) => {
            let actor = ctx
                .actor
                .as_deref()
                .ok_or(ConfigError::MissingContext("GITHUB_ACTOR"))?;
            format!("{}/{}", actor, repo_name)
        }
    };

    let qualified = match &inputs.docker_registry {
        Some(registry) => format!("{}/{}", registry, base),
        None => base,
    };

    Ok(qualified.to_lowercase())
}

fn notebook_user(inputs: &Inputs) -> String {
    let hosted = inputs.mybinderorg_tag.is_some() || inputs.binder_cache.is_some();
    match &inputs.notebook_user {
        Some(user) if !hosted => user.clone(),
        _ => DEFAULT_NOTEBOOK_USER.to_string(),
    }
}

fn short_sha(sha: &str) -> Result<String> {
    let len = sha.chars().count();
    if len < SHA_TAG_LEN {
        return Err(ConfigError::ShaTooShort {
            sha: sha.to_string(),
            len,
        });
    }
    Ok(sha.chars().take(SHA_TAG_LEN).collect())
}
