//! jupyter-repo2docker invocation

use crate::docker::NB_UID;
use crate::runner::Invocation;
use std::path::Path;

/// What to build and how to tag it.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub notebook_user: &'a str,
    pub repo_dir: &'a str,
    /// Tag of the produced image
    pub image_name: &'a str,
    /// Image whose layers the builder may reuse
    pub cache_from: &'a str,
    /// Extra Dockerfile instructions appended after the generated ones
    pub appendix: Option<&'a str>,
    pub source_dir: &'a Path,
}

/// Builds `jupyter-repo2docker` command lines.
#[derive(Debug, Clone)]
pub struct Repo2Docker {
    program: String,
}

impl Default for Repo2Docker {
    fn default() -> Self {
        Self::new("jupyter-repo2docker")
    }
}

impl Repo2Docker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build without running the image. The source directory is always the
    /// last argument.
    pub fn build(&self, request: &BuildRequest<'_>) -> Invocation {
        let mut inv = Invocation::new(&self.program)
            .args(["--no-run", "--user-id"])
            .arg(NB_UID.to_string())
            .args([
                "--user-name",
                request.notebook_user,
                "--target-repo-dir",
                request.repo_dir,
                "--image-name",
                request.image_name,
                "--cache-from",
                request.cache_from,
            ]);

        if let Some(appendix) = request.appendix {
            inv = inv.args(["--appendix", appendix]);
        }

        inv.arg(request.source_dir.to_string_lossy())
    }
}
