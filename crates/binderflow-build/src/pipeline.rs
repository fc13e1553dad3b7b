//! Build, test and publish sequence
//!
//! Steps run strictly one after another: pull the previous image, log in,
//! build, test, push. Every step except the cache pull and the secondary tag
//! pushes stops the run on failure.

use crate::docker::{Docker, NB_UID};
use crate::error::{PipelineError, Result};
use crate::image_tests::{IMAGE_TESTS_DIR, has_image_tests, test_script};
use crate::repo2docker::{BuildRequest, Repo2Docker};
use crate::runner::{CommandOutcome, CommandRunner, Invocation};
use binderflow_config::{BuildPlan, Credentials};
use std::path::PathBuf;
use std::sync::Arc;

/// External tools the pipeline drives.
#[derive(Debug, Clone, Default)]
pub struct Tools {
    pub docker: Docker,
    pub repo2docker: Repo2Docker,
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub built: String,
    pub tested: bool,
    pub pushed: Vec<String>,
    /// Secondary tags whose push failed without failing the run
    pub failed_pushes: Vec<String>,
}

/// Folds everything printed while it is alive into one CI log group.
struct LogGroup;

impl LogGroup {
    fn open(title: impl AsRef<str>) -> Self {
        println!("::group::{}", title.as_ref());
        LogGroup
    }
}

impl Drop for LogGroup {
    fn drop(&mut self) {
        println!("::endgroup::");
    }
}

pub struct Pipeline {
    plan: BuildPlan,
    source_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
    tools: Tools,
}

impl Pipeline {
    pub fn new(
        plan: BuildPlan,
        source_dir: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        tools: Tools,
    ) -> Self {
        Self {
            plan,
            source_dir: source_dir.into(),
            runner,
            tools,
        }
    }

    pub fn plan(&self) -> &BuildPlan {
        &self.plan
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary {
            built: self.plan.full_image_name.clone(),
            ..Default::default()
        };

        self.pull_previous().await;

        if self.plan.push
            && let Some(credentials) = &self.plan.credentials
        {
            self.login(credentials).await?;
        }

        {
            let _group = LogGroup::open(format!("Build {}", self.plan.full_image_name));
            self.build().await?;
        }

        if has_image_tests(&self.source_dir) {
            let _group = LogGroup::open(format!("Running image tests from {}/", IMAGE_TESTS_DIR));
            self.run_image_tests().await?;
            summary.tested = true;
        } else {
            tracing::info!(
                "No {}/ directory in {}, skipping image tests",
                IMAGE_TESTS_DIR,
                self.source_dir.display()
            );
        }

        if self.plan.push {
            let _group = LogGroup::open("Pushing images");
            self.publish(&mut summary).await?;
        } else {
            tracing::info!("Pushing disabled, not publishing {}", self.plan.full_image_name);
        }

        Ok(summary)
    }

    async fn exec(&self, invocation: &Invocation) -> Result<CommandOutcome> {
        tracing::debug!("Running: {}", invocation.display());
        self.runner
            .run(invocation)
            .await
            .map_err(|source| PipelineError::Spawn {
                program: invocation.program.clone(),
                source,
            })
    }

    /// Warm the layer cache. The tag usually does not exist on first build,
    /// so any failure is ignored.
    async fn pull_previous(&self) {
        let inv = self.tools.docker.pull(&self.plan.full_image_name);
        match self.exec(&inv).await {
            Ok(outcome) if outcome.success() => {
                tracing::info!("Pulled {} for layer cache", self.plan.full_image_name);
            }
            Ok(outcome) => {
                tracing::warn!(
                    "Could not pull {} (exit {:?}), building without it",
                    self.plan.full_image_name,
                    outcome.code
                );
            }
            Err(e) => {
                tracing::warn!("Could not pull {}: {}", self.plan.full_image_name, e);
            }
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let registry = self.plan.registry.as_deref();
        let registry_label = registry.unwrap_or("default registry").to_string();
        tracing::info!("Logging in to {} as {}", registry_label, credentials.username);

        let outcome = self
            .exec(&self.tools.docker.login(registry, credentials))
            .await?;

        if !outcome.success() {
            return Err(PipelineError::Auth {
                registry: registry_label,
                code: outcome.code,
                stderr: outcome.stderr.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn build(&self) -> Result<()> {
        let request = BuildRequest {
            notebook_user: &self.plan.notebook_user,
            repo_dir: &self.plan.repo_dir,
            image_name: &self.plan.full_image_name,
            cache_from: &self.plan.image_name,
            appendix: self.plan.appendix.as_deref(),
            source_dir: &self.source_dir,
        };

        let outcome = self.exec(&self.tools.repo2docker.build(&request)).await?;
        if !outcome.success() {
            return Err(PipelineError::Build { code: outcome.code });
        }

        tracing::info!("Built {}", self.plan.full_image_name);
        Ok(())
    }

    async fn run_image_tests(&self) -> Result<()> {
        let script = test_script(IMAGE_TESTS_DIR);
        let inv = self.tools.docker.run_script(
            NB_UID,
            &self.plan.repo_dir,
            &self.plan.full_image_name,
            &script,
        );

        let outcome = self.exec(&inv).await?;
        if !outcome.success() {
            return Err(PipelineError::Test { code: outcome.code });
        }
        Ok(())
    }

    /// Push the commit tag, then alias and push every additional tag.
    ///
    /// A failed secondary push is only reported; the commit tag is already
    /// published at that point.
    async fn publish(&self, summary: &mut RunSummary) -> Result<()> {
        let primary = &self.plan.full_image_name;

        let outcome = self.exec(&self.tools.docker.push(primary)).await?;
        if !outcome.success() {
            return Err(PipelineError::Push {
                image: primary.clone(),
                code: outcome.code,
            });
        }
        summary.pushed.push(primary.clone());

        for tag in &self.plan.additional_tags {
            let target = self.plan.tagged(tag);

            let outcome = self.exec(&self.tools.docker.tag(primary, &target)).await?;
            if !outcome.success() {
                return Err(PipelineError::Tag {
                    source_image: primary.clone(),
                    target,
                    code: outcome.code,
                });
            }

            match self.exec(&self.tools.docker.push(&target)).await {
                Ok(outcome) if outcome.success() => summary.pushed.push(target),
                Ok(outcome) => {
                    tracing::warn!("Push of {} failed (exit {:?})", target, outcome.code);
                    summary.failed_pushes.push(target);
                }
                Err(e) => {
                    tracing::warn!("Push of {} failed: {}", target, e);
                    summary.failed_pushes.push(target);
                }
            }
        }

        Ok(())
    }
}
