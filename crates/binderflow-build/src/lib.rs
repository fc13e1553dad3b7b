//! binderflow image build and publish steps
//!
//! Drives `jupyter-repo2docker` and `docker` as external tools: build the
//! image, run the repository's image tests inside it, then push the commit
//! tag and any additional tags.
//!
//! All process execution goes through [`CommandRunner`]; the `docker` and
//! `repo2docker` modules only produce [`Invocation`]s.

pub mod docker;
pub mod error;
pub mod pipeline;
pub mod repo2docker;
pub mod runner;

pub use docker::{Docker, NB_UID};
pub use error::{PipelineError, Result};
pub use image_tests::{IMAGE_TESTS_DIR, has_image_tests, test_script};
pub use pipeline::{Pipeline, RunSummary, Tools};
pub use repo2docker::{BuildRequest, Repo2Docker};
pub use runner::{CommandOutcome, CommandRunner, DryRunRunner, Invocation, SystemRunner};
