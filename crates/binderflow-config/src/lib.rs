//! Configuration for binderflow
//!
//! Reads action inputs and CI context once and derives the [`BuildPlan`]
//! every later step works from.

pub mod error;
pub mod inputs;
pub mod plan;

pub use error::{ConfigError, Result};
pub use inputs::{CiContext, INPUT_PREFIX, Inputs, Secret};
pub use plan::{BuildPlan, Credentials, DEFAULT_NOTEBOOK_USER, LATEST_TAG, SHA_TAG_LEN};
