use binderflow_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("image build failed ({})", status(.code))]
    Build { code: Option<i32> },

    #[error("image tests failed ({})", status(.code))]
    Test { code: Option<i32> },

    #[error("login to {registry} failed ({}): {stderr}", status(.code))]
    Auth {
        registry: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("push of {image} failed ({})", status(.code))]
    Push { image: String, code: Option<i32> },

    #[error("tagging {source_image} as {target} failed ({})", status(.code))]
    Tag {
        source_image: String,
        target: String,
        code: Option<i32>,
    },
}

impl PipelineError {
    /// Status the process should exit with. Tool failures propagate the
    /// tool's own exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Build { code }
            | PipelineError::Test { code }
            | PipelineError::Auth { code, .. }
            | PipelineError::Push { code, .. }
            | PipelineError::Tag { code, .. } => code.filter(|c| *c != 0).unwrap_or(1),
            PipelineError::Config(_) | PipelineError::Spawn { .. } => 1,
        }
    }
}

fn status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_propagates_tool_status() {
        assert_eq!(PipelineError::Build { code: Some(3) }.exit_code(), 3);
        assert_eq!(PipelineError::Test { code: None }.exit_code(), 1);
        assert_eq!(
            PipelineError::Config(ConfigError::MissingContext("GITHUB_SHA")).exit_code(),
            1
        );
    }

    #[test]
    fn test_messages() {
        let err = PipelineError::Push {
            image: "a/b:1".into(),
            code: Some(1),
        };
        assert_eq!(err.to_string(), "push of a/b:1 failed (exit code 1)");

        let err = PipelineError::Build { code: None };
        assert_eq!(err.to_string(), "image build failed (terminated by signal)");
    }
}
