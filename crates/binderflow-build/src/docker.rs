//! docker CLI invocations

use crate::runner::Invocation;
use binderflow_config::Credentials;

/// Numeric uid the image user is created with and the tests run as.
pub const NB_UID: u32 = 1000;

/// Builds `docker` command lines.
#[derive(Debug, Clone)]
pub struct Docker {
    program: String,
}

impl Default for Docker {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl Docker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Invocation {
        Invocation::new(&self.program)
    }

    /// `docker login [registry] -u <user> --password-stdin`
    ///
    /// The password travels over stdin so it never appears in a process
    /// listing. Without a registry docker logs in to its default one.
    pub fn login(&self, registry: Option<&str>, credentials: &Credentials) -> Invocation {
        let mut inv = self.command().arg("login");
        if let Some(registry) = registry {
            inv = inv.arg(registry);
        }
        inv.args(["-u", credentials.username.as_str(), "--password-stdin"])
            .stdin(credentials.password.clone())
            .captured()
    }

    pub fn pull(&self, image: &str) -> Invocation {
        self.command().args(["pull", image])
    }

    pub fn push(&self, image: &str) -> Invocation {
        self.command().args(["push", image])
    }

    pub fn tag(&self, source: &str, target: &str) -> Invocation {
        self.command().args(["tag", source, target])
    }

    /// `docker run -u <uid> -w <workdir> <image> /bin/bash -c <script>`
    pub fn run_script(&self, uid: u32, workdir: &str, image: &str, script: &str) -> Invocation {
        self.command()
            .args(["run", "-u"])
            .arg(uid.to_string())
            .args(["-w", workdir, image, "/bin/bash", "-c", script])
    }
}
