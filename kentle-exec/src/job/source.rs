use std::path::PathBuf;

use secrecy::SecretString;

/// Where the engine loads the transformation from.
#[derive(Debug, Clone)]
pub enum JobSource {
    File { path: PathBuf },
    Repository(RepositoryLocation),
}

impl JobSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        JobSource::File { path: path.into() }
    }

    /// Short phrase naming where the transformation comes from.
    pub fn origin(&self) -> String {
        match self {
            JobSource::File { .. } => "from file system".to_string(),
            JobSource::Repository(repo) => format!("from repository {}", repo.repository),
        }
    }
}

impl std::fmt::Display for JobSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobSource::File { path } => write!(f, "{}", path.display()),
            JobSource::Repository(repo) => f.write_str(&repo.transformation),
        }
    }
}

/// A transformation stored in a Kettle repository.
///
/// `Debug` never shows the password.
#[derive(Debug, Clone)]
pub struct RepositoryLocation {
    pub repository: String,
    pub directory: String,
    pub transformation: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}
