use gix::ObjectId;
use std::fmt;

/// A remote repository to scan, as produced by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDescriptor {
    pub url: String,
    /// Logical name, used for the clone directory and skip lists
    pub name: String,
}

impl RepositoryDescriptor {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }

    /// Build a descriptor whose name is the URL basename without `.git`
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = repo_name_from_url(&url);
        Self { url, name }
    }
}

fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let base = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    let base = base.strip_suffix(".git").unwrap_or(base);
    if base.is_empty() {
        "repo".to_string()
    } else {
        base.to_string()
    }
}

/// Identifier of a commit within one repository
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(pub ObjectId);

impl CommitId {
    pub fn from_git2(oid: git2::Oid) -> Option<Self> {
        ObjectId::try_from(oid.as_bytes()).ok().map(Self)
    }

    pub fn to_git2(self) -> Option<git2::Oid> {
        git2::Oid::from_bytes(self.0.as_bytes()).ok()
    }

    /// First 8 hex characters, for log lines
    pub fn short(&self) -> String {
        let hex = self.0.to_hex().to_string();
        hex[..8.min(hex.len())].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}
