//! Repository URL validation and the cache key derived from it

use super::IngestError;
use std::fmt;
use url::Url;

/// A validated repository location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    clone_url: String,
    key: String,
    name: String,
}

impl RepoUrl {
    /// Validate `raw` against the allowed hosts and normalize it.
    ///
    /// Accepts `http(s)://host/owner/repo[.git][/anything]`. The key is
    /// `host/owner/repo` in lowercase, so different spellings of the same
    /// repository share one index.
    pub fn parse(raw: &str, allowed_hosts: &[String]) -> Result<Self, IngestError> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| IngestError::InvalidUrl {
            url: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(invalid("scheme must be http or https"));
        }

        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
        if !allowed_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
            return Err(IngestError::HostNotAllowed {
                host,
                allowed: allowed_hosts.to_vec(),
            });
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 2 {
            return Err(invalid("expected a path of the form /owner/repo"));
        }

        let owner = segments[0];
        let name = segments[1].strip_suffix(".git").unwrap_or(segments[1]);
        if name.is_empty() {
            return Err(invalid("empty repository name"));
        }

        Ok(Self {
            clone_url: format!("https://{host}/{owner}/{name}"),
            key: format!("{host}/{owner}/{name}").to_lowercase(),
            name: name.to_string(),
        })
    }

    /// URL handed to `git clone`
    pub fn clone_url(&self) -> &str {
        &self.clone_url
    }

    /// Normalized identity used as the index cache key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Repository name without owner
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clone_url)
    }
}
