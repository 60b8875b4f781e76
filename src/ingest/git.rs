//! Shallow-clone ingestion through libgit2

use super::{corpus, IngestError, Ingestor, RepoUrl};
use git2::build::RepoBuilder;
use git2::FetchOptions;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 8000;

/// Clones a repository into a temporary directory and flattens its text files
#[derive(Debug, Clone)]
pub struct GitIngestor {
    clone_depth: u32,
    max_file_bytes: u64,
}

impl GitIngestor {
    /// `clone_depth` of 0 fetches the full history
    pub fn new(clone_depth: u32, max_file_bytes: u64) -> Self {
        Self {
            clone_depth,
            max_file_bytes,
        }
    }
}

impl Default for GitIngestor {
    fn default() -> Self {
        Self::new(1, 1_048_576)
    }
}

/// Clone `url` into `target`, fetching at most `depth` commits.
pub fn clone_repository(url: &str, target: &Path, depth: u32) -> Result<(), IngestError> {
    info!("Cloning {} into {}", url, target.display());

    let mut fetch = FetchOptions::new();
    if depth > 0 {
        fetch.depth(i32::try_from(depth).unwrap_or(i32::MAX));
    }

    RepoBuilder::new()
        .fetch_options(fetch)
        .clone(url, target)
        .map_err(|e| IngestError::Clone {
            url: url.to_string(),
            message: e.message().to_string(),
        })?;

    info!("Clone complete: {}", target.display());
    Ok(())
}

impl Ingestor for GitIngestor {
    async fn ingest(&self, repo: &RepoUrl) -> Result<String, IngestError> {
        let workdir = tempfile::tempdir().map_err(|e| IngestError::Io {
            source: e,
            context: "Failed to create clone directory".to_string(),
        })?;
        let checkout = workdir.path().join(repo.name());

        let url = repo.clone_url().to_string();
        let name = repo.name().to_string();
        let depth = self.clone_depth;
        let max_file_bytes = self.max_file_bytes;
        let text = tokio::task::spawn_blocking(move || {
            clone_repository(&url, &checkout, depth)?;
            render_corpus(&checkout, &name, max_file_bytes)
        })
        .await
        .map_err(|e| IngestError::Io {
            source: std::io::Error::other(e),
            context: "Clone task failed".to_string(),
        })??;

        if text.is_empty() {
            return Err(IngestError::EmptyRepository {
                url: repo.clone_url().to_string(),
            });
        }

        info!("Ingested {} ({} characters)", repo, text.chars().count());
        Ok(text)
    }
}

/// Walk `root` and flatten every readable text file into one corpus.
///
/// Hidden files and anything matched by `.gitignore` are skipped, as are
/// files larger than `max_file_bytes`, binary files, and non-UTF-8 files.
/// Returns an empty string when nothing qualifies.
pub fn render_corpus(root: &Path, repo_name: &str, max_file_bytes: u64) -> Result<String, IngestError> {
    let mut files: Vec<(String, String)> = Vec::new();

    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();

        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if size > max_file_bytes {
            debug!("Skipping oversized file {}", path.display());
            continue;
        }

        let mut bytes = Vec::new();
        std::fs::File::open(path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| IngestError::Io {
                source: e,
                context: format!("Failed to read {}", path.display()),
            })?;

        let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
        if sniff.contains(&0) {
            debug!("Skipping binary file {}", path.display());
            continue;
        }
        let Ok(contents) = String::from_utf8(bytes) else {
            debug!("Skipping non-UTF-8 file {}", path.display());
            continue;
        };

        let relative = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        files.push((relative, contents));
    }

    if files.iter().all(|(_, contents)| contents.trim().is_empty()) {
        return Ok(String::new());
    }

    let paths: Vec<String> = files.iter().map(|(p, _)| p.clone()).collect();
    let mut out = String::new();
    corpus::write_tree(&mut out, repo_name, &paths);
    for (path, contents) in &files {
        corpus::write_file_section(&mut out, path, contents);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_corpus_labels_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("README.md"), "# Demo\n").unwrap();
        std::fs::write(temp.path().join("src/lib.rs"), "pub fn add() {}\n").unwrap();

        let text = render_corpus(temp.path(), "demo", 1024).unwrap();
        let sections = corpus::file_sections(&text);
        let paths: Vec<&str> = sections.iter().map(|s| s.path.as_str()).collect();

        assert_eq!(paths, vec!["README.md", "src/lib.rs"]);
        assert!(text.contains("pub fn add() {}"));
        assert!(text.starts_with("Directory structure:"));
    }

    #[test]
    fn test_render_corpus_skips_binary_hidden_and_large() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("blob.bin"), [0u8, 1, 2, 3]).unwrap();
        std::fs::write(temp.path().join(".env"), "SECRET=1\n").unwrap();
        std::fs::write(temp.path().join("big.txt"), "x".repeat(2048)).unwrap();
        std::fs::write(temp.path().join("ok.txt"), "fine\n").unwrap();

        let text = render_corpus(temp.path(), "demo", 1024).unwrap();
        let sections = corpus::file_sections(&text);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path, "ok.txt");
        assert!(!text.contains("SECRET"));
    }

    #[test]
    fn test_clone_failure_reports_url() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("no-such-repo");
        let url = format!("file://{}", missing.display());

        let err = clone_repository(&url, &temp.path().join("checkout"), 1).unwrap_err();
        match err {
            IngestError::Clone { url: reported, .. } => assert_eq!(reported, url),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_render_corpus_skips_unreadable_directories() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let locked = temp.path().join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("inner.txt"), "hidden away\n").unwrap();
        std::fs::write(temp.path().join("ok.txt"), "fine\n").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let result = render_corpus(temp.path(), "demo", 1024);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        let text = result.unwrap();
        assert!(text.contains("fine"));
    }

    #[test]
    fn test_render_corpus_empty_repository() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("empty.txt"), "   \n").unwrap();

        let text = render_corpus(temp.path(), "demo", 1024).unwrap();
        assert!(text.is_empty());
    }
}
