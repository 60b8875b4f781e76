//! Corpus layout shared by the ingestor (writer) and the chunker (reader)
//!
//! ```text
//! ================================================
//! FILE: src/main.rs (42 bytes)
//! ================================================
//! <contents>
//! ```
//!
//! The byte count lets the reader step over file contents, so header-like
//! lines inside a file are never taken for a section boundary.

use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

pub const SEPARATOR: &str = "================================================";

/// A file section found in a corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection {
    /// Byte offset where the header block starts
    pub start: usize,
    /// Relative path named by the header
    pub path: String,
}

/// Append one file section to `out`
pub fn write_file_section(out: &mut String, path: &str, contents: &str) {
    // Writing into a String cannot fail
    let _ = write!(
        out,
        "{SEPARATOR}\nFILE: {path} ({} bytes)\n{SEPARATOR}\n{contents}",
        contents.len()
    );
    if !contents.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
}

/// Render the leading directory listing
pub fn write_tree(out: &mut String, repo_name: &str, paths: &[String]) {
    let _ = writeln!(out, "Directory structure:\n└── {repo_name}/");
    for path in paths {
        let _ = writeln!(out, "    {path}");
    }
    out.push('\n');
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(?m)^={48}\nFILE: ([^\n]+) \((\d+) bytes\)\n={48}\n")
            .expect("file header pattern is valid")
    })
}

/// Locate every file header, in corpus order.
///
/// The first header is searched for; every later one must follow the
/// previous section's contents directly. Parsing stops at the first
/// section that does not line up.
pub fn file_sections(corpus: &str) -> Vec<FileSection> {
    let mut sections = Vec::new();
    let Some(first) = header_regex().find(corpus) else {
        return sections;
    };

    let mut pos = first.start();
    while let Some(caps) = corpus.get(pos..).and_then(|rest| header_regex().captures(rest)) {
        let (Some(whole), Some(path), Some(len)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };
        if whole.start() != 0 {
            break;
        }
        let Ok(len) = len.as_str().parse::<usize>() else {
            break;
        };

        sections.push(FileSection {
            start: pos,
            path: path.as_str().trim().to_string(),
        });

        let contents_end = pos + whole.end() + len;
        let Some(tail) = corpus.get(contents_end..) else {
            break;
        };
        pos = contents_end + (tail.len() - tail.trim_start_matches('\n').len());
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_round_trip_paths() {
        let mut corpus = String::new();
        write_tree(&mut corpus, "demo", &["a.rs".into(), "b/c.py".into()]);
        write_file_section(&mut corpus, "a.rs", "fn main() {}");
        write_file_section(&mut corpus, "b/c.py", "print('hi')\n");

        let sections = file_sections(&corpus);
        let paths: Vec<&str> = sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b/c.py"]);
        assert!(sections[0].start < sections[1].start);
        assert!(corpus[sections[1].start..].starts_with(SEPARATOR));
    }

    #[test]
    fn test_plain_text_has_no_sections() {
        assert!(file_sections("just some text\nFILE: not a header\n").is_empty());
    }

    #[test]
    fn test_header_lookalike_inside_contents_is_ignored() {
        let fake = format!("before\n{SEPARATOR}\nFILE: fake.rs (3 bytes)\n{SEPARATOR}\nabc\nafter\n");
        let mut corpus = String::new();
        write_tree(&mut corpus, "demo", &["notes.md".into(), "real.rs".into()]);
        write_file_section(&mut corpus, "notes.md", &fake);
        write_file_section(&mut corpus, "real.rs", "fn real() {}");

        let sections = file_sections(&corpus);
        let paths: Vec<&str> = sections.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["notes.md", "real.rs"]);
    }

    #[test]
    fn test_multibyte_contents_are_skipped_by_bytes() {
        let mut corpus = String::new();
        write_file_section(&mut corpus, "ünï.txt", "héllo wörld ✓");
        write_file_section(&mut corpus, "next.txt", "plain");

        let sections = file_sections(&corpus);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].path, "next.txt");
        assert!(corpus[sections[1].start..].starts_with(SEPARATOR));
    }
}
