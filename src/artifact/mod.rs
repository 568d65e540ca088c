use anyhow::Result;
use fs_err as fs;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Downloadable code distilled from the implementation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeArtifact {
    pub file_name: String,
    pub language: String,
    pub content: String,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Both fences start a line; the closing one stands alone. The body may be empty.
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*```[\w#+.\-]*[ \t]*\r?\n((?s:.*?))^[ \t]*```[ \t]*\r?$")
            .expect("static fence pattern")
    })
}

/// Bodies of all fenced code blocks, in order of appearance. Empty blocks
/// yield empty strings.
pub fn extract_code_blocks(text: &str) -> Vec<String> {
    fence_re()
        .captures_iter(text)
        .map(|c| {
            let body = &c[1];
            let body = body.strip_suffix('\n').unwrap_or(body);
            body.strip_suffix('\r').unwrap_or(body).to_string()
        })
        .collect()
}

/// Non-blank code blocks joined by a blank line; empty when there are none.
pub fn combine_code_blocks(text: &str) -> String {
    extract_code_blocks(text)
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// File extension for a language name, `txt` when unknown. Case-insensitive.
pub fn file_extension(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "python" => "py",
        "javascript" => "js",
        "typescript" => "ts",
        "java" => "java",
        "c#" => "cs",
        "go" => "go",
        "ruby" => "rb",
        "php" => "php",
        "swift" => "swift",
        "kotlin" => "kt",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        "r" => "r",
        "rust" => "rs",
        "c++" => "cpp",
        "c" => "c",
        "scala" => "scala",
        "dart" => "dart",
        "powershell" => "ps1",
        "bash" => "sh",
        "perl" => "pl",
        _ => "txt",
    }
}

impl CodeArtifact {
    /// `None` when the implementation text has no fenced code.
    pub fn from_implementation(text: &str, language: &str) -> Option<Self> {
        let content = combine_code_blocks(text);
        if content.is_empty() {
            return None;
        }
        let slug: String = language
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
            .collect();
        let slug = if slug.is_empty() { "generated".to_string() } else { slug };
        Some(Self {
            file_name: format!("vibe_coding_{}_code.{}", slug, file_extension(language)),
            language: language.to_string(),
            content,
        })
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.content)?;
        Ok(path)
    }
}
