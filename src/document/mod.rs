// Document module
// Loads markdown sources, extracts front matter metadata, and derives the
// stable identity used for content-addressed ingestion

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::IndexerError;

/// Fixed namespace so identifiers stay stable across runs and machines.
static ID_NAMESPACE: LazyLock<Uuid> =
    LazyLock::new(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, b"vault-indexer"));

/// Deterministic UUIDv5 from an arbitrary name under the crate namespace.
#[inline]
pub fn stable_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&ID_NAMESPACE, name.as_bytes())
}

/// Structured metadata resolved from front matter, overrides, and path
/// heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocMetadata {
    pub title: String,
    pub doc_type: String,
    pub category: String,
    pub tags: Vec<String>,
    pub people: Vec<String>,
    pub date: Option<String>,
}

/// A source document read fresh from disk. Never mutated by the pipeline.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    /// Stable identity key: vault-relative path when available, absolute
    /// path otherwise.
    pub doc_key: String,
    /// UUIDv5 of `doc_key`.
    pub doc_id: String,
    /// Full raw text including front matter.
    pub text: String,
    /// Body text with the front matter block stripped.
    pub body: String,
    pub metadata: DocMetadata,
    pub source_mtime: String,
    /// SHA-256 of the raw text, hex encoded.
    pub content_sha: String,
}

/// Caller-supplied metadata overrides and identity settings.
#[derive(Debug, Clone, Default)]
pub struct DocumentOverrides {
    pub doc_type: Option<String>,
    pub category: Option<String>,
    pub vault_root: Option<PathBuf>,
}

impl Document {
    /// Reads and parses a document from disk.
    ///
    /// Malformed front matter degrades to empty metadata; an undecodable
    /// file is a parse error and the document is skipped by the caller.
    #[inline]
    pub fn load(path: &Path, overrides: &DocumentOverrides) -> crate::Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| IndexerError::DocumentParse {
            path: path.to_path_buf(),
            reason: format!("read failed: {e}"),
        })?;
        let text = String::from_utf8(bytes).map_err(|e| IndexerError::DocumentParse {
            path: path.to_path_buf(),
            reason: format!("not valid UTF-8: {e}"),
        })?;

        let source_mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(|t| {
                DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Secs, true)
            })
            .unwrap_or_default();

        let content_sha = format!("{:x}", Sha256::digest(text.as_bytes()));

        let (front_matter, body) = parse_front_matter(&text);
        let body = body.to_string();

        let metadata = resolve_metadata(front_matter.as_ref(), &body, path, overrides);

        let doc_key = derive_doc_key(path, overrides.vault_root.as_deref());
        let doc_id = stable_uuid(&doc_key).to_string();

        debug!(
            "Loaded document {} (doc_id={}, sha={})",
            path.display(),
            doc_id,
            &content_sha[..8.min(content_sha.len())]
        );

        Ok(Self {
            path: path.to_path_buf(),
            doc_key,
            doc_id,
            text,
            body,
            metadata,
            source_mtime,
            content_sha,
        })
    }
}

/// Splits a YAML front matter block off the document text.
///
/// Tolerates a BOM, leading whitespace, and CRLF line endings. Returns
/// `None` metadata when the block is absent or fails to parse.
#[inline]
pub fn parse_front_matter(text: &str) -> (Option<serde_yaml::Mapping>, &str) {
    let stripped = text.trim_start_matches('\u{feff}');
    let stripped = stripped.trim_start_matches([' ', '\t', '\r', '\n']);

    let mut lines = stripped.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, text);
    };
    if first.trim_end() != "---" {
        return (None, text);
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        if line.trim_end() == "---" {
            let raw = stripped.get(block_start..offset).unwrap_or_default();
            let rest = stripped.get(offset + line.len()..).unwrap_or_default();
            return match serde_yaml::from_str::<serde_yaml::Value>(raw) {
                Ok(serde_yaml::Value::Mapping(map)) => (Some(map), rest),
                Ok(_) => (None, rest),
                Err(e) => {
                    warn!("Ignoring malformed front matter: {e}");
                    (None, rest)
                }
            };
        }
        offset += line.len();
    }

    // Opening fence without a closing one: treat the whole text as body.
    (None, text)
}

/// Normalizes a front matter field into a list of strings.
///
/// Accepts a YAML sequence, a plain scalar, or a bracketed comma string
/// such as `"[a, b]"`.
fn listify(value: Option<&serde_yaml::Value>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    match value {
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => {
            let Some(s) = scalar_to_string(other) else {
                return Vec::new();
            };
            let s = s.trim();
            let s = s
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .unwrap_or(s);
            s.split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.trim().to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn fm_get<'a>(
    fm: Option<&'a serde_yaml::Mapping>,
    keys: &[&str],
) -> Option<&'a serde_yaml::Value> {
    let fm = fm?;
    keys.iter().find_map(|k| fm.get(*k))
}

fn fm_string(fm: Option<&serde_yaml::Mapping>, keys: &[&str]) -> Option<String> {
    fm_get(fm, keys)
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
}

fn resolve_metadata(
    fm: Option<&serde_yaml::Mapping>,
    body: &str,
    path: &Path,
    overrides: &DocumentOverrides,
) -> DocMetadata {
    // People and tags come strictly from front matter, with synonyms.
    let people = listify(fm_get(fm, &["attendees", "people", "participants"]));
    let tags = listify(fm_get(fm, &["tags", "tag"]));

    // Category: override, then front matter (`project` is a legacy synonym),
    // then the parent folder name.
    let category = overrides
        .category
        .clone()
        .or_else(|| fm_string(fm, &["category", "project"]))
        .unwrap_or_else(|| {
            path.parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    let doc_type = overrides
        .doc_type
        .clone()
        .or_else(|| fm_string(fm, &["type"]))
        .or_else(|| infer_type_from_front_matter(fm_string(fm, &["category", "project"]), &tags))
        .unwrap_or_else(|| infer_type_from_path(path));

    let title = guess_title(body, path);
    let date = fm_string(fm, &["date"]);

    DocMetadata {
        title,
        doc_type,
        category,
        tags,
        people,
        date,
    }
}

/// Infers the document type from front matter category and tags.
fn infer_type_from_front_matter(category: Option<String>, tags: &[String]) -> Option<String> {
    if let Some(category) = category {
        let cat = category.to_lowercase();
        if cat == "one-on-one" || cat == "one-on-ones" {
            return Some("one-on-one".to_string());
        }
        // Any category that isn't one of the other channel types is
        // assumed to describe a meeting (sync-meeting, standup, retro, ...).
        if !matches!(
            cat.as_str(),
            "email" | "emails" | "slack" | "calendar" | "cal" | "note" | "notes"
        ) {
            return Some("meeting".to_string());
        }
    }

    let tags_lower: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    let has = |wanted: &[&str]| tags_lower.iter().any(|t| wanted.contains(&t.as_str()));

    if has(&["one-on-one", "1-1", "one-on-ones"]) {
        return Some("one-on-one".to_string());
    }
    if has(&["meeting", "meetings"]) {
        return Some("meeting".to_string());
    }
    if has(&["email", "emails"]) {
        return Some("email".to_string());
    }
    if has(&["slack"]) {
        return Some("slack".to_string());
    }
    if has(&["calendar", "cal"]) {
        return Some("calendar".to_string());
    }

    None
}

/// Path-based type fallback, used when front matter is silent.
fn infer_type_from_path(path: &Path) -> String {
    let s = path.to_string_lossy().to_lowercase();
    if s.contains("/one-on-one") || s.contains("/1-1") || s.contains("/one_on_one") {
        "one-on-one".to_string()
    } else if s.contains("/meeting") {
        "meeting".to_string()
    } else if s.contains("/email") {
        "email".to_string()
    } else if s.contains("/slack") {
        "slack".to_string()
    } else if s.contains("/calendar") || s.contains("/cal/") {
        "calendar".to_string()
    } else {
        "note".to_string()
    }
}

/// First `# ` heading, else a `title:` line, else the file stem.
fn guess_title(body: &str, path: &Path) -> String {
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("# ") {
            return heading.trim().to_string();
        }
        if trimmed.to_lowercase().starts_with("title:") {
            if let Some((_, value)) = trimmed.split_once(':') {
                return value.trim().to_string();
            }
        }
    }
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Derives the stable identity key for a document path.
///
/// Paths under the vault root use the relative path so documents survive
/// vault moves and sync; everything else falls back to the absolute path.
fn derive_doc_key(path: &Path, vault_root: Option<&Path>) -> String {
    let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if let Some(root) = vault_root {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        if let Ok(rel) = resolved.strip_prefix(&root) {
            return format!("rel:{}", rel.display());
        }
    }
    resolved.display().to_string()
}

/// Collects candidate files from a mixed list of file and directory inputs.
///
/// Results are sorted and deduplicated so runs are reproducible regardless
/// of argument order or directory iteration order.
#[inline]
pub fn collect_files(inputs: &[PathBuf], recursive: bool, extensions: &[String]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    let matches_ext = |path: &Path| -> bool {
        if wanted.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy())
            .is_some_and(|ext| wanted.iter().any(|w| ext.eq_ignore_ascii_case(w)))
    };

    let mut found: BTreeSet<PathBuf> = BTreeSet::new();
    for input in inputs {
        if input.is_file() {
            if matches_ext(input) {
                found.insert(input.clone());
            }
        } else if input.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            for entry in WalkDir::new(input)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_map(std::result::Result::ok)
            {
                let path = entry.path();
                if entry.file_type().is_file() && matches_ext(path) {
                    found.insert(path.to_path_buf());
                }
            }
        } else {
            warn!("Input path does not exist, skipping: {}", input.display());
        }
    }

    found.into_iter().collect()
}
