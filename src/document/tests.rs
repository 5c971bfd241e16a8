use super::*;
use std::fs;
use tempfile::TempDir;

fn write_doc(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent dirs");
    }
    fs::write(&path, content).expect("should write test doc");
    path
}

#[test]
fn front_matter_basic() {
    let text = "---\ncategory: sync-meeting\ntags: [planning, q3]\nattendees:\n  - Alice\n  - Bob\ndate: 2025-10-24\n---\n# Weekly Sync\n\nNotes body.\n";
    let (fm, body) = parse_front_matter(text);
    let fm = fm.expect("front matter should parse");

    assert_eq!(
        fm.get("category").and_then(|v| v.as_str()),
        Some("sync-meeting")
    );
    assert!(body.starts_with("# Weekly Sync"));
}

#[test]
fn front_matter_tolerates_bom_and_crlf() {
    let text = "\u{feff}  \r\n---\r\ncategory: email\r\n---\r\nBody text\r\n";
    let (fm, body) = parse_front_matter(text);
    let fm = fm.expect("front matter should parse despite BOM/CRLF");

    assert_eq!(fm.get("category").and_then(|v| v.as_str()), Some("email"));
    assert!(body.contains("Body text"));
}

#[test]
fn malformed_front_matter_degrades_to_none() {
    let text = "---\n: : definitely not yaml [\n---\nBody survives.\n";
    let (fm, body) = parse_front_matter(text);

    assert!(fm.is_none());
    assert!(body.contains("Body survives."));
}

#[test]
fn missing_front_matter_returns_full_text() {
    let text = "# Just a heading\n\nNo metadata here.\n";
    let (fm, body) = parse_front_matter(text);

    assert!(fm.is_none());
    assert_eq!(body, text);
}

#[test]
fn unterminated_front_matter_is_body() {
    let text = "---\ncategory: meeting\nno closing fence\n";
    let (fm, body) = parse_front_matter(text);

    assert!(fm.is_none());
    assert_eq!(body, text);
}

#[test]
fn listify_accepts_sequences_and_comma_strings() {
    let yaml: serde_yaml::Mapping =
        serde_yaml::from_str("seq: [a, b]\nplain: one, two\nbracket: \"[x, y]\"\nempty: \"\"")
            .expect("should parse yaml");

    assert_eq!(listify(yaml.get("seq")), vec!["a", "b"]);
    assert_eq!(listify(yaml.get("plain")), vec!["one", "two"]);
    assert_eq!(listify(yaml.get("bracket")), vec!["x", "y"]);
    assert!(listify(yaml.get("empty")).is_empty());
    assert!(listify(yaml.get("missing")).is_empty());
}

#[test]
fn people_synonyms_resolve() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_doc(
        &dir,
        "meetings/standup.md",
        "---\nparticipants: [Alice, Bob]\ntag: standup\n---\n# Standup\n",
    );

    let doc =
        Document::load(&path, &DocumentOverrides::default()).expect("should load document");

    assert_eq!(doc.metadata.people, vec!["Alice", "Bob"]);
    assert_eq!(doc.metadata.tags, vec!["standup"]);
}

#[test]
fn type_inference_chain() {
    let dir = TempDir::new().expect("should create TempDir");

    // Category that is not a known channel implies a meeting.
    let path = write_doc(&dir, "a.md", "---\ncategory: retro\n---\nBody\n");
    let doc = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_eq!(doc.metadata.doc_type, "meeting");

    // Explicit type field wins over inference.
    let path = write_doc(&dir, "b.md", "---\ntype: email\ncategory: retro\n---\nBody\n");
    let doc = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_eq!(doc.metadata.doc_type, "email");

    // Tag-based inference.
    let path = write_doc(&dir, "c.md", "---\ntags: [1-1]\n---\nBody\n");
    let doc = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_eq!(doc.metadata.doc_type, "one-on-one");

    // Path heuristic as a last resort.
    let path = write_doc(&dir, "one-on-one/d.md", "Body only\n");
    let doc = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_eq!(doc.metadata.doc_type, "one-on-one");

    // Caller override beats everything.
    let overrides = DocumentOverrides {
        doc_type: Some("slack".to_string()),
        ..DocumentOverrides::default()
    };
    let doc = Document::load(&path, &overrides).expect("should load");
    assert_eq!(doc.metadata.doc_type, "slack");
}

#[test]
fn category_falls_back_to_parent_folder() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_doc(&dir, "meetings/sync.md", "No front matter\n");

    let doc =
        Document::load(&path, &DocumentOverrides::default()).expect("should load document");

    assert_eq!(doc.metadata.category, "meetings");
}

#[test]
fn title_from_heading_then_stem() {
    let dir = TempDir::new().expect("should create TempDir");

    let path = write_doc(&dir, "notes.md", "intro line\n# Real Title\nmore\n");
    let doc = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_eq!(doc.metadata.title, "Real Title");

    let path = write_doc(&dir, "2025-10-24 - AWS PM.md", "no heading\n");
    let doc = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_eq!(doc.metadata.title, "2025-10-24 - AWS PM");
}

#[test]
fn doc_id_stable_and_vault_relative()
{
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_doc(&dir, "vault/meetings/sync.md", "content\n");

    let overrides = DocumentOverrides {
        vault_root: Some(dir.path().join("vault")),
        ..DocumentOverrides::default()
    };

    let first = Document::load(&path, &overrides).expect("should load");
    let second = Document::load(&path, &overrides).expect("should load");
    assert_eq!(first.doc_id, second.doc_id);
    assert_eq!(first.doc_key, "rel:meetings/sync.md");

    // Without a vault root the key is the absolute path, so the id differs.
    let absolute = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    assert_ne!(absolute.doc_id, first.doc_id);
    assert!(absolute.doc_key.ends_with("sync.md"));
}

#[test]
fn content_hash_tracks_content() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = write_doc(&dir, "a.md", "version one\n");

    let before = Document::load(&path, &DocumentOverrides::default()).expect("should load");
    fs::write(&path, "version two\n").expect("should rewrite");
    let after = Document::load(&path, &DocumentOverrides::default()).expect("should load");

    assert_ne!(before.content_sha, after.content_sha);
    assert_eq!(before.doc_id, after.doc_id);
}

#[test]
fn load_rejects_non_utf8() {
    let dir = TempDir::new().expect("should create TempDir");
    let path = dir.path().join("binary.md");
    fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).expect("should write bytes");

    let err = Document::load(&path, &DocumentOverrides::default())
        .expect_err("non-UTF-8 input should fail to parse");
    assert!(matches!(err, IndexerError::DocumentParse { .. }));
}

#[test]
fn collect_files_filters_and_sorts() {
    let dir = TempDir::new().expect("should create TempDir");
    write_doc(&dir, "b.md", "b");
    write_doc(&dir, "a.md", "a");
    write_doc(&dir, "skip.rs", "code");
    write_doc(&dir, "nested/c.MD", "c");
    write_doc(&dir, "nested/d.txt", "d");

    let exts = vec!["md".to_string(), "txt".to_string()];

    let shallow = collect_files(&[dir.path().to_path_buf()], false, &exts);
    assert_eq!(
        shallow
            .iter()
            .map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect::<Vec<_>>(),
        vec![
            Some("a.md".to_string()),
            Some("b.md".to_string())
        ]
    );

    let deep = collect_files(&[dir.path().to_path_buf()], true, &exts);
    assert_eq!(deep.len(), 4, "recursive walk should include nested files");

    // A file passed directly is kept regardless of discovery mode.
    let single = collect_files(&[dir.path().join("a.md")], false, &exts);
    assert_eq!(single.len(), 1);
}
