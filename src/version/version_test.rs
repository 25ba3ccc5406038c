use super::*;
use tempfile::TempDir;

fn tags(raw: &[&str]) -> Vec<VersionTag> {
    raw.iter().map(|s| VersionTag::parse(s).unwrap()).collect()
}

#[test]
fn test_grammar_accepts_valid_tags() {
    for raw in ["v0.1.0", "v1.2.3", "v10.20.30", "master", "c-214", "c-1"] {
        assert!(VersionTag::is_valid(raw), "{} should be valid", raw);
    }
}

#[test]
fn test_grammar_rejects_invalid_tags() {
    for raw in [
        "",
        "1.2.3",
        "v1.2",
        "v1.2.3-beta",
        "V1.2.3",
        "Master",
        "main",
        "c-",
        "c-abc",
        "c-12/..",
        "../v1.2.3",
        "favicon.ico",
    ] {
        assert!(!VersionTag::is_valid(raw), "{} should be invalid", raw);
    }
}

#[test]
fn test_kind() {
    assert_eq!(
        VersionTag::parse("v1.2.3").unwrap().kind(),
        VersionKind::Release(semver::Version::new(1, 2, 3))
    );
    assert_eq!(VersionTag::master().kind(), VersionKind::Master);
    assert_eq!(
        VersionTag::parse("c-214").unwrap().kind(),
        VersionKind::Custom(214)
    );
}

#[test]
fn test_resolve_path_wins_even_when_not_installed() {
    let available = tags(&["v0.1.0"]);
    let resolved = resolve(Some("v9.9.9"), Some("v0.1.0"), &available).unwrap();
    assert_eq!(resolved.as_str(), "v9.9.9");

    let resolved = resolve(Some("c-214"), None, &available).unwrap();
    assert_eq!(resolved.as_str(), "c-214");
}

#[test]
fn test_resolve_invalid_path_falls_through_to_cookie() {
    let available = tags(&["v0.1.0", "v0.2.0"]);
    let resolved = resolve(Some("twitter"), Some("master"), &available).unwrap();
    assert_eq!(resolved.as_str(), "master");
}

#[test]
fn test_resolve_invalid_cookie_falls_through_to_most_recent() {
    let available = tags(&["v0.1.0", "v0.3.2", "v0.2.0", "master", "c-214"]);
    let resolved = resolve(Some("nope"), Some("garbage"), &available).unwrap();
    assert_eq!(resolved.as_str(), "v0.3.2");
}

#[test]
fn test_most_recent_uses_numeric_ordering() {
    let available = tags(&["v0.9.0", "v0.10.0"]);
    assert_eq!(most_recent(&available).unwrap().as_str(), "v0.10.0");
}

#[test]
fn test_most_recent_excludes_custom_and_prefers_releases_over_master() {
    let available = tags(&["master", "c-999", "v0.1.0"]);
    assert_eq!(most_recent(&available).unwrap().as_str(), "v0.1.0");

    let available = tags(&["master", "c-999"]);
    assert_eq!(most_recent(&available).unwrap().as_str(), "master");

    let available = tags(&["c-999"]);
    assert!(most_recent(&available).is_none());
}

#[test]
fn test_resolve_without_versions_fails() {
    let result = resolve(None, None, &[]);
    assert!(matches!(result, Err(ConsoleError::NoVersionsAvailable)));
}

#[test]
fn test_layout_lists_installed_versions_in_display_order() {
    let temp = TempDir::new().unwrap();
    let layout = VersionLayout::new(temp.path());
    for name in ["v0.1.0", "master", "c-7", "v0.2.0", "not-a-version", "c-3"] {
        std::fs::create_dir_all(layout.releases_dir().join(name)).unwrap();
    }
    std::fs::write(layout.releases_dir().join("v9.9.9"), b"a file, not a dir").unwrap();

    let installed: Vec<String> = layout
        .installed()
        .unwrap()
        .into_iter()
        .map(String::from)
        .collect();

    assert_eq!(installed, vec!["v0.2.0", "v0.1.0", "master", "c-3", "c-7"]);
}

#[test]
fn test_layout_without_releases_dir_is_empty() {
    let temp = TempDir::new().unwrap();
    let layout = VersionLayout::new(temp.path().join("missing"));
    assert!(layout.installed().unwrap().is_empty());
}

#[test]
fn test_version_tag_serde() {
    let tag: VersionTag = serde_json::from_str("\"v1.0.0\"").unwrap();
    assert_eq!(tag.as_str(), "v1.0.0");
    assert!(serde_json::from_str::<VersionTag>("\"1.0.0\"").is_err());
}
