use gqlcheck::config::{SchemaFormat, SchemaSource, load_token};
use std::fs;

#[test]
fn load_token_trims_whitespace() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("token");
    fs::write(&p, "  test_token\n").unwrap();
    assert_eq!(load_token(&p).unwrap(), "test_token");
}

#[test]
fn load_token_rejects_empty_file() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("token");
    fs::write(&p, "\n").unwrap();
    assert!(load_token(&p).is_err());
}

#[test]
fn load_token_fails_for_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(load_token(&tmp.path().join("absent")).is_err());
}

#[test]
fn auto_format_sniffs_json_captures() {
    assert_eq!(
        SchemaSource::from_text("  {\"data\": {}}".into(), SchemaFormat::Auto),
        SchemaSource::Introspection("  {\"data\": {}}".into())
    );
    assert_eq!(
        SchemaSource::from_text("type Query { a: Int }".into(), SchemaFormat::Auto),
        SchemaSource::Sdl("type Query { a: Int }".into())
    );
    assert_eq!(
        SchemaSource::from_text("{ not sdl }".into(), SchemaFormat::Sdl),
        SchemaSource::Sdl("{ not sdl }".into())
    );
}
