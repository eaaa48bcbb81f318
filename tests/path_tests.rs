// tests/path_tests.rs

use ogree_cli::path::{self, SELECTION, resolve};
use pretty_assertions::assert_eq;

#[test]
fn test_relative_paths() {
    assert_eq!(resolve("R1", "/Physical/S/B/R", "/"), "/Physical/S/B/R/R1");
    assert_eq!(resolve("./R1/", "/Physical/S", "/"), "/Physical/S/R1");
    assert_eq!(resolve("../..", "/Physical/S/B/R", "/"), "/Physical/S");
}

#[test]
fn test_parent_never_goes_above_root() {
    assert_eq!(resolve("../../..", "/Physical", "/"), "/");
}

#[test]
fn test_namespace_abbreviations() {
    assert_eq!(resolve("/P/S", "/", "/"), "/Physical/S");
    assert_eq!(resolve("/L/Tags", "/", "/"), "/Logical/Tags");
    assert_eq!(resolve("/O/Domain", "/", "/"), "/Organisation/Domain");
    // only the first segment is expanded
    assert_eq!(resolve("/Physical/P", "/", "/"), "/Physical/P");
    assert_eq!(resolve("S", "/P", "/"), "/Physical/S");
}

#[test]
fn test_special_paths() {
    assert_eq!(resolve("", "/Physical", "/"), "/Physical");
    assert_eq!(resolve("_", "/Physical", "/"), SELECTION);
    assert_eq!(resolve("-", "/Physical", "/Logical"), "/Logical");
}

#[test]
fn test_join_and_namespaces() {
    assert_eq!(path::join("/", "Physical"), "/Physical");
    assert_eq!(path::join("/Logical/Tags", "red"), "/Logical/Tags/red");
    assert!(path::is_namespace(path::STRAY));
    assert!(!path::is_namespace("/Physical/S"));
}
