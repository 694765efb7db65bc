// tests/patterns.rs

use std::error::Error;
use std::path::{Path, PathBuf};

use stagewatch::fs::mock::MockFileSystem;
use stagewatch::watch::path_utils::relative_str;
use stagewatch::watch::{SourcePattern, collect_matching_files};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn base_is_the_literal_prefix() -> TestResult {
    assert_eq!(SourcePattern::parse("css/src/**/*.scss")?.base(), Path::new("css/src"));
    assert_eq!(SourcePattern::parse("./js/src/*.js")?.base(), Path::new("js/src"));
    assert_eq!(SourcePattern::parse("*.md")?.base(), Path::new(""));
    assert_eq!(SourcePattern::parse("assets/{img,font}/*")?.base(), Path::new("assets"));
    Ok(())
}

#[test]
fn literal_pattern_uses_parent_as_base() -> TestResult {
    let pattern = SourcePattern::parse("js/src/main.js")?;
    assert_eq!(pattern.base(), Path::new("js/src"));
    assert!(pattern.matches("js/src/main.js"));
    Ok(())
}

#[test]
fn single_star_does_not_cross_directories() -> TestResult {
    let pattern = SourcePattern::parse("src/*.scss")?;
    assert!(pattern.matches("src/a.scss"));
    assert!(!pattern.matches("src/partials/_b.scss"));

    let deep = SourcePattern::parse("src/**/*.scss")?;
    assert!(deep.matches("src/a.scss"));
    assert!(deep.matches("src/partials/_b.scss"));
    assert!(!deep.matches("lib/a.scss"));
    Ok(())
}

#[test]
fn collects_matching_files_sorted() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/src/b.js", "");
    fs.add_file("/p/src/a.js", "");
    fs.add_file("/p/src/nested/c.js", "");
    fs.add_file("/p/src/readme.md", "");

    let pattern = SourcePattern::parse("src/**/*.js")?;
    let files = collect_matching_files(&fs, Path::new("/p"), &pattern)?;

    assert_eq!(
        files,
        vec![
            PathBuf::from("/p/src/a.js"),
            PathBuf::from("/p/src/b.js"),
            PathBuf::from("/p/src/nested/c.js"),
        ]
    );
    Ok(())
}

#[test]
fn missing_base_directory_is_an_error() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/p/other/a.js", "");
    let pattern = SourcePattern::parse("src/*.js")?;
    assert!(collect_matching_files(&fs, Path::new("/p"), &pattern).is_err());
    Ok(())
}

#[test]
fn relative_str_handles_dot_roots() {
    assert_eq!(
        relative_str(Path::new("."), Path::new("./src/a.js")).as_deref(),
        Some("src/a.js")
    );
    assert_eq!(
        relative_str(Path::new("/p"), Path::new("/p/css/x.scss")).as_deref(),
        Some("css/x.scss")
    );
    assert_eq!(relative_str(Path::new("/p"), Path::new("/elsewhere/x")), None);
}
