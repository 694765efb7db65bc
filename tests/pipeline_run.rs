// tests/pipeline_run.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stagewatch::config::ConfigFile;
use stagewatch::fs::mock::MockFileSystem;
use stagewatch::pipeline::{PipelineRegistry, RunResult};
use stagewatch::types::DiagnosticKind;
use stagewatch_test_utils::builders::{
    ConfigFileBuilder, TaskConfigBuilder, compact_stage, lint_stage, rename_stage,
    sourcemap_stage,
};
use stagewatch_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

const ROOT: &str = "/proj";

fn styles_config() -> ConfigFile {
    ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(compact_stage())
                .stage(rename_stage("css"))
                .build(),
        )
        .build()
}

fn registry(cfg: &ConfigFile, fs: &MockFileSystem) -> Result<PipelineRegistry, Box<dyn Error>> {
    Ok(PipelineRegistry::from_config(cfg, Arc::new(fs.clone()), ROOT)?)
}

fn p(rel: &str) -> PathBuf {
    Path::new(ROOT).join(rel)
}

#[tokio::test]
async fn styles_task_writes_passing_files_and_reports_the_broken_one() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.scss"), "a {\n  color: red; /* note */\n}\n");
    fs.add_file(p("src/b.scss"), "b { color: blue; }\n/* never closed\n");
    fs.add_file(p("src/c.scss"), "\n\nc { margin: 0; }\n");

    let registry = registry(&styles_config(), &fs)?;
    let result = registry.run_task("styles").await?;

    assert_eq!(result.written, vec![p("dist/a.css"), p("dist/c.css")]);
    assert_eq!(result.diagnostics.len(), 1);
    let diag = &result.diagnostics[0];
    assert_eq!(diag.kind, DiagnosticKind::CompileError);
    assert_eq!(diag.path, p("src/b.scss"));
    assert_eq!(diag.line, Some(2));
    assert_eq!(result.exit_code(), 1);

    assert_eq!(fs.contents(p("dist/a.css")).as_deref(), Some("a {\ncolor: red;\n}\n"));
    assert_eq!(fs.contents(p("dist/c.css")).as_deref(), Some("c { margin: 0; }\n"));
    assert!(fs.contents(p("dist/b.css")).is_none());
    Ok(())
}

#[tokio::test]
async fn one_failing_file_does_not_block_siblings() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    for i in 0..20 {
        let body = if i == 7 {
            "x { /* open".to_string()
        } else {
            format!("f{i} {{}}\n")
        };
        fs.add_file(p(&format!("src/f{i:02}.scss")), body);
    }

    let cfg = ConfigFileBuilder::new()
        .workers(4)
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(compact_stage())
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("styles").await?;

    assert_eq!(result.written.len(), 19);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].path, p("src/f07.scss"));

    let mut sorted = result.written.clone();
    sorted.sort();
    assert_eq!(sorted, result.written);
    Ok(())
}

#[tokio::test]
async fn outputs_keep_the_path_below_the_glob_base() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("js/src/main.js"), "main();\n");
    fs.add_file(p("js/src/lib/util.js"), "util();\n");
    fs.add_file(p("js/src/lib/notes.txt"), "ignored\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("scripts", "js/src/**/*.js", "js/dist")
                .stage(compact_stage())
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("scripts").await?;

    assert!(result.is_success());
    assert_eq!(
        result.written,
        vec![p("js/dist/lib/util.js"), p("js/dist/main.js")]
    );
    Ok(())
}

#[tokio::test]
async fn last_declared_extension_wins() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.ts"), "let a = 1;\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("ts", "src/*.ts", "out")
                .stage(rename_stage("js"))
                .stage(compact_stage())
                .stage(rename_stage(".mjs"))
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("ts").await?;

    assert_eq!(result.written, vec![p("out/a.mjs")]);
    Ok(())
}

#[tokio::test]
async fn rerunning_on_unchanged_inputs_is_byte_identical() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.scss"), "a { }\n/* c */\n");
    fs.add_file(p("src/b.scss"), "b { }\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(compact_stage())
                .stage(sourcemap_stage())
                .stage(rename_stage("css"))
                .build(),
        )
        .build();
    let registry = registry(&cfg, &fs)?;

    let first: RunResult = registry.run_task("styles").await?;
    let snapshot: Vec<Option<String>> = first.written.iter().map(|w| fs.contents(w)).collect();

    let second = registry.run_task("styles").await?;
    let again: Vec<Option<String>> = second.written.iter().map(|w| fs.contents(w)).collect();

    assert_eq!(first, second);
    assert_eq!(snapshot, again);
    Ok(())
}

#[tokio::test]
async fn sourcemap_is_written_next_to_the_output() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/app.scss"), "a { }\nb { }\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(sourcemap_stage())
                .stage(rename_stage("css"))
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("styles").await?;

    assert_eq!(
        result.written,
        vec![p("dist/app.css"), p("dist/app.css.map")]
    );

    let css = fs.contents(p("dist/app.css")).ok_or("missing css")?;
    assert_eq!(css, "a { }\nb { }\n/*# sourceMappingURL=app.css.map */\n");

    let map: serde_json::Value =
        serde_json::from_str(&fs.contents(p("dist/app.css.map")).ok_or("missing map")?)?;
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "app.css");
    assert_eq!(map["sources"][0], "app.scss");
    assert_eq!(map["mappings"], "AAAA;AACA");
    Ok(())
}

#[tokio::test]
async fn write_failure_is_an_io_diagnostic() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.scss"), "a { }\n");
    fs.fail_writes_under(p("dist"));

    let result = registry(&styles_config(), &fs)?.run_task("styles").await?;

    assert!(result.written.is_empty());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::IoError);
    assert_eq!(result.diagnostics[0].stage, "write");
    Ok(())
}

#[tokio::test]
async fn missing_glob_base_still_returns_a_result() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("other/a.scss"), "a { }\n");

    let result = registry(&styles_config(), &fs)?.run_task("styles").await?;

    assert_eq!(result.task, "styles");
    assert!(result.written.is_empty());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::IoError);
    assert_eq!(result.diagnostics[0].path, p("src"));
    Ok(())
}

#[tokio::test]
async fn lint_failure_skips_later_stages_for_that_file() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/ok.scss"), "a { color: red; }\n");
    fs.add_file(p("src/bad.scss"), "a { color: red !important; }\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(lint_stage(&[("!important", "avoid !important")]))
                .stage(rename_stage("css"))
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("styles").await?;

    assert_eq!(result.written, vec![p("dist/ok.css")]);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::LintError);
    assert_eq!(result.diagnostics[0].stage, "lint");
    assert_eq!(result.diagnostics[0].message, "line 1: avoid !important");
    Ok(())
}

#[tokio::test]
async fn unknown_task_never_runs() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.scss"), "a { }\n");

    let err = registry(&styles_config(), &fs)?
        .run_task("scripts")
        .await
        .expect_err("unknown task must fail");

    assert!(err.to_string().contains("scripts"));
    assert_eq!(fs.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn outputs_inside_the_source_glob_are_not_read_back() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("js/main.js"), "main();\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("scripts", "js/**/*.js", "js/dist")
                .stage(compact_stage())
                .build(),
        )
        .build();
    let registry = registry(&cfg, &fs)?;

    let first = registry.run_task("scripts").await?;
    let second = registry.run_task("scripts").await?;

    assert_eq!(first.written, vec![p("js/dist/main.js")]);
    assert_eq!(first, second);
    assert!(fs.contents(p("js/dist/dist/main.js")).is_none());

    let profiles = registry.watch_profiles();
    assert!(profiles[0].matches("js/main.js"));
    assert!(!profiles[0].matches("js/dist/main.js"));
    Ok(())
}

#[tokio::test]
async fn failed_output_write_leaves_no_sourcemap_behind() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.scss"), "a { }\n");
    fs.add_file(p("src/b.scss"), "b { }\n");
    fs.fail_writes_under(p("dist/a.css"));

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(sourcemap_stage())
                .stage(rename_stage("css"))
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("styles").await?;

    assert_eq!(result.written, vec![p("dist/b.css"), p("dist/b.css.map")]);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, DiagnosticKind::IoError);
    assert_eq!(result.diagnostics[0].path, p("dist/a.css"));
    assert!(fs.contents(p("dist/a.css.map")).is_none());
    Ok(())
}

#[tokio::test]
async fn failed_sourcemap_write_drops_the_file_from_written() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.scss"), "a { }\n");
    fs.fail_writes_under(p("dist/a.css.map"));

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*.scss", "dist")
                .stage(sourcemap_stage())
                .stage(rename_stage("css"))
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("styles").await?;

    assert!(result.written.is_empty());
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].path, p("dist/a.css.map"));
    Ok(())
}

#[tokio::test]
async fn sources_sharing_an_output_are_reported() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file(p("src/a.css"), "from css\n");
    fs.add_file(p("src/a.scss"), "from scss\n");

    let cfg = ConfigFileBuilder::new()
        .with_task(
            TaskConfigBuilder::new("styles", "src/*", "dist")
                .stage(rename_stage("css"))
                .build(),
        )
        .build();
    let result = registry(&cfg, &fs)?.run_task("styles").await?;

    // Sorted order decides: `a.css` sorts before `a.scss`.
    assert_eq!(result.written, vec![p("dist/a.css")]);
    assert_eq!(fs.contents(p("dist/a.css")).as_deref(), Some("from css\n"));
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].path, p("src/a.scss"));
    assert!(result.diagnostics[0].message.contains("already produced by"));
    Ok(())
}
