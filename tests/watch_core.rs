// tests/watch_core.rs

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;

use stagewatch::engine::{
    CoreCommand, RuntimeEvent, RuntimeOptions, WatchCore, WatchEvent, WatchState,
};
use stagewatch::pipeline::RunResult;
use stagewatch::types::ChangeKind;
use stagewatch::watch::{SourcePattern, TaskWatchProfile};

type TestResult = Result<(), Box<dyn Error>>;

const DEBOUNCE: Duration = Duration::from_millis(100);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn core() -> Result<WatchCore, Box<dyn Error>> {
    let profiles = vec![
        TaskWatchProfile::new("styles", SourcePattern::parse("css/src/**/*.scss")?),
        TaskWatchProfile::new("scripts", SourcePattern::parse("js/src/**/*.js")?),
        TaskWatchProfile::new("all-css", SourcePattern::parse("css/**/*")?),
    ];
    Ok(WatchCore::new(profiles, RuntimeOptions { debounce: DEBOUNCE }))
}

fn changed(path: &str, at: Instant) -> RuntimeEvent {
    RuntimeEvent::PathChanged(WatchEvent::new(path, ChangeKind::Modified, at))
}

fn completed(task: &str, written: &[&str]) -> RuntimeEvent {
    let mut result = RunResult::empty(task);
    result.written = written.iter().map(PathBuf::from).collect();
    RuntimeEvent::RunCompleted(result)
}

fn started(commands: &[CoreCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            CoreCommand::StartRun { task, .. } => Some(task.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn burst_within_window_runs_once() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();

    core.step(changed("js/src/main.js", t0), t0);
    core.step(changed("js/src/main.js", t0 + ms(10)), t0 + ms(10));

    // Deadline is measured from the last event.
    assert_eq!(core.next_deadline(), Some(t0 + ms(110)));
    assert!(core.tick(t0 + ms(100)).commands.is_empty());

    let step = core.tick(t0 + ms(110));
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            task: "scripts".into(),
            changed: vec!["js/src/main.js".into()],
        }]
    );
    assert_eq!(core.state(), WatchState::Running("scripts".into()));

    // Nothing else is pending once the run completes.
    let step = core.step(completed("scripts", &[]), t0 + ms(200));
    assert!(started(&step.commands).is_empty());
    assert_eq!(core.state(), WatchState::Idle);
    Ok(())
}

#[test]
fn debouncing_is_per_task() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();

    core.step(changed("js/src/a.js", t0), t0);
    core.step(changed("js/src/b.js", t0 + ms(50)), t0 + ms(50));
    core.step(changed("css/src/a.scss", t0 + ms(60)), t0 + ms(60));

    match core.state() {
        WatchState::Debouncing {
            pending,
            changed,
            deadline,
        } => {
            assert_eq!(pending, vec!["styles", "scripts", "all-css"]);
            assert_eq!(changed.len(), 3);
            assert_eq!(deadline, t0 + ms(150));
        }
        other => panic!("expected debouncing, got {other:?}"),
    }

    // scripts is due first even though styles is registered first.
    assert_eq!(started(&core.tick(t0 + ms(150)).commands), vec!["scripts"]);
    Ok(())
}

#[test]
fn due_tasks_run_sequentially_in_registration_order() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();

    // Owned by both "styles" and "all-css".
    core.step(changed("css/src/a.scss", t0), t0);
    core.step(changed("js/src/a.js", t0), t0);

    let now = t0 + ms(100);
    assert_eq!(started(&core.tick(now).commands), vec!["styles"]);
    // Only one run at a time.
    assert!(core.tick(now).commands.is_empty());
    assert_eq!(core.next_deadline(), None);

    let step = core.step(completed("styles", &["css/dist/a.css"]), now);
    assert_eq!(started(&step.commands), vec!["scripts"]);

    let step = core.step(completed("scripts", &[]), now);
    assert_eq!(started(&step.commands), vec!["all-css"]);

    let step = core.step(completed("all-css", &[]), now);
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
    Ok(())
}

#[test]
fn completion_broadcasts_written_paths() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();
    core.step(changed("js/src/a.js", t0), t0);
    core.tick(t0 + DEBOUNCE);

    let step = core.step(completed("scripts", &["js/dist/a.js", "js/dist/a.js.map"]), t0);
    assert_eq!(
        step.commands,
        vec![CoreCommand::Broadcast {
            task: "scripts".into(),
            paths: vec![PathBuf::from("js/dist/a.js"), PathBuf::from("js/dist/a.js.map")],
        }]
    );
    Ok(())
}

#[test]
fn events_during_a_run_are_replayed_after_completion() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();

    core.step(changed("js/src/a.js", t0), t0);
    core.tick(t0 + ms(100));

    core.step(changed("js/src/b.js", t0 + ms(120)), t0 + ms(120));
    assert_eq!(core.state(), WatchState::Running("scripts".into()));

    let done = t0 + ms(500);
    let step = core.step(completed("scripts", &[]), done);
    assert!(started(&step.commands).is_empty());
    assert_eq!(core.next_deadline(), Some(done + DEBOUNCE));

    let step = core.tick(done + DEBOUNCE);
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            task: "scripts".into(),
            changed: vec!["js/src/b.js".into()],
        }]
    );
    Ok(())
}

#[test]
fn unmatched_events_are_ignored() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();
    let step = core.step(changed("README.md", t0), t0);
    assert!(step.commands.is_empty());
    assert!(step.keep_running);
    assert_eq!(core.state(), WatchState::Idle);
    assert_eq!(core.next_deadline(), None);
    Ok(())
}

#[test]
fn manual_trigger_is_due_immediately() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();
    core.step(RuntimeEvent::TaskTriggered { task: "scripts".into() }, t0);
    core.step(RuntimeEvent::TaskTriggered { task: "styles".into() }, t0);
    core.step(RuntimeEvent::TaskTriggered { task: "nope".into() }, t0);

    assert_eq!(core.next_deadline(), Some(t0));
    let step = core.tick(t0);
    assert_eq!(
        step.commands,
        vec![CoreCommand::StartRun {
            task: "styles".into(),
            changed: Vec::new(),
        }]
    );
    Ok(())
}

#[test]
fn shutdown_when_idle_exits_immediately() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();
    core.step(changed("js/src/a.js", t0), t0);

    let step = core.step(RuntimeEvent::ShutdownRequested, t0);
    assert!(!step.keep_running);
    assert_eq!(core.next_deadline(), None);
    assert!(core.fatal_error().is_none());
    Ok(())
}

#[test]
fn shutdown_waits_for_in_flight_run_and_drops_pending() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();
    core.step(changed("js/src/a.js", t0), t0);
    core.tick(t0 + DEBOUNCE);
    core.step(changed("css/src/a.scss", t0 + ms(110)), t0 + ms(110));

    let step = core.step(RuntimeEvent::ShutdownRequested, t0 + ms(120));
    assert!(step.keep_running, "must wait for the running task");
    assert!(core.is_stopping());

    // No new intake once stopping.
    core.step(changed("js/src/b.js", t0 + ms(130)), t0 + ms(130));

    let step = core.step(completed("scripts", &["js/dist/a.js"]), t0 + ms(300));
    assert!(!step.keep_running);
    assert!(started(&step.commands).is_empty());
    // The finished run is still published.
    assert!(matches!(step.commands.as_slice(), [CoreCommand::Broadcast { .. }]));
    Ok(())
}

#[test]
fn observer_failure_is_fatal_after_in_flight_run() -> TestResult {
    let mut core = core()?;
    let t0 = Instant::now();
    core.step(changed("js/src/a.js", t0), t0);
    core.tick(t0 + DEBOUNCE);

    let step = core.step(
        RuntimeEvent::ObserverFailed("watched directory js/src was removed".into()),
        t0 + ms(150),
    );
    assert!(step.keep_running);
    assert_eq!(core.fatal_error(), Some("watched directory js/src was removed"));

    let step = core.step(completed("scripts", &[]), t0 + ms(200));
    assert!(!step.keep_running);
    Ok(())
}

#[test]
fn writes_below_a_tasks_own_dest_do_not_retrigger_it() -> TestResult {
    let profiles = vec![
        TaskWatchProfile::new("scripts", SourcePattern::parse("js/**/*.js")?)
            .excluding(Some("js/dist".into())),
    ];
    let mut core = WatchCore::new(profiles, RuntimeOptions { debounce: DEBOUNCE });
    let t0 = Instant::now();

    core.step(changed("js/dist/main.js", t0), t0);
    assert_eq!(core.state(), WatchState::Idle);

    core.step(changed("js/distant.js", t0), t0);
    assert!(matches!(core.state(), WatchState::Debouncing { .. }));
    Ok(())
}
