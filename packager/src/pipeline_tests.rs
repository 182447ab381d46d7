//! Unit tests for the release driver.
//!
//! The driver runs against a `StubExecutor` replaying rustup and cargo
//! responses, and a temporary project directory in which each "build" has
//! already placed its binary.

use super::{BuildOutcome, FailurePolicy, ReleaseDriver, ReleaseStage, ReleaseSummary, TargetState};
use crate::config::ReleaseConfig;
use crate::error::PackagerError;
use crate::target::TargetIdentifier;
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

struct Project {
    _dir: TempDir,
    root: Utf8PathBuf,
    config: ReleaseConfig,
}

impl Project {
    fn release_root(&self) -> Utf8PathBuf {
        self.root.join("baasha-releases")
    }

    fn place_binary(&self, target: &str) {
        let dir = self.root.join("target").join(target).join("release");
        fs::create_dir_all(&dir).expect("create cargo output dir");
        fs::write(dir.join("baasha"), format!("binary for {target}")).expect("write binary");
    }

    fn run(&self, executor: &StubExecutor, targets: &[&str]) -> (ReleaseSummary, String) {
        self.run_with(&ReleaseDriver::from_config(&self.config, executor, 0), targets)
    }

    fn run_with(
        &self,
        driver: &ReleaseDriver<'_>,
        targets: &[&str],
    ) -> (ReleaseSummary, String) {
        let targets: Vec<TargetIdentifier> =
            targets.iter().copied().map(TargetIdentifier::from).collect();
        let mut progress = Vec::new();
        let summary = driver.run(&targets, &mut progress).expect("run should complete");
        (summary, String::from_utf8(progress).expect("utf-8 progress"))
    }
}

#[fixture]
fn project() -> Project {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 temp dir");
    fs::write(root.join("runtime.c"), "/* baasha runtime */\n").expect("write runtime");
    let config = ReleaseConfig::default().resolve_paths(&root);
    Project {
        _dir: dir,
        root,
        config,
    }
}

fn succeed(target: &str) -> Vec<ExpectedCall> {
    vec![
        ExpectedCall::provision(target, success_output()),
        ExpectedCall::build(target, success_output()),
    ]
}

// -------------------------------------------------------------------------
// State transitions
// -------------------------------------------------------------------------

#[test]
fn target_state_walks_every_stage_in_order() {
    let mut state = TargetState::Pending;
    let mut seen = Vec::new();
    while state != TargetState::Done {
        state = state.advance();
        seen.push(state);
    }

    assert_eq!(
        seen,
        [
            TargetState::Running(ReleaseStage::Provisioning),
            TargetState::Running(ReleaseStage::Building),
            TargetState::Running(ReleaseStage::Staging),
            TargetState::Running(ReleaseStage::Archiving),
            TargetState::Done,
        ]
    );
}

#[rstest]
#[case::running(TargetState::Running(ReleaseStage::Building), TargetState::Failed(ReleaseStage::Building))]
#[case::pending(TargetState::Pending, TargetState::Pending)]
#[case::done(TargetState::Done, TargetState::Done)]
fn only_running_stages_can_fail(#[case] state: TargetState, #[case] expected: TargetState) {
    assert_eq!(state.fail(), expected);
}

#[test]
fn failed_state_is_terminal() {
    let failed = TargetState::Failed(ReleaseStage::Staging);
    assert_eq!(failed.advance(), failed);
}

// -------------------------------------------------------------------------
// Release runs
// -------------------------------------------------------------------------

#[rstest]
fn single_target_produces_staging_dir_and_archive(project: Project) {
    project.place_binary("x86_64-unknown-linux-gnu");
    let executor = StubExecutor::new(succeed("x86_64-unknown-linux-gnu"));

    let (summary, progress) = project.run(&executor, &["x86_64-unknown-linux-gnu"]);

    executor.assert_finished();
    assert!(summary.is_success());
    let staging = project.release_root().join("baasha-x86_64-unknown-linux-gnu");
    assert!(staging.join("baasha").is_file());
    assert!(staging.join("runtime.c").is_file());
    assert_eq!(fs::read_dir(&staging).expect("read staging dir").count(), 2);
    assert!(
        project
            .release_root()
            .join("baasha-x86_64-unknown-linux-gnu.zip")
            .is_file()
    );
    assert_eq!(
        progress,
        concat!(
            "Building target `x86_64-unknown-linux-gnu`\n",
            "Build complete for target `x86_64-unknown-linux-gnu`\n",
        )
    );
}

#[rstest]
fn provisioning_failure_skips_remaining_stages(project: Project) {
    let executor = StubExecutor::new(vec![ExpectedCall::provision(
        "bad-target",
        failure_output("error: toolchain does not support target 'bad-target'\nhelp: run rustup target list"),
    )]);

    let (summary, progress) = project.run(&executor, &["bad-target"]);

    executor.assert_finished();
    assert!(!summary.is_success());
    assert!(matches!(
        summary.outcomes(),
        [BuildOutcome::Failed { stage: ReleaseStage::Provisioning, .. }]
    ));
    assert!(!project.release_root().join("baasha-bad-target").exists());
    assert!(!project.release_root().join("baasha-bad-target.zip").exists());
    assert!(progress.contains("Error occurred while trying to add support for `bad-target`"));
    assert!(progress.contains("error: toolchain does not support target 'bad-target'\n"));
    assert!(progress.contains("help: run rustup target list\n"));
}

#[rstest]
fn build_failure_does_not_stop_later_targets(project: Project) {
    project.place_binary("t2");
    let executor = StubExecutor::new(vec![
        ExpectedCall::provision("t1", success_output()),
        ExpectedCall::build("t1", failure_output("error: could not compile `baasha`")),
        ExpectedCall::provision("t2", success_output()),
        ExpectedCall::build("t2", success_output()),
    ]);

    let (summary, progress) = project.run(&executor, &["t1", "t2"]);

    executor.assert_finished();
    assert_eq!(summary.failed().count(), 1);
    assert_eq!(summary.succeeded().count(), 1);
    assert!(matches!(
        summary.outcomes(),
        [
            BuildOutcome::Failed { stage: ReleaseStage::Building, .. },
            BuildOutcome::Succeeded { .. },
        ]
    ));
    assert!(!project.release_root().join("baasha-t1").exists());
    assert!(project.release_root().join("baasha-t2.zip").is_file());
    assert!(progress.contains("Error occurred while trying to build for `t1`"));
    assert!(progress.contains("Build complete for target `t2`"));
}

#[rstest]
fn fail_fast_skips_remaining_targets(project: Project) {
    let executor = StubExecutor::new(vec![ExpectedCall::provision(
        "t1",
        failure_output("error: no such target"),
    )]);
    let driver =
        ReleaseDriver::from_config(&project.config, &executor, 0).with_policy(FailurePolicy::FailFast);

    let (summary, progress) = project.run_with(&driver, &["t1", "t2", "t3"]);

    executor.assert_finished();
    assert_eq!(summary.outcomes().len(), 1);
    assert_eq!(
        summary.skipped(),
        [TargetIdentifier::from("t2"), TargetIdentifier::from("t3")]
    );
    assert!(!summary.is_success());
    assert!(progress.contains("Skipped target `t2`"));
}

#[rstest]
fn command_errors_are_attributed_to_the_running_stage(project: Project) {
    let executor = StubExecutor::new(vec![
        ExpectedCall::provision("t1", success_output()),
        ExpectedCall::new(
            "cargo",
            &["build", "--release", "--target", "t1"],
            Err(PackagerError::CommandTimedOut {
                program: "cargo".to_owned(),
                seconds: 5,
            }),
        ),
    ]);

    let (summary, progress) = project.run(&executor, &["t1"]);

    executor.assert_finished();
    assert!(matches!(
        summary.outcomes(),
        [BuildOutcome::Failed { stage: ReleaseStage::Building, diagnostics, .. }]
            if diagnostics == "cargo timed out after 5 seconds"
    ));
    assert!(progress.contains("Error occurred while trying to build for `t1`"));
}

#[rstest]
fn missing_binary_fails_at_staging_and_continues(project: Project) {
    project.place_binary("t2");
    let mut calls = succeed("t1");
    calls.extend(succeed("t2"));
    let executor = StubExecutor::new(calls);

    let (summary, progress) = project.run(&executor, &["t1", "t2"]);

    executor.assert_finished();
    match summary.outcomes() {
        [
            BuildOutcome::Failed {
                target,
                stage: ReleaseStage::Staging,
                diagnostics,
            },
            BuildOutcome::Succeeded { .. },
        ] => {
            assert_eq!(target.as_str(), "t1");
            assert!(diagnostics.contains("release/baasha"), "diagnostics: {diagnostics}");
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
    assert!(!project.release_root().join("baasha-t1.zip").exists());
    assert!(progress.contains("Error occurred while trying to stage `t1`"));
}

#[rstest]
fn rerun_overwrites_outputs_in_place(project: Project) {
    project.place_binary("t1");
    let mut calls = succeed("t1");
    calls.extend(succeed("t1"));
    let executor = StubExecutor::new(calls);

    let (first, _) = project.run(&executor, &["t1"]);
    let archive = project.release_root().join("baasha-t1.zip");
    let before = fs::read(&archive).expect("first archive");
    let (second, _) = project.run(&executor, &["t1"]);

    executor.assert_finished();
    assert!(first.is_success() && second.is_success());
    assert_eq!(fs::read(&archive).expect("second archive"), before);
    let entries: Vec<_> = fs::read_dir(project.release_root())
        .expect("read release root")
        .collect();
    assert_eq!(entries.len(), 2);
}

#[rstest]
fn quiet_mode_reports_only_failures(project: Project) {
    project.place_binary("t2");
    let executor = StubExecutor::new(vec![
        ExpectedCall::provision("t1", failure_output("error: nope")),
        ExpectedCall::provision("t2", success_output()),
        ExpectedCall::build("t2", success_output()),
    ]);
    let driver = ReleaseDriver::from_config(&project.config, &executor, 0).quiet(true);

    let (_, progress) = project.run_with(&driver, &["t1", "t2"]);

    assert_eq!(
        progress,
        "Error occurred while trying to add support for `t1`\nerror: nope\n"
    );
}

#[rstest]
fn empty_target_list_succeeds_without_commands(project: Project) {
    let executor = StubExecutor::new(Vec::new());

    let (summary, progress) = project.run(&executor, &[]);

    assert!(summary.is_success());
    assert!(summary.outcomes().is_empty());
    assert!(progress.is_empty());
    assert!(project.release_root().is_dir());
}

#[rstest]
fn unavailable_release_root_aborts_the_run(project: Project) {
    fs::write(project.release_root(), "not a directory").expect("block release root");
    let executor = StubExecutor::new(Vec::new());
    let driver = ReleaseDriver::from_config(&project.config, &executor, 0);

    let err = driver
        .run(&[TargetIdentifier::from("t1")], &mut Vec::new())
        .expect_err("release root should be unavailable");

    assert!(matches!(err, PackagerError::ReleaseRootUnavailable { .. }));
    assert!(executor.received().is_empty());
}

#[rstest]
fn toolchain_setting_reaches_both_commands(mut project: Project) {
    project.config.toolchain = Some("stable".to_owned());
    project.place_binary("t1");
    let executor = StubExecutor::new(vec![
        ExpectedCall::new(
            "rustup",
            &["target", "add", "--toolchain", "stable", "t1"],
            Ok(success_output()),
        ),
        ExpectedCall::new(
            "cargo",
            &["+stable", "build", "--release", "--target", "t1"],
            Ok(success_output()),
        ),
    ]);

    let (summary, _) = project.run(&executor, &["t1"]);

    executor.assert_finished();
    assert!(summary.is_success());
}

#[rstest]
#[case::provisioning(ReleaseStage::Provisioning, "Error occurred while trying to add support for `t`")]
#[case::building(ReleaseStage::Building, "Error occurred while trying to build for `t`")]
#[case::staging(ReleaseStage::Staging, "Error occurred while trying to stage `t`")]
#[case::archiving(ReleaseStage::Archiving, "Error occurred while trying to archive `t`")]
fn failure_messages_name_stage_and_target(#[case] stage: ReleaseStage, #[case] expected: &str) {
    assert_eq!(stage.failure_message(&TargetIdentifier::from("t")), expected);
}
