//! Snapshot walker against an in-memory checkpoint source

use archive_stats::pipeline::KindReport;
use archive_stats::snapshot::WalkState;
use archive_stats::{
    EntityKind, KindOutcome, PipelineReport, SnapshotCheckpoint, SnapshotDate, SnapshotSource,
    SnapshotWalker, WalkError,
};

fn date(s: &str) -> SnapshotDate {
    SnapshotDate::parse(s).unwrap()
}

fn checkpoint(commit: &str, summary: &str) -> SnapshotCheckpoint {
    SnapshotCheckpoint::from_commit(commit, summary).unwrap()
}

#[derive(Default)]
struct FakeSource {
    checkpoints: Vec<SnapshotCheckpoint>,
    fail_on: Option<String>,
    active: Option<String>,
    activated: Vec<String>,
    deactivations: usize,
}

impl FakeSource {
    fn with_dumps(dates: &[&str]) -> Self {
        let checkpoints = dates
            .iter()
            .enumerate()
            .map(|(i, d)| checkpoint(&format!("{i:040}"), &format!("Update dump-{d}.zip")))
            .collect();
        Self {
            checkpoints,
            ..Self::default()
        }
    }
}

impl SnapshotSource for FakeSource {
    fn discover_checkpoints(&self) -> Result<Vec<SnapshotCheckpoint>, WalkError> {
        Ok(self.checkpoints.clone())
    }

    fn activate(&mut self, checkpoint: &SnapshotCheckpoint) -> Result<(), WalkError> {
        if self.fail_on.as_deref() == Some(checkpoint.commit.as_str()) {
            return Err(WalkError::Activation {
                commit: checkpoint.commit.clone(),
                reason: "checkout refused".to_string(),
            });
        }
        self.active = Some(checkpoint.commit.clone());
        self.activated.push(checkpoint.commit.clone());
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), WalkError> {
        self.active = None;
        self.deactivations += 1;
        Ok(())
    }
}

fn report(date: SnapshotDate, failed: bool) -> PipelineReport {
    let outcome = if failed {
        KindOutcome::Failed {
            error: "File not found: subject.jsonlines".to_string(),
        }
    } else {
        KindOutcome::Completed(Default::default())
    };
    PipelineReport {
        data_date: date,
        kinds: vec![KindReport {
            kind: EntityKind::Subject,
            outcome,
        }],
        duration_ms: 0,
    }
}

#[test]
fn test_walk_starts_at_requested_date() {
    let source = FakeSource::with_dumps(&["2024-01-01", "2024-02-01", "2024-03-01"]);
    let mut walker = SnapshotWalker::new(source);
    let mut seen = Vec::new();

    let walk = walker
        .run(Some(date("2024-02-01")), |d| {
            seen.push(d);
            report(d, false)
        })
        .unwrap();

    assert_eq!(seen, vec![date("2024-02-01"), date("2024-03-01")]);
    assert!(walk.is_success());
    assert_eq!(walk.checkpoints.len(), 2);
    assert!(!walk.run_id.is_empty());
    assert_eq!(walker.state(), WalkState::Done);

    let source = walker.into_source();
    assert_eq!(source.activated.len(), 2);
    assert_eq!(source.deactivations, 2);
    assert!(source.active.is_none());
}

#[test]
fn test_walk_without_start_visits_everything_in_date_order() {
    let mut source = FakeSource::with_dumps(&["2024-03-01", "2024-01-01"]);
    source.checkpoints.push(checkpoint("f".repeat(40).as_str(), "dump-2024-02-01.zip"));
    let mut walker = SnapshotWalker::new(source);
    let mut seen = Vec::new();

    walker
        .run(None, |d| {
            seen.push(d.to_string());
            report(d, false)
        })
        .unwrap();

    assert_eq!(seen, vec!["2024-01-01", "2024-02-01", "2024-03-01"]);
}

#[test]
fn test_partial_failure_does_not_halt_walk() {
    let source = FakeSource::with_dumps(&["2024-01-01", "2024-02-01", "2024-03-01"]);
    let mut walker = SnapshotWalker::new(source);

    let walk = walker
        .run(None, |d| report(d, d == date("2024-02-01")))
        .unwrap();

    assert_eq!(walk.checkpoints.len(), 3);
    assert!(!walk.is_success());
    let partial: Vec<_> = walk.partial_failures().iter().map(|cp| cp.date).collect();
    assert_eq!(partial, vec![date("2024-02-01")]);
}

#[test]
fn test_activation_failure_halts_walk() {
    let mut source = FakeSource::with_dumps(&["2024-01-01", "2024-02-01", "2024-03-01"]);
    source.fail_on = Some(format!("{:040}", 1));
    let mut walker = SnapshotWalker::new(source);
    let mut ingested = 0;

    let err = walker
        .run(None, |d| {
            ingested += 1;
            report(d, false)
        })
        .unwrap_err();

    assert!(matches!(err, WalkError::Activation { .. }));
    assert_eq!(ingested, 1);
    assert_eq!(walker.state(), WalkState::Done);
    let source = walker.into_source();
    assert_eq!(source.activated.len(), 1);
    // the failed activation is still cleaned up
    assert_eq!(source.deactivations, 2);
}

#[test]
fn test_unknown_start_date_is_rejected() {
    let source = FakeSource::with_dumps(&["2024-01-01", "2024-03-01"]);
    let mut walker = SnapshotWalker::new(source);

    let err = walker
        .run(Some(date("2024-02-01")), |d| report(d, false))
        .unwrap_err();

    assert!(matches!(err, WalkError::StartNotFound(d) if d == date("2024-02-01")));
    assert!(walker.source().activated.is_empty());
}

#[test]
fn test_empty_history_is_rejected() {
    let mut walker = SnapshotWalker::new(FakeSource::default());
    let err = walker.run(None, |d| report(d, false)).unwrap_err();
    assert!(matches!(err, WalkError::NoCheckpoints));
}

#[test]
fn test_plan_keeps_latest_commit_for_duplicate_dates() {
    let mut source = FakeSource::with_dumps(&["2024-01-01"]);
    source
        .checkpoints
        .push(checkpoint("b".repeat(40).as_str(), "Re-upload dump-2024-01-01.zip"));
    let walker = SnapshotWalker::new(source);

    let plan = walker.plan(None).unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].commit, "b".repeat(40));
}
