use std::fs;

use seqmem::config::RoundConfig;
use seqmem::generator::ScriptedSequences;
use seqmem::round::RoundStateMachine;
use seqmem::speech::RecordingAnnouncer;
use seqmem::stats::{aggregate, FileStore, Percentage, RunResult, StatsStore};
use seqmem::timer::RoundTimer;
use tempfile::tempdir;

fn machine(dir: &std::path::Path, sequence: Vec<u32>) -> RoundStateMachine<FileStore> {
    let config = RoundConfig {
        sequence_length: sequence.len(),
        memorize_secs: 0,
        ..RoundConfig::default()
    };
    RoundStateMachine::new(
        config,
        StatsStore::open(FileStore::new(dir)),
        Box::new(RecordingAnnouncer::new()),
    )
    .with_source(Box::new(ScriptedSequences::new([sequence])))
    .with_timer(RoundTimer::with_ticks_per_second(1))
}

#[test]
fn history_survives_restart_and_aggregates() {
    let dir = tempdir().unwrap();

    let mut first = machine(dir.path(), vec![1, 2, 3, 4, 5, 6]);
    first.start_round().unwrap();
    for (i, a) in ["1", "2", "3", "4", "0", "0"].iter().enumerate() {
        first.record_answer(i, *a).unwrap();
    }
    first.reveal().unwrap();

    let mut second = machine(dir.path(), vec![9, 8, 7, 6, 5]);
    assert_eq!(second.stats().history(), &[RunResult::new(6, 4)]);
    second.start_round().unwrap();
    for (i, a) in ["9", "8", "7", "6", "5"].iter().enumerate() {
        second.record_answer(i, *a).unwrap();
    }
    second.reveal().unwrap();

    let reopened = StatsStore::open(FileStore::new(dir.path()));
    let summary = reopened.summary();
    assert_eq!(summary.correct_total, 9);
    assert_eq!(summary.attempted_total, 11);
    assert_eq!(summary.percentage.to_string(), "81.82");
    assert_eq!(
        summary.headline(),
        "You have answered correctly 9 times out of 11 in 2 runs (81.82%)"
    );
}

#[test]
fn corrupted_history_starts_fresh_and_is_overwritten() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("stats.json"), "[{\"total\": oops").unwrap();

    let mut m = machine(dir.path(), vec![3]);
    assert!(m.stats().history().is_empty());
    m.start_round().unwrap();
    m.record_answer(0, "3").unwrap();
    m.reveal().unwrap();

    let raw = fs::read_to_string(dir.path().join("stats.json")).unwrap();
    assert_eq!(raw, r#"[{"total":1,"correct":1}]"#);
}

#[test]
fn reset_persists_empty_history() {
    let dir = tempdir().unwrap();
    let mut m = machine(dir.path(), vec![3]);
    m.start_round().unwrap();
    m.reveal().unwrap();
    m.reset_stats().unwrap();

    let reopened = StatsStore::open(FileStore::new(dir.path()));
    assert!(reopened.history().is_empty());
    assert_eq!(aggregate(reopened.history()).percentage, Percentage::NoData);
}
