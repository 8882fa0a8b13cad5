// Integration tests for per-session pidfile exclusion

use authd::daemon::{Claim, PidFile};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

#[test]
fn test_exactly_one_concurrent_claim_wins() {
    let temp_dir = TempDir::new().unwrap();
    let pid_file = PidFile::locate(temp_dir.path(), "alice", "777").unwrap();
    let claimers = 8;
    let barrier = Arc::new(Barrier::new(claimers));

    let handles: Vec<_> = (0..claimers)
        .map(|i| {
            let pid_file = pid_file.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let pid = 10_000 + i as u32;
                barrier.wait();
                (pid, pid_file.claim_for(pid).unwrap())
            })
        })
        .collect();

    let results: Vec<(u32, Claim)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<u32> = results
        .iter()
        .filter(|(_, claim)| *claim == Claim::Claimed)
        .map(|(pid, _)| *pid)
        .collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0];

    for (pid, claim) in &results {
        if *pid != winner {
            assert_eq!(*claim, Claim::AlreadyOwned(winner));
        }
    }
    assert_eq!(pid_file.read_owner_pid().unwrap(), Some(winner));
}

#[test]
fn test_sequential_claims_report_first_owner() {
    let temp_dir = TempDir::new().unwrap();
    let pid_file = PidFile::locate(temp_dir.path(), "alice", "777").unwrap();

    assert_eq!(pid_file.claim_for(100).unwrap(), Claim::Claimed);
    assert_eq!(pid_file.claim_for(200).unwrap(), Claim::AlreadyOwned(100));
    assert_eq!(pid_file.claim_for(300).unwrap(), Claim::AlreadyOwned(100));
}

#[test]
fn test_claim_after_release() {
    let temp_dir = TempDir::new().unwrap();
    let pid_file = PidFile::locate(temp_dir.path(), "alice", "777").unwrap();

    assert_eq!(pid_file.claim_for(100).unwrap(), Claim::Claimed);
    pid_file.release().unwrap();
    assert_eq!(pid_file.claim_for(200).unwrap(), Claim::Claimed);
    assert_eq!(pid_file.read_owner_pid().unwrap(), Some(200));
}

#[test]
fn test_release_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let pid_file = PidFile::locate(temp_dir.path(), "alice", "777").unwrap();

    // Nothing claimed yet
    pid_file.release().unwrap();

    pid_file.claim().unwrap();
    pid_file.release().unwrap();
    pid_file.release().unwrap();
    assert!(!pid_file.exists());
}

#[test]
fn test_sessions_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let first = PidFile::locate(temp_dir.path(), "alice", "777").unwrap();
    let second = PidFile::locate(temp_dir.path(), "alice", "888").unwrap();
    let other_owner = PidFile::locate(temp_dir.path(), "bob", "777").unwrap();

    assert_eq!(first.claim_for(100).unwrap(), Claim::Claimed);
    assert_eq!(second.claim_for(200).unwrap(), Claim::Claimed);
    assert_eq!(other_owner.claim_for(300).unwrap(), Claim::Claimed);
}
