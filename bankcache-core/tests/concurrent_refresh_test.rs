//! Concurrent refresh tests
//!
//! Many threads share one repository handle and write the same accounts at
//! once, the way overlapping HTTP refreshes do.
//!
//! Run with: cargo test --test concurrent_refresh_test

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use bankcache_core::adapters::duckdb::DuckDbRepository;
use bankcache_core::ports::{AccountSummary, TransactionRecord};

const THREAD_COUNT: usize = 8;

fn create_shared_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let repo = DuckDbRepository::new(&temp_dir.path().join("concurrent.duckdb"))
        .expect("Failed to create repository");
    repo.upsert_user("u1", "tok", None).unwrap();
    repo.upsert_accounts("u1", &[AccountSummary::new("a1")]).unwrap();
    Arc::new(repo)
}

fn record(n: u32) -> TransactionRecord {
    TransactionRecord {
        id: format!("t{n:02}"),
        description: None,
        amount: Decimal::new(-(n as i64) * 100, 2),
        date: NaiveDate::from_ymd_opt(2025, 8, n).unwrap(),
        running_balance: None,
        transaction_type: None,
    }
}

#[test]
fn test_identical_refreshes_converge() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_shared_repo(&temp_dir);
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let batch: Vec<_> = (1..=12).map(record).collect();

    let handles: Vec<_> = (0..THREAD_COUNT)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            let batch = batch.clone();
            thread::spawn(move || {
                barrier.wait();
                repo.upsert_transactions("a1", &batch, Utc::now())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked").expect("refresh failed");
    }

    let stored = repo.get_transactions("a1", 100).unwrap();
    assert_eq!(stored.len(), 12);
    let unique: HashSet<_> = stored.iter().map(|t| t.id.clone()).collect();
    assert_eq!(unique.len(), 12);
}

#[test]
fn test_disjoint_windows_keep_union() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_shared_repo(&temp_dir);
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    // Thread i writes days 3i+1..=3i+3; windows never overlap
    let handles: Vec<_> = (0..THREAD_COUNT as u32)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let batch: Vec<_> = (3 * i + 1..=3 * i + 3).map(record).collect();
                barrier.wait();
                repo.upsert_transactions("a1", &batch, Utc::now())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked").expect("refresh failed");
    }

    assert_eq!(repo.counts().unwrap().transactions, 3 * THREAD_COUNT as i64);
}

#[test]
fn test_overlapping_windows_keep_union() {
    // Either commit order must end with t01..t12; repeat to vary the interleaving
    for _ in 0..10 {
        let temp_dir = TempDir::new().unwrap();
        let repo = create_shared_repo(&temp_dir);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [1..=8, 5..=12]
            .into_iter()
            .map(|days| {
                let repo = Arc::clone(&repo);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let batch: Vec<_> = days.map(record).collect();
                    barrier.wait();
                    repo.upsert_transactions("a1", &batch, Utc::now())
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked").expect("refresh failed");
        }

        let stored = repo.get_transactions("a1", 100).unwrap();
        let unique: HashSet<String> = stored.iter().map(|t| t.id.clone()).collect();
        let expected: HashSet<String> = (1..=12).map(|n| format!("t{n:02}")).collect();
        assert_eq!(stored.len(), 12);
        assert_eq!(unique, expected);
    }
}

#[test]
fn test_concurrent_balances_leave_one_row() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_shared_repo(&temp_dir);
    let barrier = Arc::new(Barrier::new(THREAD_COUNT));

    let handles: Vec<_> = (0..THREAD_COUNT as i64)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                repo.upsert_balance("a1", Some(Decimal::new(i * 100, 2)), None, Some("USD"), Utc::now())
            })
        })
        .collect();

    let written: Vec<Decimal> = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked").expect("balance failed"))
        .filter_map(|b| b.available)
        .collect();

    assert_eq!(repo.counts().unwrap().balances, 1);
    let stored = repo.get_balance("a1").unwrap();
    assert!(written.contains(&stored.available.unwrap()));
}

#[test]
fn test_readers_during_writes_see_whole_batches() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_shared_repo(&temp_dir);
    repo.upsert_transactions("a1", &(1..=10).map(record).collect::<Vec<_>>(), Utc::now())
        .unwrap();
    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let repo = Arc::clone(&repo);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for _ in 0..20 {
                repo.upsert_transactions("a1", &(1..=10).map(record).collect::<Vec<_>>(), Utc::now())
                    .unwrap();
            }
        })
    };

    barrier.wait();
    for _ in 0..20 {
        assert_eq!(repo.get_transactions("a1", 100).unwrap().len(), 10);
    }
    writer.join().expect("writer panicked");
}
