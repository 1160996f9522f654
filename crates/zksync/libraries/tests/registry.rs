use std::{
    env, fs,
    process::Command,
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use foundry_zksync_libraries::{
    LibraryRegistryError, LockFile, LockRetryPolicy, ZkLibraryRegistry, ZkMissingLibrary,
};
use foundry_zksync_test_utils::init_tracing;
use similar_asserts::assert_eq;

/// Set for the child processes spawned by `appends_from_separate_processes_are_kept`.
const CHILD_REGISTRY_ENV: &str = "ZK_LIBRARIES_TEST_REGISTRY";
const CHILD_INDEX_ENV: &str = "ZK_LIBRARIES_TEST_INDEX";

fn record(index: usize) -> ZkMissingLibrary {
    ZkMissingLibrary::new(
        format!("src/Contract{index}.sol"),
        format!("Contract{index}"),
        [format!("src/Lib{index}.sol:Lib{index}")],
    )
}

fn sorted(mut records: Vec<ZkMissingLibrary>) -> Vec<ZkMissingLibrary> {
    records.sort_by(|a, b| a.contract_name.cmp(&b.contract_name));
    records
}

/// Appenders released together with the default retry policy must all get their turn.
#[test]
fn concurrent_appends_keep_every_record() {
    init_tracing();
    const APPENDERS: usize = 16;

    let dir = tempfile::tempdir().unwrap();
    let path = ZkLibraryRegistry::default_path(dir.path());
    let barrier = Arc::new(Barrier::new(APPENDERS));
    let done = Arc::new(AtomicBool::new(false));

    let poller = {
        let registry = ZkLibraryRegistry::new(&path);
        let done = done.clone();
        thread::spawn(move || {
            let mut reads = 0;
            while !done.load(Ordering::SeqCst) {
                match registry.read() {
                    Ok(_) => reads += 1,
                    Err(LibraryRegistryError::NotFound { .. }) => {}
                    Err(err) => panic!("observed invalid registry: {err}"),
                }
            }
            reads
        })
    };

    let appenders = (0..APPENDERS)
        .map(|index| {
            // every appender opens its own lock file handle, like a separate process would
            let registry = ZkLibraryRegistry::new(&path);
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.append(&[record(index)])
            })
        })
        .collect::<Vec<_>>();

    for appender in appenders {
        appender.join().unwrap().unwrap();
    }
    done.store(true, Ordering::SeqCst);
    poller.join().unwrap();

    let recorded = ZkLibraryRegistry::new(&path).read().unwrap();
    assert_eq!(sorted(recorded), sorted((0..APPENDERS).map(record).collect()));
}

#[test]
fn appends_from_separate_processes_are_kept() {
    if let Ok(path) = env::var(CHILD_REGISTRY_ENV) {
        let index = env::var(CHILD_INDEX_ENV).unwrap().parse().unwrap();
        let registry = ZkLibraryRegistry::new(path);
        registry.append(&[record(index)]).unwrap();
        return;
    }

    init_tracing();
    const PROCESSES: usize = 6;

    let dir = tempfile::tempdir().unwrap();
    let path = ZkLibraryRegistry::default_path(dir.path());
    let exe = env::current_exe().unwrap();

    let children = (0..PROCESSES)
        .map(|index| {
            Command::new(&exe)
                .args(["--exact", "appends_from_separate_processes_are_kept", "--test-threads=1"])
                .env(CHILD_REGISTRY_ENV, &path)
                .env(CHILD_INDEX_ENV, index.to_string())
                .spawn()
                .unwrap()
        })
        .collect::<Vec<_>>();

    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let recorded = ZkLibraryRegistry::new(&path).read().unwrap();
    assert_eq!(sorted(recorded), sorted((0..PROCESSES).map(record).collect()));
}

#[test]
fn corrupt_registry_is_reported_and_lock_released() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ZkLibraryRegistry::new(dir.path().join("libs.json"))
        .with_lock_policy(LockRetryPolicy::no_retry());
    fs::write(registry.path(), "[{\"contractName\": ").unwrap();

    let err = registry.append(&[record(0)]).unwrap_err();
    assert!(matches!(err, LibraryRegistryError::Corrupt { .. }), "{err}");
    assert_eq!(fs::read_to_string(registry.path()).unwrap(), "[{\"contractName\": ");

    // an object is valid JSON, but not a registry
    fs::write(registry.path(), "{}").unwrap();
    let err = registry.append(&[record(0)]).unwrap_err();
    assert!(matches!(err, LibraryRegistryError::Corrupt { .. }), "{err}");

    fs::write(registry.path(), "[]").unwrap();
    registry.append(&[record(1)]).unwrap();
    assert_eq!(registry.read().unwrap(), vec![record(1)]);
}

#[test]
fn held_lock_times_out_without_touching_registry() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let policy = LockRetryPolicy {
        retries: 3,
        min_timeout: Duration::from_millis(1),
        max_timeout: Duration::from_millis(20),
    };
    let registry = ZkLibraryRegistry::new(dir.path().join("libs.json")).with_lock_policy(policy);
    registry.append(&[record(0)]).unwrap();

    let held = LockFile::acquire(registry.lock_path(), &LockRetryPolicy::no_retry()).unwrap();
    let err = registry.append(&[record(1)]).unwrap_err();
    assert!(matches!(err, LibraryRegistryError::LockTimeout { attempts: 4, .. }), "{err}");
    drop(held);

    assert_eq!(registry.read().unwrap(), vec![record(0)]);
    registry.append(&[record(1)]).unwrap();
    assert_eq!(registry.read().unwrap(), vec![record(0), record(1)]);
}

#[test]
fn unwritable_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let registry = ZkLibraryRegistry::new(blocker.join("libs.json"));
    assert!(matches!(registry.ensure_exists(), Err(LibraryRegistryError::Io { .. })));
}
