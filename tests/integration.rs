//! Integration tests exercising the public API end to end.
//!
//! These tests verify that:
//! 1. Sync and copy dispatch through the copy registry per scheme pair
//! 2. A missing destination parent is created and the copy retried once
//! 3. Brace-expanded globs span backends and keep alternative order
//! 4. The caching façade materializes and writes back remote files
//! 5. Errors carry useful context

use smartfs::*;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn store() -> Arc<MemoryObjectClient> {
    Arc::new(MemoryObjectClient::new().with_bucket("bucket"))
}

fn smart(client: Arc<MemoryObjectClient>) -> SmartFs {
    SmartFs::builder().object_client(client).build()
}

fn path_str(path: &Path) -> String {
    path.to_str().unwrap().to_string()
}

type Calls = Arc<Mutex<Vec<(String, String)>>>;

/// A `file -> file` strategy that only records what it was asked to do.
fn recording_fs() -> (SmartFs, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&calls);
    let mut registry = CopyRegistry::new();
    registry
        .register(
            "file",
            "file",
            Arc::new(move |req: &CopyRequest<'_>| -> Result<(), SmartError> {
                seen.lock()
                    .unwrap()
                    .push((req.src.path().to_string(), req.dst.path().to_string()));
                Ok(())
            }),
        )
        .unwrap();
    (SmartFs::builder().copy_funcs(registry).build(), calls)
}

// =============================================================================
// Sync Dispatch
// =============================================================================

#[test]
fn sync_directory_calls_copy_once_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("folder");
    fs::create_dir_all(src.join("folderA")).unwrap();
    fs::write(src.join("fileA"), b"A").unwrap();
    fs::write(src.join("folderA/fileB"), b"B").unwrap();
    let dst = path_str(&dir.path().join("target"));
    let (smart, calls) = recording_fs();

    smart.sync(&path_str(&src), &dst, None).unwrap();
    let mut first = calls.lock().unwrap().clone();
    first.sort();
    assert_eq!(
        first,
        vec![
            (path_str(&src.join("fileA")), format!("{dst}/fileA")),
            (
                path_str(&src.join("folderA/fileB")),
                format!("{dst}/folderA/fileB")
            ),
        ]
    );

    // Nothing was actually written, so a second run does the same work.
    smart.sync(&path_str(&src), &dst, None).unwrap();
    assert_eq!(calls.lock().unwrap().len(), 4);
}

#[test]
fn sync_single_file_copies_to_destination_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("only.txt");
    fs::write(&src, b"x").unwrap();
    let dst = path_str(&dir.path().join("renamed.txt"));
    let (smart, calls) = recording_fs();

    smart.sync(&path_str(&src), &dst, None).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![(path_str(&src), dst)]);
}

#[test]
fn sync_local_tree_round_trips_through_object_store() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("folder");
    fs::create_dir_all(src.join("folderA")).unwrap();
    fs::write(src.join("fileA"), b"AAA").unwrap();
    fs::write(src.join("folderA/fileB"), b"BB").unwrap();
    let smart = smart(store());

    let total = AtomicUsize::new(0);
    let cb = |n: u64| {
        total.fetch_max(n as usize, Ordering::SeqCst);
    };
    smart.sync(&path_str(&src), "s3://bucket/backup", Some(&cb)).unwrap();
    assert_eq!(total.load(Ordering::SeqCst), 3);

    let back = dir.path().join("restored");
    smart.sync("s3://bucket/backup", &path_str(&back), None).unwrap();
    assert_eq!(fs::read(back.join("fileA")).unwrap(), b"AAA");
    assert_eq!(fs::read(back.join("folderA/fileB")).unwrap(), b"BB");
}

// =============================================================================
// Missing Parent Retry
// =============================================================================

#[test]
fn copy_retries_after_creating_parent() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::write(&src, b"payload").unwrap();
    let dst = dir.path().join("deep/nested/dst");
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let mut smart = SmartFs::builder().copy_funcs(CopyRegistry::new()).build();
    smart
        .register_copy_func(
            "file",
            "file",
            Arc::new(move |req: &CopyRequest<'_>| -> Result<(), SmartError> {
                counter.fetch_add(1, Ordering::SeqCst);
                let dst = Path::new(req.dst.path());
                if !dst.parent().is_some_and(Path::exists) {
                    return Err(SmartError::NotFound {
                        path: req.dst.path().to_string(),
                    });
                }
                fs::copy(req.src.path(), dst)
                    .map(|_| ())
                    .map_err(|e| SmartError::from_io("copy", req.dst.path(), e))
            }),
        )
        .unwrap();

    smart.copy(&path_str(&src), &path_str(&dst), None).unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(fs::read(&dst).unwrap(), b"payload");
}

#[test]
fn copy_retry_happens_only_once() {
    let dir = tempfile::tempdir().unwrap();
    let dst = path_str(&dir.path().join("a/b"));
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);

    let mut registry = CopyRegistry::new();
    registry
        .register(
            "file",
            "file",
            Arc::new(move |req: &CopyRequest<'_>| -> Result<(), SmartError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SmartError::NotFound {
                    path: req.dst.path().to_string(),
                })
            }),
        )
        .unwrap();
    let smart = SmartFs::builder().copy_funcs(registry).build();

    let err = smart.copy("/anything", &dst, None).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(dir.path().join("a").is_dir());
}

#[test]
fn duplicate_copy_func_keeps_first() {
    let mut smart = SmartFs::new();
    let err = smart
        .register_copy_func("s3", "s3", Arc::new(same_backend_copy))
        .unwrap_err();
    assert_eq!(err.to_string(), "copy function has already existed: s3->s3");
    assert_eq!(smart.copy_funcs().len(), 4);
}

// =============================================================================
// Cross-Backend Glob
// =============================================================================

#[test]
fn glob_merges_backends_in_alternative_order() {
    let dir = tempfile::tempdir().unwrap();
    let local = path_str(dir.path());
    fs::write(dir.path().join("b.log"), b"").unwrap();
    fs::write(dir.path().join("a.log"), b"").unwrap();
    fs::write(dir.path().join("skip.txt"), b"").unwrap();
    let smart = smart(store());
    smart.save_content("s3://bucket/logs/c.log", b"").unwrap();
    smart.save_content("s3://bucket/logs/deep/d.log", b"").unwrap();

    let found = smart
        .glob(&format!("{{s3://bucket/logs,{local}}}/*.log"))
        .unwrap();
    assert_eq!(
        found,
        vec![
            "s3://bucket/logs/c.log".to_string(),
            format!("{local}/a.log"),
            format!("{local}/b.log"),
        ]
    );

    let recursive = smart.glob("s3://bucket/logs/**/*.log").unwrap();
    assert!(recursive.contains(&"s3://bucket/logs/deep/d.log".to_string()));

    let entries = smart.glob_entries(&format!("{local}/*.txt")).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].stat.is_file());
}

// =============================================================================
// Caching Façade
// =============================================================================

#[test]
fn cache_exposes_remote_file_locally() {
    let smart = smart(store());
    smart.save_text("s3://bucket/config.ini", "[core]\n").unwrap();

    let text = smart
        .with_cache("s3://bucket/config.ini", "r", |path| {
            fs::read_to_string(path).map_err(|e| SmartError::from_io("read", "cache", e))
        })
        .unwrap();
    assert_eq!(text, "[core]\n");
}

#[test]
fn cache_writes_back_on_success_only() {
    let smart = smart(store());
    let failed: Result<(), SmartError> = smart.with_cache("s3://bucket/new.bin", "wb", |path| {
        fs::write(path, b"half").unwrap();
        Err(SmartError::Backend("tool crashed".into()))
    });
    assert!(failed.is_err());
    assert!(!smart.exists("s3://bucket/new.bin").unwrap());

    let handle = smart.cache("s3://bucket/new.bin", "wb").unwrap();
    fs::write(handle.path(), b"whole").unwrap();
    handle.close().unwrap();
    assert_eq!(smart.load_content("s3://bucket/new.bin", None, None).unwrap(), b"whole");
}

// =============================================================================
// File Access
// =============================================================================

#[test]
fn load_content_slices_like_a_sequence() {
    let smart = smart(store());
    smart.save_content("s3://bucket/abc", b"abcdefgh").unwrap();

    assert_eq!(smart.load_content("s3://bucket/abc", Some(2), Some(5)).unwrap(), b"cde");
    assert_eq!(smart.load_content("s3://bucket/abc", Some(-3), None).unwrap(), b"fgh");
    assert_eq!(smart.load_content("s3://bucket/abc", None, Some(100)).unwrap(), b"abcdefgh");
    assert_eq!(smart.load_content("s3://bucket/abc", Some(4), Some(4)).unwrap(), b"");
    let err = smart.load_content("s3://bucket/abc", Some(6), Some(-4)).unwrap_err();
    assert!(matches!(err, SmartError::RangeError { start: 6, stop: 4, .. }));
}

#[test]
fn open_modes_across_backends() {
    let dir = tempfile::tempdir().unwrap();
    let local = path_str(&dir.path().join("f.txt"));
    let smart = smart(store());

    let mut file = smart.open(&local, "w+").unwrap();
    file.write_text("local").unwrap();
    file.close().unwrap();

    let mut file = smart.open(&local, "a").unwrap();
    file.write_all(b"!").unwrap();
    file.close().unwrap();
    assert_eq!(smart.load_text(&local).unwrap(), "local!");

    let mut file = smart.open(&local, "rb").unwrap();
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    assert_eq!(buf, b"local!");

    let err = smart.open("s3://bucket/f", "wb+").err().unwrap();
    assert!(err.to_string().contains("wb+"), "{err}");
    let err = smart.open("s3://bucket/f", "+bw").err().unwrap();
    assert!(err.to_string().contains("\"+bw\""), "{err}");
    assert!(smart.open("s3://bucket/missing", "r").err().unwrap().is_not_found());
}

#[test]
fn metadata_and_listing() {
    let smart = smart(store());
    smart.save_content("s3://bucket/dir/one", b"1").unwrap();
    smart.save_content("s3://bucket/dir/two", b"22").unwrap();

    assert_eq!(smart.listdir("s3://bucket/dir").unwrap(), vec!["one", "two"]);
    assert_eq!(smart.getsize("s3://bucket/dir/two").unwrap(), 2);
    assert!(smart.is_dir("s3://bucket/dir").unwrap());
    assert!(!smart.is_symlink("s3://bucket/dir/one").unwrap());
    assert!(smart.stat("s3://bucket/dir/none").unwrap_err().is_not_found());

    smart.remove("s3://bucket/dir", false).unwrap();
    assert!(!smart.exists("s3://bucket/dir/one").unwrap());
    smart.unlink("s3://bucket/dir/one", true).unwrap();
}

#[test]
fn move_between_object_store_and_local() {
    let dir = tempfile::tempdir().unwrap();
    let smart = smart(store());
    smart.save_content("s3://bucket/moving/x", b"x").unwrap();
    let dst = path_str(&dir.path().join("landed"));

    smart.move_path("s3://bucket/moving", &dst).unwrap();
    assert!(!smart.exists("s3://bucket/moving/x").unwrap());
    assert_eq!(fs::read(dir.path().join("landed/x")).unwrap(), b"x");
}

// =============================================================================
// Routing Errors
// =============================================================================

#[test]
fn unknown_schemes_and_bad_stdio_paths_fail() {
    let smart = SmartFs::new();
    assert!(matches!(
        smart.exists("s3://bucket/key"),
        Err(SmartError::UnsupportedScheme { .. })
    ));
    assert!(matches!(
        smart.exists("ftp://host/x"),
        Err(SmartError::UnsupportedScheme { .. })
    ));
    assert!(matches!(
        smart.open("stdio://stdout", "w"),
        Err(SmartError::InvalidPath { .. })
    ));
    assert!(matches!(
        smart.open("stdio://-", "r+"),
        Err(SmartError::InvalidMode { .. })
    ));
    assert!(matches!(
        smart.listdir("stdio://-"),
        Err(SmartError::NotSupported { .. })
    ));
}

#[test]
fn path_helpers_are_scheme_aware() {
    assert_eq!(path_join("s3://bucket", &["dir/", "/key"]), "s3://bucket/dir/key");
    assert_eq!(path_join("/a", &["b", "../c"]), "/a/c");
    assert_eq!(parent("s3://bucket/dir/key").as_deref(), Some("s3://bucket/dir"));
    assert_eq!(split_scheme("file:///tmp/x"), (Some("file"), "/tmp/x"));
    assert_eq!(expand("{a,b}c").unwrap(), vec!["ac", "bc"]);
}
