//! Concurrency tests: serialized directory edits, deadlock-free renames,
//! exactly-once reclamation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use voltfs_core::FsError;
use voltfs_tests::{init_tracing, TestFs};

#[test]
fn test_concurrent_creates_distinct_names() {
    init_tracing();
    let fs = TestFs::new();

    thread::scope(|s| {
        for t in 0..8 {
            let fs = &fs;
            s.spawn(move || {
                for i in 0..50 {
                    fs.create(&format!("/t{t}-f{i}"), 0o644).unwrap();
                }
            });
        }
    });

    assert_eq!(fs.read_dir("/").unwrap().len(), 8 * 50);
}

#[test]
fn test_concurrent_creates_same_name_one_winner() {
    init_tracing();
    let fs = TestFs::new();
    let wins = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..8 {
            let fs = &fs;
            let wins = &wins;
            s.spawn(move || match fs.create("/contested", 0o644) {
                Ok(_) => {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
                Err(FsError::AlreadyExists(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            });
        }
    });

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(fs.read_dir("/").unwrap().len(), 1);
}

#[test]
fn test_opposing_renames_do_not_deadlock() {
    init_tracing();
    let fs = TestFs::new();
    fs.mkdir("/a", 0o755).unwrap();
    fs.mkdir("/b", 0o755).unwrap();
    fs.create("/a/x", 0o644).unwrap();
    fs.create("/b/y", 0o644).unwrap();

    // x ping-pongs a->b while y ping-pongs b->a; the ordered dual locking
    // must never wedge.
    thread::scope(|s| {
        let fs1 = &fs;
        s.spawn(move || {
            for i in 0..100 {
                let (from, to) = if i % 2 == 0 {
                    ("/a/x", "/b/x")
                } else {
                    ("/b/x", "/a/x")
                };
                fs1.rename(from, to).unwrap();
            }
        });
        let fs2 = &fs;
        s.spawn(move || {
            for i in 0..100 {
                let (from, to) = if i % 2 == 0 {
                    ("/b/y", "/a/y")
                } else {
                    ("/a/y", "/b/y")
                };
                fs2.rename(from, to).unwrap();
            }
        });
    });

    // Both entries ended where their even iteration count left them.
    assert!(fs.lookup("/a/x").is_ok());
    assert!(fs.lookup("/b/y").is_ok());
}

#[test]
fn test_rename_atomicity_under_observation() {
    init_tracing();
    let fs = TestFs::new();
    fs.mkdir("/a", 0o755).unwrap();
    fs.mkdir("/b", 0o755).unwrap();
    fs.create("/a/x", 0o644).unwrap();

    thread::scope(|s| {
        let mover = &fs;
        s.spawn(move || {
            // Give the observer time to sample the pre-move state.
            thread::yield_now();
            mover.rename("/a/x", "/b/y").unwrap();
        });

        let observer = &fs;
        s.spawn(move || {
            for _ in 0..1000 {
                // Destination first: once it is visible the source must be
                // gone, since nothing ever moves the entry back.
                let at_dst = observer.lookup("/b/y").is_ok();
                let at_src = observer.lookup("/a/x").is_ok();
                if at_dst {
                    assert!(!at_src, "entry visible under both names");
                } else if !at_src {
                    // The move completed between the two lookups; the new
                    // binding must be visible now. No in-between state.
                    assert!(observer.lookup("/b/y").is_ok(), "entry vanished");
                }
            }
        });
    });
}

#[test]
fn test_racing_rmdirs_single_winner() {
    init_tracing();
    let fs = TestFs::new();

    // Losers must observe NotFound, never panic, even when the directory
    // inode is freed between their id read and their inode fetch.
    for _ in 0..50 {
        fs.mkdir("/victim", 0o755).unwrap();
        let wins = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..4 {
                let fs = &fs;
                let wins = &wins;
                s.spawn(move || match fs.rmdir("/victim") {
                    Ok(()) => {
                        wins.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(FsError::NotFound(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                });
            }
        });
        assert_eq!(wins.load(Ordering::SeqCst), 1);
    }
    assert_eq!(fs.stat("/").unwrap().nlink, 2);
}

#[test]
fn test_racing_renames_of_one_source() {
    init_tracing();
    let fs = TestFs::new();
    fs.mkdir("/mv", 0o755).unwrap();

    let wins = AtomicUsize::new(0);
    thread::scope(|s| {
        for t in 0..4 {
            let fs = &fs;
            let wins = &wins;
            s.spawn(move || match fs.rename("/mv", &format!("/dst{t}")) {
                Ok(()) => {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
                Err(FsError::NotFound(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            });
        }
    });

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert_eq!(fs.read_dir("/").unwrap().len(), 1);
}

#[test]
fn test_orphan_freed_exactly_once_under_racing_closes() {
    init_tracing();
    let fs = TestFs::new();
    fs.write_file("/f", b"contended").unwrap();

    let handles: Vec<_> = (0..8).map(|_| fs.open("/f").unwrap()).collect();
    fs.unlink("/f").unwrap();

    thread::scope(|s| {
        for h in handles {
            let fs = &fs;
            s.spawn(move || {
                fs.read(h, 16).unwrap();
                fs.close(h).unwrap();
            });
        }
    });

    // Whichever close observed zero links and zero handles freed the inode,
    // and only that one did.
    assert!(matches!(fs.open("/f"), Err(FsError::NotFound(_))));
    assert_eq!(fs.table().store().extent_count(), 0);
}

#[test]
fn test_concurrent_counter_reads_each_increment_once() {
    init_tracing();
    let fs = TestFs::with_counters();

    thread::scope(|s| {
        for _ in 0..8 {
            let fs = &fs;
            s.spawn(move || {
                let h = fs.open("/counter").unwrap();
                let first = fs.read(h, 16).unwrap();
                // Re-reads replay this handle's snapshot.
                assert_eq!(fs.read(h, 16).unwrap(), first);
                fs.close(h).unwrap();
            });
        }
    });

    // Eight handles, one increment each.
    let h = fs.open("/counter").unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"8\n");
    fs.close(h).unwrap();
}

#[test]
fn test_concurrent_link_unlink_settles() {
    init_tracing();
    let fs = TestFs::new();
    fs.write_file("/orig", b"x").unwrap();

    thread::scope(|s| {
        for t in 0..4 {
            let fs = &fs;
            s.spawn(move || {
                let alias = format!("/alias{t}");
                for _ in 0..50 {
                    fs.link("/orig", &alias).unwrap();
                    fs.unlink(&alias).unwrap();
                }
            });
        }
    });

    assert_eq!(fs.stat("/orig").unwrap().nlink, 1);
    assert_eq!(fs.read_file("/orig").unwrap(), b"x");
}
