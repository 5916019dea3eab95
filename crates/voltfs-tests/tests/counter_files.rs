//! Counter special-file tests, reproducing the original self-increment-once
//! demonstration semantics.

use voltfs_core::FsError;
use voltfs_tests::{init_tracing, TestFs};

#[test]
fn test_counter_increments_once_per_handle() {
    init_tracing();
    let fs = TestFs::with_counters();

    let h = fs.open("/counter").unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"0\n");
    // The same handle sees the pre-increment snapshot, not "1\n".
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"0\n");
    fs.close(h).unwrap();

    let h = fs.open("/counter").unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"1\n");
    fs.close(h).unwrap();
}

#[test]
fn test_counters_are_independent() {
    init_tracing();
    let fs = TestFs::with_counters();

    for _ in 0..3 {
        let h = fs.open("/counter").unwrap();
        fs.read(h, 16).unwrap();
        fs.close(h).unwrap();
    }

    let h = fs.open("/subdir/subcounter").unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"0\n");
    fs.close(h).unwrap();
}

#[test]
fn test_counter_write_resets_value() {
    init_tracing();
    let fs = TestFs::with_counters();

    let h = fs.open("/counter").unwrap();
    fs.write(h, b"100\n").unwrap();
    fs.close(h).unwrap();

    let h = fs.open("/counter").unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"100\n");
    fs.close(h).unwrap();
}

#[test]
fn test_counter_write_at_offset_rejected() {
    init_tracing();
    let fs = TestFs::with_counters();

    let h = fs.open("/counter").unwrap();
    fs.read(h, 16).unwrap();
    assert!(matches!(
        fs.write(h, b"5"),
        Err(FsError::InvalidArgument(_))
    ));
    fs.close(h).unwrap();
}

#[test]
fn test_counter_whole_file_read_terminates() {
    init_tracing();
    let fs = TestFs::with_counters();

    // A whole-file read must finish despite the snapshot replay on every
    // read call, and still counts as one handle.
    assert_eq!(fs.read_file("/counter").unwrap(), b"0\n");
    assert_eq!(fs.read_file("/counter").unwrap(), b"1\n");
}

#[test]
fn test_counter_stat_reflects_rendered_text() {
    init_tracing();
    let fs = TestFs::with_counters();

    // Counter 0 renders as "0\n".
    assert_eq!(fs.stat("/counter").unwrap().size, 2);

    let h = fs.open("/counter").unwrap();
    fs.write(h, b"1234").unwrap();
    fs.close(h).unwrap();
    assert_eq!(fs.stat("/counter").unwrap().size, 5);
}
