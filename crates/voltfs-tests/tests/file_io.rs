//! Regular-file data path tests: cursor semantics, sparse writes, capacity.

use voltfs_core::FsError;
use voltfs_tests::{init_tracing, TestFs};

#[test]
fn test_write_read_roundtrip() {
    init_tracing();
    let fs = TestFs::new();

    fs.create("/hello", 0o644).unwrap();
    let h = fs.open("/hello").unwrap();
    assert_eq!(fs.write(h, b"hello").unwrap(), 5);
    fs.seek(h, 0).unwrap();
    assert_eq!(fs.read(h, 5).unwrap().as_ref(), b"hello");
    fs.close(h).unwrap();
}

#[test]
fn test_cursor_advances_across_calls() {
    init_tracing();
    let fs = TestFs::new();

    fs.write_file("/f", b"abcdef").unwrap();
    let h = fs.open("/f").unwrap();
    assert_eq!(fs.read(h, 2).unwrap().as_ref(), b"ab");
    assert_eq!(fs.read(h, 2).unwrap().as_ref(), b"cd");
    assert_eq!(fs.read(h, 100).unwrap().as_ref(), b"ef");
    // End of data: empty, never an error.
    assert!(fs.read(h, 1).unwrap().is_empty());
    fs.close(h).unwrap();
}

#[test]
fn test_independent_handle_cursors() {
    init_tracing();
    let fs = TestFs::new();

    fs.write_file("/f", b"abcdef").unwrap();
    let h1 = fs.open("/f").unwrap();
    let h2 = fs.open("/f").unwrap();

    assert_eq!(fs.read(h1, 3).unwrap().as_ref(), b"abc");
    assert_eq!(fs.read(h2, 3).unwrap().as_ref(), b"abc");
    assert_eq!(fs.read(h1, 3).unwrap().as_ref(), b"def");

    fs.close(h1).unwrap();
    fs.close(h2).unwrap();
}

#[test]
fn test_sparse_write_zero_fills() {
    init_tracing();
    let fs = TestFs::new();

    fs.create("/sparse", 0o644).unwrap();
    let h = fs.open("/sparse").unwrap();
    fs.seek(h, 4).unwrap();
    fs.write(h, b"xy").unwrap();

    fs.seek(h, 0).unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"\0\0\0\0xy");
    fs.close(h).unwrap();

    assert_eq!(fs.stat("/sparse").unwrap().size, 6);
}

#[test]
fn test_write_extends_size_and_mtime() {
    init_tracing();
    let fs = TestFs::new();

    fs.create("/grow", 0o644).unwrap();
    let before = fs.stat("/grow").unwrap();
    assert_eq!(before.size, 0);

    let h = fs.open("/grow").unwrap();
    fs.write(h, b"0123456789").unwrap();
    fs.close(h).unwrap();

    let after = fs.stat("/grow").unwrap();
    assert_eq!(after.size, 10);
    assert!(after.times.mtime >= before.times.mtime);
}

#[test]
fn test_out_of_space() {
    init_tracing();
    let fs = TestFs::with_capacity(8);

    fs.create("/tiny", 0o644).unwrap();
    let h = fs.open("/tiny").unwrap();
    assert_eq!(fs.write(h, b"12345678").unwrap(), 8);
    assert!(matches!(fs.write(h, b"9"), Err(FsError::OutOfSpace)));

    // The failed write changed nothing.
    fs.seek(h, 0).unwrap();
    assert_eq!(fs.read(h, 16).unwrap().as_ref(), b"12345678");
    fs.close(h).unwrap();
}

#[test]
fn test_capacity_is_per_file() {
    init_tracing();
    let fs = TestFs::with_capacity(8);

    fs.write_file("/a", b"12345678").unwrap();
    fs.write_file("/b", b"12345678").unwrap();
    assert_eq!(fs.read_file("/a").unwrap(), b"12345678");
    assert_eq!(fs.read_file("/b").unwrap(), b"12345678");
}

#[test]
fn test_open_directory_for_io_fails() {
    init_tracing();
    let fs = TestFs::new();

    fs.mkdir("/d", 0o755).unwrap();
    assert!(matches!(fs.open("/d"), Err(FsError::IsADirectory(_))));
}
