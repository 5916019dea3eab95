//! Orphaned-inode lifecycle: unlink while open keeps the inode alive until
//! the last handle closes.

use voltfs_core::FsError;
use voltfs_tests::{init_tracing, TestFs};

#[test]
fn test_orphan_then_free() {
    init_tracing();
    let fs = TestFs::new();

    fs.write_file("/f", b"before unlink").unwrap();
    let h = fs.open("/f").unwrap();

    fs.unlink("/f").unwrap();
    assert!(matches!(fs.lookup("/f"), Err(FsError::NotFound(_))));

    // IO through the surviving handle still works.
    assert_eq!(fs.read(h, 64).unwrap().as_ref(), b"before unlink");
    fs.seek(h, 0).unwrap();
    assert_eq!(fs.write(h, b"after  unlink").unwrap(), 13);
    fs.seek(h, 0).unwrap();
    assert_eq!(fs.read(h, 64).unwrap().as_ref(), b"after  unlink");

    let extents_before_close = fs.table().store().extent_count();
    fs.close(h).unwrap();
    // The last close freed record and storage.
    assert_eq!(fs.table().store().extent_count(), extents_before_close - 1);
    assert!(matches!(fs.open("/f"), Err(FsError::NotFound(_))));
}

#[test]
fn test_orphan_survives_intermediate_closes() {
    init_tracing();
    let fs = TestFs::new();

    fs.write_file("/f", b"x").unwrap();
    let h1 = fs.open("/f").unwrap();
    let h2 = fs.open("/f").unwrap();
    fs.unlink("/f").unwrap();

    fs.close(h1).unwrap();
    // One handle remains; the inode is still alive.
    assert_eq!(fs.read(h2, 8).unwrap().as_ref(), b"x");
    fs.close(h2).unwrap();
    assert!(matches!(fs.read(h2, 1), Err(FsError::InvalidArgument(_))));
}

#[test]
fn test_hard_link_prevents_orphaning() {
    init_tracing();
    let fs = TestFs::new();

    fs.write_file("/orig", b"content").unwrap();
    fs.link("/orig", "/alias").unwrap();
    let h = fs.open("/orig").unwrap();

    fs.unlink("/orig").unwrap();
    fs.close(h).unwrap();

    // The alias edge keeps the inode live after the close.
    assert_eq!(fs.read_file("/alias").unwrap(), b"content");
}

#[test]
fn test_rename_victim_orphaned_while_open() {
    init_tracing();
    let fs = TestFs::new();

    fs.write_file("/src", b"new").unwrap();
    fs.write_file("/dst", b"old").unwrap();
    let h = fs.open("/dst").unwrap();

    // Replacing the destination unlinks its inode, but the open handle
    // keeps the old content readable.
    fs.rename("/src", "/dst").unwrap();
    assert_eq!(fs.read(h, 8).unwrap().as_ref(), b"old");
    fs.close(h).unwrap();

    assert_eq!(fs.read_file("/dst").unwrap(), b"new");
}
