//! Test harness for voltfs integration tests.

#![warn(rust_2018_idioms)]

pub mod harness;

pub use harness::TestFs;

/// Initializes tracing for tests. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("voltfs_vfs=debug,voltfs_store=debug")
        .with_test_writer()
        .try_init();
}
