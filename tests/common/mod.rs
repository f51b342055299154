//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     fixture.init("proj");
//!     fixture.command("proj").args(["log"]).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// A sandbox with a shared store, a fake home directory and any number of
/// working directories.
///
/// Commands run with `HOME`, `XDG_CONFIG_HOME` and `XDG_DATA_HOME` pointed
/// into the sandbox, so tests never read or write the real user config.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new fixture with empty `home/`, `store/` and `work/` dirs.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        for dir in ["home", "store", "work"] {
            temp_dir
                .child(dir)
                .create_dir_all()
                .expect("Failed to create fixture directory");
        }
        Self { temp_dir }
    }

    /// Path of the shared store.
    pub fn store(&self) -> PathBuf {
        self.temp_dir.path().join("store")
    }

    /// Path of the fake home directory.
    pub fn home(&self) -> PathBuf {
        self.temp_dir.path().join("home")
    }

    /// Path of working directory `name`, created if missing.
    pub fn work(&self, name: &str) -> PathBuf {
        let child = self.temp_dir.child("work").child(name);
        child
            .create_dir_all()
            .expect("Failed to create working directory");
        child.path().to_path_buf()
    }

    /// Add a file inside working directory `work`.
    pub fn with_file(self, work: &str, path: &str, content: &str) -> Self {
        self.write(work, path, content);
        self
    }

    /// Write (or overwrite) a file inside working directory `work`.
    pub fn write(&self, work: &str, path: &str, content: &str) {
        self.work(work);
        self.temp_dir
            .child("work")
            .child(work)
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Write a binary file inside working directory `work`.
    pub fn write_binary(&self, work: &str, path: &str, content: &[u8]) {
        self.work(work);
        self.temp_dir
            .child("work")
            .child(work)
            .child(path)
            .write_binary(content)
            .expect("Failed to write binary file");
    }

    /// Read a file from working directory `work`.
    pub fn read(&self, work: &str, path: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join("work").join(work).join(path))
            .expect("Failed to read file")
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command running in working directory `work`, isolated from
    /// the real user environment.
    pub fn command(&self, work: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("dynasync");
        let home = self.home();
        cmd.current_dir(self.work(work))
            .env("HOME", &home)
            .env("XDG_CONFIG_HOME", home.join(".config"))
            .env("XDG_DATA_HOME", home.join(".local/share"))
            .env("DYNASYNC_STORE", self.store())
            .env("DYNASYNC_AUTHOR", "tester")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run `dynasync init` in working directory `work` and expect success.
    pub fn init(&self, work: &str) {
        self.command(work).arg("init").assert().success();
    }

    /// Run `dynasync commit -m <message> <files>` and expect success.
    pub fn commit(&self, work: &str, message: &str, files: &[&str]) {
        self.command(work)
            .args(["commit", "-m", message])
            .args(files)
            .assert()
            .success();
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_layout() {
        let fixture = TestFixture::new();
        assert!(fixture.store().is_dir());
        assert!(fixture.home().is_dir());
        assert!(fixture.work("proj").is_dir());
    }

    #[test]
    fn test_fixture_with_file() {
        let fixture = TestFixture::new().with_file("proj", "dir/a.txt", "hello");
        assert_eq!(fixture.read("proj", "dir/a.txt"), "hello");
    }
}
