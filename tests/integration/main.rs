//! Integration tests for ppbt

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// ppbt with its work root and config file isolated under `home`
    fn ppbt(home: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("ppbt");
        cmd.env("PPBT_DATA", home.join("work"))
            .env("PPBT_CONFIG", home.join("config.toml"))
            .env_remove("CI");
        cmd
    }

    /// Package a small fake toolchain into the work root
    fn package_fake_toolchain(home: &Path) {
        let build = home.join("scratch");
        let tree = build.join("x86_64-linux-gnu");
        fs::create_dir_all(tree.join("bin")).unwrap();
        fs::create_dir_all(tree.join("x86_64-linux-gnu/sysroot/lib")).unwrap();
        fs::write(tree.join("bin/x86_64-linux-gnu-gcc"), b"gcc").unwrap();
        fs::write(tree.join("x86_64-linux-gnu/sysroot/lib/libc.so"), b"libc").unwrap();

        let triplet = ppbt::triplet::Triplet::resolve("x86_64", "linux").unwrap();
        ppbt::package::Archiver::new(home.join("work/toolchain"), "ppbt/_toolchain")
            .package(&build, &triplet)
            .unwrap();
    }

    #[test]
    fn help_displays() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("toolchain"));
    }

    #[test]
    fn version_displays() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ppbt"));
    }

    #[test]
    fn triplet_resolves() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["triplet", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .success()
            .stdout("x86_64-linux-gnu\n");

        ppbt(home.path())
            .args(["triplet", "--machine", "ARM64", "--platform", "darwin"])
            .assert()
            .success()
            .stdout("ARM64-macos\n");
    }

    #[test]
    fn triplet_unknown_platform() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["triplet", "--machine", "x86_64", "--platform", "haiku"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown platform haiku"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn config_path() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[generator]"))
            .stdout(predicate::str::contains("namespace = \"ppbt/_toolchain\""));
    }

    #[test]
    fn config_init_writes_once() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(home.path().join("config.toml").is_file());

        ppbt(home.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[generator]\nversion = \"not-a-version\"\n",
        )
        .unwrap();
        ppbt(home.path())
            .args(["list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn list_empty() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout("[]\n");
    }

    #[test]
    fn list_shows_packaged_toolchain() {
        let home = TempDir::new().unwrap();
        package_fake_toolchain(home.path());
        ppbt(home.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("x86_64-linux-gnu\n");
    }

    #[test]
    fn env_requires_extraction() {
        let home = TempDir::new().unwrap();
        package_fake_toolchain(home.path());
        ppbt(home.path())
            .args(["env", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Toolchain not extracted"))
            .stderr(predicate::str::contains("ppbt extract"));
    }

    #[test]
    fn env_auto_extracts() {
        let home = TempDir::new().unwrap();
        package_fake_toolchain(home.path());
        let dir = home.path().join("work/toolchain/x86_64-linux-gnu");

        ppbt(home.path())
            .args([
                "env",
                "--auto-extract",
                "--format",
                "json",
                "--machine",
                "x86_64",
                "--platform",
                "linux",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"CC\""))
            .stdout(predicate::str::contains("x86_64-linux-gnu-gcc"));
        assert!(dir.join("bin/x86_64-linux-gnu-gcc").is_file());

        ppbt(home.path())
            .args(["env", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .success()
            .stdout(predicate::str::contains("export LDFLAGS='-L"));
    }

    #[test]
    fn extract_without_archive_fails() {
        let home = TempDir::new().unwrap();
        ppbt(home.path())
            .args(["extract", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Toolchain archive not found"))
            .stderr(predicate::str::contains("ppbt build"));
    }

    #[test]
    fn extract_then_skip() {
        let home = TempDir::new().unwrap();
        package_fake_toolchain(home.path());
        ppbt(home.path())
            .args(["extract", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Toolchain extracted"));

        ppbt(home.path())
            .args(["extract", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already extracted"));
    }

    #[test]
    fn build_without_shipped_config_exits_2() {
        let home = TempDir::new().unwrap();
        // A compiled generator is already present, so no download happens.
        let generator = home.path().join("work/src/crosstool-ng-1.26.0");
        fs::create_dir_all(&generator).unwrap();
        fs::write(generator.join("ct-ng"), b"#!/bin/sh\n").unwrap();

        ppbt(home.path())
            .args(["build", "--machine", "x86_64", "--platform", "linux"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Toolchain config missing"));
    }
}
