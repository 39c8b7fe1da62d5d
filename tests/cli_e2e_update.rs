//! End-to-end tests for the `update` command.
//!
//! These tests invoke the actual CLI binary and validate the behavior of the
//! `update` subcommand from a user's perspective.

mod common;

use common::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_writes_consolidated_pixi_toml() {
    let fixture = TestFixture::new()
        .with_project("core", declarations::CORE)
        .with_project("calc", declarations::CALC);

    let mut cmd = cargo_bin_cmd!("pixi-devenv");
    cmd.current_dir(fixture.project("calc"))
        .args(["update", "--color", "never"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    let pixi = fixture.child("calc/pixi.toml");
    pixi.assert(predicate::str::contains("attrs = \"*\" # From: core"));
    pixi.assert(predicate::str::contains("platforms = [\"linux-64\"]"));
    pixi.assert(predicate::str::contains("pywin32").not());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_dry_run_prints_without_writing() {
    let fixture = TestFixture::new()
        .with_project("core", declarations::CORE)
        .with_project("calc", declarations::CALC);

    let mut cmd = cargo_bin_cmd!("pixi-devenv");
    cmd.arg("update")
        .arg("--dry-run")
        .arg(fixture.project("calc"))
        .assert()
        .success()
        .stdout(predicate::str::contains("# Managed by devenv"));

    fixture
        .child("calc/pixi.toml")
        .assert(predicate::str::diff("[workspace]\n"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_several_directories() {
    let fixture = TestFixture::sample();

    let mut cmd = cargo_bin_cmd!("pixi-devenv");
    cmd.current_dir(fixture.path())
        .args(["update", "app", "calc", "gui", "core"])
        .assert()
        .success();

    fixture
        .child("app/pixi.toml")
        .assert(predicate::str::contains("pyside-extras"));
    fixture
        .child("gui/pixi.toml")
        .assert(predicate::str::contains("gui-channel"));
    fixture
        .child("calc/pixi.toml")
        .assert(predicate::str::contains("qt = \">=5.16,<6\" # From: calc, core"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_platform_override() {
    let fixture = TestFixture::new()
        .with_project("core", declarations::CORE)
        .with_project("calc", declarations::CALC);

    let mut cmd = cargo_bin_cmd!("pixi-devenv");
    cmd.current_dir(fixture.project("calc"))
        .args(["update", "--platform", "win-64"])
        .assert()
        .success();

    let pixi = fixture.child("calc/pixi.toml");
    pixi.assert(predicate::str::contains("platforms = [\"win-64\"]"));
    pixi.assert(predicate::str::contains("pywin32"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_update_second_run_changes_nothing() {
    let fixture = TestFixture::sample();

    cargo_bin_cmd!("pixi-devenv")
        .current_dir(fixture.project("app"))
        .arg("update")
        .assert()
        .success();
    let first = fixture.pixi_toml("app");

    cargo_bin_cmd!("pixi-devenv")
        .current_dir(fixture.project("app"))
        .arg("update")
        .assert()
        .success();

    assert_eq!(fixture.pixi_toml("app"), first);
}
