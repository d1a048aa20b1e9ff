use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn recipes_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("recipes")
}

#[allow(deprecated)]
fn dunepack_cmd() -> Command {
    let mut cmd = Command::cargo_bin("dunepack").unwrap();
    cmd.env_remove("DUNEPACK_RECIPES").arg("--recipes").arg(recipes_dir());
    cmd
}

#[test]
fn test_resolve_default_dune() {
    dunepack_cmd()
        .args(["resolve", "dune", "--prefix", "/opt/dune"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dune@2.7+shared"))
        .stdout(predicate::str::contains("dune-localfunctions"))
        .stdout(predicate::str::contains("bin/dunecontrol"))
        .stderr(predicate::str::contains("Resolving"));
}

#[test]
fn test_resolve_rejects_missing_requirement() {
    dunepack_cmd()
        .args(["resolve", "dune@2.7+pdelab"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires '+functions'"));
}

#[test]
fn test_resolve_declared_conflict() {
    dunepack_cmd()
        .args(["resolve", "dune@2.6+codegen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("conflicts with '+codegen'"));
}

#[test]
fn test_resolve_json() {
    dunepack_cmd()
        .args([
            "resolve",
            "dune@2.7+pdelab+functions+typetree",
            "--prefix",
            "/opt/dune",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"package\": \"dune\""))
        .stdout(predicate::str::contains("\"name\": \"dune-pdelab\""));
}

#[test]
fn test_unknown_package() {
    dunepack_cmd()
        .args(["resolve", "dune-nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown package 'dune-nonexistent'"));
}

#[test]
fn test_flags() {
    dunepack_cmd()
        .args(["flags", "dune~shared"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "-DCMAKE_BUILD_TYPE:STRING=RelWithDebInfo\n",
        ))
        .stdout(predicate::str::contains("-DBUILD_SHARED_LIBS:BOOL=OFF"));
}

#[test]
fn test_opts() {
    dunepack_cmd()
        .args(["opts", "dune@2.7+python", "--prefix", "/opt/dune"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("CMAKE_FLAGS=\""))
        .stdout(predicate::str::contains("'system'"))
        .stdout(predicate::str::contains("-DCMAKE_INSTALL_PREFIX=/opt/dune\""));
}

#[test]
fn test_opts_for_cmake_package_fails() {
    dunepack_cmd()
        .args(["opts", "funcep", "--prefix", "/opt/funcep"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not built with dunecontrol"));
}
