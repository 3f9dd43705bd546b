//! Binary-level tests: manifest in, exit code and artifact out.

#![cfg(unix)]

mod common;

use assert_cmd::Command;
use common::Fixture;
use predicates::prelude::*;

fn command(fx: &Fixture) -> Command {
    let tools = fx.tools_dir();
    let mut cmd = Command::cargo_bin("kodegen_bundler_pkg").unwrap();
    cmd.current_dir(fx.path())
        .env("PKGBUILD", tools.join("pkgbuild"))
        .env("PRODUCTBUILD", tools.join("productbuild"))
        .env("PRODUCTSIGN", tools.join("productsign"))
        .env("SECURITY", tools.join("security"))
        .env_remove("PKG_SIGNING_IDENTITY")
        .env_remove("RUST_LOG");
    cmd
}

fn manifest(fx: &Fixture, extra: &str) {
    fx.app("build/App.app");
    fx.write(
        "pkg.toml",
        &format!(
            r#"output = "dist/App.pkg"
identifier = "com.x.app"
version = "2.1.0"

[[files]]
source = "build/App.app"
destination = "/Applications/App.app"
{extra}"#
        ),
    );
}

#[test]
fn builds_flat_package_from_manifest() {
    let fx = Fixture::new();
    manifest(&fx, "");

    command(&fx)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created flat package"));

    assert!(fx.path().join("dist/App.pkg").is_file());
    let args = fx.args("pkgbuild").unwrap();
    assert!(args.contains(&"2.1.0".to_string()));
}

#[test]
fn json_report_describes_the_artifact() {
    let fx = Fixture::new();
    manifest(&fx, "");

    let output = command(&fx).arg("--json").assert().success().get_output().stdout.clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(report["package_type"], "flat");
    assert_eq!(report["signed"], false);
    assert_eq!(report["checksum"].as_str().unwrap().len(), 64);
    assert!(report["path"].as_str().unwrap().ends_with("dist/App.pkg"));
}

#[test]
fn distribution_table_builds_a_distribution() {
    let fx = Fixture::new();
    manifest(&fx, "\n[distribution]\ntitle = \"App\"\nlicense = { file = \"LICENSE.md\" }\n");
    fx.write("LICENSE.md", "MIT");

    command(&fx)
        .args(["--output", "out/Installer.pkg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created distribution package"));

    assert!(fx.path().join("out/Installer.pkg").is_file());
    assert!(!fx.path().join("dist/App.pkg").exists());
    assert!(fx.capture().join("resources/LICENSE.html").is_file());
}

#[test]
fn signing_failure_exits_nonzero_with_diagnostic() {
    let fx = Fixture::new();
    manifest(&fx, "");

    command(&fx)
        .args(["--sign", "Developer ID Installer: Nobody (NONE)"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("signing identity not found"));

    assert!(!fx.path().join("dist/App.pkg").exists());
}

#[test]
fn allow_unsigned_delivers_anyway() {
    let fx = Fixture::new();
    manifest(&fx, "");

    command(&fx)
        .args(["--sign", "Developer ID Installer: Nobody (NONE)", "--allow-unsigned"])
        .assert()
        .success();

    assert!(fx.path().join("dist/App.pkg").is_file());
}

#[test]
fn missing_manifest_is_an_error() {
    let fx = Fixture::new();

    command(&fx)
        .args(["--manifest", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn invalid_spec_is_rejected_before_any_tool_runs() {
    let fx = Fixture::new();
    fx.write("pkg.toml", "output = \"A.pkg\"\nidentifier = \"com.x.a\"\n");

    command(&fx)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid package configuration"));

    assert!(fx.args("pkgbuild").is_none());
}

#[test]
fn interrupt_abandons_the_build_and_removes_staging() {
    let fx = Fixture::new();
    manifest(&fx, "");
    let started = fx.tools_dir().join("started");
    fx.tool("pkgbuild", &format!("touch '{}'\nsleep 5\n", started.display()));
    let tmp = fx.path().join("tmp");
    std::fs::create_dir_all(&tmp).unwrap();

    let tools = fx.tools_dir();
    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("kodegen_bundler_pkg"))
        .current_dir(fx.path())
        .env("PKGBUILD", tools.join("pkgbuild"))
        .env("PRODUCTBUILD", tools.join("productbuild"))
        .env("PRODUCTSIGN", tools.join("productsign"))
        .env("SECURITY", tools.join("security"))
        .env("TMPDIR", &tmp)
        .env_remove("PKG_SIGNING_IDENTITY")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
    while !started.exists() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    assert!(started.exists(), "pkgbuild never started");
    assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 1);

    let killed = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(130));
    assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);
    assert!(!fx.path().join("dist/App.pkg").exists());
}
