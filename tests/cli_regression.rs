// Regression tests for the scadcheck binary: exit codes, report text and
// miette-rendered diagnostics.

mod common;

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use common::{cube_stl, write_file};
use predicates::{prelude::PredicateBooleanExt, str::contains};

/// Stand-in for OpenSCAD: copies `fixture` to the `-o` path, or fails when the
/// isolated statement is `fail(...)`. Run through `/bin/sh` from a config file.
fn fake_openscad(dir: &Path, fixture: &Path) -> PathBuf {
    let script = format!(
        r#"out=""
src=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    *) src="$1" ;;
  esac
  shift
done
if grep -q '^!fail' "$src"; then
  echo "ERROR: Parser error" >&2
  exit 1
fi
cp "{}" "$out"
"#,
        fixture.display()
    );
    let script = write_file(dir, "fake-openscad.sh", &script);
    let config = format!(
        "compiler: /bin/sh\nbaseline_args: [\"{}\"]\ntimeout_secs: 30\n",
        script.display()
    );
    write_file(dir, "scadcheck.yaml", &config)
}

fn scadcheck(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scadcheck").unwrap();
    cmd.env_remove("SCADCHECK_OPENSCAD")
        .arg("--no-color")
        .arg("--config")
        .arg(config);
    cmd
}

#[cfg(unix)]
#[test]
fn passing_file_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_file(dir.path(), "cube2.stl", &cube_stl(2.0));
    let config = fake_openscad(dir.path(), &fixture);
    let part = write_file(
        dir.path(),
        "part.scad",
        "cube(2); ///ASSERT:volume=8,size_z=2\ncube(2); ///EXPECT:cube2.stl\n",
    );

    scadcheck(&config)
        .arg(&part)
        .assert()
        .success()
        .stdout(contains("Running TestSuite: part.scad"))
        .stdout(contains("part.scad:1 ... OK"))
        .stdout(contains("part.scad:2 ... OK"))
        .stdout(contains("Result: OK"));
}

#[cfg(unix)]
#[test]
fn failures_are_counted_and_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_file(dir.path(), "cube2.stl", &cube_stl(2.0));
    let config = fake_openscad(dir.path(), &fixture);
    let part = write_file(
        dir.path(),
        "part.scad",
        "cube(2); ///ASSERT:volume=9\nfail(); ///ASSERT:volume=8\ncube(2); ///ASSERT:volume=8\n",
    );

    scadcheck(&config)
        .arg(&part)
        .assert()
        .code(1)
        .stdout(contains("Actual: \"volume\" == \"8\""))
        .stdout(contains("ERROR: Parser error"))
        .stdout(contains("part.scad:3 ... OK"))
        .stdout(contains("NOK: total errors: 2"));
}

#[cfg(unix)]
#[test]
fn directory_mode_runs_top_level_files_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_file(dir.path(), "cube2.stl", &cube_stl(2.0));
    let config = fake_openscad(dir.path(), &fixture);
    let models = dir.path().join("models");
    write_file(&models, "b.scad", "cube(2); ///ASSERT:volume=8\n");
    write_file(&models, "a.scad", "cube(2); ///ASSERT:volume=8\n");
    write_file(&models, "nested/c.scad", "cube(2); ///ASSERT:volume=1\n");

    let output = scadcheck(&config)
        .arg("-d")
        .arg(&models)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let a = stdout.find("Running TestSuite: a.scad").unwrap();
    let b = stdout.find("Running TestSuite: b.scad").unwrap();
    assert!(a < b);
    assert!(!stdout.contains("c.scad"));
}

#[cfg(unix)]
#[test]
fn malformed_directive_is_reported_as_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_file(dir.path(), "cube2.stl", &cube_stl(2.0));
    let config = fake_openscad(dir.path(), &fixture);
    let part = write_file(dir.path(), "part.scad", "cube(2); ///MEASURE:volume=8\n");

    scadcheck(&config)
        .arg(&part)
        .assert()
        .failure()
        .stderr(contains("scadcheck::parse").and(contains("MEASURE")));
}

#[test]
fn missing_compiler_is_reported_as_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let part = write_file(dir.path(), "part.scad", "cube(2); ///ASSERT:volume=8\n");

    Command::cargo_bin("scadcheck")
        .unwrap()
        .arg("--openscad")
        .arg(dir.path().join("no-such-openscad"))
        .arg(&part)
        .assert()
        .failure()
        .stderr(contains("scadcheck::compiler_spawn").or(contains("could not start")));
}

#[test]
fn file_and_directory_are_mutually_exclusive() {
    Command::cargo_bin("scadcheck")
        .unwrap()
        .arg("part.scad")
        .arg("-d")
        .arg("models")
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn an_input_is_required() {
    Command::cargo_bin("scadcheck")
        .unwrap()
        .assert()
        .failure()
        .stderr(contains("required"));
}

#[test]
fn nonexistent_file_is_a_usage_error() {
    Command::cargo_bin("scadcheck")
        .unwrap()
        .arg("/definitely/not/here.scad")
        .assert()
        .failure()
        .stderr(contains("is not a file"));
}
