// Changes the process working directory, so it stays the only test in this binary.

mod common;

use std::env;

use common::{cube_stl, write_file};
use scadcheck::{build_default_registry, SourceScanner};

#[test]
fn expect_reference_found_from_the_working_directory() {
    let root = tempfile::tempdir().unwrap();
    let root_path = root.path().canonicalize().unwrap();
    write_file(&root_path, "refs/cube.stl", &cube_stl(1.0));
    let part = write_file(
        &root_path,
        "models/part.scad",
        "cube(1); ///EXPECT:refs/cube.stl\n",
    );
    let registry = build_default_registry();

    let previous = env::current_dir().unwrap();
    env::set_current_dir(&root_path).unwrap();
    let scanned = SourceScanner::new(&registry).scan_file(&part);
    env::set_current_dir(previous).unwrap();

    let cases = scanned.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].actions[0].identifier(), "EXPECT");
}
