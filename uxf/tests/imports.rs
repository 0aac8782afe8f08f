//! Import resolution: system names, files, duplicates, cycles.

use std::fs;
use std::path::{Path, PathBuf};

use uxf::{compare, dumps, load_with, loads_with, Compare, Event, Options, Severity, Uxf};

const CARGO_TARGET_TMPDIR: &str = env!("CARGO_TARGET_TMPDIR");

#[static_init::dynamic]
static INIT_LOGGER: () = {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .compact()
        .without_time()
        .finish();
};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = Path::new(CARGO_TARGET_TMPDIR).join("imports").join(name);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn quiet_load(path: &std::path::Path) -> Result<Uxf, uxf::Error> {
    let mut quiet = |_: &Event| {};
    load_with(path, &Options::default(), Some(&mut quiet))
}

#[test]
fn system_imports() {
    let mut quiet = |_: &Event| {};
    let uxo = loads_with(
        "uxf 1\n!complex\n!fraction\n[(Complex 1.0 2.0) (Fraction 22 7)]\n",
        "-",
        &Options::default(),
        Some(&mut quiet),
    )
    .unwrap();
    assert_eq!(uxo.imports()["Complex"], "complex");
    assert_eq!(uxo.imports()["Fraction"], "fraction");
    let complex = uxo.tclass("Complex").unwrap();
    assert_eq!(complex.fields()[0].name(), "Real");
    assert_eq!(complex.fields()[0].vtype(), Some("real"));
    // Imported ttypes are written as imports, not definitions.
    let text = dumps(&uxo).unwrap();
    assert!(text.contains("!complex\n"));
    assert!(!text.contains("=Complex"));
}

#[test]
fn file_imports_resolve_relative_to_the_importer() {
    let dir = scratch_dir("relative");
    fs::write(dir.join("ttype-test.uxi"), "uxf 1\n=pair first second\n").unwrap();
    fs::write(
        dir.join("main.uxf"),
        "uxf 1\n!ttype-test.uxi\n[(pair 1 2)]\n",
    )
    .unwrap();
    let uxo = quiet_load(&dir.join("main.uxf")).unwrap();
    assert_eq!(uxo.imports()["pair"], "ttype-test.uxi");
    assert!(uxo.tclass("pair").is_some());
}

#[test]
fn nested_imports_accumulate() {
    let dir = scratch_dir("nested");
    fs::write(dir.join("point.uxi"), "uxf 1\n=point x:int y:int\n").unwrap();
    fs::write(
        dir.join("line.uxi"),
        "uxf 1\n!point.uxi\n=line p1:point p2:point\n",
    )
    .unwrap();
    fs::write(dir.join("main.uxf"), "uxf 1\n!line.uxi\n[line]\n").unwrap();
    let uxo = quiet_load(&dir.join("main.uxf")).unwrap();
    assert!(uxo.tclass("point").is_some());
    assert!(uxo.tclass("line").is_some());
    assert_eq!(uxo.imports()["line"], "line.uxi");
    assert_eq!(uxo.imports()["point"], "line.uxi");
}

#[test]
fn self_import_is_fatal() {
    let dir = scratch_dir("selfimport");
    fs::write(dir.join("i64.uxi"), "uxf 1\n!i64.uxi\n[]\n").unwrap();
    let err = quiet_load(&dir.join("i64.uxi")).unwrap_err();
    assert_eq!(err.code, 176);
}

#[test]
fn circular_imports_are_fatal() {
    let dir = scratch_dir("circular");
    fs::write(dir.join("i65.uxi"), "uxf 1\n!i66.uxi\n[]\n").unwrap();
    fs::write(dir.join("i66.uxi"), "uxf 1\n!i65.uxi\n[]\n").unwrap();
    assert_eq!(quiet_load(&dir.join("i65.uxi")).unwrap_err().code, 580);
    assert_eq!(quiet_load(&dir.join("i66.uxi")).unwrap_err().code, 580);
}

#[test]
fn duplicate_identical_imports_are_free() {
    let dir = scratch_dir("duplicates");
    fs::write(dir.join("pair1.uxi"), "uxf 1\n=pair first second\n").unwrap();
    fs::write(dir.join("pair2.uxi"), "uxf 1\n=pair first second\n").unwrap();
    fs::write(
        dir.join("main.uxf"),
        "uxf 1\n!pair1.uxi\n!pair2.uxi\n[(pair 1 2)]\n",
    )
    .unwrap();
    let uxo = quiet_load(&dir.join("main.uxf")).unwrap();
    // The first source to supply the ttype wins the provenance entry.
    assert_eq!(uxo.imports()["pair"], "pair1.uxi");
}

#[test]
fn conflicting_duplicate_imports_are_fatal() {
    let dir = scratch_dir("conflicts");
    fs::write(dir.join("pair1.uxi"), "uxf 1\n=pair first second\n").unwrap();
    fs::write(dir.join("pair2.uxi"), "uxf 1\n=pair a b c\n").unwrap();
    fs::write(
        dir.join("main.uxf"),
        "uxf 1\n!pair1.uxi\n!pair2.uxi\n[(pair 1 2)]\n",
    )
    .unwrap();
    assert_eq!(quiet_load(&dir.join("main.uxf")).unwrap_err().code, 544);
}

#[test]
fn failed_imports_report_and_continue() {
    let dir = scratch_dir("failures");
    fs::write(dir.join("notuxf.txt"), "User-agent: *\nDisallow:\n").unwrap();
    fs::write(
        dir.join("main.uxf"),
        "uxf 1\n!missing.uxi\n!notuxf.txt\n[]\n",
    )
    .unwrap();
    let mut raised = Vec::new();
    let mut collect = |event: &Event| raised.push((event.severity, event.code));
    let uxo = load_with(&dir.join("main.uxf"), &Options::default(), Some(&mut collect)).unwrap();
    assert!(uxo.tclasses().is_empty());
    // The bad import's own fatal header event is reported, then wrapped
    // as the non-fatal 530.
    assert_eq!(
        raised,
        vec![
            (Severity::Error, 586),
            (Severity::Fatal, 110),
            (Severity::Error, 530),
        ]
    );
}

#[test]
fn replace_imports_makes_standalone() {
    let mut quiet = |_: &Event| {};
    let options = Options { replace_imports: true, ..Options::default() };
    let uxo = loads_with(
        "uxf 1\n!complex\n[(Complex 1.0 2.0)]\n",
        "-",
        &options,
        Some(&mut quiet),
    )
    .unwrap();
    assert!(uxo.imports().is_empty());
    assert!(uxo.tclass("Complex").is_some());
    let text = dumps(&uxo).unwrap();
    assert!(!text.contains('!'));
    assert!(text.contains("=Complex Real:real Imag:real\n"));
}

#[test]
fn drop_unused_drops_ttypes_and_their_imports() {
    let dir = scratch_dir("dropunused");
    fs::write(
        dir.join("shapes.uxi"),
        "uxf 1\n=point x:int y:int\n=dob y:int m:int d:int\n",
    )
    .unwrap();
    fs::write(
        dir.join("main.uxf"),
        "uxf 1\n!shapes.uxi\n=local a\n[(point 1 2)]\n",
    )
    .unwrap();
    let mut raised = Vec::new();
    let mut collect = |event: &Event| raised.push(event.code);
    let options = Options { drop_unused: true, ..Options::default() };
    let uxo = load_with(&dir.join("main.uxf"), &options, Some(&mut collect)).unwrap();
    assert_eq!(raised, vec![422]);
    assert!(uxo.tclass("point").is_some());
    assert!(uxo.tclass("dob").is_none());
    assert!(uxo.tclass("local").is_none());
    assert!(uxo.imports().contains_key("point"));
    assert!(!uxo.imports().contains_key("dob"));
}

#[test]
fn drop_then_replace() {
    let dir = scratch_dir("dropreplace");
    fs::write(
        dir.join("shapes.uxi"),
        "uxf 1\n=point x:int y:int\n=dob y:int m:int d:int\n",
    )
    .unwrap();
    fs::write(dir.join("main.uxf"), "uxf 1\n!shapes.uxi\n[(point 1 2)]\n").unwrap();
    let mut quiet = |_: &Event| {};
    let options = Options {
        drop_unused: true,
        replace_imports: true,
        ..Options::default()
    };
    let uxo = load_with(&dir.join("main.uxf"), &options, Some(&mut quiet)).unwrap();
    assert!(uxo.imports().is_empty());
    assert!(uxo.tclass("point").is_some());
    assert!(uxo.tclass("dob").is_none());
}

#[test]
fn imported_and_replaced_documents_are_equivalent() {
    let dir = scratch_dir("equivalence");
    fs::write(dir.join("pair.uxi"), "uxf 1\n=pair first second\n").unwrap();
    fs::write(dir.join("main.uxf"), "uxf 1\n!pair.uxi\n(pair 1 2 3 4)\n").unwrap();
    let mut quiet = |_: &Event| {};
    let plain = load_with(&dir.join("main.uxf"), &Options::default(), Some(&mut quiet)).unwrap();
    let mut quiet2 = |_: &Event| {};
    let options = Options { replace_imports: true, ..Options::default() };
    let replaced = load_with(&dir.join("main.uxf"), &options, Some(&mut quiet2)).unwrap();
    assert!(!compare(&plain, &replaced, Compare::Exact));
    assert!(compare(&plain, &replaced, Compare::Equivalent));
}
