//! Load → dump → load round trips and the writer's wrapping rules.

use uxf::{
    compare, dumps, dumps_with, loads, loads_with, Compare, Event, Options, Severity, Value,
};

fn quiet_loads(text: &str) -> uxf::Uxf {
    let mut quiet = |_: &Event| {};
    loads_with(text, "-", &Options::default(), Some(&mut quiet)).unwrap()
}

#[test]
fn minimum_document() {
    let uxo = loads("uxf 1\n[]\n").unwrap();
    let lst = uxo.value().as_list().unwrap();
    assert!(lst.is_empty());
    assert_eq!(dumps(&uxo).unwrap(), "uxf 1\n[]\n");
}

#[test]
fn empty_top_level_is_an_empty_list() {
    let uxo = loads("uxf 1\n").unwrap();
    assert!(uxo.value().as_list().unwrap().is_empty());
    assert_eq!(dumps(&uxo).unwrap(), "uxf 1\n[]\n");
}

#[test]
fn custom_header_text_survives() {
    let text = "uxf 1 Geo 1.0.0\n[]\n";
    let uxo = loads(text).unwrap();
    assert_eq!(uxo.custom(), "Geo 1.0.0");
    assert_eq!(dumps(&uxo).unwrap(), text);
}

#[test]
fn file_comment_survives() {
    let text = "uxf 1\n#<A comment>\n[]\n";
    let uxo = loads(text).unwrap();
    assert_eq!(uxo.comment(), Some("A comment"));
    assert_eq!(dumps(&uxo).unwrap(), text);
}

#[test]
fn typed_list() {
    let uxo = loads("uxf 1\n[int 1 2 3]\n").unwrap();
    let lst = uxo.value().as_list().unwrap();
    assert_eq!(lst.vtype(), Some("int"));
    assert_eq!(lst.len(), 3);
    assert_eq!(lst[0], Value::Int(1));
    assert_eq!(dumps(&uxo).unwrap(), "uxf 1\n[int 1 2 3]\n");
}

#[test]
fn table_records_pack_positionally() {
    let uxo = quiet_loads("uxf 1\n=Point x:int y:int\n(Point 1 2 3 4)\n");
    let table = uxo.value().as_table().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.first().unwrap(), &vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(table.last().unwrap(), &vec![Value::Int(3), Value::Int(4)]);
    // More than one record forces one record per line.
    assert_eq!(
        dumps(&uxo).unwrap(),
        "uxf 1\n=Point x:int y:int\n(Point\n   1 2\n   3 4)\n"
    );
    let again = quiet_loads(&dumps(&uxo).unwrap());
    assert!(compare(&uxo, &again, Compare::Exact));
}

#[test]
fn single_record_tables_stay_inline() {
    let uxo = quiet_loads("uxf 1\n=Point x:int y:int\n(Point 1 2)\n");
    assert_eq!(dumps(&uxo).unwrap(), "uxf 1\n=Point x:int y:int\n(Point 1 2)\n");
}

#[test]
fn fieldless_markers() {
    let text = "uxf 1\n=Off\n=On\n[(On) (Off) (On)]\n";
    let uxo = quiet_loads(text);
    assert_eq!(dumps(&uxo).unwrap(), text);
    let first = uxo.value().as_list().unwrap().get(0).unwrap();
    assert!(first.as_table().unwrap().is_empty());
}

#[test]
fn ttype_defs_sort_case_insensitively() {
    let uxo = quiet_loads("uxf 1\n=zeta a\n=Alpha b\n[(zeta 1) (Alpha 2)]\n");
    let text = dumps(&uxo).unwrap();
    let alpha = text.find("=Alpha").unwrap();
    let zeta = text.find("=zeta").unwrap();
    assert!(alpha < zeta);
}

#[test]
fn scalars_render_canonically() {
    let uxo = quiet_loads(
        "uxf 1\n[? yes no -7 4.0 <x &amp; y> (:ab cd:) 2022-09-19 2020-02-20T20:20:20-07:31]\n",
    );
    assert_eq!(
        dumps(&uxo).unwrap(),
        "uxf 1\n[? yes no -7 4.0 <x &amp; y> (:ABCD:) 2022-09-19 2020-02-20T20:20:20]\n"
    );
}

#[test]
fn realdp_rounds_output() {
    let uxo = quiet_loads("uxf 1\n[1.23456 2.0]\n");
    let options = Options { realdp: Some(2), ..Options::default() };
    assert_eq!(
        dumps_with(&uxo, &options, None).unwrap(),
        "uxf 1\n[1.23 2.0]\n"
    );
}

#[test]
fn int_widening_warns() {
    let mut raised = Vec::new();
    let mut collect = |event: &Event| raised.push((event.severity, event.code));
    let uxo = loads_with("uxf 1\n[real 1 2.5]\n", "-", &Options::default(), Some(&mut collect))
        .unwrap();
    assert_eq!(raised, vec![(Severity::Warning, 496)]);
    let lst = uxo.value().as_list().unwrap();
    assert_eq!(lst[0], Value::Real(1.0));
}

#[test]
fn huge_integers_saturate_with_a_warning() {
    let mut raised = Vec::new();
    let mut collect = |event: &Event| raised.push(event.code);
    let uxo = loads_with(
        "uxf 1\n[9223372036854775808]\n",
        "-",
        &Options::default(),
        Some(&mut collect),
    )
    .unwrap();
    assert_eq!(raised, vec![218]);
    assert_eq!(uxo.value().as_list().unwrap()[0], Value::Int(i64::MAX));
}

#[test]
fn long_strings_split_into_continuations() {
    let word = "abcdefghij ".repeat(12); // 132 chars, longer than the wrap
    let text = format!("uxf 1\n[<{}>]\n", word.trim_end());
    let uxo = quiet_loads(&text);
    let options = Options { wrap_width: 40, ..Options::default() };
    let dumped = dumps_with(&uxo, &options, None).unwrap();
    assert!(dumped.contains('&'));
    for line in dumped.lines() {
        assert!(line.chars().count() <= 40, "line too long: {line:?}");
    }
    let again = quiet_loads(&dumped);
    assert!(compare(&uxo, &again, Compare::Equivalent));
}

#[test]
fn long_bytes_wrap() {
    let hex = "AB".repeat(100);
    let text = format!("uxf 1\n[(:{hex}:)]\n");
    let uxo = quiet_loads(&text);
    let options = Options { wrap_width: 40, ..Options::default() };
    let dumped = dumps_with(&uxo, &options, None).unwrap();
    assert!(dumped.lines().count() > 3);
    let again = quiet_loads(&dumped);
    assert!(compare(&uxo, &again, Compare::Equivalent));
}

#[test]
fn wrapping_is_equivalence_preserving_at_any_width() {
    // A document with nesting, comments, and every scalar kind.
    let text = "uxf 1\n\
#<Round trip fodder>\n\
=Reading when:datetime value:real note:str\n\
{#<outer> str map\n\
  <a> {int list 1 [1 2.5 <three> (:0102:)] 2 [yes no ?]}\n\
  <b> {date str 2022-01-01 <new year>}\n\
  <c> {str table <r> (Reading 2022-01-02T03:04:05 -1.5 <cold> 2022-06-07T08:09:10 21.5 <warm>)}\n\
}\n";
    let uxo = quiet_loads(text);
    for wrap_width in [40, 56, 72, 96, 240] {
        let options = Options { wrap_width, ..Options::default() };
        let dumped = dumps_with(&uxo, &options, None).unwrap();
        let again = quiet_loads(&dumped);
        assert!(
            compare(&uxo, &again, Compare::Equivalent),
            "round trip changed the tree at wrap_width {wrap_width}:\n{dumped}"
        );
    }
}

#[test]
fn dump_then_load_is_stable() {
    let text = "uxf 1\n=p x:int y:int\n[#<pairs> p (p 1 2) (p 3 4 5 6) ?]\n";
    let first = quiet_loads(text);
    let dumped1 = dumps(&first).unwrap();
    let second = quiet_loads(&dumped1);
    let dumped2 = dumps(&second).unwrap();
    assert_eq!(dumped1, dumped2);
    assert!(compare(&first, &second, Compare::Exact));
}

#[test]
fn gzip_round_trip() -> anyhow::Result<()> {
    let dir = std::path::Path::new(env!("CARGO_TARGET_TMPDIR")).join("gzip");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("t.uxf.gz");
    let uxo = quiet_loads("uxf 1\n=p x y\n(p 1 <two>)\n");
    uxf::dump(&path, &uxo)?;
    let magic = std::fs::read(&path)?;
    assert_eq!(&magic[..2], &[0x1F, 0x8B]);
    let again = uxf::load(&path)?;
    assert!(compare(&uxo, &again, Compare::Exact));
    Ok(())
}

#[test]
fn exact_implies_equivalent_never_converse() {
    let a = quiet_loads("uxf 1\n=p x y\n=unused q\n[#<c> (p 1 2)]\n");
    let b = quiet_loads("uxf 1\n=p x y\n[(p 1 2)]\n");
    assert!(!compare(&a, &b, Compare::Exact));
    assert!(compare(&a, &b, Compare::Equivalent));
    let c = quiet_loads(&dumps(&a).unwrap());
    assert!(compare(&a, &c, Compare::Exact));
    assert!(compare(&a, &c, Compare::Equivalent));
}
