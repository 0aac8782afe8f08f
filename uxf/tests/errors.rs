//! The error-code taxonomy, exercised end to end through `loads`.

use uxf::{loads_with, Event, Options, Severity};

/// Parses `text` expecting a fatal error; returns its code.
fn err_code(text: &str) -> u16 {
    let mut quiet = |_: &Event| {};
    loads_with(text, "-", &Options::default(), Some(&mut quiet))
        .expect_err("expected a fatal error")
        .code
}

/// Parses `text` expecting success; returns every raised (severity, code).
fn event_codes(text: &str) -> Vec<(Severity, u16)> {
    let mut raised = Vec::new();
    let mut collect = |event: &Event| raised.push((event.severity, event.code));
    loads_with(text, "-", &Options::default(), Some(&mut collect)).expect("expected a clean load");
    raised
}

#[test]
fn header_taxonomy() {
    assert_eq!(err_code("not a uxf file"), 110);
    assert_eq!(err_code("uxf\n"), 120);
    assert_eq!(err_code("UXF 1.0\n"), 130);
    assert_eq!(err_code("uxf 9.0\n"), 141);
    assert_eq!(err_code("uxf 1.0x\n"), 151);
    assert_eq!(err_code("uxf 1.0\n# Not a comment"), 160);
}

#[test]
fn lexical_taxonomy() {
    assert_eq!(err_code("uxf 1.0\n* invalid"), 170);
    assert_eq!(err_code("uxf 1.0\n[1 2 5_invalid]"), 170);
    assert_eq!(err_code("uxf 1.0\n[# 123]"), 180);
    assert_eq!(err_code("uxf 1.0\n[123 #<comment>]"), 190);
    assert_eq!(err_code("uxf 1.0\n{1 2 #<3> 4}"), 190);
    assert_eq!(err_code("uxf 1.0\n[(:AB CD EF GH:)]"), 200);
    assert_eq!(err_code("uxf 1.0\n[-3e4e]"), 210);
    assert_eq!(err_code("uxf 1.0\n[7.8.9]"), 220);
    assert_eq!(err_code("uxf 1.0\n[2020-02-20T20e20]"), 220);
    assert_eq!(err_code("uxf 1.0\n[2020-02-30]"), 231);
    assert_eq!(err_code("uxf 1.0\n[2020-02-20T20:20:20-07:31T]"), 231);
    assert_eq!(err_code("uxf 1.0\n[(:AB 12:]"), 270);
    assert_eq!(err_code("uxf 1.0\n[-7F]"), 460);
}

#[test]
fn container_taxonomy() {
    assert_eq!(err_code("uxf 1.0\n[int real]"), 272);
    assert_eq!(err_code("uxf 1.0\n{p}"), 273);
    assert_eq!(err_code("uxf 1.0\n=a b\n(a x)"), 274);
    assert_eq!(err_code("uxf 1.0\n{int real str}"), 276);
    assert_eq!(err_code("uxf 1.0\n=p q\n{(p 1) 8}"), 290);
    assert_eq!(err_code("uxf 1.0\n{7.9 8}"), 294);
    assert_eq!(err_code("uxf 1.0\n{real 1 2}"), 294);
    assert_eq!(err_code("uxf 1.0\n{1}"), 440);
    assert_eq!(err_code("uxf 1.0\n{int T 5 <x>}"), 446);
    assert_eq!(err_code("uxf 1.0\n{int p}"), 446);
    assert_eq!(err_code("uxf 1.0\n[T 5]"), 446);
    assert_eq!(err_code("uxf 1.0\n[q]"), 446);
    assert_eq!(err_code("uxf 1.0\n[{map 1 2}"), 448);
    assert_eq!(err_code("uxf 1.0\n[1 FALSE]"), 458);
}

#[test]
fn top_level_taxonomy() {
    assert_eq!(err_code("uxf 1.0\n(:AB:)"), 402);
    assert_eq!(err_code("uxf 1.0\np a b\n(p 1 2)"), 402);
    assert_eq!(err_code("uxf 1.0\nA b c\n(A 1 2)"), 402);
    assert_eq!(err_code("uxf 1.0\nint"), 402);
}

#[test]
fn table_taxonomy() {
    assert_eq!(err_code("uxf 1.0\n(a)"), 450);
    assert_eq!(err_code("uxf 1.0\n(T 5)"), 450);
    assert_eq!(err_code("uxf 1.0\n(r)"), 450);
    assert_eq!(err_code("uxf 1.0\n(int 1)"), 450);
    assert_eq!(err_code("uxf 1.0\n=T a\n=U b\n(T (u 1))"), 450);
    let text = "uxf 1.0
=p x:int y:int
=q a:real b:real
{str p
  <one> (#<ok> p 1 2 -3 4 5 6)
  <four> (#<wrong> q 8.1 -9.3)
  <five> (#<ok2> p -7 -6)
}";
    assert_eq!(err_code(text), 454);
    let text = "uxf 1.0
=p x:int y:int
{str p <one> (#<ok> p 1 2 -3 4 5 6)
<three> (#<worse> p 11 -12";
    assert_eq!(err_code(text), 486);
    assert_eq!(err_code("uxf 1.0\n=Point x:int y:int\n(Point 1 2 3)"), 486);
}

#[test]
fn fieldless_taxonomy() {
    let ok = "uxf 1.0
=Fieldless
=Single field
[
  (Single)
  (Single 1)
  (Fieldless)
]";
    assert!(event_codes(ok).is_empty());
    let bad = "uxf 1.0
=Fieldless
=Single field
[
  (Single)
  (Single 1)
  (Fieldless)
  (Fieldless 1)
]";
    assert_eq!(err_code(bad), 334);
}

#[test]
fn vtype_taxonomy() {
    // int widens for a declared real field with a warning...
    let mut raised = Vec::new();
    let mut collect = |event: &Event| raised.push((event.severity, event.code));
    let err = loads_with(
        "uxf 1.0\n=p x:real y:int\n(p 1 2.0)",
        "-",
        &Options::default(),
        Some(&mut collect),
    )
    .unwrap_err();
    // ...but the real supplied for the declared int is fatal.
    assert_eq!(err.code, 498);
    assert_eq!(raised[0], (Severity::Warning, 496));

    assert_eq!(err_code("uxf 1.0\n=p x:int y:real\n(p 1.0 2)"), 498);
    assert_eq!(err_code("uxf 1.0\n[int 1 2.0 3]"), 498);
    let text = "uxf 1.0
=p x:int y:int
{str p <one> (#<ok> p 1 2 -3 4 5 6)
<two> (#<bad> p 7 -8 9.0 10)}";
    assert_eq!(err_code(text), 498);
    assert_eq!(err_code("uxf 1.0\n=a b:x\n[(a 1)]"), 500);
}

#[test]
fn closure_taxonomy() {
    assert_eq!(err_code("uxf 1.0\n{1 2 3 4}]"), 510);
    assert_eq!(err_code("uxf 1.0\n[1 2 3}"), 512);
}

#[test]
fn registration_taxonomy() {
    assert_eq!(err_code("uxf 1.0\n!complex\n=Complex a b\n(Complex 1 2)"), 528);
    assert_eq!(err_code("uxf 1.0\n=p x\n=p y\n[]"), 544);
    // An identical duplicate definition is fine.
    assert!(event_codes("uxf 1.0\n=p x y\n=p x y\n[(p 1 2)]").is_empty());
}

#[test]
fn import_errors_are_not_fatal() {
    let raised = event_codes("uxf 1.0\n!system-missing\n[]");
    assert_eq!(raised, vec![(Severity::Error, 560)]);
    let raised = event_codes("uxf 1.0\n!no-such-file.uxi\n[]");
    assert_eq!(raised, vec![(Severity::Error, 586)]);
}

#[test]
fn booleans_and_null_are_not_keys() {
    assert_eq!(err_code("uxf 1.0\n{yes 1}"), 294);
    assert_eq!(err_code("uxf 1.0\n{? 1}"), 294);
}

#[test]
fn unterminated_containers() {
    assert_eq!(err_code("uxf 1.0\n[1 2"), 510);
    assert_eq!(err_code("uxf 1.0\n{1 2"), 510);
    assert_eq!(err_code("uxf 1.0\n=p x\n(p 1"), 486);
}

#[test]
fn unused_ttype_warning() {
    let raised = event_codes("uxf 1.0\n=p x y\n=dob y m d\n[(p 1 2)]");
    assert_eq!(raised, vec![(Severity::Warning, 422)]);
    // Two unused ttypes get the plural message and one warning.
    let raised = event_codes("uxf 1.0\n=a x\n=b y\n[]");
    assert_eq!(raised, vec![(Severity::Warning, 422)]);
}

#[test]
fn message_format_is_stable() {
    let mut texts = Vec::new();
    let mut collect = |event: &Event| texts.push(event.to_string());
    let _ = loads_with(
        "uxf 1.0\n[int 1 2.0]",
        "test.uxf",
        &Options::default(),
        Some(&mut collect),
    );
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("uxf:F498:test.uxf:2:"), "got {}", texts[0]);
}
