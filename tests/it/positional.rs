use std::cell::{Cell, RefCell};

use expect_test::expect;
use flagtree::{BuildError, Command, Flag};

use crate::{check, outcome};

#[test]
fn filled_in_declaration_order() {
    let foo = RefCell::new(String::new());
    let bar = RefCell::new(String::new());
    let baz = RefCell::new(Vec::<String>::new());
    let qux = RefCell::new(Vec::<String>::new());
    let cmd = Command::new("test", "")
        .flags([
            Flag::new(&foo, "foo").positional().required(),
            Flag::new(&bar, "bar").positional().required(),
            Flag::list(&baz, "baz").positional().nargs(2, 2),
            Flag::list(&qux, "qux").positional().nargs(0, 0),
        ])
        .build()
        .unwrap();

    check(&cmd, "one two three four five six", expect!["run: test []"]);
    assert_eq!(*foo.borrow(), "one");
    assert_eq!(*bar.borrow(), "two");
    assert_eq!(*baz.borrow(), ["three", "four"]);
    assert_eq!(*qux.borrow(), ["five", "six"]);
}

#[test]
fn missing_and_extra() {
    let src = RefCell::new(String::new());
    let dst = RefCell::new(String::new());
    let cmd = Command::new("cp", "")
        .flags([Flag::new(&src, "src").positional().required(), Flag::new(&dst, "dst").positional()])
        .build()
        .unwrap();

    check(&cmd, "", expect!["error: missing argument: SRC"]);
    check(&cmd, "a", expect!["run: cp []"]);
    check(&cmd, "a b", expect!["run: cp []"]);
    assert_eq!((src.borrow().as_str(), dst.borrow().as_str()), ("a", "b"));
    check(&cmd, "a b c", expect!["error: unexpected positional argument: c"]);
}

#[test]
fn positional_and_named_flags_mix() {
    let verbose = Cell::new(false);
    let files = RefCell::new(Vec::<String>::new());
    let cmd = Command::new("cat", "")
        .flags([Flag::new(&verbose, "v"), Flag::list(&files, "file").positional()])
        .build()
        .unwrap();

    check(&cmd, "a -v b", expect!["run: cat []"]);
    assert!(verbose.get());
    assert_eq!(*files.borrow(), ["a", "b"]);
}

#[test]
fn dash_and_empty_are_values() {
    let input = RefCell::new(String::from("unset"));
    let cmd = Command::new("test", "").flag(Flag::new(&input, "input").positional()).build().unwrap();

    expect!["run: test []"].assert_eq(&outcome(&cmd, vec!["-".to_string()]));
    assert_eq!(*input.borrow(), "-");

    expect!["run: test []"].assert_eq(&outcome(&cmd, vec![String::new()]));
    assert_eq!(*input.borrow(), "");
}

#[test]
fn positionals_are_not_named() {
    let path = RefCell::new(String::new());
    let cmd = Command::new("test", "").flag(Flag::new(&path, "path").positional()).build().unwrap();

    check(&cmd, "--path x", expect!["error: unrecognized argument: --path"]);
}

#[test]
fn unbounded_must_come_last() {
    let sink = RefCell::new(Vec::<String>::new());

    let err = Command::new("test", "")
        .flags([Flag::list(&sink, "one").positional(), Flag::list(&sink, "two").positional().nargs(0, 1)])
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::PositionalAfterUnbounded { .. }));
    expect!["command: test: positional arguments cannot follow unbounded positional arguments: TWO"]
        .assert_eq(&err.to_string());

    Command::new("test", "")
        .flags([Flag::list(&sink, "one").positional().nargs(1, 1), Flag::list(&sink, "two").positional()])
        .build()
        .unwrap();
}
