use std::{
    cell::{Cell, RefCell},
    net::IpAddr,
    time::Duration,
};

use expect_test::expect;
use flagtree::{BitField, Command, Flag, ParseError};

use crate::check;

#[test]
fn required_and_boolean() {
    let foo = RefCell::new(String::new());
    let bar = Cell::new(false);
    let cmd = Command::new("test", "")
        .flags([Flag::new(&foo, "foo").required(), Flag::new(&bar, "bar")])
        .build()
        .unwrap();

    check(&cmd, "--foo x --bar", expect![[r#"run: test []"#]]);
    assert_eq!(*foo.borrow(), "x");
    assert!(bar.get());

    check(&cmd, "--bar", expect!["error: missing argument: --foo"]);
    check(&cmd, "--foo x --foo y", expect!["error: argument declared too many times: --foo"]);
    check(&cmd, "--foo", expect!["error: no value specified for flag: --foo"]);
    check(&cmd, "--foo --bar", expect!["error: no value specified for flag: --foo"]);
    check(&cmd, "--foo x --werbose", expect!["error: unrecognized argument: --werbose"]);
}

#[test]
fn short_forms() {
    let n = Cell::new(0i64);
    let cmd = Command::new("test", "").flag(Flag::new(&n, "number").short("n")).build().unwrap();

    for (args, expected) in [("-n 92", 92), ("-n=93", 93), ("-n94", 94), ("--number 95", 95), ("--number=96", 96)] {
        check(&cmd, args, expect!["run: test []"]);
        assert_eq!(n.get(), expected, "{args}");
    }
}

#[test]
fn dashed_values_are_flags() {
    let n = Cell::new(0i64);
    let x = Cell::new(0.0f64);
    let cmd = Command::new("test", "")
        .flags([Flag::new(&n, "n"), Flag::new(&x, "foo-negative")])
        .build()
        .unwrap();

    check(&cmd, "-n=5 --foo-negative=1.5", expect!["run: test []"]);
    assert_eq!(n.get(), 5);
    assert_eq!(x.get(), 1.5);

    // no special casing of negative numbers
    check(&cmd, "-n -1", expect!["error: no value specified for flag: -n"]);
    check(&cmd, "-n=-1", expect!["error: no value specified for flag: -n"]);
    check(&cmd, "-n-1", expect!["error: no value specified for flag: -n"]);
    check(&cmd, "--foo-negative=-1.0", expect!["error: no value specified for flag: --foo-negative"]);
    assert_eq!(n.get(), 5);
    assert_eq!(x.get(), 1.5);
}

#[test]
fn boolean_never_takes_the_next_argument() {
    let x = Cell::new(false);
    let cmd = Command::new("test", "").flag(Flag::new(&x, "x")).build().unwrap();

    check(&cmd, "-x somefile", expect!["error: unexpected positional argument: somefile"]);

    x.set(false);
    check(&cmd, "-x", expect!["run: test []"]);
    assert!(x.get());

    check(&cmd, "-x=false", expect!["run: test []"]);
    assert!(!x.get());

    check(&cmd, "-x=nope", expect![[r#"error: -x: invalid boolean value: "nope""#]]);
}

#[test]
fn glued_booleans_leave_the_rest() {
    let v = Cell::new(false);
    let files = RefCell::new(Vec::<String>::new());
    let cmd = Command::new("cat", "")
        .flags([Flag::new(&v, "v"), Flag::list(&files, "file").positional()])
        .build()
        .unwrap();

    check(&cmd, "-vfile", expect!["run: cat []"]);
    assert!(v.get());
    assert_eq!(*files.borrow(), ["file"]);

    v.set(false);
    check(&cmd, "-vq", expect!["run: cat []"]);
    assert!(v.get());
    assert_eq!(*files.borrow(), ["file", "q"]);

    // only `=` hands a value to a boolean
    check(&cmd, "-v=false", expect!["run: cat []"]);
    assert!(!v.get());
    assert_eq!(*files.borrow(), ["file", "q"]);
}

#[test]
fn invalid_values_name_the_flag() {
    let n = Cell::new(0u32);
    let cmd = Command::new("test", "").flag(Flag::new(&n, "count")).build().unwrap();

    let err = cmd.parse(["--count", "abc"]).unwrap_err();
    assert_eq!(err.to_string(), "--count: invalid digit found in string");
    match &err {
        ParseError::InvalidValue { command, flag, value, .. } => {
            assert_eq!(command, "test");
            assert_eq!(flag, "--count");
            assert_eq!(value, "abc");
        }
        _ => panic!("unexpected error: {err:?}"),
    }
    assert_eq!(err.flag(), Some("--count"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn validators() {
    let ip = RefCell::new(String::from("127.0.0.1"));
    let cmd = Command::new("ping", "")
        .flag(Flag::new(&ip, "ip").usage("IP Address to ping").validate(|arg: &str| {
            arg.parse::<IpAddr>().map(drop).map_err(|_| format!("invalid IP: {arg}"))
        }))
        .build()
        .unwrap();

    check(&cmd, "--ip=10.0.0.1", expect!["run: ping []"]);
    assert_eq!(*ip.borrow(), "10.0.0.1");

    // 256 is not a valid IPv4 component
    check(&cmd, "--ip=256.0.0.1", expect!["error: --ip: invalid IP: 256.0.0.1"]);
    assert_eq!(*ip.borrow(), "10.0.0.1");
}

#[test]
fn choices() {
    let v = RefCell::new(String::new());
    let cmd = Command::new("test", "").flag(Flag::new(&v, "foo").choices(["bar", "baz"])).build().unwrap();

    check(&cmd, "--foo=bar", expect!["run: test []"]);
    check(&cmd, "--foo=baz", expect!["run: test []"]);
    check(&cmd, "--foo=barr", expect!["error: --foo: invalid value: barr (expected one of: bar, baz)"]);
}

#[test]
fn repeated_flags() {
    let names = RefCell::new(Vec::<String>::new());
    let cmd = Command::new("create-widgets", "")
        .flag(Flag::list(&names, "name").nargs(1, 0))
        .build()
        .unwrap();

    check(&cmd, "--name=foo --name bar -- --name=baz", expect![[r#"error: unexpected positional argument: --"#]]);
    names.borrow_mut().clear();

    check(&cmd, "--name=foo --name bar --name=baz", expect!["run: create-widgets []"]);
    assert_eq!(*names.borrow(), ["foo", "bar", "baz"]);

    check(&cmd, "", expect!["error: missing argument: --name"]);
}

#[test]
fn occurrences_are_counted_per_appearance() {
    let seen = RefCell::new(Vec::new());
    let cmd = Command::new("test", "")
        .flag(
            Flag::func("tag", |s| {
                seen.borrow_mut().push(s.to_string());
                Ok(())
            })
            .nargs(2, 3),
        )
        .build()
        .unwrap();

    check(&cmd, "--tag a", expect!["error: missing argument: --tag"]);
    check(&cmd, "--tag a --tag=b", expect!["run: test []"]);
    check(&cmd, "--tag a --tag b --tag c", expect!["run: test []"]);
    check(&cmd, "--tag a --tag b --tag c --tag d", expect!["error: argument declared too many times: --tag"]);
    assert_eq!(seen.borrow().len(), 1 + 2 + 3 + 4);
}

#[test]
fn bit_fields() {
    let bits = Cell::new(0u64);
    let cmd = Command::new("test", "")
        .flags([
            Flag::new(BitField::new(&bits, 0x01, false), "foo"),
            Flag::new(BitField::new(&bits, 0x02, false), "bar"),
            Flag::new(BitField::new(&bits, 0x04, true), "baz"),
        ])
        .build()
        .unwrap();

    check(&cmd, "--foo", expect!["run: test []"]);
    assert_eq!(bits.get(), 0x05);

    check(&cmd, "--baz=false --bar", expect!["run: test []"]);
    assert_eq!(bits.get(), 0x03);
}

#[test]
fn typed_sinks() {
    let timeout = Cell::new(Duration::ZERO);
    let ratio = Cell::new(0.0f64);
    let level = RefCell::new(None::<u8>);
    let cmd = Command::new("test", "")
        .flags([Flag::new(&timeout, "timeout"), Flag::new(&ratio, "ratio"), Flag::new(&level, "level")])
        .build()
        .unwrap();

    check(&cmd, "--timeout=1s --ratio 0.5", expect!["run: test []"]);
    assert_eq!(timeout.get(), Duration::from_secs(1));
    assert_eq!(ratio.get(), 0.5);
    assert_eq!(*level.borrow(), None);

    check(&cmd, "--level 3", expect!["run: test []"]);
    assert_eq!(*level.borrow(), Some(3));

    check(&cmd, "--level 300", expect!["error: --level: number too large to fit in target type"]);
}
