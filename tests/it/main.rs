mod positional;
mod smoke;

use expect_test::Expect;
use flagtree::{Command, Parsed};

fn check(cmd: &Command<'_>, args: &str, expect: Expect) {
    let args = args.split_ascii_whitespace().map(String::from).collect::<Vec<_>>();
    expect.assert_eq(&outcome(cmd, args));
}

fn outcome(cmd: &Command<'_>, args: Vec<String>) -> String {
    match cmd.parse(args) {
        Ok(Parsed::Run { command, args }) => format!("run: {} {args:?}", command.path()),
        Ok(Parsed::Help { command }) => format!("help: {}", command.path()),
        Err(err) => format!("error: {err}"),
    }
}
