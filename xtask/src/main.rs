#[cfg(test)]
mod tidy;

use std::{cell::Cell, error::Error, time::Instant};

use flagtree::{Command, Flag};
use xshell::{cmd, Shell};

type TaskResult = Result<(), Box<dyn Error>>;

fn main() {
    let dry_run = Cell::new(false);
    let tasks = Command::new("xtask", "Development tasks for flagtree")
        .handler(|_| report(ci().and_then(|()| release(false))))
        .subcommands([
            Command::new("ci", "Check formatting, build, run tests and docs").handler(|_| report(ci())),
            Command::new("tidy", "Check sources for leftovers").handler(|_| report(tidy())),
            Command::new("release", "Tag and publish the current version from master")
                .flag(Flag::new(&dry_run, "dry-run").usage("Print commands instead of running them"))
                .handler(|_| report(release(dry_run.get()))),
        ])
        .build();

    let code = match tasks {
        Ok(tasks) => tasks.run_env(),
        Err(err) => {
            eprintln!("{err}");
            2
        }
    };
    std::process::exit(code)
}

fn report(res: TaskResult) -> i32 {
    match res {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn stable_shell() -> Result<Shell, Box<dyn Error>> {
    let sh = Shell::new()?;
    cmd!(sh, "rustup toolchain install stable --no-self-update --component rustfmt").run()?;
    sh.set_var("RUSTUP_TOOLCHAIN", "stable");
    cmd!(sh, "rustc --version").run()?;
    Ok(sh)
}

fn ci() -> TaskResult {
    let sh = stable_shell()?;

    {
        let _s = section("FMT");
        cmd!(sh, "cargo fmt --all -- --check").run()?;
    }

    {
        let _s = section("BUILD");
        cmd!(sh, "cargo test --workspace --no-run").run()?;
    }

    {
        let _s = section("TEST");
        cmd!(sh, "cargo test --workspace --all-targets -- --nocapture").run()?;
    }

    {
        let _s = section("DOCS");
        cmd!(sh, "cargo test -p flagtree --doc").run()?;
        let _e = sh.push_env("RUSTDOCFLAGS", "-D warnings");
        cmd!(sh, "cargo doc -p flagtree --no-deps").run()?;
    }

    Ok(())
}

fn tidy() -> TaskResult {
    let sh = Shell::new()?;
    let _s = section("TIDY");
    cmd!(sh, "cargo test -p xtask tidy").run()?;
    Ok(())
}

/// Version of the root package, read from its manifest.
fn package_version(sh: &Shell) -> Result<String, Box<dyn Error>> {
    let manifest = sh.read_file("Cargo.toml")?;
    let version = manifest
        .lines()
        .find_map(|line| line.strip_prefix("version = "))
        .map(|it| it.trim().trim_matches('"').to_string())
        .ok_or("no version in Cargo.toml")?;
    Ok(version)
}

fn release(dry_run: bool) -> TaskResult {
    let sh = Shell::new()?;
    let _s = section("RELEASE");

    let version = package_version(&sh)?;
    let tag = format!("v{version}");

    let branch = cmd!(sh, "git branch --show-current").read()?;
    if branch != "master" {
        eprintln!("not on master, skipping {tag}");
        return Ok(());
    }
    if cmd!(sh, "git tag --list").read()?.split_ascii_whitespace().any(|it| it == tag) {
        eprintln!("{tag} is already released");
        return Ok(());
    }

    for step in [
        cmd!(sh, "git tag {tag}"),
        cmd!(sh, "cargo publish -p flagtree"),
        cmd!(sh, "git push --tags"),
    ] {
        if dry_run {
            println!("would run: {step}");
        } else {
            step.run()?;
        }
    }
    Ok(())
}

/// Groups the output of a CI step and reports how long it took.
fn section(name: &'static str) -> impl Drop {
    println!("::group::{name}");
    let start = Instant::now();
    defer(move || {
        let elapsed = start.elapsed();
        eprintln!("{name}: {elapsed:.2?}");
        println!("::endgroup::");
    })
}

fn defer<F: FnOnce()>(f: F) -> impl Drop {
    struct D<F: FnOnce()>(Option<F>);
    impl<F: FnOnce()> Drop for D<F> {
        fn drop(&mut self) {
            if let Some(f) = self.0.take() {
                f()
            }
        }
    }
    D(Some(f))
}
