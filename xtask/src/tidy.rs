use std::path::{Path, PathBuf};

use xshell::Shell;

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap().to_path_buf()
}

fn rust_files(sh: &Shell, dir: &Path, acc: &mut Vec<PathBuf>) {
    for path in sh.read_dir(dir).unwrap() {
        if path.is_dir() {
            rust_files(sh, &path, acc);
        } else if path.extension().map_or(false, |it| it == "rs") {
            acc.push(path);
        }
    }
}

#[test]
fn no_leftover_debugging() {
    let sh = Shell::new().unwrap();
    let root = project_root();
    let mut files = Vec::new();
    for dir in ["src", "tests", "xtask/src"] {
        rust_files(&sh, &root.join(dir), &mut files);
    }
    assert!(!files.is_empty());

    let needles = [concat!("dbg", "!("), concat!("todo", "!("), concat!("eprintln!(\"", "XXX")];
    for path in files {
        let text = sh.read_file(&path).unwrap();
        for (i, line) in text.lines().enumerate() {
            let at = format!("{}:{}", path.display(), i + 1);
            assert!(!line.ends_with(' ') && !line.ends_with('\t'), "trailing whitespace at {at}");
            for needle in needles {
                assert!(!line.contains(needle), "`{needle}` at {at}");
            }
        }
    }
}
