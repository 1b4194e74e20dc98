use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("au3-cli-smoke-{}-{}", name, nanos))
}

#[test]
fn scans_a_directory_and_prints_json() {
    let bin = env!("CARGO_BIN_EXE_au-scan");
    let root = temp_path("dir");
    fs::create_dir_all(root.join("lib")).expect("dirs");
    fs::write(
        root.join("main.au3"),
        "#comments-start\nfunc Ignored()\n#comments-end\nFunc Add(iA, iB = 0)\n    Return iA + iB\nEndFunc\n",
    )
    .expect("main");
    fs::write(root.join("lib").join("util.au3"), "Func Twice($x) -> Return $x * 2\n").expect("util");

    let output = Command::new(bin)
        .arg("--json")
        .arg(&root)
        .output()
        .expect("cli should execute");

    if !output.status.success() {
        panic!(
            "scan failed\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let scripts = report["scripts"].as_array().expect("scripts");
    assert_eq!(scripts.len(), 2);
    let names = scripts
        .iter()
        .flat_map(|script| script["functions"].as_array().cloned().unwrap_or_default())
        .filter_map(|function| function["name"].as_str().map(str::to_string))
        .collect::<Vec<_>>();
    assert!(names.contains(&"Add".to_string()));
    assert!(names.contains(&"Twice".to_string()));
    assert!(!names.contains(&"Ignored".to_string()));
}

#[test]
fn strict_mode_failures_exit_non_zero() {
    let bin = env!("CARGO_BIN_EXE_au-scan");
    let file = temp_path("strict").join("one_liner.au3");
    fs::create_dir_all(file.parent().expect("parent")).expect("dir");
    fs::write(&file, "Func Twice($x) -> Return $x * 2\n").expect("file");

    let output = Command::new(bin)
        .arg("--strict")
        .arg(&file)
        .output()
        .expect("cli should execute");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("error error.experimental.one_liner at "), "{stdout}");
}

#[test]
fn missing_paths_report_a_cli_error() {
    let bin = env!("CARGO_BIN_EXE_au-scan");
    let output = Command::new(bin)
        .arg(temp_path("nowhere"))
        .output()
        .expect("cli should execute");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR_CODE:CLI_SOURCE_NOT_FOUND"), "{stderr}");
}
