use super::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("au3-cli-{}-{}", name, nanos))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn scanner() -> ScriptScanner {
    ScriptScanner::new(
        ScannerOptions::default().with_include_dir(temp_path("include")),
        PluginRegistry::new(),
    )
}

#[test]
fn cli_args_parse_flags_and_paths() {
    let cli = Cli::try_parse_from(["au-scan", "--strict", "--json", "-vv", "--include-dir", "inc", "a.au3", "lib"])
        .expect("args should parse");
    assert!(cli.strict);
    assert!(cli.json);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.include_dir, Some(PathBuf::from("inc")));
    assert_eq!(cli.paths, vec![PathBuf::from("a.au3"), PathBuf::from("lib")]);

    let options = scanner_options(&cli);
    assert!(options.strict_mode);
    assert_eq!(options.include_dir, PathBuf::from("inc"));

    assert!(Cli::try_parse_from(["au-scan"]).is_err());
}

#[test]
fn scan_files_keeps_input_order_and_reports_each_outcome() {
    let root = temp_path("order");
    let files = (0..6)
        .map(|index| {
            let file = root.join(format!("s{}.au3", index));
            write_file(&file, &format!("Func F{}($a, $b = {})\n  Return $a\nEndFunc", index, index));
            file
        })
        .chain(std::iter::once(root.join("broken.au3")))
        .collect::<Vec<_>>();
    write_file(&files[6], "Func Broken()\n");

    let scanner = scanner();
    let outcomes = scan_files(&scanner, &files);
    assert_eq!(outcomes.iter().map(|(file, _)| file.clone()).collect::<Vec<_>>(), files);
    assert_eq!(outcomes.iter().filter(|(_, result)| result.is_ok()).count(), 6);

    let report = build_report(&outcomes);
    assert!(!report.is_success());
    assert_eq!(report.scripts.len(), 6);
    assert_eq!(report.errors[0].key, "error.unexpected_eof");
    assert_eq!(report.errors[0].location.start_line, 2);
}

#[test]
fn text_report_lists_functions_labels_and_hooks() {
    let file = temp_path("text").join("main.au3");
    write_file(
        &file,
        "#include-once\n#OnAutoItStartRegister \"Init\"\nVolatile Func Init()\nagain:\nEndFunc\nFunc Add($iA, $iB = 0)\n  Return $iA + $iB\nEndFunc\n",
    );

    let scanner = scanner();
    let report = build_report(&scan_files(&scanner, &[file]));
    let text = render_text(&report);

    assert!(text.starts_with("script "));
    assert!(text.contains("[include-once]"));
    let lines = text.lines().collect::<Vec<_>>();
    assert!(lines[1].starts_with("  Func $global()  [0 Lines]"));
    assert!(lines[2].starts_with("  Func Add($iA, $iB = 0)  [1 Lines]"));
    assert!(lines[3].starts_with("  Volatile Func Init()  [1 Lines]"));
    assert!(lines[4].starts_with("    label AGAIN @ "));
    assert_eq!(lines[5], "  startup: INIT");
}

#[test]
fn json_report_uses_camel_case_fields() {
    let file = temp_path("json").join("lib.au3");
    write_file(&file, "Func Lib(ByRef $x)\nEndFunc");

    let scanner = scanner();
    let report = build_report(&scan_files(&scanner, &[file]));
    let value = serde_json::to_value(&report).expect("report json");

    let function = &value["scripts"][0]["functions"][1];
    assert_eq!(function["name"], "Lib");
    assert_eq!(function["lineCount"], 0);
    assert_eq!(function["parameters"][0]["is_byref"], true);
    assert_eq!(value["scripts"][0]["includeOnce"], false);
    assert!(value["errors"].as_array().expect("errors").is_empty());
}

#[test]
fn run_cli_from_args_maps_failures_to_exit_codes() {
    let missing = temp_path("missing");
    assert_eq!(run_cli_from_args(["au-scan", missing.to_string_lossy().as_ref()]), 1);

    let good = temp_path("good").join("ok.au3");
    write_file(&good, "ConsoleWrite('ok')");
    assert_eq!(run_cli_from_args(["au-scan", good.to_string_lossy().as_ref()]), 0);
}
