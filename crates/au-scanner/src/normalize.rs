use std::sync::OnceLock;

use au_core::error::keys;
use au_core::{InterpreterError, SourceLocation};
use regex::Regex;

/// One logical source line after comment stripping, continuation merging and
/// desugaring. Lines produced by desugaring share their origin's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub text: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSource {
    pub lines: Vec<LogicalLine>,
    pub physical_line_count: usize,
}

/// Rewrites the raw text of one file into logical lines.
///
/// Block comments, region markers and blank lines produce nothing. A trailing
/// ` _` joins the next physical line; legacy directives are rewritten into
/// their general forms; one-line `if` and one-line `func` are expanded into
/// their block forms.
pub fn normalize_source(
    file: &str,
    content: &str,
    strict_mode: bool,
) -> Result<NormalizedSource, InterpreterError> {
    let physical = content.lines().collect::<Vec<_>>();
    let mut lines = Vec::new();
    let mut comment_level = 0usize;
    let mut index = 0usize;

    while index < physical.len() {
        let mut location = SourceLocation::new(file, index + 1);
        let mut line = trim_comment(physical[index].trim_start());
        index += 1;

        if block_comment_start_regex().is_match(&line) {
            comment_level += 1;
            continue;
        }
        if block_comment_end_regex().is_match(&line) {
            comment_level = comment_level.saturating_sub(1);
            continue;
        }
        if region_regex().is_match(&line) || comment_level > 0 {
            continue;
        }

        while let Some(found) = continuation_regex().find(&line) {
            if index >= physical.len() {
                return Err(InterpreterError::bare(location, keys::UNEXPECTED_LINE_CONT));
            }
            let next = trim_comment(physical[index].trim_start());
            line = format!("{} {}", &line[..found.start()], next);
            location = location.through(&SourceLocation::new(file, index + 1));
            index += 1;
        }

        let line = rewrite_legacy_directive(line);
        desugar(line, &location, strict_mode, &mut lines)?;
    }

    Ok(NormalizedSource {
        lines,
        physical_line_count: physical.len(),
    })
}

fn rewrite_legacy_directive(line: String) -> String {
    if require_admin_regex().is_match(&line) {
        "#pragma compile(ExecLevel, requireAdministrator)".to_string()
    } else if no_tray_icon_regex().is_match(&line) {
        "Opt(\"TrayIconHide\", 1)".to_string()
    } else {
        line
    }
}

fn desugar(
    line: String,
    location: &SourceLocation,
    strict_mode: bool,
    out: &mut Vec<LogicalLine>,
) -> Result<(), InterpreterError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    let push = |out: &mut Vec<LogicalLine>, text: &str| {
        out.push(LogicalLine {
            text: text.to_string(),
            location: location.clone(),
        });
    };

    if let Some((condition, statement)) = split_one_line_if(line) {
        push(out, condition);
        desugar(statement.to_string(), location, strict_mode, out)?;
        push(out, "endif");
    } else if let Some(caps) = one_line_func_regex().captures(line) {
        if strict_mode {
            return Err(InterpreterError::bare(
                location.clone(),
                keys::EXPERIMENTAL_ONE_LINER,
            ));
        }
        push(out, caps.name("decl").map_or("", |m| m.as_str()).trim());
        desugar(
            caps.name("body").map_or("", |m| m.as_str()).to_string(),
            location,
            strict_mode,
            out,
        )?;
        push(out, "endfunc");
    } else {
        push(out, line);
    }

    Ok(())
}

/// Splits `if <cond> then <stmt>` at the first `then` outside a string literal.
fn split_one_line_if(line: &str) -> Option<(&str, &str)> {
    if !if_start_regex().is_match(line) {
        return None;
    }
    then_regex().find_iter(line).find_map(|found| {
        let statement = line[found.end()..].trim();
        (!statement.is_empty() && outside_string_literal(&line[..found.start()]))
            .then(|| (line[..found.end()].trim(), statement))
    })
}

/// Whether the end of `prefix` lies outside any string literal. A literal
/// closes only on the quote that opened it; a doubled quote inside it is an
/// escaped quote.
fn outside_string_literal(prefix: &str) -> bool {
    let mut open_quote = None;
    let mut chars = prefix.chars().peekable();

    while let Some(ch) = chars.next() {
        match open_quote {
            Some(quote) if ch == quote => {
                if chars.peek() == Some(&quote) {
                    chars.next();
                } else {
                    open_quote = None;
                }
            }
            Some(_) => {}
            None if ch == '"' || ch == '\'' => open_quote = Some(ch),
            None => {}
        }
    }

    open_quote.is_none()
}

/// Removes a trailing `;` comment, keeping semicolons inside string literals.
pub fn trim_comment(line: &str) -> String {
    if line.trim().is_empty() {
        return String::new();
    }

    let mut line = line;
    if let Some(first_semicolon) = line.find(';') {
        if let Some(found) = trailing_comment_regex().find(line) {
            line = &line[..found.start()];
        } else {
            let before = &line[..first_semicolon];
            if !line.contains("$\"")
                && before.matches('"').count() % 2 == 0
                && before.matches('\'').count() % 2 == 0
            {
                return before.trim().to_string();
            } else if let Some(cmt) = comment_after_double_quoted_regex()
                .captures(line)
                .and_then(|caps| caps.name("cmt"))
            {
                line = &line[..cmt.start()];
            } else if let Some(cmt) = comment_after_single_quoted_regex()
                .captures(line)
                .and_then(|caps| caps.name("cmt"))
            {
                line = &line[..cmt.start()];
            }
        }
    }

    line.trim_end().to_string()
}

fn trailing_comment_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#";[^"']*$"#).expect("trailing comment regex"))
}

fn comment_after_double_quoted_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"^(?:[^";]*"[^"]*"[^";]*)*(?P<cmt>;).*$"#)
            .expect("double-quoted comment regex")
    })
}

fn comment_after_single_quoted_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^(?:[^';]*'[^']*'[^';]*)*(?P<cmt>;).*$").expect("single-quoted comment regex")
    })
}

fn block_comment_start_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^#(comments-start|cs)(\b|$)").expect("cs regex"))
}

fn block_comment_end_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^#(comments-end|ce)(\b|$)").expect("ce regex"))
}

fn region_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^#(end-?)?region\b").expect("region regex"))
}

fn continuation_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(\s|^)_$").expect("continuation regex"))
}

fn require_admin_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^#requireadmin\b").expect("requireadmin regex"))
}

fn no_tray_icon_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^#notrayicon\b").expect("notrayicon regex"))
}

fn if_start_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)^if\b").expect("if regex"))
}

fn then_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)\bthen\b").expect("then regex"))
}

fn one_line_func_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?i)^(?P<decl>(?:volatile\s+)?func\s+[a-z_]\w*\s*\(.*?\))\s*->\s*(?P<body>.+)$",
        )
        .expect("one-line func regex")
    })
}

#[cfg(test)]
mod normalize_tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        normalize_source("t.au3", source, false)
            .expect("normalize should pass")
            .lines
            .into_iter()
            .map(|line| line.text)
            .collect()
    }

    #[test]
    fn comment_after_even_quote_count_is_stripped() {
        assert_eq!(trim_comment("$a = 1 ; note"), "$a = 1");
        assert_eq!(trim_comment("$s = \"ab\" ; c"), "$s = \"ab\"");
        assert_eq!(trim_comment("$x = 1 ; don't"), "$x = 1");
        assert_eq!(trim_comment("   "), "");
    }

    #[test]
    fn semicolon_after_odd_quote_count_is_kept() {
        assert_eq!(trim_comment("$s = \"a;b\""), "$s = \"a;b\"");
        assert_eq!(trim_comment("$s = 'a ; b'"), "$s = 'a ; b'");
        assert_eq!(
            trim_comment("$s = \"a;b\" & \"c\" ; it's"),
            "$s = \"a;b\" & \"c\""
        );
    }

    #[test]
    fn interpolated_strings_use_the_strict_boundary_scan() {
        assert_eq!(trim_comment("$s = $\"x\" ; y's"), "$s = $\"x\"");
        assert_eq!(trim_comment("$s = $\"a;b\""), "$s = $\"a;b\"");
    }

    #[test]
    fn block_comments_nest_and_swallow_everything() {
        let lines = texts("#cs\nfunc A()\n#comments-start\nx\n#ce\nLabel:\n#ce\n#ce\nkept");
        assert_eq!(lines, vec!["kept"]);
    }

    #[test]
    fn regions_and_blank_lines_are_dropped() {
        assert_eq!(texts("#region Setup\n\n  a = 1\n#endregion\n#end-region"), vec!["a = 1"]);
    }

    #[test]
    fn continuation_merges_lines_and_spans_locations() {
        let normalized = normalize_source("t.au3", "$a = 1 + _\n  2 + _ ; more\n 3\nnext", false)
            .expect("normalize");
        assert_eq!(normalized.lines[0].text, "$a = 1 + 2 + 3");
        assert_eq!(
            normalized.lines[0].location,
            SourceLocation::spanning("t.au3", 1, 3)
        );
        assert_eq!(normalized.lines[1].location, SourceLocation::new("t.au3", 4));
        assert_eq!(normalized.physical_line_count, 4);
    }

    #[test]
    fn continuation_on_last_line_is_an_error() {
        let error = normalize_source("t.au3", "a\n$b = _", false).expect_err("dangling continuation");
        assert!(error.is(keys::UNEXPECTED_LINE_CONT));
        assert_eq!(error.location, SourceLocation::new("t.au3", 2));
    }

    #[test]
    fn one_line_if_expands_to_block_form() {
        let normalized = normalize_source("t.au3", "If $a Then $b = 1", false).expect("normalize");
        let texts = normalized.lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["If $a Then", "$b = 1", "endif"]);
        assert!(normalized
            .lines
            .iter()
            .all(|line| line.location == SourceLocation::new("t.au3", 1)));
    }

    #[test]
    fn one_line_if_ignores_then_inside_strings_and_nests() {
        assert_eq!(
            texts("If $s = \"then\" Then Foo()"),
            vec!["If $s = \"then\" Then", "Foo()", "endif"]
        );
        assert_eq!(
            texts("if a then if b then c"),
            vec!["if a then", "if b then", "c", "endif", "endif"]
        );
        assert_eq!(texts("If $a Then"), vec!["If $a Then"]);
        assert_eq!(texts("If $a = \"then\" Then"), vec!["If $a = \"then\" Then"]);
        assert_eq!(texts("ElseIf $a Then"), vec!["ElseIf $a Then"]);
    }

    #[test]
    fn one_line_if_handles_mixed_and_doubled_quotes() {
        assert_eq!(
            texts("If $s = \"don't\" Then Foo()"),
            vec!["If $s = \"don't\" Then", "Foo()", "endif"]
        );
        assert_eq!(
            texts("If $s = 'say \"hi' Then Foo()"),
            vec!["If $s = 'say \"hi' Then", "Foo()", "endif"]
        );
        assert_eq!(
            texts("If $s = 'it''s then' Then Bar()"),
            vec!["If $s = 'it''s then' Then", "Bar()", "endif"]
        );
    }

    #[test]
    fn string_literal_scan_tracks_the_opening_quote() {
        assert!(outside_string_literal("If $s = \"don't\" "));
        assert!(!outside_string_literal("If $s = \"a "));
        assert!(!outside_string_literal("If $s = 'a\"\" "));
        assert!(outside_string_literal("If $s = \"a\"\"b\" "));
    }

    #[test]
    fn one_line_func_expands_unless_strict() {
        assert_eq!(
            texts("Volatile Func Sq($x) -> Return $x * $x"),
            vec!["Volatile Func Sq($x)", "Return $x * $x", "endfunc"]
        );
        let error = normalize_source("t.au3", "func f() -> 1", true).expect_err("strict");
        assert!(error.is(keys::EXPERIMENTAL_ONE_LINER));
    }

    #[test]
    fn legacy_directives_are_rewritten() {
        assert_eq!(
            texts("#RequireAdmin\n#NoTrayIcon"),
            vec![
                "#pragma compile(ExecLevel, requireAdministrator)",
                "Opt(\"TrayIconHide\", 1)"
            ]
        );
    }
}
