//! Source linter
//!
//! Text-level checks that run alongside the parser. Findings are warnings or
//! infos and never block execution.

use super::Diagnostic;
use crate::parser::ast::SourceLocation;
use regex::Regex;
use std::sync::LazyLock;

const STATEMENT_STARTERS: &[&str] = &[
    "var", "rule", "function", "if", "while", "for", "return", "set", "toggle", "clear", "step",
];

/// Single-letter names that read fine as loop counters or coordinates
const CONVENTIONAL_SHORT_NAMES: &[&str] = &["i", "j", "k", "x", "y"];

const INDENT_WIDTH: usize = 2;

static FIRST_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("valid regex"));
static VAR_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^var\s+(\w+)").expect("valid regex"));
static SELF_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bvar\s+(\w+)\s*=\s*(\w+)\b").expect("valid regex"));
static BARE_CONDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(if|while)\s*\(\s*\w+\s*\)\s*\{").expect("valid regex"));

/// Lint `source`.
pub fn lint(source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let lines: Vec<&str> = source.split('\n').collect();

    for (i, line) in lines.iter().enumerate() {
        check_line(line, i + 1, &mut diagnostics);
    }
    check_brackets(source, &mut diagnostics);
    check_entry_point(source, &mut diagnostics);
    check_blank_runs(&lines, &mut diagnostics);
    check_indentation(&lines, &mut diagnostics);

    diagnostics.sort_by_key(|d| (d.line, d.column));
    diagnostics
}

fn at(line: usize, column: usize) -> SourceLocation {
    SourceLocation::new(line, column)
}

fn check_line(line: &str, line_no: usize, out: &mut Vec<Diagnostic>) {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return;
    }

    if starts_statement(trimmed)
        && !trimmed.ends_with(';')
        && !trimmed.ends_with('{')
        && !trimmed.ends_with('}')
    {
        out.push(Diagnostic::warning(
            "Missing semicolon at end of statement",
            at(line_no, line.chars().count() + 1),
        ));
    }

    if let Some(caps) = SELF_ASSIGN.captures(line) {
        if caps[1] == caps[2] {
            out.push(Diagnostic::warning(
                "Variable assigned to itself - did you mean to use a different value?",
                at(line_no, 1),
            ));
        }
    }

    if let Some(caps) = BARE_CONDITION.captures(line) {
        out.push(Diagnostic::warning(
            format!("Consider adding a comparison operator in {} condition", &caps[1]),
            at(line_no, 1),
        ));
    }

    if let Some(caps) = VAR_DECL.captures(trimmed) {
        let name = &caps[1];
        if name.chars().count() == 1 && !CONVENTIONAL_SHORT_NAMES.contains(&name) {
            let indent = line.len() - line.trim_start().len();
            out.push(Diagnostic::warning(
                format!("Single-letter variable '{name}' - consider using a more descriptive name"),
                at(line_no, indent + 5),
            ));
        }
    }
}

fn starts_statement(trimmed: &str) -> bool {
    FIRST_WORD
        .find(trimmed)
        .is_some_and(|word| STATEMENT_STARTERS.contains(&word.as_str()))
}

/// Match brackets across the whole source, skipping strings and comments.
fn check_brackets(source: &str, out: &mut Vec<Diagnostic>) {
    let mut open: Vec<(char, SourceLocation)> = Vec::new();
    let mut chars = source.chars().peekable();
    let (mut line, mut column) = (1, 1);
    let mut in_string = false;

    while let Some(c) = chars.next() {
        let here = at(line, column);
        if c == '\n' {
            line += 1;
            column = 1;
            // Unterminated strings end at the line break for bracket purposes
            in_string = false;
            continue;
        }
        column += 1;

        if in_string {
            match c {
                '\\' => {
                    if chars.next_if(|&n| n != '\n').is_some() {
                        column += 1;
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&n| n != '\n').is_some() {}
            }
            '(' | '{' | '[' => open.push((c, here)),
            ')' | '}' | ']' => {
                let opener = matching_open(c);
                match open.last() {
                    Some(&(top, _)) if top == opener => {
                        open.pop();
                    }
                    _ => out.push(Diagnostic::warning(
                        format!("Unbalanced {} detected: unmatched '{c}'", bracket_name(c)),
                        here,
                    )),
                }
            }
            _ => {}
        }
    }

    for (c, location) in open {
        out.push(Diagnostic::warning(
            format!("Unbalanced {} detected: '{c}' is never closed", bracket_name(c)),
            location,
        ));
    }
}

fn matching_open(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

fn bracket_name(c: char) -> &'static str {
    match c {
        '(' | ')' => "parentheses",
        '[' | ']' => "brackets",
        _ => "braces",
    }
}

fn check_entry_point(source: &str, out: &mut Vec<Diagnostic>) {
    if !source.contains("function main") && !source.contains("rule main") {
        out.push(Diagnostic::info(
            "Consider adding a main function or rule as an entry point",
            at(1, 1),
        ));
    }
}

fn check_blank_runs(lines: &[&str], out: &mut Vec<Diagnostic>) {
    let mut run = 0;
    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            run += 1;
            if run > 2 {
                out.push(Diagnostic::info(
                    "Too many consecutive empty lines - consider reducing to improve readability",
                    at(i + 1, 1),
                ));
            }
        } else {
            run = 0;
        }
    }
}

/// Lines that open or close a block must sit at the block's depth.
fn check_indentation(lines: &[&str], out: &mut Vec<Diagnostic>) {
    let mut expected = 0usize;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        let actual = line.len() - line.trim_start().len();

        if trimmed.ends_with('{') {
            if actual != expected {
                out.push(inconsistent_indent(i + 1));
            }
            expected += INDENT_WIDTH;
        } else if trimmed.starts_with('}') {
            expected = expected.saturating_sub(INDENT_WIDTH);
            if actual != expected {
                out.push(inconsistent_indent(i + 1));
            }
        }
    }
}

fn inconsistent_indent(line: usize) -> Diagnostic {
    Diagnostic::warning("Inconsistent indentation detected", at(line, 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::Severity;

    fn messages(source: &str) -> Vec<String> {
        lint(source).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_clean_program_only_suggests_entry_point() {
        let source = "function main() {\n  set(1, 1);\n  step();\n}\n";
        let diagnostics = lint(source);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let diagnostics = lint("set(1, 1);\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Info);
    }

    #[test]
    fn test_missing_semicolon_points_past_line_end() {
        let diagnostics = lint("var count = 1\nfunction main() {\n}\n");
        let missing = diagnostics
            .iter()
            .find(|d| d.message.starts_with("Missing semicolon"))
            .expect("reported");
        assert_eq!((missing.line, missing.column), (1, 14));
        // Identifiers merely starting with a keyword are not statements
        assert!(!messages("variable\nfunction main() {\n}").iter().any(|m| m.starts_with("Missing")));
    }

    #[test]
    fn test_brackets_are_matched_across_lines() {
        let ok = "function main() {\n  var xs = [\n    1, 2\n  ];\n}\n";
        assert!(!messages(ok).iter().any(|m| m.starts_with("Unbalanced")));

        let diagnostics = lint("function main() {\n  print(\"}\");\n");
        let unclosed: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.message.starts_with("Unbalanced braces"))
            .collect();
        assert_eq!(unclosed.len(), 1);
        assert_eq!((unclosed[0].line, unclosed[0].column), (1, 17));

        assert!(messages("var a = (1));").iter().any(|m| m.contains("unmatched ')'")));
    }

    #[test]
    fn test_suspicious_patterns() {
        let found = messages("var total = total;\nif (flag) {\n}\nwhile (n) {\n}\nvar q = 2;");
        assert!(found.iter().any(|m| m.starts_with("Variable assigned to itself")));
        assert!(found.iter().any(|m| m.ends_with("in if condition")));
        assert!(found.iter().any(|m| m.ends_with("in while condition")));
        assert!(found.iter().any(|m| m.starts_with("Single-letter variable 'q'")));
        assert!(!messages("var x = 1;").iter().any(|m| m.starts_with("Single-letter")));
    }

    #[test]
    fn test_layout_checks() {
        let found = lint("rule main {\n}\n\n\n\nset(1, 1);\n");
        assert!(found
            .iter()
            .any(|d| d.severity == Severity::Info && d.message.starts_with("Too many") && d.line == 5));

        let found = messages("function main() {\n    if (1 == 1) {\n    }\n}\n");
        assert_eq!(
            found.iter().filter(|m| *m == "Inconsistent indentation detected").count(),
            2
        );
    }
}
