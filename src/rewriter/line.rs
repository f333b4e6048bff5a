// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 freezerun contributors

//! Line-level relative import rewriting

/// Rewrite one relative `from` import into its absolute form.
///
/// Returns `None` when the line is not a relative import or does not have
/// the `from <module> import <names>` shape. Indentation is kept as is and
/// the imported names are rejoined with single spaces.
pub fn rewrite_line(line: &str) -> Option<String> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];

    let mut tokens = body.split_whitespace();
    if tokens.next() != Some("from") {
        return None;
    }

    let module = tokens.next()?;
    if !module.starts_with('.') {
        return None;
    }
    if tokens.next() != Some("import") {
        return None;
    }

    let names = tokens.collect::<Vec<_>>().join(" ");
    if names.is_empty() {
        return None;
    }

    let module = module.trim_start_matches('.');
    let rewritten = if module.is_empty() {
        format!("{}import {}", indent, names)
    } else {
        format!("{}from {} import {}", indent, module, names)
    };

    Some(rewritten)
}

/// Byte order mark some editors put at the start of a UTF-8 file
const BOM: char = '\u{feff}';

/// Rewrite every qualifying line of a source file.
///
/// Returns the new text and the number of changed lines, or `None` if
/// nothing changed. Line endings (`\n` or `\r\n`) and a leading byte order
/// mark are preserved.
pub fn rewrite_source(text: &str) -> Option<(String, usize)> {
    let mut out = String::with_capacity(text.len());
    let mut changed = 0;

    let text = match text.strip_prefix(BOM) {
        Some(rest) => {
            out.push(BOM);
            rest
        }
        None => text,
    };

    for raw in text.split_inclusive('\n') {
        let (content, ending) = split_line_ending(raw);
        match rewrite_line(content) {
            Some(new) if new != content => {
                out.push_str(&new);
                changed += 1;
            }
            _ => out.push_str(content),
        }
        out.push_str(ending);
    }

    if changed == 0 {
        None
    } else {
        Some((out, changed))
    }
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(content) = raw.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = raw.strip_suffix('\n') {
        (content, "\n")
    } else {
        (raw, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_relative_becomes_plain_import() {
        assert_eq!(rewrite_line("from . import x").as_deref(), Some("import x"));
        assert_eq!(rewrite_line("from .. import x").as_deref(), Some("import x"));
    }

    #[test]
    fn test_module_relative_keeps_from_clause() {
        assert_eq!(
            rewrite_line("from .foo import bar").as_deref(),
            Some("from foo import bar")
        );
        assert_eq!(
            rewrite_line("from ..a.b import c as d").as_deref(),
            Some("from a.b import c as d")
        );
    }

    #[test]
    fn test_indentation_preserved() {
        assert_eq!(
            rewrite_line("    from .m import n").as_deref(),
            Some("    from m import n")
        );
        assert_eq!(
            rewrite_line("\t\tfrom .m import n").as_deref(),
            Some("\t\tfrom m import n")
        );
    }

    #[test]
    fn test_multiple_names_rejoined() {
        assert_eq!(
            rewrite_line("from .languages import  LANGUAGES,   to_code").as_deref(),
            Some("from languages import LANGUAGES, to_code")
        );
    }

    #[test]
    fn test_non_relative_lines_untouched() {
        for line in [
            "import os",
            "from os import path",
            "from os.path import join as j",
            "x = 'from . import y'",
            "# from . import commented",
            "",
            "   ",
            "fromage = 1",
        ] {
            assert_eq!(rewrite_line(line), None, "line: {line:?}");
        }
    }

    #[test]
    fn test_malformed_relative_imports_untouched() {
        for line in [
            "from .",
            "from .foo",
            "from .foo import",
            "from .foo export bar",
            "from. import x",
        ] {
            assert_eq!(rewrite_line(line), None, "line: {line:?}");
        }
    }

    #[test]
    fn test_source_preserves_other_bytes() {
        let text = "import os\r\nfrom .util import helper\r\n\r\n\
                    def f():\n    from ..pkg import thing\n    return 1";
        let (out, changed) = rewrite_source(text).unwrap();

        assert_eq!(changed, 2);
        assert_eq!(
            out,
            "import os\r\nfrom util import helper\r\n\r\n\
             def f():\n    from pkg import thing\n    return 1"
        );
    }

    #[test]
    fn test_byte_order_mark_kept_and_first_line_rewritten() {
        let text = "\u{feff}from .core import run\nfrom .x import y\n";
        let (out, changed) = rewrite_source(text).unwrap();

        assert_eq!(changed, 2);
        assert_eq!(out, "\u{feff}from core import run\nfrom x import y\n");
        assert_eq!(rewrite_source("\u{feff}import os\n"), None);
    }

    #[test]
    fn test_source_without_matches_is_none() {
        assert_eq!(rewrite_source("import os\nprint('hi')\n"), None);
        assert_eq!(rewrite_source(""), None);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let text = "from . import a\nfrom ..b.c import d as e\n";
        let (once, _) = rewrite_source(text).unwrap();
        assert_eq!(rewrite_source(&once), None);
    }
}
