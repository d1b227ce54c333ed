use crate::block::{Block, Span};
use crate::config::Config;

/// Lists up to this many items are kept on one page
const UNBREAKABLE_LIST_ITEMS: usize = 5;

/// Convert blocks to Typst markup
pub fn blocks_to_typst(blocks: &[Block], config: &Config) -> String {
    let mut out = preamble(config);

    let mut i = 0;
    while i < blocks.len() {
        let block = &blocks[i];

        match block {
            Block::Heading { .. } => {
                // Keep heading with following content using a block that prevents breaks
                out.push_str("#block(breakable: false)[\n");
                emit_block(block, &mut out);

                // Include the next block if it exists (to keep heading with first content)
                if i + 1 < blocks.len() {
                    i += 1;
                    emit_block(&blocks[i], &mut out);
                }
                out.push_str("]\n\n");
            }
            _ => {
                emit_block(block, &mut out);
            }
        }

        i += 1;
    }

    out
}

fn preamble(config: &Config) -> String {
    // Set up paragraph settings to prevent widows/orphans
    let mut out = String::from("#set par(linebreaks: \"optimized\")\n");
    if config.page.numbers {
        out.push_str("#set page(numbering: \"1\")\n");
    }
    out.push_str(&format!(
        "#show link: set text(fill: rgb({}))\n",
        typst_string(&config.links.color)
    ));
    if config.links.underline {
        out.push_str("#show link: underline\n");
    }
    out.push('\n');
    out
}

fn emit_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, text } => {
            for _ in 0..*level {
                out.push('=');
            }
            out.push(' ');
            escape_text(text, false, out);
            out.push_str("\n\n");
        }
        Block::Paragraph { content } => {
            spans_to_typst(content, out);
            out.push_str("\n\n");
        }
        Block::Blockquote { content } => {
            out.push_str("#quote(block: true)[");
            spans_to_typst(content, out);
            out.push_str("]\n\n");
        }
        Block::CodeBlock { language, content } => {
            // Keep code blocks together when possible
            out.push_str("#block(breakable: false)[\n```");
            if let Some(lang) = language {
                out.push_str(lang);
            }
            out.push('\n');
            out.push_str(content);
            if !content.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n]\n\n");
        }
        Block::OrderedList { items } => emit_list(items, "+", out),
        Block::UnorderedList { items } => emit_list(items, "-", out),
        Block::Table { headers, rows } => {
            // Keep tables together when possible
            out.push_str("#block(breakable: false)[\n");
            table_to_typst(headers, rows, out);
            out.push_str("]\n\n");
        }
    }
}

fn emit_list(items: &[Vec<Span>], marker: &str, out: &mut String) {
    // Wrap list to keep together when small, allow breaks when large
    let small = items.len() <= UNBREAKABLE_LIST_ITEMS;
    if small {
        out.push_str("#block(breakable: false)[\n");
    }
    for item in items {
        out.push_str(marker);
        out.push(' ');
        spans_to_typst(item, out);
        out.push('\n');
    }
    if small {
        out.push_str("]\n\n");
    } else {
        out.push('\n');
    }
}

/// Emit spans that open a line or a content block.
fn spans_to_typst(spans: &[Span], out: &mut String) {
    for (i, span) in spans.iter().enumerate() {
        span_to_typst(span, i == 0, out);
    }
}

fn span_to_typst(span: &Span, line_start: bool, out: &mut String) {
    match span {
        Span::Text(text) => escape_text(text, line_start, out),
        Span::Bold(inner) => {
            out.push('*');
            spans_to_typst(inner, out);
            out.push('*');
        }
        Span::Italic(inner) => {
            out.push('_');
            spans_to_typst(inner, out);
            out.push('_');
        }
        Span::Code(text) => {
            // Code spans never contain backticks
            out.push('`');
            out.push_str(text);
            out.push('`');
        }
        Span::Link { url, content } => {
            out.push_str("#link(");
            out.push_str(&typst_string(url));
            out.push_str(")[");
            spans_to_typst(content, out);
            out.push(']');
        }
    }
}

/// Escape special Typst characters in markup text.
///
/// At `line_start`, heading, list, enum and term markers are escaped as well.
/// A `/` following another `/` is escaped so text never opens a comment.
fn escape_text(text: &str, line_start: bool, out: &mut String) {
    let enum_digits = if line_start {
        text.chars().take_while(|c| c.is_ascii_digit()).count()
    } else {
        0
    };
    let mut prev = None;
    for (i, ch) in text.chars().enumerate() {
        let escape = match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '~' => true,
            '=' | '+' | '-' | '/' if line_start && i == 0 => true,
            '/' => prev == Some('/'),
            '.' => enum_digits > 0 && i == enum_digits,
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
        prev = Some(ch);
    }
}

/// Quote a value as a Typst string literal
fn typst_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

fn table_to_typst(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], out: &mut String) {
    // Rows may be ragged; widen to the longest row and pad with empty cells so
    // every row starts in the first column
    let col_count = rows.iter().map(Vec::len).fold(headers.len(), usize::max);
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    out.push_str(&format!("  columns: {},\n", col_count));

    // Header cells (bold)
    for cell in headers {
        out.push_str("  [*");
        spans_to_typst(cell, out);
        out.push_str("*],\n");
    }
    pad_row(headers.len(), col_count, out);

    // Data rows
    for row in rows {
        for cell in row {
            out.push_str("  [");
            spans_to_typst(cell, out);
            out.push_str("],\n");
        }
        pad_row(row.len(), col_count, out);
    }

    out.push_str(")\n");
}

fn pad_row(len: usize, col_count: usize, out: &mut String) {
    for _ in len..col_count {
        out.push_str("  [],\n");
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, markdown_to_typst, markdown_to_typst_with_config};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const PREAMBLE: &str = "#set par(linebreaks: \"optimized\")\n\
                            #show link: set text(fill: rgb(\"#1a4f8b\"))\n\
                            #show link: underline\n\n";

    #[test]
    fn heading() {
        assert_eq!(
            markdown_to_typst("# Hello"),
            format!("{PREAMBLE}#block(breakable: false)[\n= Hello\n\n]\n\n")
        );
    }

    #[test]
    fn heading_with_following_content() {
        // Heading should be grouped with following paragraph
        let result = markdown_to_typst("## Title\n\nSome text.");
        assert!(result.contains("#block(breakable: false)[\n== Title\n\nSome text.\n\n]\n\n"));
    }

    #[test]
    fn heading_text_is_escaped_not_formatted() {
        assert_eq!(
            markdown_to_typst("### **Draft** #1"),
            format!("{PREAMBLE}#block(breakable: false)[\n=== \\*\\*Draft\\*\\* \\#1\n\n]\n\n")
        );
    }

    #[test]
    fn paragraph() {
        assert_eq!(
            markdown_to_typst("Hello world"),
            format!("{PREAMBLE}Hello world\n\n")
        );
    }

    #[test]
    fn bold_and_italic() {
        assert_eq!(
            markdown_to_typst("**bold**"),
            format!("{PREAMBLE}*bold*\n\n")
        );
        assert_eq!(
            markdown_to_typst("*italic*"),
            format!("{PREAMBLE}_italic_\n\n")
        );
        assert_eq!(
            markdown_to_typst("***both***"),
            format!("{PREAMBLE}_*both*_\n\n")
        );
    }

    #[test]
    fn inline_code() {
        assert_eq!(markdown_to_typst("`code`"), format!("{PREAMBLE}`code`\n\n"));
    }

    #[test]
    fn link() {
        assert_eq!(
            markdown_to_typst("[presets](http://s.id/AN-STD-EWO)"),
            format!("{PREAMBLE}#link(\"http://s.id/AN-STD-EWO\")[presets]\n\n")
        );
    }

    #[test]
    fn blockquote() {
        assert_eq!(
            markdown_to_typst("> **Critical:** save first"),
            format!("{PREAMBLE}#quote(block: true)[*Critical:* save first]\n\n")
        );
    }

    #[test]
    fn code_block() {
        assert_eq!(
            markdown_to_typst("```rust\nlet x = 1;\n```"),
            format!("{PREAMBLE}#block(breakable: false)[\n```rust\nlet x = 1;\n```\n]\n\n")
        );
    }

    #[test]
    fn unordered_list() {
        assert_eq!(
            markdown_to_typst("- one\n- two"),
            format!("{PREAMBLE}#block(breakable: false)[\n- one\n- two\n]\n\n")
        );
    }

    #[test]
    fn ordered_list() {
        assert_eq!(
            markdown_to_typst("1. one\n2. two"),
            format!("{PREAMBLE}#block(breakable: false)[\n+ one\n+ two\n]\n\n")
        );
    }

    #[test]
    fn long_list_may_break() {
        assert_eq!(
            markdown_to_typst("- a\n- b\n- c\n- d\n- e\n- f"),
            format!("{PREAMBLE}- a\n- b\n- c\n- d\n- e\n- f\n\n")
        );
    }

    #[test]
    fn escapes_special_chars() {
        assert_eq!(markdown_to_typst("a * b"), format!("{PREAMBLE}a \\* b\n\n"));
        assert_eq!(markdown_to_typst("a # b"), format!("{PREAMBLE}a \\# b\n\n"));
        assert_eq!(markdown_to_typst("a_b"), format!("{PREAMBLE}a\\_b\n\n"));
    }

    #[test]
    fn table() {
        let md = "| A | B |\n|---|---|\n| 1 | 2 |";
        let expected = format!(
            "{PREAMBLE}#block(breakable: false)[\n#table(\n  columns: 2,\n  [*A*],\n  [*B*],\n  [1],\n  [2],\n)\n]\n\n"
        );
        assert_eq!(markdown_to_typst(md), expected);
    }

    #[rstest]
    #[case::heading_marker("= Not a heading", "\\= Not a heading")]
    #[case::enum_marker("+ plus", "\\+ plus")]
    #[case::numbered_enum_marker("12.", "12\\.")]
    #[case::term_marker("/ term: x", "\\/ term: x")]
    #[case::line_comment("a // b", "a /\\/ b")]
    #[case::non_breaking_space("a ~ b", "a \\~ b")]
    #[case::markers_mid_line("a = b + c - d / e", "a = b + c - d / e")]
    fn escapes_markup_markers(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(markdown_to_typst(input), format!("{PREAMBLE}{expected}\n\n"));
    }

    #[test]
    fn list_item_text_cannot_nest_lists() {
        assert_eq!(
            markdown_to_typst("- - x\n- + y"),
            format!("{PREAMBLE}#block(breakable: false)[\n- \\- x\n- \\+ y\n]\n\n")
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let md = "| A | B |\n|---|---|\n| x |\n| 1 | 2 |";
        let expected = format!(
            "{PREAMBLE}#block(breakable: false)[\n#table(\n  columns: 2,\n  [*A*],\n  [*B*],\n  [x],\n  [],\n  [1],\n  [2],\n)\n]\n\n"
        );
        assert_eq!(markdown_to_typst(md), expected);
    }

    #[test]
    fn long_rows_widen_the_table() {
        let md = "| A |\n|---|\n| 1 | 2 |";
        let expected = format!(
            "{PREAMBLE}#block(breakable: false)[\n#table(\n  columns: 2,\n  [*A*],\n  [],\n  [1],\n  [2],\n)\n]\n\n"
        );
        assert_eq!(markdown_to_typst(md), expected);
    }

    #[test]
    fn config_controls_preamble() {
        let mut config = Config::default();
        config.page.numbers = true;
        config.links.underline = false;
        config.links.color = "#000000".to_string();

        assert_eq!(
            markdown_to_typst_with_config("x", &config),
            "#set par(linebreaks: \"optimized\")\n\
             #set page(numbering: \"1\")\n\
             #show link: set text(fill: rgb(\"#000000\"))\n\nx\n\n"
        );
    }
}
