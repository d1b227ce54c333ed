use std::sync::LazyLock;

use regex::Regex;

use crate::block::{Block, Span};
use crate::inline;

const FENCE: &str = "```";

static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.\s(.+)").expect("ordered list pattern is valid"));

/// Parse a wiki document into a list of blocks
pub fn parse(markdown: &str) -> Vec<Block> {
    let mut state = ParseState::default();

    for line in markdown.trim().lines() {
        state.process_line(line);
    }

    let blocks = state.finish();
    log::debug!("parsed {} blocks", blocks.len());
    blocks
}

/// The multi-line construct currently being accumulated. Only one can be open.
#[derive(Debug, Default)]
enum Open {
    #[default]
    None,
    Code {
        language: Option<String>,
        lines: Vec<String>,
    },
    Table(Vec<String>),
    OrderedList(Vec<String>),
    UnorderedList(Vec<String>),
}

#[derive(Default)]
struct ParseState {
    open: Open,
    blocks: Vec<Block>,
}

impl ParseState {
    fn process_line(&mut self, line: &str) {
        let trimmed = line.trim();

        // Code fences
        if let Some(info) = trimmed.strip_prefix(FENCE) {
            let closing = matches!(self.open, Open::Code { .. });
            self.flush();
            if !closing {
                let info = info.trim();
                self.open = Open::Code {
                    language: (!info.is_empty()).then(|| info.to_string()),
                    lines: Vec::new(),
                };
            }
            return;
        }
        if let Open::Code { lines, .. } = &mut self.open {
            lines.push(line.to_string());
            return;
        }

        // Tables
        if is_table_row(trimmed) {
            match &mut self.open {
                Open::Table(rows) => rows.push(trimmed.to_string()),
                _ => {
                    self.flush();
                    self.open = Open::Table(vec![trimmed.to_string()]);
                }
            }
            return;
        }
        if matches!(self.open, Open::Table(_)) {
            self.flush();
        }

        if trimmed.is_empty() {
            self.flush();
            return;
        }

        // Headings
        for (level, prefix) in [(1, "# "), (2, "## "), (3, "### ")] {
            if let Some(text) = trimmed.strip_prefix(prefix) {
                self.flush();
                self.blocks.push(Block::Heading {
                    level,
                    text: text.to_string(),
                });
                return;
            }
        }

        if let Some(quote) = trimmed.strip_prefix("> ") {
            self.flush();
            self.blocks.push(Block::Blockquote {
                content: inline::format(quote),
            });
            return;
        }

        // Lists
        if let Some(caps) = ORDERED_ITEM.captures(trimmed) {
            let item = caps[1].to_string();
            match &mut self.open {
                Open::OrderedList(items) => items.push(item),
                _ => {
                    self.flush();
                    self.open = Open::OrderedList(vec![item]);
                }
            }
            return;
        }
        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            match &mut self.open {
                Open::UnorderedList(items) => items.push(item.to_string()),
                _ => {
                    self.flush();
                    self.open = Open::UnorderedList(vec![item.to_string()]);
                }
            }
            return;
        }

        self.flush();
        self.blocks.push(Block::Paragraph {
            content: inline::format(trimmed),
        });
    }

    /// Close whatever is open and append the resulting block.
    fn flush(&mut self) {
        let block = match std::mem::take(&mut self.open) {
            Open::None => return,
            Open::Code { language, lines } => Block::CodeBlock {
                language,
                content: lines.join("\n"),
            },
            Open::Table(rows) => table_block(&rows),
            Open::OrderedList(items) => Block::OrderedList {
                items: format_items(&items),
            },
            Open::UnorderedList(items) => Block::UnorderedList {
                items: format_items(&items),
            },
        };
        log::trace!("flushed block {:?}", block);
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        if let Open::Code { lines, .. } = &self.open {
            log::debug!("unterminated code fence, closing {} lines at end of input", lines.len());
        }
        self.flush();
        self.blocks
    }
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn split_cells(row: &str) -> Vec<Vec<Span>> {
    row.split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(inline::format)
        .collect()
}

/// The first row is the header and the second is always taken to be the
/// separator, whatever it contains.
fn table_block(rows: &[String]) -> Block {
    let headers = rows.first().map(|row| split_cells(row)).unwrap_or_default();
    let rows = rows.iter().skip(2).map(|row| split_cells(row)).collect();
    Block::Table { headers, rows }
}

fn format_items(items: &[String]) -> Vec<Vec<Span>> {
    items.iter().map(|item| inline::format(item)).collect()
}
