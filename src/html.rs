use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::block::{Block, Span};
use crate::config::HtmlConfig;

/// Convert blocks to HTML, one top-level element per line
pub fn blocks_to_html(blocks: &[Block], config: &HtmlConfig) -> String {
    let mut out = String::new();
    for block in blocks {
        emit_block(block, config, &mut out);
        out.push('\n');
    }
    out
}

/// Render inline spans as an HTML fragment.
pub fn spans_to_html(spans: &[Span]) -> String {
    let mut out = String::new();
    push_spans(spans, &mut out);
    out
}

fn emit_block(block: &Block, config: &HtmlConfig, out: &mut String) {
    match block {
        Block::Heading { level, text } => {
            out.push_str(&format!("<h{level}>{}</h{level}>", encode_text(text)));
        }
        Block::Paragraph { content } => {
            out.push_str("<p>");
            push_spans(content, out);
            out.push_str("</p>");
        }
        Block::Blockquote { content } => {
            out.push_str("<blockquote><p>");
            push_spans(content, out);
            out.push_str("</p></blockquote>");
        }
        Block::OrderedList { items } => {
            emit_list("ol", &config.class("ordered-list"), items, out);
        }
        Block::UnorderedList { items } => {
            emit_list("ul", &config.class("unordered-list"), items, out);
        }
        Block::Table { headers, rows } => {
            if config.wrap_tables {
                out.push_str(&format!("<div class=\"{}\">", config.class("table-wrapper")));
            }
            emit_table(headers, rows, &config.class("table"), out);
            if config.wrap_tables {
                out.push_str("</div>");
            }
        }
        Block::CodeBlock { language, content } => {
            match language {
                Some(lang) => out.push_str(&format!(
                    "<pre><code class=\"language-{}\">",
                    encode_double_quoted_attribute(lang)
                )),
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&encode_text(content));
            out.push_str("</code></pre>");
        }
    }
}

fn emit_list(tag: &str, class: &str, items: &[Vec<Span>], out: &mut String) {
    out.push_str(&format!("<{tag} class=\"{class}\">"));
    for item in items {
        out.push_str("<li>");
        push_spans(item, out);
        out.push_str("</li>");
    }
    out.push_str(&format!("</{tag}>"));
}

fn emit_table(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], class: &str, out: &mut String) {
    out.push_str(&format!("<table class=\"{class}\"><thead><tr>"));
    for cell in headers {
        out.push_str("<th>");
        push_spans(cell, out);
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            push_spans(cell, out);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn push_spans(spans: &[Span], out: &mut String) {
    for span in spans {
        push_span(span, out);
    }
}

fn push_span(span: &Span, out: &mut String) {
    match span {
        Span::Text(text) => out.push_str(&encode_text(text)),
        Span::Code(text) => {
            out.push_str("<code>");
            out.push_str(&encode_text(text));
            out.push_str("</code>");
        }
        Span::Bold(inner) => {
            out.push_str("<strong>");
            push_spans(inner, out);
            out.push_str("</strong>");
        }
        Span::Italic(inner) => {
            out.push_str("<em>");
            push_spans(inner, out);
            out.push_str("</em>");
        }
        Span::Link { url, content } if !is_safe_href(url) => {
            log::warn!("dropping link with unsupported scheme: {}", url);
            push_spans(content, out);
        }
        Span::Link { url, content } => {
            // Links always open in a new tab without opener or referrer
            out.push_str(&format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">",
                encode_double_quoted_attribute(url)
            ));
            push_spans(content, out);
            out.push_str("</a>");
        }
    }
}

/// Relative targets and http, https and mailto URLs. Anything else, such as
/// `javascript:` or `data:`, is rendered as plain label text.
fn is_safe_href(url: &str) -> bool {
    // Browsers ignore whitespace and control characters inside the scheme
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_control())
        .collect();
    let Some(colon) = cleaned.find(':') else {
        return true;
    };
    let scheme = &cleaned[..colon];
    if scheme.contains(['/', '?', '#']) {
        return true;
    }
    ["http", "https", "mailto"]
        .iter()
        .any(|allowed| scheme.eq_ignore_ascii_case(allowed))
}
