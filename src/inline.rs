//! Inline formatting.
//!
//! Text is rewritten by four rules applied in a fixed order: inline code, bold,
//! italic, links. Each rule runs leftmost-first over the output of the previous one.
//! Spans produced by an earlier rule are atoms for the later ones: they can be
//! enclosed by a new span but never split, and code spans are never looked into.

use crate::block::Span;

/// One position in the sequence a rule scans: a character of plain text or a
/// span produced by an earlier rule.
#[derive(Debug)]
enum Unit {
    Char(char),
    Atom(Span),
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Code,
    Bold,
    Italic,
    Link,
}

impl Rule {
    const ORDER: [Rule; 4] = [Rule::Code, Rule::Bold, Rule::Italic, Rule::Link];

    /// Opening delimiter, closing delimiter and the character the content may not contain.
    fn delimiters(self) -> (&'static str, &'static str, char) {
        match self {
            Rule::Code => ("`", "`", '`'),
            Rule::Bold => ("**", "**", '*'),
            Rule::Italic => ("*", "*", '*'),
            Rule::Link => ("[", "]", ']'),
        }
    }
}

/// Unit indices of one rule match.
struct Match {
    start: usize,
    content_start: usize,
    content_end: usize,
    end: usize,
    url: Option<String>,
}

/// Apply inline formatting to a fragment of text.
pub fn format(text: &str) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut spans = vec![Span::Text(text.to_string())];
    for rule in Rule::ORDER {
        spans = apply(spans, rule);
    }
    spans
}

fn apply(spans: Vec<Span>, rule: Rule) -> Vec<Span> {
    let units = to_units(spans, rule);
    let stops = Stops::new(&units, rule);

    let mut matches = Vec::new();
    let mut i = 0;
    while i < units.len() {
        match match_at(&units, &stops, i, rule) {
            Some(m) => {
                i = m.end;
                matches.push(m);
            }
            None => i += 1,
        }
    }

    let mut out = Vec::new();
    let mut pending = Vec::new();
    let mut iter = units.into_iter();
    let mut pos = 0;
    for m in matches {
        pending.extend(iter.by_ref().take(m.start - pos));
        flush_units(&mut pending, &mut out);

        let mut matched: Vec<Unit> = iter.by_ref().take(m.end - m.start).collect();
        let content = matched
            .drain(m.content_start - m.start..m.content_end - m.start)
            .collect();
        out.push(build(rule, content, m.url));
        pos = m.end;
    }
    pending.extend(iter);
    flush_units(&mut pending, &mut out);
    out
}

/// Flatten spans into units, recursing into the children of formatted spans so
/// that the rule also applies inside them. Code spans stay opaque.
fn to_units(spans: Vec<Span>, rule: Rule) -> Vec<Unit> {
    let mut units = Vec::new();
    for span in spans {
        match span {
            Span::Text(text) => units.extend(text.chars().map(Unit::Char)),
            Span::Code(_) => units.push(Unit::Atom(span)),
            Span::Bold(inner) => units.push(Unit::Atom(Span::Bold(apply(inner, rule)))),
            Span::Italic(inner) => units.push(Unit::Atom(Span::Italic(apply(inner, rule)))),
            Span::Link { url, content } => units.push(Unit::Atom(Span::Link {
                url,
                content: apply(content, rule),
            })),
        }
    }
    units
}

fn match_at(units: &[Unit], stops: &Stops, start: usize, rule: Rule) -> Option<Match> {
    let (open, close, _) = rule.delimiters();
    if !starts_with(units, start, open) {
        return None;
    }

    let content_start = start + open.len();
    let content_end = stops.content[content_start];
    if content_end == content_start || !starts_with(units, content_end, close) {
        return None;
    }
    let after_close = content_end + close.len();

    if !matches!(rule, Rule::Link) {
        return Some(Match {
            start,
            content_start,
            content_end,
            end: after_close,
            url: None,
        });
    }

    // Link target: `(` + plain text without `)` + `)`
    if !starts_with(units, after_close, "(") {
        return None;
    }
    let url_start = after_close + 1;
    let url_end = stops.url[url_start];
    if url_end == url_start || !starts_with(units, url_end, ")") {
        return None;
    }
    let url = units[url_start..url_end]
        .iter()
        .filter_map(|unit| match unit {
            Unit::Char(c) => Some(*c),
            Unit::Atom(_) => None,
        })
        .collect();

    Some(Match {
        start,
        content_start,
        content_end,
        end: url_end + 1,
        url: Some(url),
    })
}

/// Where content runs end, precomputed per scan so each opener is checked in
/// constant time.
struct Stops {
    /// First unit at or after each index that is the rule's excluded character
    content: Vec<usize>,
    /// First `)` or atom at or after each index; link targets stop there
    url: Vec<usize>,
}

impl Stops {
    fn new(units: &[Unit], rule: Rule) -> Self {
        let (_, _, excluded) = rule.delimiters();
        let content = next_stop(units, |unit| matches!(unit, Unit::Char(c) if *c == excluded));
        let url = match rule {
            Rule::Link => next_stop(units, |unit| matches!(unit, Unit::Char(')') | Unit::Atom(_))),
            _ => Vec::new(),
        };
        Self { content, url }
    }
}

/// For every index up to `units.len()`, the index of the first unit at or after
/// it for which `is_stop` holds, or `units.len()`.
fn next_stop(units: &[Unit], is_stop: impl Fn(&Unit) -> bool) -> Vec<usize> {
    let mut next = vec![units.len(); units.len() + 1];
    for i in (0..units.len()).rev() {
        next[i] = if is_stop(&units[i]) { i } else { next[i + 1] };
    }
    next
}

// Delimiters are ASCII, so byte length equals unit count.
fn starts_with(units: &[Unit], start: usize, delimiter: &str) -> bool {
    delimiter
        .chars()
        .enumerate()
        .all(|(offset, expected)| matches!(units.get(start + offset), Some(Unit::Char(c)) if *c == expected))
}

fn build(rule: Rule, mut content: Vec<Unit>, url: Option<String>) -> Span {
    let mut inner = Vec::new();
    flush_units(&mut content, &mut inner);

    match rule {
        Rule::Code => Span::Code(inner.iter().map(Span::plain_text).collect()),
        Rule::Bold => Span::Bold(inner),
        Rule::Italic => Span::Italic(inner),
        Rule::Link => Span::Link {
            url: url.unwrap_or_default(),
            content: inner,
        },
    }
}

/// Move units into `out`, merging consecutive characters into text spans.
fn flush_units(units: &mut Vec<Unit>, out: &mut Vec<Span>) {
    let mut text = String::new();
    for unit in units.drain(..) {
        match unit {
            Unit::Char(c) => text.push(c),
            Unit::Atom(span) => {
                if !text.is_empty() {
                    push_text(out, std::mem::take(&mut text));
                }
                out.push(span);
            }
        }
    }
    if !text.is_empty() {
        push_text(out, text);
    }
}

fn push_text(out: &mut Vec<Span>, text: String) {
    if let Some(Span::Text(prev)) = out.last_mut() {
        prev.push_str(&text);
    } else {
        out.push(Span::Text(text));
    }
}
