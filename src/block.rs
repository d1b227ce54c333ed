use serde::Serialize;

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Span {
    Text(String),
    Code(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Link { url: String, content: Vec<Span> },
}

impl Span {
    /// Plain text of the span with all formatting removed.
    pub fn plain_text(&self) -> String {
        match self {
            Span::Text(text) | Span::Code(text) => text.clone(),
            Span::Bold(inner) | Span::Italic(inner) | Span::Link { content: inner, .. } => {
                inner.iter().map(Span::plain_text).collect()
            }
        }
    }
}

/// Block-level elements of a wiki document, in presentation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Levels 1 to 3. Heading text is kept raw.
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        content: Vec<Span>,
    },
    Blockquote {
        content: Vec<Span>,
    },
    OrderedList {
        items: Vec<Vec<Span>>,
    },
    UnorderedList {
        items: Vec<Vec<Span>>,
    },
    Table {
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    CodeBlock {
        /// Info string after the opening fence, if any
        language: Option<String>,
        content: String,
    },
}
