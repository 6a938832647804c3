// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mobiledoc document model
//!
//! A document is an ordered list of sections plus the lookup tables
//! (markups, atoms, cards) that sections and markers point into by index.
//! Renderers only ever borrow a document; they never mutate it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Document format version produced by [`Document::new`]
pub const MOBILEDOC_VERSION: &str = "0.3.1";

/// Free-form key/value payload carried by atoms and cards
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// The root document node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    #[serde(default)]
    pub markups: Vec<Markup>,
    #[serde(default)]
    pub atoms: Vec<Atom>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self {
            version: MOBILEDOC_VERSION.to_string(),
            markups: Vec::new(),
            atoms: Vec::new(),
            cards: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Append a markup to the markup table, returning its index
    pub fn add_markup(&mut self, markup: Markup) -> usize {
        self.markups.push(markup);
        self.markups.len() - 1
    }

    /// Append an atom to the atom table, returning its index
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Append a card to the card table, returning its index
    pub fn add_card(&mut self, card: Card) -> usize {
        self.cards.push(card);
        self.cards.len() - 1
    }

    pub fn push_section(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn markup(&self, index: usize) -> Option<&Markup> {
        self.markups.get(index)
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Inline style annotation (bold, link, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markup {
    pub tag: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl Markup {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Named inline extension with fallback text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub payload: Payload,
}

impl Atom {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// Named block-level extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub name: String,
    #[serde(default)]
    pub payload: Payload,
}

impl Card {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::new(),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// Top-level block of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    /// Paragraph-like section of markers (p, h1, blockquote, ...)
    Markup { tag: String, markers: Vec<Marker> },

    /// Image referenced by source URI
    Image { source: String },

    /// Ordered or unordered list; each item is its own marker sequence
    List { tag: String, items: Vec<Vec<Marker>> },

    /// Card referenced by index into [`Document::cards`]
    Card { card: usize },

    /// Section kind this crate does not understand; rendered as nothing
    #[serde(other)]
    Unknown,
}

impl Section {
    /// Markup section with the conventional `p` tag
    pub fn paragraph(markers: Vec<Marker>) -> Self {
        Self::Markup {
            tag: "p".to_string(),
            markers,
        }
    }

    pub fn image(source: impl Into<String>) -> Self {
        Self::Image {
            source: source.into(),
        }
    }

    pub fn list(tag: impl Into<String>, items: Vec<Vec<Marker>>) -> Self {
        Self::List {
            tag: tag.into(),
            items,
        }
    }

    pub fn card(card: usize) -> Self {
        Self::Card { card }
    }

    /// Short kind name used in logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Markup { .. } => "markup",
            Self::Image { .. } => "image",
            Self::List { .. } => "list",
            Self::Card { .. } => "card",
            Self::Unknown => "unknown",
        }
    }
}

/// One inline content unit, bracketed by markup open/close events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Indices into [`Document::markups`] opened before this marker's content
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub open_markups: Vec<usize>,
    /// Number of open markups closed after this marker's content
    #[serde(default)]
    pub closed_markups: usize,
    #[serde(flatten)]
    pub kind: MarkerKind,
}

impl Marker {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            open_markups: Vec::new(),
            closed_markups: 0,
            kind: MarkerKind::Text { text: text.into() },
        }
    }

    pub fn atom(atom: usize) -> Self {
        Self {
            open_markups: Vec::new(),
            closed_markups: 0,
            kind: MarkerKind::Atom { atom },
        }
    }

    pub fn with_open(mut self, markups: impl IntoIterator<Item = usize>) -> Self {
        self.open_markups.extend(markups);
        self
    }

    pub fn with_closed(mut self, count: usize) -> Self {
        self.closed_markups = count;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarkerKind {
    /// Literal text, written verbatim
    Text { text: String },

    /// Atom referenced by index into [`Document::atoms`]
    Atom { atom: usize },
}

/// Document table a section or marker points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Markup,
    Atom,
    Card,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markup => "markup",
            Self::Atom => "atom",
            Self::Card => "card",
        })
    }
}
