// SPDX-License-Identifier: AGPL-3.0-or-later
//! Renderer trait, extension registry, configuration and errors

use crate::ast::{Document, Payload, TableKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

/// Error reported by a host-supplied atom or card renderer
pub type ExtensionError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of atom and card renderers
pub type ExtensionResult = std::result::Result<(), ExtensionError>;

/// Which extension point a failing callback was registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Atom,
    Card,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Atom => "atom",
            Self::Card => "card",
        })
    }
}

/// Error type for rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Malformed URI {source_text:?}: {reason}")]
    MalformedUri { source_text: String, reason: String },

    #[error("Missing card renderer: {name}")]
    MissingRenderer { name: String },

    #[error("Missing atom renderer: {name}")]
    MissingAtom { name: String },

    #[error("The {kind} renderer {name:?} failed: {source}")]
    Extension {
        kind: ExtensionKind,
        name: String,
        #[source]
        source: ExtensionError,
    },

    #[error("Cannot close {requested} markups with only {open} open")]
    UnbalancedMarkup { requested: usize, open: usize },

    #[error("Dangling {kind} reference: index {index}")]
    DanglingReference { kind: TableKind, index: usize },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// What to do when a marker closes more markups than are open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderflowPolicy {
    /// Empty the stack and carry on
    #[default]
    Clamp,
    /// Fail with [`RenderError::UnbalancedMarkup`]
    Error,
}

/// What to do with an atom whose name has no registered renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAtomPolicy {
    /// Emit nothing for the marker
    #[default]
    Omit,
    /// Emit the atom's own fallback text
    RawText,
    /// Fail with [`RenderError::MissingAtom`]
    Error,
}

/// Configuration for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub markup_underflow: UnderflowPolicy,
    pub missing_atom: MissingAtomPolicy,
    /// Capacity of the buffer wrapped around the output sink
    pub buffer_capacity: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            markup_underflow: UnderflowPolicy::default(),
            missing_atom: MissingAtomPolicy::default(),
            buffer_capacity: 4096,
        }
    }
}

/// Renderer trait: write a Document to an output sink
pub trait Renderer: Send + Sync {
    /// Render the whole document, flushing the sink on success
    fn render(&self, writer: &mut dyn Write, doc: &Document) -> Result<()>;
}

/// Convenience operations layered on [`Renderer`]
pub trait RendererExt: Renderer {
    /// Render into memory and return the text
    fn render_to_string(&self, doc: &Document) -> Result<String> {
        let mut buf = Vec::new();
        self.render(&mut buf, doc)?;
        String::from_utf8(buf)
            .map_err(|e| RenderError::IoError(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

impl<T: Renderer + ?Sized> RendererExt for T {}

/// Inline extension callback: `(sink, atom text, atom payload)`
pub trait AtomRenderer: Send + Sync {
    fn render(
        &self,
        writer: &mut dyn Write,
        text: &str,
        payload: &Payload,
    ) -> ExtensionResult;
}

impl<F> AtomRenderer for F
where
    F: Fn(&mut dyn Write, &str, &Payload) -> ExtensionResult + Send + Sync,
{
    fn render(
        &self,
        writer: &mut dyn Write,
        text: &str,
        payload: &Payload,
    ) -> ExtensionResult {
        self(writer, text, payload)
    }
}

/// Block extension callback: `(sink, card payload)`
pub trait CardRenderer: Send + Sync {
    fn render(&self, writer: &mut dyn Write, payload: &Payload) -> ExtensionResult;
}

impl<F> CardRenderer for F
where
    F: Fn(&mut dyn Write, &Payload) -> ExtensionResult + Send + Sync,
{
    fn render(&self, writer: &mut dyn Write, payload: &Payload) -> ExtensionResult {
        self(writer, payload)
    }
}

/// Registry of atom and card renderers, keyed by name
///
/// Registering a name twice replaces the earlier renderer.
pub struct ExtensionRegistry {
    atoms: HashMap<String, Box<dyn AtomRenderer>>,
    cards: HashMap<String, Box<dyn CardRenderer>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self {
            atoms: HashMap::new(),
            cards: HashMap::new(),
        }
    }

    pub fn register_atom(&mut self, name: impl Into<String>, renderer: impl AtomRenderer + 'static) {
        self.atoms.insert(name.into(), Box::new(renderer));
    }

    pub fn register_card(&mut self, name: impl Into<String>, renderer: impl CardRenderer + 'static) {
        self.cards.insert(name.into(), Box::new(renderer));
    }

    pub fn atom(&self, name: &str) -> Option<&dyn AtomRenderer> {
        self.atoms.get(name).map(|r| r.as_ref())
    }

    pub fn card(&self, name: &str) -> Option<&dyn CardRenderer> {
        self.cards.get(name).map(|r| r.as_ref())
    }

    pub fn atom_names(&self) -> impl Iterator<Item = &str> {
        self.atoms.keys().map(String::as_str)
    }

    pub fn card_names(&self) -> impl Iterator<Item = &str> {
        self.cards.keys().map(String::as_str)
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut atoms: Vec<_> = self.atom_names().collect();
        let mut cards: Vec<_> = self.card_names().collect();
        atoms.sort_unstable();
        cards.sort_unstable();
        f.debug_struct("ExtensionRegistry")
            .field("atoms", &atoms)
            .field("cards", &cards)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_registration_wins() {
        let mut registry = ExtensionRegistry::new();
        registry.register_card("c", |w: &mut dyn Write, _: &Payload| -> ExtensionResult {
            w.write_all(b"first")?;
            Ok(())
        });
        registry.register_card("c", |w: &mut dyn Write, _: &Payload| -> ExtensionResult {
            w.write_all(b"second")?;
            Ok(())
        });

        let mut out = Vec::new();
        registry
            .card("c")
            .expect("registered")
            .render(&mut out, &Payload::new())
            .expect("render");
        assert_eq!(out, b"second");
        assert_eq!(registry.card_names().count(), 1);
    }

    #[test]
    fn test_lookup_misses() {
        let registry = ExtensionRegistry::new();
        assert!(registry.atom("nope").is_none());
        assert!(registry.card("nope").is_none());
    }

    #[test]
    fn test_atom_callback_receives_text_and_payload() {
        let mut registry = ExtensionRegistry::new();
        registry.register_atom(
            "mention",
            |w: &mut dyn Write, text: &str, payload: &Payload| -> ExtensionResult {
                let id = payload.get("id").and_then(|v| v.as_u64()).unwrap_or_default();
                write!(w, "{text}#{id}")?;
                Ok(())
            },
        );

        let mut payload = Payload::new();
        payload.insert("id".to_string(), serde_json::json!(7));
        let mut out = Vec::new();
        registry
            .atom("mention")
            .expect("registered")
            .render(&mut out, "@bob", &payload)
            .expect("render");
        assert_eq!(String::from_utf8(out).unwrap(), "@bob#7");
    }

    #[test]
    fn test_config_defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.markup_underflow, UnderflowPolicy::Clamp);
        assert_eq!(config.missing_atom, MissingAtomPolicy::Omit);
        assert_eq!(config.buffer_capacity, 4096);
    }

    #[test]
    fn test_config_partial_json() {
        let config: RenderConfig =
            serde_json::from_str(r#"{"missing_atom":"raw_text"}"#).expect("deserialize");
        assert_eq!(config.missing_atom, MissingAtomPolicy::RawText);
        assert_eq!(config.markup_underflow, UnderflowPolicy::Clamp);
    }

    #[test]
    fn test_error_messages() {
        let err = RenderError::MissingRenderer {
            name: "card1".to_string(),
        };
        assert_eq!(err.to_string(), "Missing card renderer: card1");

        let err = RenderError::DanglingReference {
            kind: TableKind::Atom,
            index: 4,
        };
        assert_eq!(err.to_string(), "Dangling atom reference: index 4");
    }
}
