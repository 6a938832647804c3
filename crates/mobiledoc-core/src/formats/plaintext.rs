// SPDX-License-Identifier: AGPL-3.0-or-later
//! Plain text renderer
//!
//! Walks sections in document order and writes a single linear text stream.
//! Markups are tracked but never rendered; atoms and cards are delegated to
//! the renderers registered on the [`ExtensionRegistry`].

use crate::ast::{Document, Marker, MarkerKind, Section, TableKind};
use crate::formats::markup_stack::MarkupStack;
use crate::traits::{
    AtomRenderer, CardRenderer, ExtensionKind, ExtensionRegistry, MissingAtomPolicy, RenderConfig,
    RenderError, Renderer, Result,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::io::{BufWriter, Write};
use url::Url;

/// Plain text renderer
#[derive(Debug, Default)]
pub struct TextRenderer {
    registry: ExtensionRegistry,
    config: RenderConfig,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: ExtensionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ExtensionRegistry {
        &mut self.registry
    }

    pub fn register_atom(&mut self, name: impl Into<String>, renderer: impl AtomRenderer + 'static) {
        self.registry.register_atom(name, renderer);
    }

    pub fn register_card(&mut self, name: impl Into<String>, renderer: impl CardRenderer + 'static) {
        self.registry.register_card(name, renderer);
    }

    fn render_section(&self, w: &mut dyn Write, doc: &Document, section: &Section) -> Result<()> {
        match section {
            Section::Markup { markers, .. } => self.render_markers(w, doc, markers),
            Section::Image { source } => {
                let src = normalize_source(source)?;
                write!(w, " {src} ")?;
                Ok(())
            }
            Section::List { items, .. } => {
                for item in items {
                    self.render_markers(w, doc, item)?;
                }
                Ok(())
            }
            Section::Card { card } => self.render_card(w, doc, *card),
            Section::Unknown => {
                tracing::debug!("Skipping unknown section kind");
                Ok(())
            }
        }
    }

    fn render_card(&self, w: &mut dyn Write, doc: &Document, index: usize) -> Result<()> {
        let card = doc.card(index).ok_or(RenderError::DanglingReference {
            kind: TableKind::Card,
            index,
        })?;

        let renderer = self
            .registry
            .card(&card.name)
            .ok_or_else(|| RenderError::MissingRenderer {
                name: card.name.clone(),
            })?;

        renderer
            .render(w, &card.payload)
            .map_err(|source| RenderError::Extension {
                kind: ExtensionKind::Card,
                name: card.name.clone(),
                source,
            })
    }

    /// Render one marker sequence (a markup section or a single list item)
    fn render_markers(&self, w: &mut dyn Write, doc: &Document, markers: &[Marker]) -> Result<()> {
        let mut stack = MarkupStack::new();

        for marker in markers {
            for &index in &marker.open_markups {
                let markup = doc.markup(index).ok_or(RenderError::DanglingReference {
                    kind: TableKind::Markup,
                    index,
                })?;
                stack.push(markup);
            }

            match &marker.kind {
                MarkerKind::Text { text } => w.write_all(text.as_bytes())?,
                MarkerKind::Atom { atom } => self.render_atom(w, doc, *atom)?,
            }

            stack.pop(marker.closed_markups, self.config.markup_underflow)?;
        }

        if stack.depth() > 0 {
            tracing::trace!(unclosed = stack.depth(), "Marker sequence ended with open markups");
        }

        Ok(())
    }

    fn render_atom(&self, w: &mut dyn Write, doc: &Document, index: usize) -> Result<()> {
        let atom = doc.atom(index).ok_or(RenderError::DanglingReference {
            kind: TableKind::Atom,
            index,
        })?;

        let Some(renderer) = self.registry.atom(&atom.name) else {
            return match self.config.missing_atom {
                MissingAtomPolicy::Omit => {
                    tracing::debug!(atom = %atom.name, "Omitting atom without renderer");
                    Ok(())
                }
                MissingAtomPolicy::RawText => {
                    w.write_all(atom.text.as_bytes())?;
                    Ok(())
                }
                MissingAtomPolicy::Error => Err(RenderError::MissingAtom {
                    name: atom.name.clone(),
                }),
            };
        };

        renderer
            .render(w, &atom.text, &atom.payload)
            .map_err(|source| RenderError::Extension {
                kind: ExtensionKind::Atom,
                name: atom.name.clone(),
                source,
            })
    }
}

impl Renderer for TextRenderer {
    fn render(&self, writer: &mut dyn Write, doc: &Document) -> Result<()> {
        let mut w = BufWriter::with_capacity(self.config.buffer_capacity, writer);

        tracing::debug!(sections = doc.sections.len(), "Rendering document as plain text");

        for (index, section) in doc.sections.iter().enumerate() {
            tracing::trace!(index, kind = section.kind(), "Rendering section");
            self.render_section(&mut w, doc, section)?;
        }

        w.flush()?;

        tracing::debug!("Plain text render complete");
        Ok(())
    }
}

/// Characters escaped in the path and fragment of a written source
///
/// Non-ASCII is always escaped. `%` is left alone since escapes are
/// validated before encoding.
const PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Validate an image source and return the form written to the output
///
/// The scheme is lowercased and the path percent-encoded; host, query and
/// the remaining text are kept as written. Absolute URIs must also parse
/// with [`Url`].
fn normalize_source(source: &str) -> Result<String> {
    let malformed = |reason: String| RenderError::MalformedUri {
        source_text: source.to_string(),
        reason,
    };

    if let Some(c) = source.chars().find(|c| c.is_ascii_control()) {
        return Err(malformed(format!("invalid control character {c:?}")));
    }

    let (reference, fragment) = match source.split_once('#') {
        Some((reference, fragment)) => (reference, Some(fragment)),
        None => (source, None),
    };
    let (target, query) = match reference.split_once('?') {
        Some((target, query)) => (target, Some(query)),
        None => (reference, None),
    };

    check_escapes(target).map_err(malformed)?;
    if let Some(fragment) = fragment {
        check_escapes(fragment).map_err(malformed)?;
    }

    let mut out = String::with_capacity(source.len());
    match split_scheme(target).map_err(malformed)? {
        (Some(scheme), rest) => {
            Url::parse(source).map_err(|e| malformed(e.to_string()))?;
            out.push_str(&scheme.to_ascii_lowercase());
            out.push(':');
            if rest.starts_with('/') {
                out.extend(utf8_percent_encode(rest, PATH_ENCODE_SET));
            } else {
                // opaque, e.g. mailto:
                out.push_str(rest);
            }
        }
        (None, path) => {
            let first_segment = path.split('/').next().unwrap_or_default();
            if first_segment.contains(':') {
                return Err(malformed(
                    "first path segment in URL cannot contain colon".to_string(),
                ));
            }
            out.extend(utf8_percent_encode(path, PATH_ENCODE_SET));
        }
    }

    if let Some(query) = query {
        out.push('?');
        out.push_str(query);
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.extend(utf8_percent_encode(fragment, PATH_ENCODE_SET));
    }

    Ok(out)
}

/// Split off a leading `scheme:`; a reference without one comes back whole
fn split_scheme(target: &str) -> std::result::Result<(Option<&str>, &str), String> {
    for (i, b) in target.bytes().enumerate() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' => {}
            b'0'..=b'9' | b'+' | b'-' | b'.' if i > 0 => {}
            b':' if i == 0 => return Err("missing protocol scheme".to_string()),
            b':' => return Ok((Some(&target[..i]), &target[i + 1..])),
            _ => return Ok((None, target)),
        }
    }
    Ok((None, target))
}

/// Every `%` must start a two-digit hex escape
fn check_escapes(text: &str) -> std::result::Result<(), String> {
    for (i, _) in text.match_indices('%') {
        let valid = text
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()));
        if !valid {
            let escape: String = text[i..].chars().take(3).collect();
            return Err(format!("invalid URL escape {escape:?}"));
        }
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::ast::Markup;
    use crate::traits::RendererExt;
    use proptest::prelude::*;

    fn text_strategy() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 <>&.,]{0,12}"
    }

    fn text_sections_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
        prop::collection::vec(prop::collection::vec(text_strategy(), 0..6), 0..6)
    }

    /// Marker with markup events referencing a three-entry markup table
    fn marked_marker_strategy() -> impl Strategy<Value = Marker> {
        (
            text_strategy(),
            prop::collection::vec(0usize..3, 0..3),
            0usize..4,
        )
            .prop_map(|(text, open, closed)| Marker::text(text).with_open(open).with_closed(closed))
    }

    fn markup_table(doc: &mut Document) {
        doc.add_markup(Markup::new("b"));
        doc.add_markup(Markup::new("i"));
        doc.add_markup(Markup::new("a").with_attribute("href", "http://example.com"));
    }

    proptest! {
        // Property: text-only documents render as the concatenation of all texts
        #[test]
        fn prop_text_only_is_concatenation(sections in text_sections_strategy()) {
            let mut doc = Document::new();
            for texts in &sections {
                doc.push_section(Section::paragraph(texts.iter().map(Marker::text).collect()));
            }
            let expected: String = sections.iter().flatten().map(String::as_str).collect();

            let output = TextRenderer::new().render_to_string(&doc).unwrap();
            prop_assert_eq!(output, expected);
        }

        // Property: a list renders as its items back to back
        #[test]
        fn prop_list_is_item_concatenation(items in text_sections_strategy()) {
            let renderer = TextRenderer::new();
            let mut doc = Document::new();
            doc.push_section(Section::list(
                "ul",
                items.iter().map(|item| item.iter().map(Marker::text).collect()).collect(),
            ));

            let mut expected = String::new();
            for item in &items {
                let mut single = Document::new();
                single.push_section(Section::paragraph(item.iter().map(Marker::text).collect()));
                expected.push_str(&renderer.render_to_string(&single).unwrap());
            }

            prop_assert_eq!(renderer.render_to_string(&doc).unwrap(), expected);
        }

        // Property: markup events never change the rendered text
        #[test]
        fn prop_markups_do_not_affect_output(
            markers in prop::collection::vec(marked_marker_strategy(), 0..10)
        ) {
            let mut marked = Document::new();
            markup_table(&mut marked);
            marked.push_section(Section::paragraph(markers.clone()));

            let mut plain = Document::new();
            markup_table(&mut plain);
            plain.push_section(Section::paragraph(
                markers
                    .into_iter()
                    .map(|mut m| {
                        m.open_markups.clear();
                        m.closed_markups = 0;
                        m
                    })
                    .collect(),
            ));

            let renderer = TextRenderer::new();
            prop_assert_eq!(
                renderer.render_to_string(&marked).unwrap(),
                renderer.render_to_string(&plain).unwrap()
            );
        }

        // Property: relative paths of unreserved characters pass through untouched
        #[test]
        fn prop_plain_relative_paths_unchanged(path in "[a-z0-9/._-]{1,20}") {
            prop_assert_eq!(normalize_source(&path).unwrap(), path);
        }

        // Property: spaces in relative paths are written as %20
        #[test]
        fn prop_relative_path_spaces_escaped(path in "[a-z /]{1,20}") {
            prop_assert_eq!(normalize_source(&path).unwrap(), path.replace(' ', "%20"));
        }
    }
}
