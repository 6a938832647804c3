// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mobiledoc Core - Document model and plain-text renderer
//!
//! This crate provides:
//! - The Mobiledoc document model: sections, markers, markups, atoms, cards
//! - A [`Renderer`] trait and a plain-text implementation, [`TextRenderer`]
//! - An [`ExtensionRegistry`] for host-supplied atom and card renderers
//!
//! Parsing and validating the persisted document format is left to the host;
//! deserialize a [`Document`] with serde or build one in code, then render it.

pub mod ast;
pub mod formats;
pub mod traits;

pub use ast::{
    Atom, Card, Document, Marker, MarkerKind, Markup, Payload, Section, TableKind, MOBILEDOC_VERSION,
};
pub use formats::TextRenderer;
pub use traits::{
    AtomRenderer, CardRenderer, ExtensionError, ExtensionKind, ExtensionRegistry, ExtensionResult,
    MissingAtomPolicy, RenderConfig, RenderError, Renderer, RendererExt, Result, UnderflowPolicy,
};
