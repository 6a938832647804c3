// SPDX-License-Identifier: AGPL-3.0-or-later
//! Output format renderers

mod markup_stack;
pub mod plaintext;

pub use plaintext::TextRenderer;
