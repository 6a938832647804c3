// SPDX-License-Identifier: AGPL-3.0-or-later
//! Open-markup bookkeeping for one marker sequence
//!
//! Plain text carries no inline styling, so the stack never writes output.
//! It only tracks nesting so unbalanced close counts can be detected.

use crate::ast::Markup;
use crate::traits::{RenderError, Result, UnderflowPolicy};

#[derive(Debug, Default)]
pub(crate) struct MarkupStack<'a> {
    open: Vec<&'a Markup>,
}

impl<'a> MarkupStack<'a> {
    pub(crate) fn new() -> Self {
        Self { open: Vec::new() }
    }

    pub(crate) fn push(&mut self, markup: &'a Markup) {
        self.open.push(markup);
    }

    /// Close the `count` most recently opened markups
    pub(crate) fn pop(&mut self, count: usize, policy: UnderflowPolicy) -> Result<()> {
        let depth = self.open.len();
        if count > depth {
            match policy {
                UnderflowPolicy::Clamp => {
                    tracing::warn!(requested = count, open = depth, "Clamping markup close count");
                }
                UnderflowPolicy::Error => {
                    return Err(RenderError::UnbalancedMarkup {
                        requested: count,
                        open: depth,
                    });
                }
            }
        }
        self.open.truncate(depth.saturating_sub(count));
        Ok(())
    }

    pub(crate) fn depth(&self) -> usize {
        self.open.len()
    }

    /// Innermost open markup
    #[cfg(test)]
    pub(crate) fn top(&self) -> Option<&'a Markup> {
        self.open.last().copied()
    }
}
