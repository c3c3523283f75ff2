//! Extension operator for computed bindings.

use super::SolutionFunction;
use crate::execution::{BindingSet, BoxCursor, Cursor};
use memquad_common::utils::error::Result;
use std::sync::Arc;

/// Binds computed values. Elements are evaluated in order, so later ones see
/// the bindings of earlier ones. An element whose function raises an
/// evaluation error leaves its name unbound.
pub struct ExtensionCursor {
    input: BoxCursor<BindingSet>,
    elements: Vec<(Arc<str>, Box<dyn SolutionFunction>)>,
    closed: bool,
}

impl ExtensionCursor {
    /// Creates a new extension cursor.
    pub fn new(
        input: BoxCursor<BindingSet>,
        elements: Vec<(Arc<str>, Box<dyn SolutionFunction>)>,
    ) -> Self {
        Self {
            input,
            elements,
            closed: false,
        }
    }
}

impl Cursor for ExtensionCursor {
    type Item = BindingSet;

    fn next(&mut self) -> Result<Option<BindingSet>> {
        if self.closed {
            return Ok(None);
        }
        let Some(mut solution) = self.input.next()? else {
            return Ok(None);
        };
        for (name, function) in &mut self.elements {
            match function.evaluate(&solution) {
                Ok(value) => solution.insert(Arc::clone(name), value),
                Err(e) if e.is_evaluation_error() => {
                    tracing::trace!(name = %name, error = %e, "extension left unbound");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Some(solution))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.input.close();
        }
    }

    fn name(&self) -> &'static str {
        "Extension"
    }
}
