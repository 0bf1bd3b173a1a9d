use tracing::debug;

use super::select::Selection;
use crate::buffer::{BufferError, SourceBuffer};
use crate::model::ProgramModel;

/// Replaces the selected use site with the rendered argument and returns
/// the text written.
pub fn apply<M: ProgramModel + ?Sized>(
    model: &M,
    selection: &Selection,
    buffer: &mut SourceBuffer,
) -> Result<String, BufferError> {
    assert!(!selection.span.is_empty(), "selection {} has an empty range", selection.ordinal);
    let replacement = model.render(&selection.argument);
    debug!(
        ordinal = selection.ordinal,
        start = selection.span.start,
        end = selection.span.end,
        replacement = %replacement,
        "rewriting use site"
    );
    buffer.replace(selection.span, &replacement)?;
    Ok(replacement)
}
