//! Push whole-buffer text changes into the shared text as minimal edits.

use scribe_editor_core::TextDelta;

use crate::buffer::LoroTextBuffer;
use crate::origin::Origin;

/// Apply the change from `previous` to `next` to the shared text.
///
/// The delete and insert of the computed [`TextDelta`] are committed as one
/// change tagged with `origin`. Nothing is committed when the texts are
/// equal, and nothing happens when the shared text is not attached yet;
/// the next edit diffs against the local buffer again, so no work is lost.
///
/// Returns the delta that was applied.
pub fn apply_delta(
    shared: Option<&mut LoroTextBuffer>,
    previous: &str,
    next: &str,
    origin: Origin,
) -> Option<TextDelta> {
    let Some(shared) = shared else {
        tracing::trace!(%origin, "shared text not attached, skipping delta");
        return None;
    };
    let delta = TextDelta::between(previous, next)?;

    shared.transact(origin, |buffer| delta.apply(buffer));
    tracing::trace!(
        %origin,
        start = delta.start,
        deleted = delta.delete_len,
        inserted = delta.insert_len(),
        "applied delta to shared text"
    );
    Some(delta)
}
