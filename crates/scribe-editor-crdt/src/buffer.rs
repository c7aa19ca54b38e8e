//! Loro-backed shared text.

use std::ops::Range;
use std::sync::Arc;

use loro::event::DiffEvent;
use loro::{LoroDoc, LoroText, Subscription, VersionVector, cursor::PosType};
use scribe_editor_core::TextBuffer;
use smol_str::{SmolStr, ToSmolStr};

use crate::CrdtError;
use crate::origin::{Origin, SharedTextUpdate};

/// Name of the text container inside the Loro document.
pub const CONTENT_CONTAINER: &str = "content";

/// Loro-backed text shared with every connected peer.
///
/// Mutations are expected to go through [`LoroTextBuffer::transact`], which
/// commits them as one origin-tagged change. Clones share the same document.
#[derive(Clone)]
pub struct LoroTextBuffer {
    doc: LoroDoc,
    content: LoroText,
}

impl LoroTextBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        let doc = LoroDoc::new();
        let content = doc.get_text(CONTENT_CONTAINER);
        Self { doc, content }
    }

    /// Create a buffer from an existing Loro snapshot.
    pub fn from_snapshot(snapshot: &[u8]) -> Result<Self, CrdtError> {
        let doc = LoroDoc::new();
        doc.import(snapshot)
            .map_err(|e| CrdtError::Import(e.to_string()))?;
        let content = doc.get_text(CONTENT_CONTAINER);
        Ok(Self { doc, content })
    }

    /// Export full snapshot.
    pub fn export_snapshot(&self) -> Result<Vec<u8>, CrdtError> {
        self.doc
            .export(loro::ExportMode::Snapshot)
            .map_err(|e| CrdtError::Export(e.to_string()))
    }

    /// Export updates since given version.
    pub fn export_updates_since(&self, version: &VersionVector) -> Option<Vec<u8>> {
        use std::borrow::Cow;

        let current_vv = self.doc.oplog_vv();

        if *version == current_vv {
            return None;
        }

        let updates = self
            .doc
            .export(loro::ExportMode::Updates {
                from: Cow::Owned(version.clone()),
            })
            .ok()?;

        if updates.is_empty() {
            return None;
        }

        Some(updates)
    }

    /// Import changes from a peer, tagged with [`Origin::Remote`].
    pub fn import(&self, data: &[u8]) -> Result<(), CrdtError> {
        self.doc
            .import_with(data, Origin::Remote.as_str())
            .map_err(|e| CrdtError::Import(e.to_string()))?;
        Ok(())
    }

    /// Get current version vector.
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    /// Run `f` against the buffer and commit its edits as one change tagged
    /// with `origin`.
    ///
    /// Observers see a single update no matter how many edits `f` makes.
    pub fn transact<R>(&mut self, origin: Origin, f: impl FnOnce(&mut Self) -> R) -> R {
        let result = f(self);
        self.doc.set_next_commit_origin(origin.as_str());
        self.doc.commit();
        result
    }

    /// Listen for committed or imported changes.
    ///
    /// The listener runs synchronously inside the commit. Dropping the
    /// returned [`Subscription`] unsubscribes.
    pub fn subscribe(
        &self,
        listener: impl Fn(SharedTextUpdate) + Send + Sync + 'static,
    ) -> Subscription {
        self.doc
            .subscribe_root(Arc::new(move |event: DiffEvent<'_>| {
                listener(SharedTextUpdate::from_event(&event));
            }))
    }
}

impl Default for LoroTextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoroTextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoroTextBuffer")
            .field("peer", &self.doc.peer_id())
            .field("len_chars", &self.content.len_unicode())
            .finish()
    }
}

impl TextBuffer for LoroTextBuffer {
    fn len_bytes(&self) -> usize {
        self.content.len_utf8()
    }

    fn len_chars(&self) -> usize {
        self.content.len_unicode()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        if let Err(e) = self.content.insert(char_offset, text) {
            tracing::warn!(char_offset, error = %e, "shared text insert failed");
        }
    }

    fn delete(&mut self, char_range: Range<usize>) {
        if let Err(e) = self.content.delete(char_range.start, char_range.len()) {
            tracing::warn!(?char_range, error = %e, "shared text delete failed");
        }
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.end > self.content.len_unicode() {
            return None;
        }
        self.content
            .slice(char_range.start, char_range.end)
            .ok()
            .map(|s| s.to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        self.content.char_at(char_offset).ok()
    }

    fn to_string(&self) -> String {
        self.content.to_string()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.content
            .convert_pos(char_offset, PosType::Unicode, PosType::Bytes)
            .unwrap_or(self.content.len_utf8())
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.content
            .convert_pos(byte_offset, PosType::Bytes, PosType::Unicode)
            .unwrap_or(self.content.len_unicode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording(buffer: &LoroTextBuffer) -> (Arc<Mutex<Vec<Origin>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = buffer.subscribe(move |update| sink.lock().unwrap().push(update.origin));
        (seen, sub)
    }

    #[test]
    fn test_basic_operations() {
        let mut buffer = LoroTextBuffer::new();

        buffer.transact(Origin::Local, |b| {
            b.insert(0, "Hello");
            b.insert(5, " World");
            b.delete(5..6);
        });
        assert_eq!(buffer.to_string(), "HelloWorld");
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut buffer = LoroTextBuffer::new();
        buffer.transact(Origin::Local, |b| b.insert(0, "Test content"));

        let snapshot = buffer.export_snapshot().unwrap();
        let restored = LoroTextBuffer::from_snapshot(&snapshot).unwrap();

        assert_eq!(restored.to_string(), "Test content");
    }

    #[test]
    fn test_transaction_is_one_tagged_event() {
        let mut buffer = LoroTextBuffer::new();
        let (seen, _sub) = recording(&buffer);

        buffer.transact(Origin::UndoRedo, |b| {
            b.insert(0, "abc");
            b.delete(0..1);
        });

        assert_eq!(*seen.lock().unwrap(), [Origin::UndoRedo]);
        assert_eq!(buffer.to_string(), "bc");
    }

    #[test]
    fn test_import_is_tagged_remote() {
        let mut alice = LoroTextBuffer::new();
        let bob = LoroTextBuffer::new();
        let (seen, _sub) = recording(&bob);

        let before = bob.version();
        alice.transact(Origin::Local, |b| b.insert(0, "from alice"));
        let updates = alice.export_updates_since(&before).unwrap();
        bob.import(&updates).unwrap();

        assert_eq!(bob.to_string(), "from alice");
        assert_eq!(*seen.lock().unwrap(), [Origin::Remote]);
    }

    #[test]
    fn test_dropping_subscription_stops_events() {
        let mut buffer = LoroTextBuffer::new();
        let (seen, sub) = recording(&buffer);
        drop(sub);

        buffer.transact(Origin::Local, |b| b.insert(0, "quiet"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_offset_conversion() {
        let mut buffer = LoroTextBuffer::new();
        buffer.transact(Origin::Local, |b| b.insert(0, "hello 🌍"));

        assert_eq!(buffer.len_chars(), 7); // h e l l o   🌍
        assert_eq!(buffer.len_bytes(), 10); // 6 + 4
        assert_eq!(buffer.char_to_byte(7), 10);
    }

    #[test]
    fn test_no_updates_when_version_matches() {
        let buffer = LoroTextBuffer::new();
        assert_eq!(buffer.export_updates_since(&buffer.version()), None);
    }
}
