//! Minimal single-span edits between two text snapshots.
//!
//! The editing surface hands us whole-buffer snapshots, not keystrokes. A
//! [`TextDelta`] recovers the edited span by trimming the common prefix and
//! suffix of the two snapshots: one delete plus one insert at a single
//! position. This is not an LCS diff; interior churn is not minimised, but
//! the cost is linear.

use std::ops::Range;

use smol_str::SmolStr;

use crate::text::TextBuffer;

/// A replacement of `delete_len` chars at `start` with `insert`.
///
/// Offsets are in chars (Unicode scalar values), matching [`TextBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    /// Char offset of the first differing character.
    pub start: usize,
    /// Number of chars removed from the previous text.
    pub delete_len: usize,
    /// Text inserted at `start`.
    pub insert: SmolStr,
}

impl TextDelta {
    /// Compute the delta turning `previous` into `next`.
    ///
    /// Returns `None` when the texts are equal.
    pub fn between(previous: &str, next: &str) -> Option<Self> {
        if previous == next {
            return None;
        }

        let (prefix_chars, prefix_bytes) = common_prefix(previous, next);
        let prev_rest = &previous[prefix_bytes..];
        let next_rest = &next[prefix_bytes..];

        // Suffix is measured on the remainders so it can never overlap the prefix.
        let (_, suffix_bytes) = common_suffix(prev_rest, next_rest);
        let deleted = &prev_rest[..prev_rest.len() - suffix_bytes];
        let inserted = &next_rest[..next_rest.len() - suffix_bytes];

        Some(Self {
            start: prefix_chars,
            delete_len: deleted.chars().count(),
            insert: SmolStr::new(inserted),
        })
    }

    /// The char range removed from the previous text.
    pub fn deleted_range(&self) -> Range<usize> {
        self.start..self.start + self.delete_len
    }

    /// Number of chars inserted.
    pub fn insert_len(&self) -> usize {
        self.insert.chars().count()
    }

    /// Apply to a text buffer holding the previous text.
    pub fn apply<B: TextBuffer + ?Sized>(&self, buffer: &mut B) {
        if self.delete_len > 0 {
            buffer.delete(self.deleted_range());
        }
        if !self.insert.is_empty() {
            buffer.insert(self.start, &self.insert);
        }
    }

    /// Apply to a plain string holding the previous text.
    pub fn apply_to_str(&self, previous: &str) -> String {
        let start = char_to_byte(previous, self.start);
        let end = char_to_byte(previous, self.start + self.delete_len);

        let mut out = String::with_capacity(previous.len() - (end - start) + self.insert.len());
        out.push_str(&previous[..start]);
        out.push_str(&self.insert);
        out.push_str(&previous[end..]);
        out
    }

    /// Shift this delta so it applies after `other`, where both were
    /// computed against the same text.
    ///
    /// Positions behind `other`'s span are unchanged, positions past it move
    /// by its net length. A position inside the span `other` deleted lands
    /// just after `other`'s insertion. At the same position, `other`'s
    /// insertion goes first.
    pub fn rebase(&self, other: &TextDelta) -> TextDelta {
        let start = other.map_position(self.start);
        let end = other
            .map_position(self.start + self.delete_len)
            .max(start);
        Self {
            start,
            delete_len: end - start,
            insert: self.insert.clone(),
        }
    }

    fn map_position(&self, pos: usize) -> usize {
        if pos < self.start {
            pos
        } else if pos >= self.start + self.delete_len {
            pos - self.delete_len + self.insert_len()
        } else {
            self.start + self.insert_len()
        }
    }
}

/// Length of the common prefix as (chars, bytes).
fn common_prefix(a: &str, b: &str) -> (usize, usize) {
    let mut chars = 0;
    let mut bytes = 0;
    for (x, y) in a.chars().zip(b.chars()) {
        if x != y {
            break;
        }
        chars += 1;
        bytes += x.len_utf8();
    }
    (chars, bytes)
}

/// Length of the common suffix as (chars, bytes).
fn common_suffix(a: &str, b: &str) -> (usize, usize) {
    let mut chars = 0;
    let mut bytes = 0;
    for (x, y) in a.chars().rev().zip(b.chars().rev()) {
        if x != y {
            break;
        }
        chars += 1;
        bytes += x.len_utf8();
    }
    (chars, bytes)
}

fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::EditorRope;
    use proptest::prelude::*;

    #[test]
    fn test_insert_between_affixes() {
        let delta = TextDelta::between("hello world", "hello there world").unwrap();
        assert_eq!(delta.start, 6);
        assert_eq!(delta.delete_len, 0);
        assert_eq!(delta.insert, "there ");
    }

    #[test]
    fn test_equal_texts_have_no_delta() {
        assert_eq!(TextDelta::between("same", "same"), None);
        assert_eq!(TextDelta::between("", ""), None);
    }

    #[test]
    fn test_pure_delete() {
        let delta = TextDelta::between("abcdef", "abef").unwrap();
        assert_eq!(delta.deleted_range(), 2..4);
        assert!(delta.insert.is_empty());
    }

    #[test]
    fn test_replace_everything() {
        let delta = TextDelta::between("abc", "xyz").unwrap();
        assert_eq!(delta.start, 0);
        assert_eq!(delta.delete_len, 3);
        assert_eq!(delta.insert, "xyz");
    }

    #[test]
    fn test_repeated_chars_do_not_overlap() {
        // Prefix eats "aa", the suffix must not reuse those chars.
        let delta = TextDelta::between("aa", "aaa").unwrap();
        assert_eq!(delta.start, 2);
        assert_eq!(delta.delete_len, 0);
        assert_eq!(delta.insert, "a");

        let delta = TextDelta::between("aaa", "a").unwrap();
        assert_eq!(delta.start, 1);
        assert_eq!(delta.delete_len, 2);
    }

    #[test]
    fn test_offsets_are_chars() {
        let delta = TextDelta::between("🌍 hi", "🌍 hey").unwrap();
        assert_eq!(delta.start, 3);
        assert_eq!(delta.delete_len, 1);
        assert_eq!(delta.insert, "ey");
        assert_eq!(delta.apply_to_str("🌍 hi"), "🌍 hey");
    }

    #[test]
    fn test_apply_to_rope() {
        let mut rope = EditorRope::from_str("hello world");
        TextDelta::between("hello world", "hello brave new world")
            .unwrap()
            .apply(&mut rope);
        assert_eq!(rope.to_string(), "hello brave new world");
    }

    #[test]
    fn test_rebase_past_concurrent_insert() {
        let remote = TextDelta::between("abc", "XYZabc").unwrap();
        let local = TextDelta::between("abc", "abcd").unwrap();

        let rebased = local.rebase(&remote);
        assert_eq!(rebased.start, 6);
        assert_eq!(rebased.apply_to_str("XYZabc"), "XYZabcd");
    }

    #[test]
    fn test_rebase_before_concurrent_edit_is_unchanged() {
        let remote = TextDelta::between("hello world", "hello world!").unwrap();
        let local = TextDelta::between("hello world", "Hello world").unwrap();

        assert_eq!(local.rebase(&remote), local);
        assert_eq!(local.rebase(&remote).apply_to_str("hello world!"), "Hello world!");
    }

    #[test]
    fn test_rebase_over_concurrent_delete() {
        // Remote removed "brave ", local deleted "new " after it.
        let remote = TextDelta::between("a brave new day", "a new day").unwrap();
        let local = TextDelta::between("a brave new day", "a brave day").unwrap();

        assert_eq!(local.rebase(&remote).apply_to_str("a new day"), "a day");
    }

    #[test]
    fn test_rebase_inside_deleted_span_collapses() {
        // Local replaced a char that remote already deleted.
        let remote = TextDelta::between("abcdef", "af").unwrap();
        let local = TextDelta::between("abcdef", "abXdef").unwrap();

        let rebased = local.rebase(&remote);
        assert_eq!(rebased.delete_len, 0);
        assert_eq!(rebased.apply_to_str("af"), "aXf");
    }

    proptest! {
        #[test]
        fn prop_delta_reproduces_next(previous in "\\PC{0,24}", next in "\\PC{0,24}") {
            match TextDelta::between(&previous, &next) {
                None => prop_assert_eq!(&previous, &next),
                Some(delta) => {
                    prop_assert_eq!(delta.apply_to_str(&previous), next.clone());

                    let mut rope = EditorRope::from_str(&previous);
                    delta.apply(&mut rope);
                    prop_assert_eq!(rope.to_string(), next);
                }
            }
        }

        #[test]
        fn prop_delta_on_shared_alphabet(previous in "[ab]{0,12}", next in "[ab]{0,12}") {
            if let Some(delta) = TextDelta::between(&previous, &next) {
                prop_assert!(delta.start + delta.delete_len <= previous.chars().count());
                prop_assert_eq!(delta.apply_to_str(&previous), next);
            }
        }
    }
}
