//! In-memory tag map with dictionary-style lookup flags
//!
//! Tags are read once when an [`AudioFile`](crate::AudioFile) is opened and
//! edited in memory; nothing touches the disk until `save()`. Keys use the
//! Vorbis-comment spelling (`TITLE`, `ARTIST`, `REPLAYGAIN_TRACK_GAIN`, ...)
//! regardless of container so that the same key works on every format.

use std::ops::{BitOr, BitOrAssign};

/// Lookup and update modifiers for tag operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TagFlags(u32);

impl TagFlags {
    /// No modifiers: case-insensitive keys, overwrite on set
    pub const NONE: Self = Self(0);
    /// Compare keys case-sensitively
    pub const MATCH_CASE: Self = Self(1);
    /// Leave an existing value untouched on set
    pub const DONT_OVERWRITE: Self = Self(16);
    /// Concatenate onto an existing value without a delimiter
    pub const APPEND: Self = Self(32);

    /// Raw flag bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TagFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TagFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A tag entry returned by `metadata_get`
///
/// Pass it back as `prev` to continue the search after this entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    key: String,
    value: String,
    index: usize,
}

impl Tag {
    /// Tag key as stored
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Tag value
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered key/value entries plus the unsaved-changes flag
#[derive(Debug, Default)]
pub(crate) struct TagStore {
    entries: Vec<(String, String)>,
    dirty: bool,
}

fn key_matches(stored: &str, wanted: &str, flags: TagFlags) -> bool {
    if wanted.is_empty() {
        return true;
    }
    if flags.contains(TagFlags::MATCH_CASE) {
        stored == wanted
    } else {
        stored.eq_ignore_ascii_case(wanted)
    }
}

impl TagStore {
    pub(crate) fn new(entries: Vec<(String, String)>) -> Self {
        Self {
            entries,
            dirty: false,
        }
    }

    pub(crate) fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Next entry matching `key` after `prev`; an empty key matches every entry
    pub(crate) fn get(&self, key: &str, prev: Option<&Tag>, flags: TagFlags) -> Option<Tag> {
        let start = prev.map_or(0, |p| p.index + 1);
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, (k, _))| key_matches(k, key, flags))
            .map(|(index, (k, v))| Tag {
                key: k.clone(),
                value: v.clone(),
                index,
            })
    }

    /// Apply a set/delete; returns whether anything changed
    pub(crate) fn set(&mut self, key: &str, value: Option<&str>, flags: TagFlags) -> bool {
        let existing = self
            .entries
            .iter()
            .position(|(k, _)| key_matches(k, key, flags));

        let changed = match (existing, value) {
            (None, None) => false,
            (Some(_), None) => {
                let before = self.entries.len();
                self.entries.retain(|(k, _)| !key_matches(k, key, flags));
                before != self.entries.len()
            }
            (Some(_), Some(_)) if flags.contains(TagFlags::DONT_OVERWRITE) => false,
            (Some(index), Some(value)) => {
                let slot = &mut self.entries[index].1;
                if flags.contains(TagFlags::APPEND) {
                    slot.push_str(value);
                    !value.is_empty()
                } else if slot == value {
                    false
                } else {
                    *slot = value.to_string();
                    true
                }
            }
            (None, Some(value)) => {
                self.entries.push((key.to_string(), value.to_string()));
                true
            }
        };

        self.dirty |= changed;
        changed
    }
}
