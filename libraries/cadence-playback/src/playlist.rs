//! Ordered playlist of playable items
//!
//! A doubly linked list whose nodes live in a slot map. Links are [`ItemId`]
//! keys rather than pointers; a key carries a version, so the handle of a
//! removed item stays invalid forever even after its slot is reused.
//!
//! Every operation is O(1) except `clear`, `iter` and `index_of`.

use crate::error::{PlaybackError, Result};
use cadence_audio::AudioFile;
use slotmap::SlotMap;
use std::sync::Arc;

slotmap::new_key_type! {
    /// Handle to an item in a [`Playlist`]
    pub struct ItemId;
}

#[derive(Debug, Clone)]
struct Node<F> {
    file: F,
    gain: f64,
    prev: Option<ItemId>,
    next: Option<ItemId>,
}

/// Doubly linked list of files with a per-item linear gain
///
/// Generic over the file handle so the structure can be exercised without
/// real audio; the engine uses `Arc<AudioFile>`.
#[derive(Debug, Clone)]
pub struct Playlist<F = Arc<AudioFile>> {
    nodes: SlotMap<ItemId, Node<F>>,
    head: Option<ItemId>,
    tail: Option<ItemId>,
}

impl<F> Default for Playlist<F> {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }
}

impl<F> Playlist<F> {
    /// Create an empty playlist
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `file` immediately before `before`, or append when `None`
    ///
    /// The same file may be linked any number of times.
    pub fn insert(&mut self, file: F, gain: f64, before: Option<ItemId>) -> Result<ItemId> {
        let prev = match before {
            Some(next) => self.node(next)?.prev,
            None => self.tail,
        };

        let id = self.nodes.insert(Node {
            file,
            gain,
            prev,
            next: before,
        });

        match prev {
            Some(p) => self.nodes[p].next = Some(id),
            None => self.head = Some(id),
        }
        match before {
            Some(n) => self.nodes[n].prev = Some(id),
            None => self.tail = Some(id),
        }

        Ok(id)
    }

    /// Unlink an item, returning its file
    ///
    /// The handle is invalid afterwards.
    pub fn remove(&mut self, item: ItemId) -> Result<F> {
        let node = self.nodes.remove(item).ok_or(PlaybackError::InvalidItem)?;

        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.nodes[n].prev = node.prev,
            None => self.tail = node.prev,
        }

        Ok(node.file)
    }

    /// Remove every item, front to back, returning the files in list order
    pub fn clear(&mut self) -> Vec<F> {
        let mut files = Vec::with_capacity(self.nodes.len());
        while let Some(head) = self.head {
            match self.remove(head) {
                Ok(file) => files.push(file),
                Err(_) => break,
            }
        }
        // Links and storage agree after the loop; this only matters if they did not.
        self.nodes.clear();
        self.head = None;
        self.tail = None;
        files
    }

    /// Number of items
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the playlist has no items
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set an item's linear gain
    pub fn set_gain(&mut self, item: ItemId, gain: f64) -> Result<()> {
        self.nodes
            .get_mut(item)
            .ok_or(PlaybackError::InvalidItem)?
            .gain = gain;
        Ok(())
    }

    /// An item's linear gain
    pub fn gain(&self, item: ItemId) -> Result<f64> {
        Ok(self.node(item)?.gain)
    }

    /// An item's file
    pub fn file(&self, item: ItemId) -> Result<&F> {
        Ok(&self.node(item)?.file)
    }

    /// First item
    pub fn head(&self) -> Option<ItemId> {
        self.head
    }

    /// Last item
    pub fn tail(&self) -> Option<ItemId> {
        self.tail
    }

    /// Item after `item`
    pub fn next(&self, item: ItemId) -> Result<Option<ItemId>> {
        Ok(self.node(item)?.next)
    }

    /// Item before `item`
    pub fn prev(&self, item: ItemId) -> Result<Option<ItemId>> {
        Ok(self.node(item)?.prev)
    }

    /// Whether `item` is a live handle of this playlist
    pub fn contains(&self, item: ItemId) -> bool {
        self.nodes.contains_key(item)
    }

    /// Zero-based position of `item` in list order
    pub fn index_of(&self, item: ItemId) -> Option<usize> {
        self.iter().position(|(id, _, _)| id == item)
    }

    /// Items in list order as `(id, file, gain)`
    pub fn iter(&self) -> Iter<'_, F> {
        Iter {
            playlist: self,
            cursor: self.head,
        }
    }

    fn node(&self, item: ItemId) -> Result<&Node<F>> {
        self.nodes.get(item).ok_or(PlaybackError::InvalidItem)
    }
}

/// Iterator over a playlist in list order
#[derive(Debug)]
pub struct Iter<'a, F> {
    playlist: &'a Playlist<F>,
    cursor: Option<ItemId>,
}

impl<'a, F> Iterator for Iter<'a, F> {
    type Item = (ItemId, &'a F, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.playlist.nodes.get(id)?;
        self.cursor = node.next;
        Some((id, &node.file, node.gain))
    }
}

impl<'a, F> IntoIterator for &'a Playlist<F> {
    type Item = (ItemId, &'a F, f64);
    type IntoIter = Iter<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
