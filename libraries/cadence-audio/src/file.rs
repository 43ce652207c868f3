/// Opened audio file handle
use crate::decoder::SymphoniaStream;
use crate::error::{AudioError, Result};
use crate::tags::{Tag, TagFlags, TagStore};
use cadence_core::DecodeStream;
use lofty::{FileType, ItemKey, ItemValue, Probe, TagExt, TagItem, TagType, TaggedFileExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Key spelling used for the in-memory tag map
const KEY_STYLE: TagType = TagType::VorbisComments;

/// A probed, decodable audio file
///
/// Created with [`AudioFile::open`]. The playback engine and scan jobs share
/// handles as `Arc<AudioFile>`; neither ever closes a file it was given.
///
/// Tag edits are kept in memory and mark the file dirty until [`save`](Self::save).
#[derive(Debug)]
pub struct AudioFile {
    path: PathBuf,
    duration: Option<Duration>,
    short_names: String,
    tags: Mutex<TagStore>,
}

impl AudioFile {
    /// Open and probe a file
    ///
    /// Fails if the file is missing or has no decodable audio track. Missing
    /// or unreadable tags are not an error; the file opens with an empty tag map.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let stream = SymphoniaStream::open(path)?;
        let duration = stream.duration();
        drop(stream);

        let (entries, short_names) = match read_tag_entries(path) {
            Ok((entries, file_type)) => (entries, short_names_for(Some(file_type), path)),
            Err(e) => {
                warn!("Could not read tags from {}: {}", path.display(), e);
                (Vec::new(), short_names_for(None, path))
            }
        };

        debug!(
            "Opened {} [{}] with {} tag(s)",
            path.display(),
            short_names,
            entries.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            duration,
            short_names,
            tags: Mutex::new(TagStore::new(entries)),
        })
    }

    /// Release the handle
    ///
    /// Unsaved tag edits are discarded. Dropping the last `Arc` has the same
    /// effect.
    pub fn close(self) {
        if self.is_dirty() {
            debug!("Closing {} with unsaved tag edits", self.path.display());
        }
    }

    /// Path the file was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether tags were edited since open or the last successful save
    pub fn is_dirty(&self) -> bool {
        self.store().is_dirty()
    }

    /// Container duration as reported by the probe
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Comma-separated short names of the container format (e.g. `"mov,mp4,m4a"`)
    pub fn short_names(&self) -> &str {
        &self.short_names
    }

    /// Look up a tag
    ///
    /// Returns the first entry after `prev` whose key matches. An empty `key`
    /// matches every entry, so repeated calls walk the whole map.
    pub fn metadata_get(&self, key: &str, prev: Option<&Tag>, flags: TagFlags) -> Option<Tag> {
        self.store().get(key, prev, flags)
    }

    /// Set, append to, or delete (`value == None`) a tag
    ///
    /// Marks the file dirty when the map actually changes.
    pub fn metadata_set(&self, key: &str, value: Option<&str>, flags: TagFlags) -> Result<()> {
        if key.is_empty() {
            return Err(AudioError::InvalidTagKey(key.to_string()));
        }
        if self.store().set(key, value, flags) {
            debug!("Tag {} updated on {}", key, self.path.display());
        }
        Ok(())
    }

    /// Write the in-memory tag map to the file's primary tag
    ///
    /// Replaces the items of the primary tag (creating one if the file has
    /// none) and clears the dirty flag on success.
    pub fn save(&self) -> Result<()> {
        let mut store = self.store();

        let mut tagged_file = Probe::open(&self.path)?.read()?;
        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(lofty::Tag::new(tag_type));
        }
        let tag = tagged_file.tag_mut(tag_type).ok_or_else(|| {
            AudioError::TagError(format!("No writable tag in {}", self.path.display()))
        })?;

        tag.clear();
        for (key, value) in store.entries() {
            tag.push(TagItem::new(
                ItemKey::from_key(KEY_STYLE, key),
                ItemValue::Text(value.clone()),
            ));
        }

        tag.save_to_path(&self.path)?;
        store.mark_saved();

        debug!("Saved tags to {}", self.path.display());
        Ok(())
    }

    fn store(&self) -> MutexGuard<'_, TagStore> {
        // The store holds plain data; a panicked writer cannot leave it torn.
        self.tags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn read_tag_entries(path: &Path) -> Result<(Vec<(String, String)>, FileType)> {
    let tagged_file = Probe::open(path)?.read()?;
    let file_type = tagged_file.file_type();

    let mut entries = Vec::new();
    if let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    {
        for item in tag.items() {
            let (Some(key), Some(value)) = (item.key().map_key(KEY_STYLE, true), item.value().text())
            else {
                continue;
            };
            entries.push((key.to_string(), value.to_string()));
        }
    }

    Ok((entries, file_type))
}

fn short_names_for(file_type: Option<FileType>, path: &Path) -> String {
    let names = match file_type {
        Some(FileType::Mpeg) => "mp3",
        Some(FileType::Flac) => "flac",
        Some(FileType::Vorbis | FileType::Opus) => "ogg",
        Some(FileType::Wav) => "wav",
        Some(FileType::Mp4) => "mov,mp4,m4a,3gp,3g2,mj2",
        Some(FileType::Aac) => "aac",
        Some(FileType::Aiff) => "aiff",
        Some(FileType::Ape) => "ape",
        Some(FileType::WavPack) => "wv",
        _ => {
            return path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default()
        }
    };
    names.to_string()
}
