//! ReplayGain tag reading and writing
//!
//! Works through the [`AudioFile`] tag API, so the same `REPLAYGAIN_*` keys
//! apply to every container; lofty maps them onto ID3v2 TXXX frames, Vorbis
//! comments, APE items or MP4 atoms when the file is saved.

use crate::error::Result;
use crate::replaygain::{db_to_linear, linear_to_db, FileGain, ScanSummary};
use cadence_audio::{AudioFile, TagFlags};
use tracing::debug;

/// Track gain key
pub const TRACK_GAIN: &str = "REPLAYGAIN_TRACK_GAIN";
/// Track peak key
pub const TRACK_PEAK: &str = "REPLAYGAIN_TRACK_PEAK";
/// Album gain key
pub const ALBUM_GAIN: &str = "REPLAYGAIN_ALBUM_GAIN";
/// Album peak key
pub const ALBUM_PEAK: &str = "REPLAYGAIN_ALBUM_PEAK";
/// Reference loudness key
pub const REFERENCE_LOUDNESS: &str = "REPLAYGAIN_REFERENCE_LOUDNESS";

const ALL_KEYS: [&str; 5] = [
    TRACK_GAIN,
    TRACK_PEAK,
    ALBUM_GAIN,
    ALBUM_PEAK,
    REFERENCE_LOUDNESS,
];

/// ReplayGain values read from a file's tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayGainTags {
    /// Track gain in dB
    pub track_gain: Option<f64>,
    /// Track peak (linear)
    pub track_peak: Option<f64>,
    /// Album gain in dB
    pub album_gain: Option<f64>,
    /// Album peak (linear)
    pub album_peak: Option<f64>,
    /// Reference loudness in LUFS
    pub reference_loudness: Option<f64>,
}

impl ReplayGainTags {
    /// Check if track-level tags are present
    pub fn has_track_tags(&self) -> bool {
        self.track_gain.is_some()
    }

    /// Check if album-level tags are present
    pub fn has_album_tags(&self) -> bool {
        self.album_gain.is_some()
    }

    /// Linear gain to use for playback, preferring album over track gain
    ///
    /// Neutral 1.0 when the file carries no ReplayGain tags.
    pub fn playback_gain(&self, prefer_album: bool) -> f64 {
        let db = if prefer_album {
            self.album_gain.or(self.track_gain)
        } else {
            self.track_gain.or(self.album_gain)
        };
        db.map_or(1.0, db_to_linear)
    }
}

/// Parse a gain value (e.g., "-5.23 dB" -> -5.23)
fn parse_gain(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix("dB").or_else(|| s.strip_suffix("LUFS")).unwrap_or(s);
    s.trim().parse().ok()
}

/// Parse a peak value
fn parse_peak(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

fn read_value(file: &AudioFile, key: &str, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    file.metadata_get(key, None, TagFlags::NONE)
        .and_then(|tag| parse(tag.value()))
}

/// Read ReplayGain values from a file's tag map
pub fn read_replaygain_tags(file: &AudioFile) -> ReplayGainTags {
    ReplayGainTags {
        track_gain: read_value(file, TRACK_GAIN, parse_gain),
        track_peak: read_value(file, TRACK_PEAK, parse_peak),
        album_gain: read_value(file, ALBUM_GAIN, parse_gain),
        album_peak: read_value(file, ALBUM_PEAK, parse_peak),
        reference_loudness: read_value(file, REFERENCE_LOUDNESS, parse_gain),
    }
}

/// Store track (and optionally album) ReplayGain values in the tag map
///
/// Only edits the in-memory map; call [`write_replaygain_tags`] or
/// `AudioFile::save` to persist.
pub fn set_replaygain_tags(
    file: &AudioFile,
    track: &FileGain,
    album: Option<&ScanSummary>,
    reference_lufs: f64,
) -> Result<()> {
    file.metadata_set(
        TRACK_GAIN,
        Some(&format!("{:.2} dB", linear_to_db(track.gain))),
        TagFlags::NONE,
    )?;
    file.metadata_set(TRACK_PEAK, Some(&format!("{:.6}", track.peak)), TagFlags::NONE)?;

    if let Some(album) = album {
        file.metadata_set(
            ALBUM_GAIN,
            Some(&format!("{:.2} dB", linear_to_db(album.gain))),
            TagFlags::NONE,
        )?;
        file.metadata_set(ALBUM_PEAK, Some(&format!("{:.6}", album.peak)), TagFlags::NONE)?;
    }

    file.metadata_set(
        REFERENCE_LOUDNESS,
        Some(&format!("{:.2} LUFS", reference_lufs)),
        TagFlags::NONE,
    )?;
    Ok(())
}

/// Store ReplayGain values and save the file
pub fn write_replaygain_tags(
    file: &AudioFile,
    track: &FileGain,
    album: Option<&ScanSummary>,
    reference_lufs: f64,
) -> Result<()> {
    set_replaygain_tags(file, track, album, reference_lufs)?;
    file.save()?;
    debug!("Wrote ReplayGain tags to {}", file.path().display());
    Ok(())
}

/// Remove all ReplayGain entries and save the file
pub fn remove_replaygain_tags(file: &AudioFile) -> Result<()> {
    for key in ALL_KEYS {
        file.metadata_set(key, None, TagFlags::NONE)?;
    }
    file.save()?;
    debug!("Removed ReplayGain tags from {}", file.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gain_values() {
        assert_eq!(parse_gain("-5.23 dB"), Some(-5.23));
        assert_eq!(parse_gain("3.5dB"), Some(3.5));
        assert_eq!(parse_gain("-10.0"), Some(-10.0));
        assert_eq!(parse_gain("  2.5 dB  "), Some(2.5));
        assert_eq!(parse_gain("-18.00 LUFS"), Some(-18.0));
        assert!(parse_gain("invalid").is_none());
    }

    #[test]
    fn playback_gain_prefers_requested_level() {
        let tags = ReplayGainTags {
            track_gain: Some(-6.0),
            album_gain: Some(0.0),
            ..Default::default()
        };
        assert!((tags.playback_gain(true) - 1.0).abs() < 1e-12);
        assert!((tags.playback_gain(false) - db_to_linear(-6.0)).abs() < 1e-12);

        let track_only = ReplayGainTags {
            track_gain: Some(-6.0),
            ..Default::default()
        };
        assert!((track_only.playback_gain(true) - db_to_linear(-6.0)).abs() < 1e-12);
    }

    #[test]
    fn untagged_file_plays_at_unity() {
        let tags = ReplayGainTags::default();
        assert!(!tags.has_track_tags());
        assert!(!tags.has_album_tags());
        assert_eq!(tags.playback_gain(false), 1.0);
    }
}
