//! Media kind detection from object paths.

/// MIME type for HLS playlists.
pub const HLS_MANIFEST_MIME: &str = "application/vnd.apple.mpegurl";

/// MIME type for MPEG transport stream segments.
pub const MPEG_TS_MIME: &str = "video/mp2t";

/// MIME type for MP4 video.
pub const MP4_MIME: &str = "video/mp4";

/// Fallback MIME type when neither the path nor the store names one.
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Kind of object being served, decided once per request from the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `.m3u8` playlist; rewritten before being returned
    HlsManifest,
    /// `.ts` segment
    MpegSegment,
    /// `.mp4` video
    Mp4,
    /// Anything else; the store's content type is used
    Other,
}

impl MediaKind {
    /// Classify an object path by its extension (case-insensitive).
    pub fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let extension = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return MediaKind::Other,
        };
        match extension.as_str() {
            "m3u8" => MediaKind::HlsManifest,
            "ts" => MediaKind::MpegSegment,
            "mp4" => MediaKind::Mp4,
            _ => MediaKind::Other,
        }
    }

    /// Fixed content type for this kind, if it has one.
    pub const fn content_type(&self) -> Option<&'static str> {
        match self {
            MediaKind::HlsManifest => Some(HLS_MANIFEST_MIME),
            MediaKind::MpegSegment => Some(MPEG_TS_MIME),
            MediaKind::Mp4 => Some(MP4_MIME),
            MediaKind::Other => None,
        }
    }

    /// Whether the body must go through the manifest rewriter.
    pub const fn is_manifest(&self) -> bool {
        matches!(self, MediaKind::HlsManifest)
    }
}
