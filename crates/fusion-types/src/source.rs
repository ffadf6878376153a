//! Source collection identifiers.

use serde::{Deserialize, Serialize};

/// Identifies which collection (or synthetic source) produced a fused hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Text-line collection
    Text,
    /// Still-image collection
    StaticImages,
    /// Video-frame collection
    VideoFrames,
    /// Synthetic entry for a query-supplied probe file
    Upload,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Text => "text",
            SourceId::StaticImages => "static_images",
            SourceId::VideoFrames => "video_frames",
            SourceId::Upload => "upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(SourceId::Text.as_str(), "text");
        assert_eq!(SourceId::VideoFrames.as_str(), "video_frames");
    }
}
