//! Records describing the payload behind each stored vector.
//!
//! One record is appended per vector, in insertion order; the record for
//! vector `i` is entry `i` of the collection's metadata store. Records are
//! immutable once written.

use serde::{Deserialize, Serialize};

/// The kind of media a record points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    TextLine,
    StaticImage,
    VideoFrame,
    Uploaded,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::TextLine => "text_line",
            MediaKind::StaticImage => "static_image",
            MediaKind::VideoFrame => "video_frame",
            MediaKind::Uploaded => "uploaded",
        }
    }
}

/// Metadata entry for one stored vector.
///
/// Tagged per media kind so each variant carries exactly the fields that
/// are meaningful for it, rather than one struct of optionals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// One line of a line-oriented text file.
    TextLine {
        /// Source file name
        file: String,
        /// 1-based line number within the file
        line: u32,
        /// The indexed line itself
        text: String,
    },
    /// A still image file.
    StaticImage {
        /// Image file name
        file: String,
    },
    /// One frame of a video container.
    VideoFrame {
        /// Video file name
        file: String,
        /// Frame index within the video
        frame: u32,
        /// Position of the frame in seconds
        timestamp: f32,
    },
    /// An ephemeral probe file supplied with a query.
    Uploaded {
        /// File name within the query-scoped upload location
        file: String,
    },
}

impl Record {
    /// The file this record points at.
    pub fn file(&self) -> &str {
        match self {
            Record::TextLine { file, .. }
            | Record::StaticImage { file }
            | Record::VideoFrame { file, .. }
            | Record::Uploaded { file } => file,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            Record::TextLine { .. } => MediaKind::TextLine,
            Record::StaticImage { .. } => MediaKind::StaticImage,
            Record::VideoFrame { .. } => MediaKind::VideoFrame,
            Record::Uploaded { .. } => MediaKind::Uploaded,
        }
    }

    /// Key under which fused results are deduplicated.
    ///
    /// Still images and uploads dedup on the file name alone; video frames
    /// and text lines include their position, since one file contributes
    /// many entries.
    pub fn dedup_key(&self) -> String {
        match self {
            Record::TextLine { file, line, .. } => format!("{}#{}", file, line),
            Record::StaticImage { file } => file.clone(),
            Record::VideoFrame { file, frame, .. } => format!("{}#{}", file, frame),
            Record::Uploaded { file } => file.clone(),
        }
    }

    /// The text snippet behind a text hit, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Record::TextLine { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The frame index behind a video hit, if any.
    pub fn frame(&self) -> Option<u32> {
        match self {
            Record::VideoFrame { frame, .. } => Some(*frame),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keys() {
        let image = Record::StaticImage {
            file: "sunset.jpg".to_string(),
        };
        assert_eq!(image.dedup_key(), "sunset.jpg");

        let frame = Record::VideoFrame {
            file: "clip.mp4".to_string(),
            frame: 12,
            timestamp: 24.0,
        };
        assert_eq!(frame.dedup_key(), "clip.mp4#12");

        let line = Record::TextLine {
            file: "notes.txt".to_string(),
            line: 3,
            text: "alpha bravo".to_string(),
        };
        assert_eq!(line.dedup_key(), "notes.txt#3");
    }

    #[test]
    fn test_kind_tag_in_json() {
        let frame = Record::VideoFrame {
            file: "clip.mp4".to_string(),
            frame: 7,
            timestamp: 14.0,
        };

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["kind"], "video_frame");
        assert_eq!(json["file"], "clip.mp4");
        assert_eq!(json["frame"], 7);
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            Record::TextLine {
                file: "a.txt".to_string(),
                line: 1,
                text: "hello".to_string(),
            },
            Record::StaticImage {
                file: "b.png".to_string(),
            },
            Record::Uploaded {
                file: "probe.jpg".to_string(),
            },
        ];

        let json = serde_json::to_string(&records).unwrap();
        let back: Vec<Record> = serde_json::from_str(&json).unwrap();
        assert_eq!(records, back);
    }
}
