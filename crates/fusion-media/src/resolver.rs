//! Record-to-bytes resolution, including video frame extraction.
//!
//! Frame extraction shells out to `ffmpeg` and writes into a scoped temp
//! file, so no intermediate image ever outlives the call. Extraction sits
//! behind [`FrameExtractor`] so tests can substitute deterministic
//! failure modes without touching real video.

use std::path::{Path, PathBuf};
use std::process::Command;

use fusion_types::Record;
use tempfile::Builder as TempBuilder;
use tracing::{debug, warn};

use crate::error::MediaError;

/// Upper bound on extraction attempts for one frame record.
pub const MAX_FRAME_ATTEMPTS: usize = 4;

/// Fallback sequence for a requested frame: the frame itself, its
/// predecessor, the first frame, then two past the request. Duplicates
/// collapse (requesting frame 0 tries [0, 2]), so the list length varies
/// but never exceeds [`MAX_FRAME_ATTEMPTS`].
pub fn frame_candidates(frame: u32) -> Vec<u32> {
    let raw = [frame, frame.saturating_sub(1), 0, frame + 2];
    let mut candidates = Vec::with_capacity(MAX_FRAME_ATTEMPTS);
    for f in raw {
        if !candidates.contains(&f) {
            candidates.push(f);
        }
    }
    candidates
}

/// Extracts a single frame from a video file.
pub trait FrameExtractor: Send + Sync {
    /// Return the encoded image bytes for frame `frame` of `video`, or an
    /// error when that specific frame cannot be produced.
    fn extract(&self, video: &Path, frame: u32) -> Result<Vec<u8>, MediaError>;
}

/// Frame extraction via the `ffmpeg` binary.
pub struct FfmpegExtractor;

impl FrameExtractor for FfmpegExtractor {
    fn extract(&self, video: &Path, frame: u32) -> Result<Vec<u8>, MediaError> {
        let output = TempBuilder::new()
            .prefix("frame-")
            .suffix(".jpg")
            .tempfile()?;

        let status = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(format!("select=eq(n\\,{})", frame))
            .arg("-frames:v")
            .arg("1")
            .arg("-y")
            .arg(output.path())
            .status()
            .map_err(|e| MediaError::Extraction(format!("failed to spawn ffmpeg: {}", e)))?;

        if !status.success() {
            return Err(MediaError::Extraction(format!(
                "ffmpeg exited with {} for frame {} of {}",
                status,
                frame,
                video.display()
            )));
        }

        let bytes = std::fs::read(output.path())?;
        if bytes.is_empty() {
            // ffmpeg exits 0 when the select filter matches nothing
            return Err(MediaError::Extraction(format!(
                "frame {} is past the end of {}",
                frame,
                video.display()
            )));
        }
        Ok(bytes)
    }
}

/// Resolves records to their media bytes.
pub struct MediaResolver {
    media_root: PathBuf,
    upload_dir: PathBuf,
    extractor: Box<dyn FrameExtractor>,
}

impl MediaResolver {
    /// Resolver over a media directory and an upload staging directory,
    /// extracting frames with `ffmpeg`.
    pub fn new(media_root: impl Into<PathBuf>, upload_dir: impl Into<PathBuf>) -> Self {
        Self::with_extractor(media_root, upload_dir, Box::new(FfmpegExtractor))
    }

    pub fn with_extractor(
        media_root: impl Into<PathBuf>,
        upload_dir: impl Into<PathBuf>,
        extractor: Box<dyn FrameExtractor>,
    ) -> Self {
        Self {
            media_root: media_root.into(),
            upload_dir: upload_dir.into(),
            extractor,
        }
    }

    /// Resolve a record to its media bytes.
    ///
    /// `Ok(None)` means the record has no media representation (text
    /// lines). Missing files and exhausted frame fallbacks are errors the
    /// caller decides how to surface.
    pub fn resolve(&self, record: &Record) -> Result<Option<Vec<u8>>, MediaError> {
        match record {
            Record::TextLine { .. } => Ok(None),
            Record::StaticImage { file } => self.read(&self.media_root.join(file)).map(Some),
            Record::Uploaded { file } => self.read(&self.upload_dir.join(file)).map(Some),
            Record::VideoFrame { file, frame, .. } => {
                let video = self.media_root.join(file);
                if !video.exists() {
                    return Err(MediaError::Missing(video));
                }
                self.extract_with_fallback(&video, *frame).map(Some)
            }
        }
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, MediaError> {
        if !path.exists() {
            return Err(MediaError::Missing(path.to_path_buf()));
        }
        Ok(std::fs::read(path)?)
    }

    /// Try each fallback frame in order, returning the first success.
    fn extract_with_fallback(&self, video: &Path, frame: u32) -> Result<Vec<u8>, MediaError> {
        let candidates = frame_candidates(frame);
        for &candidate in &candidates {
            match self.extractor.extract(video, candidate) {
                Ok(bytes) => {
                    if candidate != frame {
                        debug!(
                            video = %video.display(),
                            requested = frame,
                            served = candidate,
                            "served fallback frame"
                        );
                    }
                    return Ok(bytes);
                }
                Err(e) => {
                    warn!(
                        video = %video.display(),
                        frame = candidate,
                        error = %e,
                        "frame extraction attempt failed"
                    );
                }
            }
        }
        Err(MediaError::Unreadable {
            file: video.to_path_buf(),
            attempts: candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fails every frame, as a corrupt or truncated video would.
    struct AlwaysFails;

    impl FrameExtractor for AlwaysFails {
        fn extract(&self, _video: &Path, frame: u32) -> Result<Vec<u8>, MediaError> {
            Err(MediaError::Extraction(format!("no frame {}", frame)))
        }
    }

    /// Succeeds only for frames below a cutoff, like a short video.
    struct ShortVideo {
        frames: u32,
    }

    impl FrameExtractor for ShortVideo {
        fn extract(&self, _video: &Path, frame: u32) -> Result<Vec<u8>, MediaError> {
            if frame < self.frames {
                Ok(vec![frame as u8])
            } else {
                Err(MediaError::Extraction(format!("no frame {}", frame)))
            }
        }
    }

    fn dirs_with_video() -> (TempDir, TempDir) {
        let media = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        std::fs::write(media.path().join("clip.mp4"), b"not really a video").unwrap();
        (media, uploads)
    }

    fn frame_record(frame: u32) -> Record {
        Record::VideoFrame {
            file: "clip.mp4".to_string(),
            frame,
            timestamp: frame as f32 / 30.0,
        }
    }

    #[test]
    fn test_candidates_order_and_dedup() {
        assert_eq!(frame_candidates(37), vec![37, 36, 0, 39]);
        assert_eq!(frame_candidates(1), vec![1, 0, 3]);
        assert_eq!(frame_candidates(0), vec![0, 2]);
        assert!(frame_candidates(500).len() <= MAX_FRAME_ATTEMPTS);
    }

    #[test]
    fn test_text_resolves_to_none() {
        let (media, uploads) = dirs_with_video();
        let resolver =
            MediaResolver::with_extractor(media.path(), uploads.path(), Box::new(AlwaysFails));

        let record = Record::TextLine {
            file: "notes.txt".to_string(),
            line: 3,
            text: "hello".to_string(),
        };
        assert_eq!(resolver.resolve(&record).unwrap(), None);
    }

    #[test]
    fn test_static_image_read() {
        let (media, uploads) = dirs_with_video();
        std::fs::write(media.path().join("cat.jpg"), b"jpeg bytes").unwrap();
        let resolver =
            MediaResolver::with_extractor(media.path(), uploads.path(), Box::new(AlwaysFails));

        let record = Record::StaticImage {
            file: "cat.jpg".to_string(),
        };
        assert_eq!(
            resolver.resolve(&record).unwrap(),
            Some(b"jpeg bytes".to_vec())
        );
    }

    #[test]
    fn test_uploaded_reads_from_upload_dir() {
        let (media, uploads) = dirs_with_video();
        std::fs::write(uploads.path().join("query.png"), b"png bytes").unwrap();
        let resolver =
            MediaResolver::with_extractor(media.path(), uploads.path(), Box::new(AlwaysFails));

        let record = Record::Uploaded {
            file: "query.png".to_string(),
        };
        assert_eq!(
            resolver.resolve(&record).unwrap(),
            Some(b"png bytes".to_vec())
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let (media, uploads) = dirs_with_video();
        let resolver =
            MediaResolver::with_extractor(media.path(), uploads.path(), Box::new(AlwaysFails));

        let record = Record::StaticImage {
            file: "ghost.jpg".to_string(),
        };
        assert!(matches!(
            resolver.resolve(&record),
            Err(MediaError::Missing(_))
        ));
    }

    #[test]
    fn test_fallback_reaches_frame_zero() {
        // Frame 37 requested from a 10-frame video: 37, 36, and 39 fail
        // but the frame-0 fallback succeeds.
        let (media, uploads) = dirs_with_video();
        let resolver = MediaResolver::with_extractor(
            media.path(),
            uploads.path(),
            Box::new(ShortVideo { frames: 10 }),
        );

        let bytes = resolver.resolve(&frame_record(37)).unwrap();
        assert_eq!(bytes, Some(vec![0]));
    }

    #[test]
    fn test_exhaustion_reports_all_attempts() {
        let (media, uploads) = dirs_with_video();
        let resolver =
            MediaResolver::with_extractor(media.path(), uploads.path(), Box::new(AlwaysFails));

        let err = resolver.resolve(&frame_record(37)).unwrap_err();
        match err {
            MediaError::Unreadable { file, attempts } => {
                assert!(file.ends_with("clip.mp4"));
                assert_eq!(attempts, vec![37, 36, 0, 39]);
            }
            other => panic!("expected Unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_video_skips_extraction() {
        let media = TempDir::new().unwrap();
        let uploads = TempDir::new().unwrap();
        let resolver = MediaResolver::with_extractor(
            media.path(),
            uploads.path(),
            Box::new(ShortVideo { frames: 100 }),
        );

        assert!(matches!(
            resolver.resolve(&frame_record(5)),
            Err(MediaError::Missing(_))
        ));
    }
}
