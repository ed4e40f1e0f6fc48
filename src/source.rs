use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SourceError;
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Supplies decoded frames in capture order.
///
/// `None` ends the stream. An `Err` item is a single bad frame; the source
/// may still yield frames after it.
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Result<Frame, SourceError>>;

    /// Source description (for logging)
    fn describe(&self) -> String;
}

/// Reads a directory of still images as a video stream
///
/// Files with a png, jpg, jpeg or bmp extension are played back in filename
/// order. Frame `n` is stamped `n / fps` seconds from stream start.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    fps: f64,
    next_index: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self, SourceError> {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(SourceError::InvalidFrameRate(fps));
        }

        let entries = fs::read_dir(dir).map_err(|e| SourceError::OpenFailed {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::OpenFailed {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(SourceError::Empty(dir.display().to_string()));
        }

        tracing::info!(
            "Opened image sequence: {} ({} frames at {} fps)",
            dir.display(),
            files.len(),
            fps
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            fps,
            next_index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn timestamp(&self, index: usize) -> Duration {
        Duration::from_nanos((index as f64 * 1e9 / self.fps).round() as u64)
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Option<Result<Frame, SourceError>> {
        let index = self.next_index;
        let path = self.files.get(index)?.clone();
        self.next_index += 1;

        let timestamp = self.timestamp(index);
        let result = image::open(&path)
            .map_err(|e| SourceError::DecodeFailed {
                path: path.display().to_string(),
                source: e,
            })
            .and_then(|img| {
                Frame::from_rgb_image(img.to_rgb8(), timestamp).map_err(|e| {
                    SourceError::InvalidFrame {
                        path: path.display().to_string(),
                        source: e,
                    }
                })
            });
        Some(result)
    }

    fn describe(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Frames already in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    frames: VecDeque<Result<Frame, SourceError>>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
        }
    }

    /// Queue a frame or a per-frame failure
    pub fn push(&mut self, item: Result<Frame, SourceError>) {
        self.frames.push_back(item);
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Option<Result<Frame, SourceError>> {
        self.frames.pop_front()
    }

    fn describe(&self) -> String {
        format!("{} in-memory frames", self.frames.len())
    }
}
