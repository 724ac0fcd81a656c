//! 帧来源：图片序列目录与内存帧

use super::error::VisionError;
use super::frame::Frame;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

static SEQUENCE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 逐帧读取的视频源，`Ok(None)` 表示已读完
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, VisionError>;

    fn describe(&self) -> String;
}

/// 目录中的图片序列，按文件名中最后一段数字排序
pub struct ImageSequenceSource {
    source_index: usize,
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, source_index: usize) -> Result<Self, VisionError> {
        let dir = dir.as_ref().to_path_buf();
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && Self::is_image(path))
            .collect();

        files.sort_by_cached_key(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (Self::sequence_number(&name), name)
        });

        info!(
            "📂 source {}: {} frames in {:?}",
            source_index,
            files.len(),
            dir
        );

        Ok(Self {
            source_index,
            dir,
            files,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// `frame_0012.png` -> 12，没有数字的排在最后
    fn sequence_number(name: &str) -> u64 {
        let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
        SEQUENCE_NUMBER
            .find_iter(stem)
            .last()
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(u64::MAX)
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VisionError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        // 解码失败也前进，保证序列最终耗尽
        self.cursor += 1;

        debug!("🖼️ source {} reading {:?}", self.source_index, path);
        let image = image::open(path)?;
        Ok(Some(Frame::from_image(
            image,
            self.source_index,
            self.cursor as u64,
        )))
    }

    fn describe(&self) -> String {
        format!("source {} ({})", self.source_index, self.dir.display())
    }
}

/// 内存中的帧序列
pub struct VecFrameSource {
    source_index: usize,
    frames: VecDeque<Frame>,
}

impl VecFrameSource {
    pub fn new(source_index: usize, frames: Vec<Frame>) -> Self {
        Self {
            source_index,
            frames: frames.into(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VisionError> {
        Ok(self.frames.pop_front())
    }

    fn describe(&self) -> String {
        format!("source {} (memory)", self.source_index)
    }
}
