use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("无效帧: {0}")]
    InvalidFrame(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("图像解码失败: {0}")]
    Image(#[from] image::ImageError),
}
