//! 远程蚊子检测服务客户端

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::models::DetectionResponse;
use crate::core::config::ServiceConfig;
use crate::core::video::{Frame, VisionError};
use log::{debug, info};

mod parser;
mod stub;

pub use parser::{build_response, parse_response};
pub use stub::StubDetectionClient;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("检测服务不可用: {0}")]
    ServiceUnavailable(String),
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON 数据解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("帧编码失败: {0}")]
    Frame(#[from] VisionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("检测条目无效: {0}")]
    MalformedDetection(String),
}

/// 检测服务，输入一帧，返回检测框
pub trait DetectionClient: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<DetectionResponse, DetectError>;
}

/// multipart 上传 JPEG 的 HTTP 客户端
pub struct HttpDetectionClient {
    client: Client,
    api_url: String,
    jpeg_quality: u8,
    save_dir: Option<PathBuf>,
}

impl HttpDetectionClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, DetectError> {
        let mut builder = Client::builder();
        // 0 表示不设超时
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build()?;

        if let Some(dir) = &config.save_dir {
            std::fs::create_dir_all(dir)?;
        }

        info!("🌐 detection service: {}", config.api_url);
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            jpeg_quality: config.jpeg_quality,
            save_dir: config.save_dir.clone(),
        })
    }

    pub fn payload_name(frame: &Frame) -> String {
        format!("frame_{}_{}.jpg", frame.source_index, frame.frame_number)
    }
}

impl DetectionClient for HttpDetectionClient {
    fn detect(&self, frame: &Frame) -> Result<DetectionResponse, DetectError> {
        let jpeg = frame.encode_jpeg(self.jpeg_quality)?;
        let name = Self::payload_name(frame);

        if let Some(dir) = &self.save_dir {
            std::fs::write(dir.join(&name), &jpeg)?;
        }

        debug!("📤 uploading {} ({} bytes)", name, jpeg.len());
        let part = Part::bytes(jpeg).file_name(name).mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        let resp = self.client.post(&self.api_url).multipart(form).send()?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(DetectError::ServiceUnavailable(format!("HTTP {}", status)));
        }

        parse_response(&resp.text()?)
    }
}
