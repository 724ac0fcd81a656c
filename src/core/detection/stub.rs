use std::sync::atomic::{AtomicUsize, Ordering};

use super::{DetectError, DetectionClient};
use crate::api::models::{DetectionResponse, DetectionSet};
use crate::core::video::Frame;

type Responder = Box<dyn Fn(&Frame) -> Result<DetectionResponse, DetectError> + Send + Sync>;

/// 离线检测客户端，结果由闭包决定（测试与演练用）
pub struct StubDetectionClient {
    responder: Responder,
    calls: AtomicUsize,
}

impl StubDetectionClient {
    pub fn new() -> Self {
        Self::with_pattern(|_, _| Vec::new())
    }

    /// 按 (视频源, 帧号) 返回检测框
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(usize, u64) -> DetectionSet + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(move |frame: &Frame| -> Result<DetectionResponse, DetectError> {
                Ok(DetectionResponse {
                    code: 0,
                    message: None,
                    detections: pattern(frame.source_index, frame.frame_number),
                    dropped: 0,
                })
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// 每次调用都失败
    pub fn unavailable(message: &str) -> Self {
        let message = message.to_string();
        Self {
            responder: Box::new(move |_: &Frame| -> Result<DetectionResponse, DetectError> {
                Err(DetectError::ServiceUnavailable(message.clone()))
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubDetectionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionClient for StubDetectionClient {
    fn detect(&self, frame: &Frame) -> Result<DetectionResponse, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder)(frame)
    }
}
