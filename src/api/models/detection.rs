use serde::{Deserialize, Serialize};

/// 单个检测框（帧像素坐标）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// 类别名，如蚊子种类
    pub label: String,
    pub confidence: f32,
}

/// 同一视频源同一时刻的检测结果
pub type DetectionSet = Vec<DetectionBox>;

impl DetectionBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: label.into(),
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 坐标与置信度都是有限值，且 x2 >= x1、y2 >= y1
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.x1, self.y1, self.x2, self.y2, self.confidence]
            .iter()
            .all(|v| v.is_finite());
        finite && self.x2 >= self.x1 && self.y2 >= self.y1
    }

    /// 拒绝畸形框，置信度裁剪到 [0, 1]
    pub fn sanitized(mut self) -> Option<Self> {
        if !self.is_well_formed() {
            return None;
        }
        self.confidence = self.confidence.clamp(0.0, 1.0);
        Some(self)
    }
}

/// 检测服务返回结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    /// 服务端状态码，0 表示成功
    pub code: i64,
    pub message: Option<String>,
    pub detections: DetectionSet,
    /// 因字段缺失或数值非法被丢弃的条目数
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area() {
        let b = DetectionBox::new(0.0, 0.0, 10.0, 5.0, "aedes", 0.9);
        assert_eq!(b.area(), 50.0);
    }

    #[test]
    fn test_inverted_box_rejected() {
        let b = DetectionBox::new(10.0, 0.0, 0.0, 5.0, "aedes", 0.9);
        assert!(!b.is_well_formed());
        assert!(b.sanitized().is_none());
    }

    #[test]
    fn test_non_finite_rejected() {
        let b = DetectionBox::new(0.0, 0.0, f32::NAN, 5.0, "aedes", 0.9);
        assert!(b.sanitized().is_none());
        let b = DetectionBox::new(0.0, 0.0, 1.0, 5.0, "aedes", f32::INFINITY);
        assert!(b.sanitized().is_none());
    }

    #[test]
    fn test_confidence_clamped() {
        let b = DetectionBox::new(0.0, 0.0, 1.0, 1.0, "culex", 1.7).sanitized().unwrap();
        assert_eq!(b.confidence, 1.0);
    }

    #[test]
    fn test_degenerate_box_is_well_formed() {
        let b = DetectionBox::new(3.0, 3.0, 3.0, 8.0, "culex", 0.4);
        assert!(b.is_well_formed());
        assert_eq!(b.area(), 0.0);
    }
}
