use crate::api::models::{DetectionBox, DetectionSet};
use crate::core::config::DedupConfig;
use log::debug;

/// 检测框交并比，不相交或并集面积为 0 时返回 0
pub fn iou(a: &DetectionBox, b: &DetectionBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - inter_area;

    if union > 0.0 {
        inter_area / union
    } else {
        0.0
    }
}

/// 与任一历史框 IoU 达标且置信度差不超过上限，即视为同一只
///
/// 这是启发式判断，不是身份匹配：置信度差上限默认 0.8，非常宽松。
pub fn is_duplicate(
    candidate: &DetectionBox,
    previous: &[DetectionBox],
    iou_threshold: f32,
    confidence_delta_threshold: f32,
) -> bool {
    previous.iter().any(|prev| {
        iou(candidate, prev) >= iou_threshold
            && (candidate.confidence - prev.confidence).abs() <= confidence_delta_threshold
    })
}

/// 返回 `current` 中没有匹配到 `previous` 的框，保持原顺序；畸形框直接丢弃
pub fn filter_new(
    current: &[DetectionBox],
    previous: &[DetectionBox],
    iou_threshold: f32,
    confidence_delta_threshold: f32,
) -> DetectionSet {
    current
        .iter()
        .filter(|b| b.is_well_formed())
        .filter(|b| !is_duplicate(b, previous, iou_threshold, confidence_delta_threshold))
        .cloned()
        .collect()
}

/// 单路视频源的检测框去重器，保留上一次采样的新增框
pub struct DetectionDeduplicator {
    previous: DetectionSet,
    iou_threshold: f32,
    confidence_delta_threshold: f32,
}

impl DetectionDeduplicator {
    pub fn new() -> Self {
        Self::with_config(&DedupConfig::default())
    }

    pub fn with_config(config: &DedupConfig) -> Self {
        Self {
            previous: Vec::new(),
            iou_threshold: config.iou_threshold,
            confidence_delta_threshold: config.confidence_delta_threshold,
        }
    }

    /// 过滤后的新增框成为下一次比较的历史
    pub fn filter(&mut self, current: &[DetectionBox]) -> DetectionSet {
        let survivors = filter_new(
            current,
            &self.previous,
            self.iou_threshold,
            self.confidence_delta_threshold,
        );
        debug!(
            "🧹 dedup: {} in, {} new, {} previous",
            current.len(),
            survivors.len(),
            self.previous.len()
        );
        self.previous = survivors.clone();
        survivors
    }

    pub fn previous(&self) -> &[DetectionBox] {
        &self.previous
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }
}

impl Default for DetectionDeduplicator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> DetectionBox {
        DetectionBox::new(x1, y1, x2, y2, "aedes", confidence)
    }

    #[test]
    fn test_iou_self_is_one() {
        let a = bbox(2.0, 3.0, 12.0, 9.0, 0.5);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_is_zero() {
        let a = bbox(0.0, 0.0, 10.0, 10.0, 0.5);
        let b = bbox(20.0, 20.0, 30.0, 30.0, 0.5);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_touching_edges_is_zero() {
        let a = bbox(0.0, 0.0, 10.0, 10.0, 0.5);
        let b = bbox(10.0, 0.0, 20.0, 10.0, 0.5);
        assert_eq!(iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_symmetric() {
        let pairs = [
            (bbox(0.0, 0.0, 10.0, 10.0, 0.1), bbox(5.0, 5.0, 15.0, 15.0, 0.2)),
            (bbox(1.0, 2.0, 4.0, 9.0, 0.1), bbox(0.0, 0.0, 3.0, 3.0, 0.2)),
            (bbox(0.0, 0.0, 100.0, 100.0, 0.1), bbox(10.0, 10.0, 20.0, 20.0, 0.2)),
        ];
        for (a, b) in pairs.iter() {
            assert_eq!(iou(a, b), iou(b, a));
        }
    }

    #[test]
    fn test_iou_degenerate_boxes_no_division_by_zero() {
        let a = bbox(5.0, 5.0, 5.0, 5.0, 0.5);
        assert_eq!(iou(&a, &a), 0.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // 交集 5x5=25，并集 100+100-25=175
        let a = bbox(0.0, 0.0, 10.0, 10.0, 0.5);
        let b = bbox(5.0, 5.0, 15.0, 15.0, 0.5);
        assert!((iou(&a, &b) - 25.0 / 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_previous_returns_current() {
        let current = vec![bbox(0.0, 0.0, 10.0, 10.0, 0.9), bbox(30.0, 30.0, 40.0, 40.0, 0.3)];
        assert_eq!(filter_new(&current, &[], 0.5, 0.8), current);
    }

    #[test]
    fn test_shifted_box_is_duplicate() {
        let previous = vec![bbox(0.0, 0.0, 10.0, 10.0, 0.9)];
        let current = vec![bbox(1.0, 1.0, 11.0, 11.0, 0.91)];
        assert!(filter_new(&current, &previous, 0.5, 0.8).is_empty());
    }

    #[test]
    fn test_confidence_gap_keeps_box() {
        let previous = vec![bbox(0.0, 0.0, 10.0, 10.0, 0.95)];
        let current = vec![bbox(0.0, 0.0, 10.0, 10.0, 0.1)];
        assert_eq!(filter_new(&current, &previous, 0.5, 0.8).len(), 1);
    }

    #[test]
    fn test_low_overlap_keeps_box() {
        let previous = vec![bbox(0.0, 0.0, 10.0, 10.0, 0.9)];
        let current = vec![bbox(8.0, 8.0, 18.0, 18.0, 0.9)];
        assert_eq!(filter_new(&current, &previous, 0.5, 0.8).len(), 1);
    }

    #[test]
    fn test_malformed_boxes_dropped() {
        let current = vec![
            bbox(0.0, 0.0, 10.0, 10.0, 0.9),
            bbox(10.0, 0.0, 0.0, 10.0, 0.9),
            bbox(0.0, 0.0, f32::NAN, 10.0, 0.9),
        ];
        let survivors = filter_new(&current, &[], 0.5, 0.8);
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_deduplicator_rolls_previous_forward() {
        let mut dedup = DetectionDeduplicator::new();

        let first = dedup.filter(&[bbox(0.0, 0.0, 10.0, 10.0, 0.9)]);
        assert_eq!(first.len(), 1);

        // 与上一次相同，被去重，历史变为空
        let second = dedup.filter(&[bbox(0.0, 0.0, 10.0, 10.0, 0.9)]);
        assert!(second.is_empty());
        assert!(dedup.previous().is_empty());

        // 历史为空，同一个框再次计为新增
        let third = dedup.filter(&[bbox(0.0, 0.0, 10.0, 10.0, 0.9)]);
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn test_deduplicator_clear() {
        let mut dedup = DetectionDeduplicator::new();
        dedup.filter(&[bbox(0.0, 0.0, 10.0, 10.0, 0.9)]);
        dedup.clear();
        assert!(dedup.previous().is_empty());
    }
}
