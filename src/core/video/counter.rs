use crate::api::models::DetectionBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 按类别累计的检测计数，只增不减
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionCounter {
    counts: BTreeMap<String, u64>,
}

impl DetectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, boxes: &[DetectionBox]) {
        for b in boxes {
            *self.counts.entry(b.label.clone()).or_insert(0) += 1;
        }
    }

    /// 按类别求和合并
    pub fn merge(&mut self, other: &DetectionCounter) {
        for (label, count) in &other.counts {
            *self.counts.entry(label.clone()).or_insert(0) += count;
        }
    }

    pub fn get(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
