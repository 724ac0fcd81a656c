//! 监控配置（JSON5 文件 + 默认值）

use crate::core::video::diff_filter::ChangeMetric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://mksol.vn/detect/v1/api/predict/img";
pub const DEFAULT_SAMPLE_INTERVAL: u64 = 10;
pub const DEFAULT_SPECTRAL_THRESHOLD: f64 = 3_000_000.0;
pub const DEFAULT_SSIM_THRESHOLD: f64 = 0.85;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("配置解析失败: {0}")]
    Parse(#[from] json5::Error),
    #[error("配置无效: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 每隔多少个采集帧取一帧
    pub sample_interval: u64,
    /// 多路视频源并行处理
    pub parallel_sources: bool,
    pub gate: GateConfig,
    pub dedup: DedupConfig,
    pub service: ServiceConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            parallel_sources: false,
            gate: GateConfig::default(),
            dedup: DedupConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn from_json5_str(content: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json5_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval == 0 {
            return Err(ConfigError::Invalid(
                "sample_interval must be at least 1".to_string(),
            ));
        }
        let threshold = self.gate.threshold();
        if !threshold.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "gate.threshold must be finite, got {}",
                threshold
            )));
        }
        // SSIM 取值范围 [-1, 1]
        if self.gate.metric == Some(ChangeMetric::StructuralSimilarity)
            && !(-1.0..=1.0).contains(&threshold)
        {
            return Err(ConfigError::Invalid(format!(
                "gate.threshold for structural_similarity must be in [-1, 1], got {}",
                threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.dedup.iou_threshold) {
            return Err(ConfigError::Invalid(format!(
                "dedup.iou_threshold must be in [0, 1], got {}",
                self.dedup.iou_threshold
            )));
        }
        if !(self.dedup.confidence_delta_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "dedup.confidence_delta_threshold must be >= 0, got {}",
                self.dedup.confidence_delta_threshold
            )));
        }
        if self.service.jpeg_quality == 0 || self.service.jpeg_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "service.jpeg_quality must be in 1..=100, got {}",
                self.service.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// 变化门控配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// `None` 表示关闭门控，每个采样帧都送检
    pub metric: Option<ChangeMetric>,
    /// 缺省时按度量取默认值
    pub threshold: Option<f64>,
    /// 没有参考帧时是否送检
    pub analyze_first_frame: bool,
    /// 记录触发送检的分数
    pub record_history: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::spectral()
    }
}

impl GateConfig {
    pub fn spectral() -> Self {
        Self {
            metric: Some(ChangeMetric::SpectralMse),
            threshold: None,
            analyze_first_frame: false,
            record_history: true,
        }
    }

    pub fn structural() -> Self {
        Self {
            metric: Some(ChangeMetric::StructuralSimilarity),
            threshold: None,
            analyze_first_frame: false,
            record_history: true,
        }
    }

    /// 生效的阈值；门控关闭时无意义，返回 0
    pub fn threshold(&self) -> f64 {
        match (self.threshold, self.metric) {
            (Some(threshold), _) => threshold,
            (None, Some(metric)) => metric.default_threshold(),
            (None, None) => 0.0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            metric: None,
            threshold: None,
            analyze_first_frame: true,
            record_history: false,
        }
    }
}

/// 检测框去重配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub iou_threshold: f32,
    /// 置信度差上限，差值不超过它且 IoU 达标即视为重复
    pub confidence_delta_threshold: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            confidence_delta_threshold: 0.8,
        }
    }
}

/// 检测服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub jpeg_quality: u8,
    /// 上传载荷另存目录
    pub save_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            jpeg_quality: 90,
            save_dir: None,
        }
    }
}
