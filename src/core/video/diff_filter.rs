use super::error::VisionError;
use super::frame::Frame;
use super::similarity::{spectral_mse, structural_similarity};
use crate::core::config::{GateConfig, DEFAULT_SPECTRAL_THRESHOLD, DEFAULT_SSIM_THRESHOLD};
use log::debug;
use serde::{Deserialize, Serialize};

/// 帧差异度量方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMetric {
    /// 频域差分 MSE，分数越大变化越大
    SpectralMse,
    /// 结构相似度，分数越小变化越大
    StructuralSimilarity,
}

impl ChangeMetric {
    pub fn score(
        self,
        reference: &[u8],
        current: &[u8],
        width: usize,
        height: usize,
    ) -> Result<f64, VisionError> {
        match self {
            ChangeMetric::SpectralMse => Ok(spectral_mse(reference, current, width, height)),
            ChangeMetric::StructuralSimilarity => {
                structural_similarity(reference, current, width, height)
            }
        }
    }

    /// 未显式配置阈值时使用的默认值
    pub fn default_threshold(self) -> f64 {
        match self {
            ChangeMetric::SpectralMse => DEFAULT_SPECTRAL_THRESHOLD,
            ChangeMetric::StructuralSimilarity => DEFAULT_SSIM_THRESHOLD,
        }
    }

    /// 相似度类度量方向相反
    pub fn triggers(self, score: f64, threshold: f64) -> bool {
        match self {
            ChangeMetric::SpectralMse => score > threshold,
            ChangeMetric::StructuralSimilarity => score < threshold,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChangeMetric::SpectralMse => "spectral_mse",
            ChangeMetric::StructuralSimilarity => "structural_similarity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub analyze: bool,
    pub score: Option<f64>,
    pub reason: GateReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    Changed,    // 超过阈值，送检
    Unchanged,  // 未超过阈值，跳过
    FirstFrame, // 没有参考帧
    Bypassed,   // 门控关闭
}

/// 比较两帧，尺寸不一致时把 `current` 缩放到 `previous` 的尺寸
pub fn should_analyze(
    previous: &Frame,
    current: &Frame,
    metric: ChangeMetric,
    threshold: f64,
) -> Result<GateDecision, VisionError> {
    previous.validate()?;
    current.validate()?;

    let reference = previous.to_grayscale();
    let target = if (current.width, current.height) == (previous.width, previous.height) {
        current.to_grayscale()
    } else {
        debug!(
            "↔️ resize source {} frame {} from {}x{} to {}x{}",
            current.source_index,
            current.frame_number,
            current.width,
            current.height,
            previous.width,
            previous.height
        );
        current
            .resize_to(previous.width, previous.height)?
            .to_grayscale()
    };

    if reference.len() != target.len() {
        return Err(VisionError::InvalidFrame(format!(
            "luma planes differ after resize: {} vs {}",
            reference.len(),
            target.len()
        )));
    }

    let score = metric.score(
        &reference,
        &target,
        previous.width as usize,
        previous.height as usize,
    )?;
    let analyze = metric.triggers(score, threshold);

    Ok(GateDecision {
        analyze,
        score: Some(score),
        reason: if analyze {
            GateReason::Changed
        } else {
            GateReason::Unchanged
        },
    })
}

/// 单路视频源的变化门控，持有参考帧与分数历史
pub struct ChangeGate {
    metric: Option<ChangeMetric>,
    threshold: f64,
    analyze_first_frame: bool,
    record_history: bool,
    previous: Option<Frame>,
    // 只写，供外部绘图
    history: Vec<f64>,
}

impl ChangeGate {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            metric: config.metric,
            threshold: config.threshold(),
            analyze_first_frame: config.analyze_first_frame,
            record_history: config.record_history,
            previous: None,
            history: Vec::new(),
        }
    }

    /// 与参考帧比较后，无论是否触发都以当前帧作为新的参考帧
    pub fn evaluate(&mut self, frame: &Frame) -> Result<GateDecision, VisionError> {
        frame.validate()?;

        let Some(metric) = self.metric else {
            self.previous = Some(frame.clone());
            return Ok(GateDecision {
                analyze: true,
                score: None,
                reason: GateReason::Bypassed,
            });
        };

        let decision = match self.previous.as_ref() {
            Some(previous) => should_analyze(previous, frame, metric, self.threshold)?,
            None => GateDecision {
                analyze: self.analyze_first_frame,
                score: None,
                reason: GateReason::FirstFrame,
            },
        };

        if self.record_history && decision.analyze {
            if let Some(score) = decision.score {
                self.history.push(score);
            }
        }

        self.previous = Some(frame.clone());
        Ok(decision)
    }

    pub fn metric(&self) -> Option<ChangeMetric> {
        self.metric
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn has_reference(&self) -> bool {
        self.previous.is_some()
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.history.clear();
    }
}
