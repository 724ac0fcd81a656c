//! 蚊子监控入口

use crate::core::config::MonitorConfig;
use crate::core::detection::{DetectError, DetectionClient, HttpDetectionClient};
use crate::core::video::{
    DetectionCounter, FrameSource, ImageSequenceSource, MonitorPipeline, MonitorReport,
    VisionError,
};
use log::info;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

/// 蚊子监控器 - 变化门控 + 远程检测 + 去重计数
///
/// ```ignore
/// let mut monitor = MosquitoMonitor::create(MonitorConfig::default(), dirs.len())?;
/// let mut sources = MosquitoMonitor::open_sources(&dirs)?;
/// let report = monitor.run(&mut sources, &AtomicBool::new(false));
/// println!("{}", format_summary(&report));
/// ```
pub struct MosquitoMonitor {
    pipeline: MonitorPipeline,
    client: Box<dyn DetectionClient>,
}

impl MosquitoMonitor {
    /// 使用 HTTP 检测服务
    pub fn create(config: MonitorConfig, source_count: usize) -> Result<Self, DetectError> {
        let client = HttpDetectionClient::new(&config.service)?;
        Ok(Self::with_client(config, source_count, Box::new(client)))
    }

    pub fn with_client(
        config: MonitorConfig,
        source_count: usize,
        client: Box<dyn DetectionClient>,
    ) -> Self {
        info!("🎬 MosquitoMonitor: created for {} sources", source_count);
        Self {
            pipeline: MonitorPipeline::new(config, source_count),
            client,
        }
    }

    /// 每个目录一路视频源，序号按参数顺序
    pub fn open_sources(dirs: &[PathBuf]) -> Result<Vec<Box<dyn FrameSource>>, VisionError> {
        dirs.iter()
            .enumerate()
            .map(|(i, dir)| {
                ImageSequenceSource::open(dir, i).map(|s| Box::new(s) as Box<dyn FrameSource>)
            })
            .collect()
    }

    pub fn run(
        &mut self,
        sources: &mut [Box<dyn FrameSource>],
        stop: &AtomicBool,
    ) -> MonitorReport {
        self.pipeline.run_until(sources, self.client.as_ref(), stop)
    }

    pub fn counts(&self) -> DetectionCounter {
        self.pipeline.counts()
    }

    pub fn report(&self) -> MonitorReport {
        self.pipeline.report()
    }

    pub fn reset(&mut self) {
        self.pipeline.reset()
    }
}

impl Drop for MosquitoMonitor {
    fn drop(&mut self) {
        info!("🗑️ MosquitoMonitor: released");
    }
}

/// 结束时打印的检测汇总
pub fn format_summary(report: &MonitorReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== MOSQUITO DETECTION SUMMARY ===");
    let _ = writeln!(out, "Sum of all mosquito detected: {}", report.total);
    for (label, count) in report.counts.iter() {
        let _ = writeln!(out, "{}: {} detected", label, count);
    }
    for source in &report.sources {
        let s = &source.stats;
        let _ = writeln!(
            out,
            "video {}: {} frames, {} sampled, {} analyzed, {} new",
            s.source_index + 1,
            s.frames_read,
            s.sampled_frames,
            s.analyzed_frames,
            s.new_detections
        );
    }
    out
}
