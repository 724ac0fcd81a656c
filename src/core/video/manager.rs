//! 多路视频采样监控管理器

use super::counter::DetectionCounter;
use super::deduplicator::DetectionDeduplicator;
use super::diff_filter::{ChangeGate, ChangeMetric, GateDecision};
use super::frame::{Frame, FrameInfo};
use super::source::FrameSource;
use crate::api::models::DetectionSet;
use crate::core::config::MonitorConfig;
use crate::core::detection::DetectionClient;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

/// 单路视频源统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub source_index: usize,
    pub frames_read: u64,
    pub read_errors: u64,
    pub sampled_frames: u64,
    pub analyzed_frames: u64,
    pub unchanged_frames: u64,
    pub invalid_frames: u64,
    pub service_errors: u64,
    pub new_detections: u64,
    /// 服务端返回但字段无效的条目
    pub dropped_detections: u64,
}

/// 单个采样帧的处理结果
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub frame_info: FrameInfo,
    /// 帧无效时为 None
    pub decision: Option<GateDecision>,
    pub new_detections: DetectionSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub stats: SourceStats,
    pub metric: Option<ChangeMetric>,
    pub score_history: Vec<f64>,
    pub counts: DetectionCounter,
}

/// 运行汇总
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub ticks: u64,
    pub total: u64,
    pub counts: DetectionCounter,
    pub sources: Vec<SourceReport>,
}

/// 单路视频源的全部状态：参考帧、上一次新增框、计数
pub struct SourceTracker {
    gate: ChangeGate,
    dedup: DetectionDeduplicator,
    counter: DetectionCounter,
    stats: SourceStats,
}

impl SourceTracker {
    pub fn new(source_index: usize, config: &MonitorConfig) -> Self {
        Self {
            gate: ChangeGate::new(&config.gate),
            dedup: DetectionDeduplicator::with_config(&config.dedup),
            counter: DetectionCounter::new(),
            stats: SourceStats {
                source_index,
                ..Default::default()
            },
        }
    }

    /// 门控 -> 远程检测 -> 去重 -> 计数，任何一步失败都只跳过本帧
    pub fn process_sample(&mut self, frame: &Frame, client: &dyn DetectionClient) -> SampleOutcome {
        let frame_info = FrameInfo::from_frame(frame);
        self.stats.sampled_frames += 1;

        let decision = match self.gate.evaluate(frame) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(
                    "⚠️ source {} frame {}: {}",
                    frame.source_index, frame.frame_number, e
                );
                self.stats.invalid_frames += 1;
                return SampleOutcome {
                    frame_info,
                    decision: None,
                    new_detections: Vec::new(),
                };
            }
        };

        if let Some(score) = decision.score {
            debug!(
                "📈 source {} frame {}: {} {:.4} -> {:?}",
                frame.source_index,
                frame.frame_number,
                self.gate.metric().map_or("none", ChangeMetric::name),
                score,
                decision.reason
            );
        }

        if !decision.analyze {
            self.stats.unchanged_frames += 1;
            return SampleOutcome {
                frame_info,
                decision: Some(decision),
                new_detections: Vec::new(),
            };
        }

        self.stats.analyzed_frames += 1;
        let detections = match client.detect(frame) {
            Ok(response) => {
                self.stats.dropped_detections += response.dropped as u64;
                response.detections
            }
            Err(e) => {
                // 视为本次没有检测结果
                warn!(
                    "❌ source {} frame {}: {}",
                    frame.source_index, frame.frame_number, e
                );
                self.stats.service_errors += 1;
                Vec::new()
            }
        };

        let survivors = self.dedup.filter(&detections);
        self.counter.record(&survivors);
        self.stats.new_detections += survivors.len() as u64;

        if !survivors.is_empty() {
            info!(
                "🦟 source {} frame {}: {} new detections",
                frame.source_index,
                frame.frame_number,
                survivors.len()
            );
        }

        SampleOutcome {
            frame_info,
            decision: Some(decision),
            new_detections: survivors,
        }
    }

    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    pub fn counter(&self) -> &DetectionCounter {
        &self.counter
    }

    pub fn score_history(&self) -> &[f64] {
        self.gate.history()
    }

    fn report(&self) -> SourceReport {
        SourceReport {
            stats: self.stats.clone(),
            metric: self.gate.metric(),
            score_history: self.gate.history().to_vec(),
            counts: self.counter.clone(),
        }
    }
}

/// 采样循环：每个 tick 每路读一帧，每 `sample_interval` 个 tick 处理一次
pub struct MonitorPipeline {
    config: MonitorConfig,
    trackers: Vec<SourceTracker>,
    pool: Option<rayon::ThreadPool>,
    tick: u64,
}

impl MonitorPipeline {
    pub fn new(config: MonitorConfig, source_count: usize) -> Self {
        let trackers = (0..source_count)
            .map(|i| SourceTracker::new(i, &config))
            .collect();

        let pool = if config.parallel_sources && source_count > 1 {
            let num_threads = num_cpus::get().min(source_count).max(1);
            debug!("Using {} threads for {} sources", num_threads, source_count);
            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("⚠️ thread pool unavailable, running sequentially: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            trackers,
            pool,
            tick: 0,
        }
    }

    pub fn source_count(&self) -> usize {
        self.trackers.len()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn trackers(&self) -> &[SourceTracker] {
        &self.trackers
    }

    /// 处理同一 tick 的采样帧，`frames[i]` 属于第 i 路，None 表示该路本 tick 无帧
    pub fn process_tick(
        &mut self,
        frames: Vec<Option<Frame>>,
        client: &dyn DetectionClient,
    ) -> Vec<SampleOutcome> {
        let work: Vec<(&mut SourceTracker, Frame)> = self
            .trackers
            .iter_mut()
            .zip(frames)
            .filter_map(|(tracker, frame)| frame.map(|f| (tracker, f)))
            .collect();

        match &self.pool {
            // 各路状态互不共享，tick 内并行不影响同一路的先后顺序
            Some(pool) => pool.install(|| {
                work.into_par_iter()
                    .map(|(tracker, frame)| tracker.process_sample(&frame, client))
                    .collect()
            }),
            None => work
                .into_iter()
                .map(|(tracker, frame)| tracker.process_sample(&frame, client))
                .collect(),
        }
    }

    pub fn run(
        &mut self,
        sources: &mut [Box<dyn FrameSource>],
        client: &dyn DetectionClient,
    ) -> MonitorReport {
        let stop = AtomicBool::new(false);
        self.run_until(sources, client, &stop)
    }

    /// 跑到所有视频源耗尽，或 `stop` 被置位
    pub fn run_until(
        &mut self,
        sources: &mut [Box<dyn FrameSource>],
        client: &dyn DetectionClient,
        stop: &AtomicBool,
    ) -> MonitorReport {
        if sources.len() != self.trackers.len() {
            warn!(
                "⚠️ {} sources for {} trackers, extra sources are ignored",
                sources.len(),
                self.trackers.len()
            );
        }

        info!(
            "🎬 monitoring {} sources, sampling every {} frames",
            self.trackers.len(),
            self.config.sample_interval
        );

        let interval = self.config.sample_interval.max(1);
        loop {
            if stop.load(Ordering::SeqCst) {
                info!("🛑 stop requested at tick {}", self.tick);
                break;
            }

            let mut frames = Vec::with_capacity(self.trackers.len());
            let mut any_alive = false;
            for (source, tracker) in sources.iter_mut().zip(self.trackers.iter_mut()) {
                match source.next_frame() {
                    Ok(Some(frame)) => {
                        any_alive = true;
                        tracker.stats.frames_read += 1;
                        frames.push(Some(frame));
                    }
                    Ok(None) => frames.push(None),
                    Err(e) => {
                        // 读失败的源仍在推进，下个 tick 继续读
                        any_alive = true;
                        tracker.stats.read_errors += 1;
                        warn!("⚠️ {}: {}", source.describe(), e);
                        frames.push(None);
                    }
                }
            }

            if !any_alive {
                break;
            }

            self.tick += 1;
            if self.tick % interval == 0 {
                self.process_tick(frames, client);
            }
        }

        let report = self.report();
        info!(
            "✅ finished after {} ticks, {} detections",
            report.ticks, report.total
        );
        report
    }

    /// 各路计数按类别求和
    pub fn counts(&self) -> DetectionCounter {
        let mut merged = DetectionCounter::new();
        for tracker in &self.trackers {
            merged.merge(&tracker.counter);
        }
        merged
    }

    pub fn report(&self) -> MonitorReport {
        let counts = self.counts();
        MonitorReport {
            ticks: self.tick,
            total: counts.total(),
            counts,
            sources: self.trackers.iter().map(SourceTracker::report).collect(),
        }
    }

    pub fn reset(&mut self) {
        let count = self.trackers.len();
        self.trackers = (0..count)
            .map(|i| SourceTracker::new(i, &self.config))
            .collect();
        self.tick = 0;
    }
}
