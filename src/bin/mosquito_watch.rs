//! mosquito-watch - 多路视频蚊子监控
//!
//! 1. 每个 `--source` 目录是一路视频（按帧号排序的图片序列）
//! 2. 每隔 `--interval` 帧采样，变化门控通过后上传检测服务
//! 3. 去重后按类别计数，Ctrl-C 或全部读完时输出汇总

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mosquito_watch::api::{format_summary, MosquitoMonitor};
use mosquito_watch::core::config::{GateConfig, MonitorConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    /// 频域差分 MSE
    Spectral,
    /// 结构相似度
    Ssim,
    /// 不做门控，每个采样帧都送检
    None,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sample video frames, gate on change, count mosquitoes via a remote detector"
)]
struct Args {
    /// JSON5 config file; flags below override it.
    #[arg(long, env = "MOSQUITO_WATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Frame directory of one video source (repeatable).
    #[arg(long = "source", required = true)]
    sources: Vec<PathBuf>,

    /// Change metric.
    #[arg(long, value_enum)]
    metric: Option<MetricArg>,

    /// Gate threshold (MSE: analyze above; SSIM: analyze below).
    #[arg(long)]
    threshold: Option<f64>,

    /// Captured frames between two samples.
    #[arg(long)]
    interval: Option<u64>,

    /// Detection service endpoint.
    #[arg(long, env = "MOSQUITO_API_URL")]
    api_url: Option<String>,

    /// Also keep every uploaded JPEG here.
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Process sources in parallel.
    #[arg(long)]
    parallel: bool,

    /// Write the JSON report (counts, stats, score history) here.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MonitorConfig::default(),
    };

    if let Some(metric) = args.metric {
        let record_history = config.gate.record_history;
        config.gate = match metric {
            MetricArg::Spectral => GateConfig::spectral(),
            MetricArg::Ssim => GateConfig::structural(),
            MetricArg::None => GateConfig::disabled(),
        };
        config.gate.record_history = record_history;
    }
    if let Some(threshold) = args.threshold {
        config.gate.threshold = Some(threshold);
    }
    if let Some(interval) = args.interval {
        config.sample_interval = interval;
    }
    if let Some(url) = &args.api_url {
        config.service.api_url = url.clone();
    }
    if let Some(dir) = &args.save_dir {
        config.service.save_dir = Some(dir.clone());
    }
    if args.parallel {
        config.parallel_sources = true;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    mosquito_watch::init_logging();
    let args = Args::parse();

    let config = build_config(&args)?;

    let mut sources = MosquitoMonitor::open_sources(&args.sources)?;
    let mut monitor = MosquitoMonitor::create(config, sources.len())?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let report = monitor.run(&mut sources, &stop);
    print!("{}", format_summary(&report));

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("report written to {}", path.display());
    }

    Ok(())
}
