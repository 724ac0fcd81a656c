pub mod counter;
pub mod deduplicator;
pub mod diff_filter;
pub mod error;
pub mod frame;
pub mod manager;
pub mod similarity;
pub mod source;

pub use counter::DetectionCounter;
pub use deduplicator::{filter_new, iou, DetectionDeduplicator};
pub use diff_filter::{should_analyze, ChangeGate, ChangeMetric, GateDecision, GateReason};
pub use error::VisionError;
pub use frame::{Frame, FrameInfo};
pub use manager::{MonitorPipeline, MonitorReport, SampleOutcome, SourceReport, SourceStats};
pub use source::{FrameSource, ImageSequenceSource, VecFrameSource};
