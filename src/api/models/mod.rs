pub mod detection;

pub use detection::{DetectionBox, DetectionResponse, DetectionSet};
