pub mod pipeline;

pub use pipeline::{PipelineSettings, VideoPipeline};
