use std::sync::Arc;

use crate::modules::transcode::pipeline::TranscodePipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranscodePipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<TranscodePipeline>) -> Self {
        Self { pipeline }
    }
}
