// Model engine seam
// The neural side of every model sits behind these two traits

pub mod params;
pub mod remote;

use futures::StreamExt;
use futures::stream::BoxStream;
use log::{debug, warn};
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::registry::ModelDescriptor;
use crate::errors::{StudioError, StudioResult};
use crate::models::AudioSegment;

pub use params::{CallInput, GenerateParams, NativeVoice};
pub use remote::RemoteLoader;

/// Lazy, finite sequence of audio produced by one generate call.
/// Consumed exactly once.
pub type SegmentStream = BoxStream<'static, StudioResult<AudioSegment>>;

/// A loaded model instance
#[async_trait::async_trait]
pub trait SpeechModel: Send + Sync {
    async fn generate(&self, params: GenerateParams) -> StudioResult<SegmentStream>;
}

/// Builds model instances from registry metadata
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, descriptor: &ModelDescriptor) -> StudioResult<Box<dyn SpeechModel>>;
}

/// A loaded model owned by the cache.
///
/// Calls on one handle are serialised by `exec`; different handles run
/// independently.
pub struct ModelHandle {
    descriptor: ModelDescriptor,
    model: Box<dyn SpeechModel>,
    exec: Mutex<()>,
    loaded_at: Instant,
}

impl ModelHandle {
    pub fn new(descriptor: ModelDescriptor, model: Box<dyn SpeechModel>) -> Self {
        Self {
            descriptor,
            model,
            exec: Mutex::new(()),
            loaded_at: Instant::now(),
        }
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    /// Run one generate call and concatenate every segment it yields.
    ///
    /// A call that yields no samples at all is an `EmptyOutput` failure.
    pub async fn synthesize(&self, params: GenerateParams) -> StudioResult<Vec<f32>> {
        let _guard = self.exec.lock().await;
        let started = Instant::now();

        let mut stream = self.model.generate(params).await?;
        let mut samples = Vec::new();
        let mut segments = 0usize;

        while let Some(segment) = stream.next().await {
            let segment = segment?;
            if segment.sample_rate != self.descriptor.sample_rate {
                warn!(
                    "{} produced a {} Hz segment, expected {} Hz",
                    self.descriptor.name, segment.sample_rate, self.descriptor.sample_rate
                );
            }
            segments += 1;
            samples.extend(segment.samples);
        }

        if samples.is_empty() {
            return Err(StudioError::EmptyOutput {
                model: self.descriptor.name.clone(),
            });
        }

        debug!(
            "{}: {} segments, {} samples in {:?}",
            self.descriptor.name,
            segments,
            samples.len(),
            started.elapsed()
        );
        Ok(samples)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model", &self.descriptor.name)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}
