use futures::{StreamExt, TryStreamExt};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;

use super::{GenerateParams, ModelLoader, SegmentStream, SpeechModel};
use crate::config::registry::ModelDescriptor;
use crate::errors::{StudioError, StudioResult};
use crate::models::AudioSegment;

const HEALTH_ATTEMPTS: usize = 30;
const HEALTH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct LoadResponse {
    handle: String,
}

/// One NDJSON line of a generate response
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireLine {
    Segment { audio: Vec<f32>, sample_rate: u32 },
    Error { error: String },
}

fn parse_line(line: &str) -> StudioResult<AudioSegment> {
    match serde_json::from_str::<WireLine>(line)? {
        WireLine::Segment { audio, sample_rate } => Ok(AudioSegment::new(audio, sample_rate)),
        WireLine::Error { error } => Err(StudioError::RuntimeFailure(error)),
    }
}

/// Loads models into a local inference server over HTTP
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    client: Client,
    endpoint: String,
}

impl RemoteLoader {
    pub fn new(endpoint: &str, timeout_secs: u64) -> StudioResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Single health check
    pub async fn is_healthy(&self) -> bool {
        match self.client.get(format!("{}/v1/health", self.endpoint)).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn wait_for_health(&self) -> StudioResult<()> {
        for attempt in 0..HEALTH_ATTEMPTS {
            if self.is_healthy().await {
                return Ok(());
            }
            debug!("Inference server not ready (attempt {})", attempt + 1);
            tokio::time::sleep(HEALTH_INTERVAL).await;
        }
        Err(StudioError::RuntimeFailure(format!(
            "Inference server at {} is not responding",
            self.endpoint
        )))
    }
}

#[async_trait::async_trait]
impl ModelLoader for RemoteLoader {
    async fn load(&self, descriptor: &ModelDescriptor) -> StudioResult<Box<dyn SpeechModel>> {
        self.wait_for_health().await?;

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/models/load", self.endpoint))
            .json(&serde_json::json!({ "repo_id": descriptor.repo_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::RuntimeFailure(format!(
                "Load request for {} returned {}: {}",
                descriptor.repo_id, status, body
            )));
        }

        let LoadResponse { handle } = response.json().await?;
        info!(
            "Server loaded {} as {} in {:?}",
            descriptor.repo_id,
            handle,
            started.elapsed()
        );

        Ok(Box::new(RemoteModel {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            handle,
        }))
    }
}

/// A model living in the inference server, addressed by its handle
pub struct RemoteModel {
    client: Client,
    endpoint: String,
    handle: String,
}

#[async_trait::async_trait]
impl SpeechModel for RemoteModel {
    async fn generate(&self, params: GenerateParams) -> StudioResult<SegmentStream> {
        let response = self
            .client
            .post(format!("{}/v1/models/{}/generate", self.endpoint, self.handle))
            .json(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::RuntimeFailure(format!(
                "Generate on {} returned {}: {}",
                self.handle, status, body
            )));
        }

        let bytes = response.bytes_stream().map_err(std::io::Error::other);
        let lines = FramedRead::new(StreamReader::new(bytes), LinesCodec::new());

        let segments = lines
            .filter_map(|line| async move {
                match line {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => Some(parse_line(&line)),
                    Err(e) => Some(Err(StudioError::RuntimeFailure(format!(
                        "Broken generate stream: {}",
                        e
                    )))),
                }
            })
            .boxed();

        Ok(segments)
    }
}

impl Drop for RemoteModel {
    fn drop(&mut self) {
        // Best effort, the server frees the model when the request lands
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to unload {}, leaving it on the server", self.handle);
            return;
        };
        let client = self.client.clone();
        let url = format!("{}/v1/models/{}/unload", self.endpoint, self.handle);
        let handle = self.handle.clone();
        runtime.spawn(async move {
            if let Err(e) = client.post(&url).send().await {
                debug!("Unload of {} failed: {}", handle, e);
            }
        });
    }
}
