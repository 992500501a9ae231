use super::core::{describe, InferenceClient};
use super::session::ModelPhase;
use crate::types::{ModelConfig, ModelState};
use crate::{Error, Result};
use std::time::Instant;
use tracing::{info, warn};

/// Status the server answers `POST /model/load` with when a model is already loaded.
const ALREADY_LOADED_STATUS: u16 = 202;

impl InferenceClient {
    /// Load a model on the server.
    ///
    /// The session is `Loading(config)` while the request is in flight. On success it
    /// becomes `Loaded(config)`; on any failure it returns to the phase it had before.
    /// Loading while a model is already loaded fails with [`Error::AlreadyLoaded`].
    pub async fn load_model(&self, config: &ModelConfig) -> Result<()> {
        let previous = self.session.begin_load(config.clone());
        let start = Instant::now();
        info!(model = config.name.as_str(), ctx = config.context_size, "loading model");

        match self.request_load(config).await {
            Ok(()) => {
                self.session
                    .settle_load(config, ModelPhase::Loaded(config.clone()));
                info!(
                    model = config.name.as_str(),
                    duration_ms = start.elapsed().as_millis(),
                    "model loaded"
                );
                Ok(())
            }
            Err(e) => {
                self.session.settle_load(config, previous);
                warn!(model = config.name.as_str(), error = %e, "model load failed");
                Err(e)
            }
        }
    }

    async fn request_load(&self, config: &ModelConfig) -> Result<()> {
        let reply = self.transport.post_json("/model/load", config).await?;
        if reply.status == ALREADY_LOADED_STATUS {
            return Err(Error::AlreadyLoaded(reply.text_field("error")));
        }
        if !reply.is_success() {
            return Err(Error::remote(reply.status, reply.text_field("error")));
        }
        Ok(())
    }

    /// Unload the current model. Calling it with nothing loaded is fine.
    pub async fn unload_model(&self) -> Result<()> {
        let reply = self.transport.get("/model/unload").await?;
        if !reply.is_success() {
            warn!(http_status = reply.status, "model unload failed");
            return Err(Error::remote(
                reply.status,
                describe("error unloading model", &reply),
            ));
        }
        self.session.set_model(ModelPhase::Unloaded);
        info!("model unloaded");
        Ok(())
    }

    /// Fetch the server's model state and adopt it locally, unless a load is in flight.
    pub async fn models_state(&self) -> Result<ModelState> {
        let reply = self.transport.get("/model/state").await?;
        if !reply.is_success() {
            return Err(Error::remote(
                reply.status,
                describe("error loading models state", &reply),
            ));
        }
        let state: ModelState = reply.json()?;
        self.session.sync_model(&state);
        Ok(state)
    }
}
