//! Shared state handed to every HTTP handler.

use gpu_arbiter::GpuArbiter;
use std::sync::Arc;
use workflow_core::Engine;

/// The GPU arbiter is optional: hosts without accelerators simply never
/// construct one, and the `/gpu/*` routes answer 503 instead of 404 so a
/// client can tell "no such route" apart from "no GPUs on this host".
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub arbiter: Option<Arc<GpuArbiter>>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, arbiter: Option<Arc<GpuArbiter>>) -> Self {
        AppState { engine, arbiter }
    }
}
