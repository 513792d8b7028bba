//! DTOs for the `/gpu/*` routes.

use gpu_arbiter::ModelRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct AllocateRequest {
    pub model_id: String,
    #[serde(default)]
    pub vram_required_gb: Option<f64>,
    #[serde(default)]
    pub preferred_gpu_id: Option<u32>,
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocateResponse {
    pub gpu_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseRequest {
    pub model_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseResponse {
    pub released: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseAllResponse {
    pub released_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelRequestDto {
    pub model_id: String,
    #[serde(default)]
    pub vram_required_gb: Option<f64>,
}

impl From<ModelRequestDto> for ModelRequest {
    fn from(dto: ModelRequestDto) -> Self {
        ModelRequest::new(dto.model_id, dto.vram_required_gb)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub models: Vec<ModelRequestDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendResponse {
    pub recommendations: HashMap<String, Option<u32>>,
}

/// Query string for `GET /gpu/can-run-parallel?models=m1:v1,m2:v2,...`:
/// comma-separated `modelId[:vramRequiredGB]` pairs.
#[derive(Debug, Clone, Deserialize)]
pub struct CanRunParallelQuery {
    #[serde(default)]
    pub models: String,
}

impl CanRunParallelQuery {
    pub fn parse(&self) -> Vec<ModelRequest> {
        self.models
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| match entry.split_once(':') {
                Some((model_id, vram)) => {
                    ModelRequest::new(model_id, vram.parse::<f64>().ok())
                }
                None => ModelRequest::new(entry, None),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_run_parallel_query_parses_model_and_vram_pairs() {
        let query = CanRunParallelQuery { models: "m1:10,m2:20".to_string() };
        let models = query.parse();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].model_id, "m1");
        assert_eq!(models[0].vram_required_gb, Some(10.0));
    }

    #[test]
    fn can_run_parallel_query_accepts_a_bare_model_id() {
        let query = CanRunParallelQuery { models: "m1".to_string() };
        let models = query.parse();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].vram_required_gb, None);
    }

    #[test]
    fn empty_query_parses_to_no_models() {
        let query = CanRunParallelQuery { models: String::new() };
        assert!(query.parse().is_empty());
    }
}
