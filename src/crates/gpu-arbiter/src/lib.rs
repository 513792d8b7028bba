//! # gpu-arbiter - accelerator inventory and admission control
//!
//! A companion to `workflow-core`'s engine: nodes that demand a GPU call
//! into this arbiter before doing their work and release it afterward.
//! The arbiter never runs nodes itself; it only decides which GPU, if
//! any, a model may use right now, and enforces that no GPU's reserved
//! VRAM ever exceeds its total.
//!
//! All mutating operations serialize through a single lock covering the
//! whole allocation table, mirroring how `workflow-core::registry`
//! guards its type directory: the critical section is small (proportional
//! to GPU and allocation count) so contention is not a concern.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single accelerator in the host's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuRecord {
    pub gpu_id: u32,
    pub total_mem_gb: f64,
    /// Baseline VRAM already in use outside the arbiter's own bookkeeping
    /// (e.g. the driver, other processes). Informational only: admission
    /// is computed against `total_mem_gb` and the arbiter's own
    /// allocations, not this field.
    #[serde(default)]
    pub used_mem_gb: f64,
    pub name: String,
}

impl GpuRecord {
    pub fn new(gpu_id: u32, total_mem_gb: f64, name: impl Into<String>) -> Self {
        GpuRecord { gpu_id, total_mem_gb, used_mem_gb: 0.0, name: name.into() }
    }
}

/// One model's current reservation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub model_id: String,
    pub gpu_id: u32,
    pub vram_reserved_gb: f64,
    pub exclusive: bool,
    pub acquired_at: DateTime<Utc>,
}

/// Selection policy `allocate_gpu` applies once `preferred_gpu_id` (if
/// any) is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    /// Minimize post-allocation used VRAM; ties broken by lower `gpu_id`.
    LeastLoaded,
    /// Lowest-id feasible GPU.
    FirstFit,
    /// Next feasible GPU after the last allocation, wrapping around.
    RoundRobin,
}

impl Default for AllocationStrategy {
    fn default() -> Self {
        AllocationStrategy::LeastLoaded
    }
}

/// A request to be considered by [`GpuArbiter::recommend_allocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model_id: String,
    pub vram_required_gb: Option<f64>,
}

impl ModelRequest {
    pub fn new(model_id: impl Into<String>, vram_required_gb: Option<f64>) -> Self {
        ModelRequest { model_id: model_id.into(), vram_required_gb }
    }
}

/// A snapshot of the arbiter's inventory and live allocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuStatus {
    pub gpus: Vec<GpuRecord>,
    pub allocations: HashMap<String, Allocation>,
}

struct Table {
    gpus: Vec<GpuRecord>,
    allocations: HashMap<String, Allocation>,
    round_robin_cursor: Option<u32>,
}

/// Accelerator inventory plus allocation table. Construct once per host
/// and share behind an `Arc`; every method takes `&self`.
pub struct GpuArbiter {
    strategy: AllocationStrategy,
    table: Mutex<Table>,
}

impl GpuArbiter {
    pub fn new(gpus: Vec<GpuRecord>, strategy: AllocationStrategy) -> Self {
        GpuArbiter {
            strategy,
            table: Mutex::new(Table { gpus, allocations: HashMap::new(), round_robin_cursor: None }),
        }
    }

    pub fn get_status(&self) -> GpuStatus {
        let table = self.table.lock();
        GpuStatus { gpus: table.gpus.clone(), allocations: table.allocations.clone() }
    }

    /// Reserves a GPU for `model_id`, releasing any prior allocation that
    /// model held (one allocation per model at a time).
    pub fn allocate_gpu(
        &self,
        model_id: &str,
        vram_required_gb: Option<f64>,
        preferred_gpu_id: Option<u32>,
        exclusive: bool,
    ) -> Option<u32> {
        let mut table = self.table.lock();
        let required = vram_required_gb.unwrap_or(0.0);

        let feasible = |gpus: &[GpuRecord], allocations: &HashMap<String, Allocation>, gpu_id: u32| -> bool {
            let Some(gpu) = gpus.iter().find(|g| g.gpu_id == gpu_id) else { return false };
            let reserved = current_reserved(allocations, gpu_id);
            let has_existing = allocations.values().any(|a| a.gpu_id == gpu_id);
            if exclusive && has_existing {
                return false;
            }
            gpu.total_mem_gb - reserved >= required
        };

        let chosen = if let Some(preferred) = preferred_gpu_id {
            if feasible(&table.gpus, &table.allocations, preferred) {
                Some(preferred)
            } else {
                None
            }
        } else {
            select_gpu(&table.gpus, &table.allocations, self.strategy, table.round_robin_cursor, required, exclusive)
        };

        let Some(gpu_id) = chosen else { return None };

        table.allocations.remove(model_id);
        table.allocations.insert(
            model_id.to_string(),
            Allocation {
                model_id: model_id.to_string(),
                gpu_id,
                vram_reserved_gb: required,
                exclusive,
                acquired_at: Utc::now(),
            },
        );
        table.round_robin_cursor = Some(gpu_id);
        Some(gpu_id)
    }

    pub fn release_gpu(&self, model_id: &str) -> bool {
        self.table.lock().allocations.remove(model_id).is_some()
    }

    pub fn release_all(&self) -> usize {
        let mut table = self.table.lock();
        let count = table.allocations.len();
        table.allocations.clear();
        count
    }

    /// Pure: evaluates the requests in order against a hypothetical copy
    /// of the allocation table, never touching the arbiter's real state.
    pub fn recommend_allocation(&self, models: &[ModelRequest]) -> HashMap<String, Option<u32>> {
        let table = self.table.lock();
        let mut hypothetical = table.allocations.clone();
        let mut cursor = table.round_robin_cursor;
        let mut result = HashMap::new();

        for request in models {
            let required = request.vram_required_gb.unwrap_or(0.0);
            let chosen = select_gpu(&table.gpus, &hypothetical, self.strategy, cursor, required, false);
            if let Some(gpu_id) = chosen {
                hypothetical.insert(
                    request.model_id.clone(),
                    Allocation {
                        model_id: request.model_id.clone(),
                        gpu_id,
                        vram_reserved_gb: required,
                        exclusive: false,
                        acquired_at: Utc::now(),
                    },
                );
                cursor = Some(gpu_id);
            }
            result.insert(request.model_id.clone(), chosen);
        }
        result
    }

    pub fn can_run_parallel(&self, models: &[ModelRequest]) -> bool {
        self.recommend_allocation(models).values().all(|g| g.is_some())
    }
}

fn current_reserved(allocations: &HashMap<String, Allocation>, gpu_id: u32) -> f64 {
    allocations.values().filter(|a| a.gpu_id == gpu_id).map(|a| a.vram_reserved_gb).sum()
}

fn select_gpu(
    gpus: &[GpuRecord],
    allocations: &HashMap<String, Allocation>,
    strategy: AllocationStrategy,
    round_robin_cursor: Option<u32>,
    required: f64,
    exclusive: bool,
) -> Option<u32> {
    let is_feasible = |gpu: &GpuRecord| -> bool {
        let reserved = current_reserved(allocations, gpu.gpu_id);
        let has_existing = allocations.values().any(|a| a.gpu_id == gpu.gpu_id);
        if exclusive && has_existing {
            return false;
        }
        gpu.total_mem_gb - reserved >= required
    };

    match strategy {
        AllocationStrategy::FirstFit => {
            let mut sorted: Vec<&GpuRecord> = gpus.iter().filter(|g| is_feasible(g)).collect();
            sorted.sort_by_key(|g| g.gpu_id);
            sorted.first().map(|g| g.gpu_id)
        }
        AllocationStrategy::LeastLoaded => gpus
            .iter()
            .filter(|g| is_feasible(g))
            .map(|g| (g.gpu_id, current_reserved(allocations, g.gpu_id) + required))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(&b.0)))
            .map(|(gpu_id, _)| gpu_id),
        AllocationStrategy::RoundRobin => {
            if gpus.is_empty() {
                return None;
            }
            let mut ids: Vec<u32> = gpus.iter().map(|g| g.gpu_id).collect();
            ids.sort();
            let start_index = match round_robin_cursor {
                Some(last) => ids.iter().position(|&id| id == last).map(|i| (i + 1) % ids.len()).unwrap_or(0),
                None => 0,
            };
            (0..ids.len())
                .map(|offset| ids[(start_index + offset) % ids.len()])
                .find(|&id| gpus.iter().find(|g| g.gpu_id == id).map(is_feasible).unwrap_or(false))
        }
    }
}
