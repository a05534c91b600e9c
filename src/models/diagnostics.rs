use serde::Serialize;
use utoipa::ToSchema;

use crate::ws::faults::FaultCounts;

/// Response for diagnostics information
#[derive(Serialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub service: String,
    pub pod: Option<String>,
    pub uptime_secs: i64,
    pub n_conn: u32,
    /// Outbound queues still open; lower than `n_conn` while evicted connections wind down.
    pub n_queues: u32,
    pub n_rooms: u32,
    pub n_members: u32,
    pub faults: FaultCounts,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
