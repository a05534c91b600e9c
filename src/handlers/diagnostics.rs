use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::state::AppState;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Connection, room and fault counters plus host stats
pub async fn diagnostics(State(app_state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let n_conn = app_state.registry.len() as u32;
    let n_queues = app_state.gateway.open_queues() as u32;
    let room_stats = app_state.rooms.stats();
    let faults = app_state.faults.snapshot();

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Rooms: {}, Members: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        room_stats.rooms,
        room_stats.members
    );

    Json(DiagnosticsResponse {
        service: app_state.config.cloud_service_name.clone(),
        pod: app_state.config.cloud_pod.clone(),
        uptime_secs: (Utc::now() - app_state.started_at).num_seconds(),
        n_conn,
        n_queues,
        n_rooms: room_stats.rooms as u32,
        n_members: room_stats.members as u32,
        faults,
        cpu_usage,
        memory_alloc,
        memory_total,
        memory_free,
    })
}
