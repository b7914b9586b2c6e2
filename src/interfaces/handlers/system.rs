use actix_web::{web, HttpResponse, Responder};
use humantime::format_duration;
use once_cell::sync::Lazy;
use chrono::Utc;
use parking_lot::RwLock;
use std::{
    time::Duration,
    sync::atomic::{AtomicI64, Ordering},
};
use sysinfo::System;
use serde::Serialize;

use crate::{constants::START_TIME, entities::banner::BannerStatus, AppState};

const CACHE_TTL_SECS: i64 = 5;

#[derive(Serialize, Clone, Default)]
struct SystemInfo {
    os: String,
    kernel: String,
    hostname: String,
    cpu_count: usize,
    memory_total: String,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
struct HealthCheckResponse {
    status: String,
    uptime: String,
    timestamp: String,
    start_at: String,
    version: String,
    memory_usage: String,
    user_store: String,
    blob_store: String,
    banner: BannerStatus,
    banner_timer_running: bool,
    pending_deletions: Option<usize>,
    system: SystemInfo,
}

static LAST_CHECK: AtomicI64 = AtomicI64::new(0);
static CACHED_STATUS: Lazy<RwLock<Option<HealthCheckResponse>>> = Lazy::new(|| RwLock::new(None));

fn store_status(result: Result<(), crate::errors::AppError>) -> String {
    match result {
        Ok(()) => "OK".to_string(),
        Err(e) => {
            tracing::warn!("Health check dependency failure: {}", e);
            "Unavailable".to_string()
        }
    }
}

async fn build_health_response(state: &web::Data<AppState>) -> HealthCheckResponse {
    let now_utc = Utc::now();
    let uptime_duration = now_utc.signed_duration_since(*START_TIME);
    let human_uptime = format_duration(Duration::from_secs(uptime_duration.num_seconds().max(0) as u64));

    let mut sys = System::new_all();
    sys.refresh_all();

    let system_info = SystemInfo {
        os: System::name().unwrap_or_else(|| "Unknown".to_string()),
        kernel: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
        hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        cpu_count: sys.cpus().len(),
        memory_total: format!("{:.2} GB", sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0),
    };

    let user_store = store_status(state.repos.users.check_connection().await);
    let blob_store = store_status(state.repos.blobs.check_connection().await);
    let pending_deletions = state.repos.deletions.list_pending().await.ok().map(|p| p.len());

    let process = sysinfo::get_current_pid().ok().and_then(|pid| sys.process(pid));
    let memory_usage = process.map_or("Unknown".to_string(), |p|
        format!("{:.2} MB", p.memory() as f64 / 1024.0 / 1024.0)
    );

    let healthy = user_store == "OK" && blob_store == "OK";

    HealthCheckResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        uptime: human_uptime.to_string(),
        timestamp: now_utc.to_rfc3339(),
        start_at: START_TIME.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        memory_usage,
        user_store,
        blob_store,
        banner: state.banner.status(),
        banner_timer_running: state.banner.is_timer_running(),
        pending_deletions,
        system: system_info,
    }
}

pub async fn admin_health_check(state: web::Data<AppState>) -> impl Responder {
    let now = Utc::now().timestamp();
    let last = LAST_CHECK.load(Ordering::Relaxed);

    if now - last <= CACHE_TTL_SECS {
        if let Some(cached) = CACHED_STATUS.read().clone() {
            return HttpResponse::Ok().json(cached);
        }
    }

    let response = build_health_response(&state).await;
    *CACHED_STATUS.write() = Some(response.clone());
    LAST_CHECK.store(now, Ordering::Relaxed);

    HttpResponse::Ok().json(response)
}
