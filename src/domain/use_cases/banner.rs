use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::{runtime::Handle, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    entities::banner::{Banner, BannerStatus},
    errors::AppError,
};

enum Slot {
    Empty,
    Active {
        banner: Banner,
        generation: u64,
        timer: Option<JoinHandle<()>>,
    },
    Expired {
        at: DateTime<Utc>,
    },
}

struct State {
    slot: Slot,
    next_generation: u64,
}

struct Inner {
    state: RwLock<State>,
}

impl Inner {
    /// Clears the slot if it still holds `generation`. Stale timers are no-ops.
    fn expire(&self, generation: u64) {
        let mut state = self.state.write();
        match &state.slot {
            Slot::Active { generation: current, banner, .. } if *current == generation => {
                info!(kind = %banner.kind, expires_at = %banner.expires_at, "Banner expired");
                state.slot = Slot::Expired { at: Utc::now() };
            }
            _ => debug!(generation, "Ignoring stale banner timer"),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Slot::Active { timer: Some(timer), .. } = &self.state.get_mut().slot {
            timer.abort();
        }
    }
}

/// Owns the single process-wide banner and its expiration timer.
///
/// Reads never mutate the slot; only `replace`, `delete` and the timer do.
#[derive(Clone)]
pub struct BannerManager {
    inner: Arc<Inner>,
}

impl Default for BannerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BannerManager {
    pub fn new() -> Self {
        BannerManager {
            inner: Arc::new(Inner {
                state: RwLock::new(State {
                    slot: Slot::Empty,
                    next_generation: 0,
                }),
            }),
        }
    }

    /// Returns the active banner, or `NotFound` when none is set or it has expired.
    pub fn get_current(&self) -> Result<Banner, AppError> {
        let state = self.inner.state.read();
        match &state.slot {
            Slot::Active { banner, .. } if !banner.is_expired_at(Utc::now()) => Ok(banner.clone()),
            Slot::Active { .. } | Slot::Expired { .. } => {
                Err(AppError::NotFound("banner has expired".into()))
            }
            Slot::Empty => Err(AppError::NotFound("no active banner".into())),
        }
    }

    /// Validates `banner`, then atomically cancels the previous timer and installs it.
    pub fn replace(&self, banner: Banner) -> Result<Banner, AppError> {
        let now = Utc::now();
        banner.validate(now)?;

        let mut state = self.inner.state.write();
        if let Slot::Active { timer: Some(timer), .. } = &state.slot {
            timer.abort();
        }

        state.next_generation += 1;
        let generation = state.next_generation;

        let remaining = banner.expires_at - Utc::now();
        if remaining <= chrono::Duration::zero() {
            warn!(generation, "Banner expired before it could be scheduled");
            state.slot = Slot::Expired { at: Utc::now() };
            return Ok(banner);
        }

        let timer = self.spawn_countdown(generation, remaining);
        info!(kind = %banner.kind, expires_at = %banner.expires_at, generation, "Banner installed");
        state.slot = Slot::Active {
            banner: banner.clone(),
            generation,
            timer,
        };

        Ok(banner)
    }

    /// Removes the banner and cancels its timer. Idempotent.
    pub fn delete(&self) {
        let mut state = self.inner.state.write();
        if let Slot::Active { timer: Some(timer), .. } = &state.slot {
            timer.abort();
        }
        if !matches!(state.slot, Slot::Empty) {
            info!("Banner deleted");
        }
        state.slot = Slot::Empty;
    }

    pub fn is_timer_running(&self) -> bool {
        let state = self.inner.state.read();
        matches!(&state.slot, Slot::Active { timer: Some(timer), .. } if !timer.is_finished())
    }

    pub fn status(&self) -> BannerStatus {
        match &self.inner.state.read().slot {
            Slot::Empty => BannerStatus::Empty,
            Slot::Active { .. } => BannerStatus::Active,
            Slot::Expired { .. } => BannerStatus::Expired,
        }
    }

    /// When the last banner expired, if the slot is in the expired state.
    pub fn expired_at(&self) -> Option<DateTime<Utc>> {
        match &self.inner.state.read().slot {
            Slot::Expired { at } => Some(*at),
            _ => None,
        }
    }

    fn spawn_countdown(&self, generation: u64, remaining: chrono::Duration) -> Option<JoinHandle<()>> {
        let Ok(handle) = Handle::try_current() else {
            warn!(generation, "No async runtime; banner expiry is only enforced on read");
            return None;
        };

        let deadline = Instant::now() + remaining.to_std().unwrap_or_default();
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);

        Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = inner.upgrade() {
                inner.expire(generation);
            }
        }))
    }
}
