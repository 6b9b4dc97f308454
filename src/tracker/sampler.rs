use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    host::{Dispatch, Host, RenderHook},
    utils::time::duration_seconds,
};

use super::{
    categories::{CategoryStore, ALL_TIME, RENDER_TIME, WORK_TIME},
    classify::is_work_interval,
};

const DEFAULT_CHECK_INTERVAL: Duration = Duration::seconds(1);
const DEFAULT_WORK_TIME_DAMPING: Duration = Duration::seconds(10);

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    /// Minimal time between two commits.
    pub check_interval: Duration,
    /// Most work time a single commit can attribute. Keeps a stuck key or a focused but abandoned
    /// window from counting as work for as long as it lasts.
    pub work_time_damping: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            work_time_damping: DEFAULT_WORK_TIME_DAMPING,
        }
    }
}

/// Turns host events into category time. Has two states, stopped and running, and only reacts to
/// events and ticks while running. The category store is passed in on every call, since it
/// belongs to the document rather than the sampler.
pub struct Sampler<H: Host> {
    host: H,
    config: SamplerConfig,
    running: bool,
    last_commit: DateTime<Utc>,
    pending: HashSet<String>,
    render_start: Option<DateTime<Utc>>,
}

impl<H: Host> Sampler<H> {
    pub fn new(host: H, config: SamplerConfig) -> Self {
        Self {
            host,
            config,
            running: false,
            last_commit: DateTime::<Utc>::default(),
            pending: HashSet::new(),
            render_start: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn pending_events(&self) -> &HashSet<String> {
        &self.pending
    }

    pub fn render_start(&self) -> Option<DateTime<Utc>> {
        self.render_start
    }

    pub fn start(&mut self, store: &mut CategoryStore, now: DateTime<Utc>) {
        if self.running {
            debug!("Tracking is already running");
            return;
        }
        store.get_or_create(ALL_TIME);
        self.last_commit = now;
        self.pending.clear();
        self.render_start = None;
        for hook in RenderHook::ALL {
            if !self.host.is_render_hook_registered(hook) {
                self.host.register_render_hook(hook);
            }
        }
        self.running = true;
        info!("Tracking started at {now}");
    }

    pub fn stop(&mut self) {
        if !self.running {
            debug!("Stopping tracking that isn't running");
        }
        self.running = false;
        for hook in RenderHook::ALL {
            if self.host.is_render_hook_registered(hook) {
                self.host.unregister_render_hook(hook);
            }
        }
        self.pending.clear();
        self.render_start = None;
        info!("Tracking stopped");
    }

    pub fn on_event(&mut self, kind: &str) -> Dispatch {
        if !self.running {
            return Dispatch::Finished;
        }
        if !self.pending.contains(kind) {
            trace!("New event kind {kind}");
            self.pending.insert(kind.to_string());
        }
        Dispatch::PassThrough
    }

    /// Commits the time passed since the last commit once a full check interval has gone by.
    /// Returns whether a commit happened.
    #[instrument(skip(self, store))]
    pub fn on_tick(&mut self, store: &mut CategoryStore, now: DateTime<Utc>) -> bool {
        if !self.running || now - self.config.check_interval < self.last_commit {
            return false;
        }
        self.commit(store, now);
        true
    }

    /// Commits whatever elapsed since the last commit, even when it is shorter than the check
    /// interval. Called right before stopping so the tail of a session isn't lost.
    #[instrument(skip(self, store))]
    pub fn flush(&mut self, store: &mut CategoryStore, now: DateTime<Utc>) -> bool {
        if !self.running || now <= self.last_commit {
            return false;
        }
        self.commit(store, now);
        true
    }

    fn commit(&mut self, store: &mut CategoryStore, now: DateTime<Utc>) {
        let elapsed = now - self.last_commit;
        store.add_seconds(ALL_TIME, duration_seconds(elapsed));

        if is_work_interval(self.pending.iter().map(String::as_str)) {
            let credited = elapsed.min(self.config.work_time_damping);
            store.add_seconds(WORK_TIME, duration_seconds(credited));
            debug!("Committed {elapsed} with {credited} of work");
        } else {
            debug!("Committed {elapsed} of idle time");
        }

        self.last_commit = now;
        self.pending.clear();
        self.host.request_redraw();
    }

    pub fn on_render_start(&mut self, now: DateTime<Utc>) {
        if !self.running {
            debug!("Ignoring render start while stopped");
            return;
        }
        self.render_start = Some(now);
    }

    /// Handles both a finished and a cancelled render.
    pub fn on_render_end(&mut self, store: &mut CategoryStore, now: DateTime<Utc>) {
        if !self.running {
            debug!("Ignoring render end while stopped");
            return;
        }
        let Some(render_start) = self.render_start.take() else {
            warn!("Render ended without a recorded start, ignoring");
            return;
        };
        let elapsed = (now - render_start).max(Duration::zero());
        store.add_seconds(RENDER_TIME, duration_seconds(elapsed));
        info!("Render took {elapsed}");
        self.host.request_redraw();
    }
}
