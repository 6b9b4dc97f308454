//! Contracts the surrounding application must implement so the tracker can live inside it.
//! [Host] covers the hooks the sampler needs while tracking, [Frontend] covers what user facing
//! actions need. [terminal] is the headless implementation used by the command line.

pub mod terminal;

use anyhow::Result;

/// Render lifecycle notifications the tracker subscribes to while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderHook {
    Init,
    Complete,
    Cancel,
}

impl RenderHook {
    pub const ALL: [RenderHook; 3] = [RenderHook::Init, RenderHook::Complete, RenderHook::Cancel];
}

/// What the host should do with an input event after the tracker has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep dispatching the event normally. The tracker never consumes input.
    PassThrough,
    /// Tracking has stopped, the handler can be dropped.
    Finished,
}

/// Hooks used by [crate::tracker::sampler::Sampler]. Registration is not required to be
/// idempotent, callers check membership first.
#[cfg_attr(test, mockall::automock)]
pub trait Host {
    fn is_render_hook_registered(&self, hook: RenderHook) -> bool;

    fn register_render_hook(&mut self, hook: RenderHook);

    fn unregister_render_hook(&mut self, hook: RenderHook);

    /// Asks the host to repaint anything showing category totals.
    fn request_redraw(&mut self);
}

/// Services used by user facing actions.
#[cfg_attr(test, mockall::automock)]
pub trait Frontend {
    /// Writes `text` into the named text buffer, creating it if needed, and shows it.
    fn show_text_buffer(&mut self, name: &str, text: &str) -> Result<()>;

    fn copy_to_clipboard(&mut self, text: &str) -> Result<()>;

    /// Asks the user to confirm an irreversible action.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Ordered handler list with membership checks on every change, mirroring how hosts keep
/// callback lists.
#[derive(Debug)]
pub struct HandlerList<T> {
    handlers: Vec<T>,
}

impl<T> Default for HandlerList<T> {
    fn default() -> Self {
        Self { handlers: vec![] }
    }
}

impl<T: PartialEq> HandlerList<T> {
    pub fn contains(&self, handler: &T) -> bool {
        self.handlers.contains(handler)
    }

    /// Returns false if the handler was already present.
    pub fn add_if_absent(&mut self, handler: T) -> bool {
        if self.contains(&handler) {
            return false;
        }
        self.handlers.push(handler);
        true
    }

    /// Returns false if the handler wasn't present.
    pub fn remove_if_present(&mut self, handler: &T) -> bool {
        match self.handlers.iter().position(|v| v == handler) {
            Some(index) => {
                self.handlers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
