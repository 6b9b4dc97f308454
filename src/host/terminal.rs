use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use anyhow::Result;
use tracing::{debug, info, trace};

use super::{Frontend, HandlerList, Host, RenderHook};

/// Headless host. Keeps the render hooks in a handler list and has nothing to repaint.
#[derive(Debug, Default)]
pub struct TerminalHost {
    render_hooks: HandlerList<RenderHook>,
    redraws: u64,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_hooks(&self) -> usize {
        self.render_hooks.len()
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl Host for TerminalHost {
    fn is_render_hook_registered(&self, hook: RenderHook) -> bool {
        self.render_hooks.contains(&hook)
    }

    fn register_render_hook(&mut self, hook: RenderHook) {
        self.render_hooks.add_if_absent(hook);
    }

    fn unregister_render_hook(&mut self, hook: RenderHook) {
        self.render_hooks.remove_if_present(&hook);
    }

    fn request_redraw(&mut self) {
        self.redraws += 1;
        trace!("Redraw requested");
    }
}

/// Text buffers become files in `texts_dir` and are shown by printing them. The clipboard is the
/// output stream, so `timeme copy | xclip` does what one would expect.
pub struct TerminalFrontend<R, W> {
    texts_dir: PathBuf,
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> TerminalFrontend<R, W> {
    pub fn new(texts_dir: PathBuf, input: R, output: W) -> Self {
        Self {
            texts_dir,
            input,
            output,
            assume_yes: false,
        }
    }

    /// Answers every confirmation with yes without asking.
    pub fn assume_yes(self, assume_yes: bool) -> Self {
        Self { assume_yes, ..self }
    }

    pub fn text_buffer_path(&self, name: &str) -> PathBuf {
        self.texts_dir.join(format!("{name}.txt"))
    }
}

impl<R: BufRead, W: Write> Frontend for TerminalFrontend<R, W> {
    fn show_text_buffer(&mut self, name: &str, text: &str) -> Result<()> {
        std::fs::create_dir_all(&self.texts_dir)?;
        let path = self.text_buffer_path(name);
        std::fs::write(&path, text)?;
        info!("Text buffer {name} written to {path:?}");
        writeln!(self.output, "{text}")?;
        self.output.flush()?;
        Ok(())
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<()> {
        debug!("Copying {} bytes to clipboard", text.len());
        write!(self.output, "{text}")?;
        self.output.flush()?;
        Ok(())
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            debug!("Confirming {prompt:?} without asking");
            return Ok(true);
        }
        write!(self.output, "{prompt} [y/N] ")?;
        self.output.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(is_confirmation(&answer))
    }
}

/// `y` or `yes` in any case. Everything else, including an empty answer, declines.
pub fn is_confirmation(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
