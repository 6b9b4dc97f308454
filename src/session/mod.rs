//! A session is one open document plus the sampler tracking it. The category store lives on the
//! [Document], so whatever persists the document persists the totals as well.

pub mod storage;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    host::{Dispatch, Frontend, Host},
    tracker::{
        categories::{CategoryStore, ALL_TIME},
        report::{render_report, REPORT_BUFFER},
        sampler::{Sampler, SamplerConfig},
    },
};

const RESET_PROMPT: &str = "Are you sure?";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub categories: CategoryStore,
}

impl Document {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: CategoryStore::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderNotification {
    Init,
    Complete,
    Cancel,
}

/// User facing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Print,
    Copy,
    /// Clears every category. Only happens after the user confirms.
    Reset,
}

pub struct Session<H: Host> {
    document: Document,
    sampler: Sampler<H>,
}

impl<H: Host> Session<H> {
    pub fn new(document: Document, host: H, config: SamplerConfig) -> Self {
        Self {
            document,
            sampler: Sampler::new(host, config),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn sampler(&self) -> &Sampler<H> {
        &self.sampler
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.sampler.start(&mut self.document.categories, now);
    }

    pub fn stop(&mut self) {
        self.sampler.stop();
    }

    /// Commits the time since the last tick. See [`Sampler::flush`].
    pub fn flush(&mut self, now: DateTime<Utc>) -> bool {
        self.sampler.flush(&mut self.document.categories, now)
    }

    pub fn on_event(&mut self, kind: &str) -> Dispatch {
        self.sampler.on_event(kind)
    }

    pub fn on_tick(&mut self, now: DateTime<Utc>) -> bool {
        self.sampler.on_tick(&mut self.document.categories, now)
    }

    pub fn on_render(&mut self, notification: RenderNotification, now: DateTime<Utc>) {
        match notification {
            RenderNotification::Init => self.sampler.on_render_start(now),
            RenderNotification::Complete | RenderNotification::Cancel => self
                .sampler
                .on_render_end(&mut self.document.categories, now),
        }
    }

    /// Replaces the open document the way a host does on load: tracking of the old document stops
    /// before the swap and starts again on the new one. Returns the previous document.
    #[instrument(skip_all, fields(document = %document.name))]
    pub fn load_document(&mut self, document: Document, now: DateTime<Utc>) -> Document {
        self.stop();
        let previous = std::mem::replace(&mut self.document, document);
        self.start(now);
        info!("Loaded document, replacing {}", previous.name);
        previous
    }

    /// Report of the current totals. All time is always part of it, even before tracking started.
    pub fn report(&mut self) -> String {
        self.document.categories.get_or_create(ALL_TIME);
        render_report(&self.document.name, &self.document.categories)
    }

    pub fn perform(
        &mut self,
        action: Action,
        frontend: &mut dyn Frontend,
        now: DateTime<Utc>,
    ) -> Result<()> {
        match action {
            Action::Start => self.start(now),
            Action::Print => frontend.show_text_buffer(REPORT_BUFFER, &self.report())?,
            Action::Copy => frontend.copy_to_clipboard(&self.report())?,
            Action::Reset => {
                if frontend.confirm(RESET_PROMPT)? {
                    self.document.categories.clear_all();
                    info!("Categories of {} were reset", self.document.name);
                } else {
                    info!("Reset was declined");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use crate::{
        host::{terminal::TerminalHost, MockFrontend},
        tracker::{
            categories::{Category, ALL_TIME, RENDER_TIME, WORK_TIME},
            report::REPORT_BUFFER,
            sampler::SamplerConfig,
        },
    };

    use super::{Action, Document, RenderNotification, Session};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + Duration::milliseconds(millis)
    }

    fn session(name: &str) -> Session<TerminalHost> {
        Session::new(
            Document::new(name),
            TerminalHost::new(),
            SamplerConfig::default(),
        )
    }

    fn seconds(session: &Session<TerminalHost>, name: &str) -> Option<f64> {
        session.document().categories.get(name).map(Category::seconds)
    }

    #[test]
    fn test_end_to_end_tracking() {
        let mut session = session("forest");
        session.start(at(0));

        session.on_event("LEFTMOUSE");
        assert!(session.on_tick(at(2000)));
        assert_eq!(seconds(&session, ALL_TIME), Some(2.));
        assert_eq!(seconds(&session, WORK_TIME), Some(2.));

        assert!(session.on_tick(at(3000)));
        assert_eq!(seconds(&session, ALL_TIME), Some(3.));
        assert_eq!(seconds(&session, WORK_TIME), Some(2.));
    }

    #[test]
    fn test_render_complete_and_cancel_are_the_same() {
        let mut session = session("forest");
        session.start(at(0));

        session.on_render(RenderNotification::Init, at(1000));
        session.on_render(RenderNotification::Complete, at(6000));
        session.on_render(RenderNotification::Init, at(7000));
        session.on_render(RenderNotification::Cancel, at(9000));

        assert_eq!(seconds(&session, RENDER_TIME), Some(7.));
    }

    #[test]
    fn test_load_document_restarts_tracking() {
        let mut session = session("first");
        session.start(at(0));
        session.on_event("LEFTMOUSE");
        session.on_tick(at(4000));

        let mut stored = Document::new("second");
        stored.categories.add_seconds(ALL_TIME, 100.);
        let previous = session.load_document(stored, at(10_000));

        assert_eq!(previous.name, "first");
        assert_eq!(previous.categories.get(ALL_TIME).map(Category::seconds), Some(4.));
        assert!(session.sampler().is_running());
        assert!(session.sampler().pending_events().is_empty());
        assert_eq!(session.sampler().host().registered_hooks(), 3);

        assert!(session.on_tick(at(12_000)));
        assert_eq!(seconds(&session, ALL_TIME), Some(102.));
        assert_eq!(seconds(&session, WORK_TIME), None);
    }

    #[test]
    fn test_report_before_tracking() {
        let mut session = session("empty");
        let report = session.report();
        assert!(report.contains("PROJECT: empty"));
        assert!(report.contains("ALL TIME: 0s"));
    }

    #[test]
    fn test_print_and_copy_actions() -> Result<()> {
        let mut session = session("forest");
        session.start(at(0));
        let report = session.report();
        let expected = report.clone();

        let mut frontend = MockFrontend::new();
        frontend
            .expect_show_text_buffer()
            .withf(move |name, text| name == REPORT_BUFFER && text == expected)
            .times(1)
            .returning(|_, _| Ok(()));
        frontend
            .expect_copy_to_clipboard()
            .withf(move |text| text == report)
            .times(1)
            .returning(|_| Ok(()));

        session.perform(Action::Print, &mut frontend, at(100))?;
        session.perform(Action::Copy, &mut frontend, at(100))?;
        Ok(())
    }

    #[test]
    fn test_reset_requires_confirmation() -> Result<()> {
        let mut session = session("forest");
        session.start(at(0));
        session.on_tick(at(5000));

        let mut frontend = MockFrontend::new();
        let mut answers = [false, true].into_iter();
        frontend
            .expect_confirm()
            .times(2)
            .returning(move |_| Ok(answers.next().unwrap_or(false)));

        session.perform(Action::Reset, &mut frontend, at(5000))?;
        assert_eq!(seconds(&session, ALL_TIME), Some(5.));

        session.perform(Action::Reset, &mut frontend, at(5000))?;
        assert!(session.document().categories.is_empty());

        // Tracking goes on after a reset
        assert!(session.on_tick(at(6000)));
        assert_eq!(seconds(&session, ALL_TIME), Some(1.));
        Ok(())
    }

    #[test]
    fn test_failed_sink_is_reported() {
        let mut session = session("forest");
        let mut frontend = MockFrontend::new();
        frontend
            .expect_copy_to_clipboard()
            .returning(|_| Err(anyhow!("clipboard unavailable")));

        assert!(session.perform(Action::Copy, &mut frontend, at(0)).is_err());
    }

    #[test]
    fn test_start_action_is_idempotent() -> Result<()> {
        let mut session = session("forest");
        let mut frontend = MockFrontend::new();
        session.perform(Action::Start, &mut frontend, at(0))?;
        session.perform(Action::Start, &mut frontend, at(900))?;

        assert!(session.on_tick(at(1000)));
        assert_eq!(seconds(&session, ALL_TIME), Some(1.));
        Ok(())
    }
}
