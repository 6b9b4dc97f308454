use std::{io, path::Path};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    host::{
        terminal::{is_confirmation, TerminalFrontend, TerminalHost},
        Dispatch, Frontend, Host,
    },
    session::{
        storage::{DocumentStorage, DocumentStorageImpl},
        Action, Document, RenderNotification, Session,
    },
    tracker::sampler::SamplerConfig,
    utils::{
        clock::{Clock, DefaultClock},
        dir::AppDirs,
        time::project_name,
    },
};

use super::shutdown::detect_shutdown;

#[derive(Debug, Parser)]
pub struct TrackCommand {
    #[arg(
        long,
        short,
        help = "Project name or path to the project file. The report uses the file name without extension"
    )]
    project: String,
    #[arg(
        long = "check-interval",
        default_value_t = 1,
        help = "Seconds between two commits of elapsed time"
    )]
    check_interval: u32,
    #[arg(
        long,
        default_value_t = 10,
        help = "Most seconds of work time a single commit can add"
    )]
    damping: u32,
}

/// Line the host writes to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostMessage {
    Event(String),
    Render(RenderNotification),
    Action(Action),
}

impl HostMessage {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        match line {
            "" => None,
            "RENDER_INIT" => Some(Self::Render(RenderNotification::Init)),
            "RENDER_COMPLETE" => Some(Self::Render(RenderNotification::Complete)),
            "RENDER_CANCEL" => Some(Self::Render(RenderNotification::Cancel)),
            "PRINT" => Some(Self::Action(Action::Print)),
            "COPY" => Some(Self::Action(Action::Copy)),
            "RESET" => Some(Self::Action(Action::Reset)),
            kind => Some(Self::Event(kind.to_string())),
        }
    }
}

/// Command to process `track` command. Tracks the project until stdin closes or Ctrl-C.
pub async fn process_track_command(
    TrackCommand {
        project,
        check_interval,
        damping,
    }: TrackCommand,
    dirs: &AppDirs,
) -> Result<()> {
    let config = SamplerConfig {
        check_interval: Duration::seconds(check_interval.max(1).into()),
        work_time_damping: Duration::seconds(damping.into()),
    };
    let storage = super::document_storage(dirs)?;
    // Confirmations arrive as input lines, the frontend itself never reads
    let frontend = TerminalFrontend::new(dirs.texts(), io::empty(), io::stdout());

    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    let tracking = TrackingLoop::<_, DocumentStorageImpl>::open(
        &project_name(Path::new(&project)),
        TerminalHost::new(),
        config,
        storage,
        Box::new(frontend),
        Box::new(DefaultClock),
        shutdown.clone(),
    )
    .await?;
    let document = tracking
        .run(BufReader::new(tokio::io::stdin()))
        .await?;
    shutdown.cancel();

    info!("Finished tracking {}", document.name);
    Ok(())
}

/// Event loop of the headless host. Feeds input lines and ticks into the session and saves the
/// document when tracking ends. The document stays claimed for the whole run, so one shot actions
/// from other processes can't race with the saves of the loop.
pub struct TrackingLoop<H: Host, S: DocumentStorage> {
    session: Session<H>,
    storage: S,
    claim: S::Claim,
    controls: Controls,
    clock: Box<dyn Clock>,
    shutdown: CancellationToken,
}

/// Frontend for the action lines and whether a `RESET` waits for its answer line.
struct Controls {
    frontend: Box<dyn Frontend>,
    awaiting_reset: bool,
}

impl<H: Host, S: DocumentStorage> TrackingLoop<H, S> {
    /// Claims the project's document and loads it. Fails when the project is already tracked.
    pub async fn open(
        project: &str,
        host: H,
        config: SamplerConfig,
        storage: S,
        frontend: Box<dyn Frontend>,
        clock: Box<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let claim = storage.claim(project).await?;
        let document = storage.load(project).await?;

        Ok(Self {
            session: Session::new(document, host, config),
            storage,
            claim,
            controls: Controls {
                frontend,
                awaiting_reset: false,
            },
            clock,
            shutdown,
        })
    }

    /// Executes the tracking loop. Returns the document as it was saved.
    pub async fn run(self, input: impl AsyncBufRead + Unpin) -> Result<Document> {
        let Self {
            mut session,
            storage,
            claim: _claim,
            mut controls,
            clock,
            shutdown,
        } = self;

        let tick_frequency = session.sampler().config().check_interval.to_std()?;
        let mut lines = input.lines();
        let mut tick_point = clock.instant();

        session.start(clock.time());

        loop {
            tick_point = clock.next_tick(tick_point, tick_frequency);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        return Self::finish(session, &storage, clock.time()).await;
                    }
                    line = lines.next_line() => {
                        let Some(line) = line? else {
                            info!("Input closed");
                            return Self::finish(session, &storage, clock.time()).await;
                        };
                        Self::handle_line(&mut session, &storage, &mut controls, clock.time(), &line)
                            .await;
                    }
                    _ = clock.sleep_until(tick_point) => break,
                }
            }
            if session.on_tick(clock.time()) {
                debug!("Committed tick");
            }
        }
    }

    async fn handle_line(
        session: &mut Session<H>,
        storage: &S,
        controls: &mut Controls,
        now: DateTime<Utc>,
        line: &str,
    ) {
        let Some(message) = HostMessage::parse(line) else {
            return;
        };

        if controls.awaiting_reset {
            controls.awaiting_reset = false;
            if let HostMessage::Event(answer) = &message {
                Self::reset(session, storage, controls, now, is_confirmation(answer)).await;
                return;
            }
            info!("Reset wasn't answered, dropping it");
        }

        match message {
            HostMessage::Event(kind) => {
                if session.on_event(&kind) == Dispatch::Finished {
                    debug!("Tracking isn't running, dropping {kind}");
                }
            }
            HostMessage::Render(notification) => {
                session.on_render(notification, now);
                // Renders are rare and long, good moment to persist
                Self::save(session, storage, "render notification").await;
            }
            HostMessage::Action(Action::Reset) => {
                info!("Reset requested, the next line answers it");
                controls.awaiting_reset = true;
            }
            HostMessage::Action(action) => {
                if let Err(e) = session.perform(action, controls.frontend.as_mut(), now) {
                    error!("Failed to perform {action:?} {e:?}");
                }
            }
        }
    }

    async fn reset(
        session: &mut Session<H>,
        storage: &S,
        controls: &mut Controls,
        now: DateTime<Utc>,
        confirmed: bool,
    ) {
        let mut frontend = AnsweredFrontend {
            inner: controls.frontend.as_mut(),
            answer: confirmed,
        };
        match session.perform(Action::Reset, &mut frontend, now) {
            Ok(()) if confirmed => Self::save(session, storage, "reset").await,
            Ok(()) => {}
            Err(e) => error!("Failed to reset {e:?}"),
        }
    }

    async fn save(session: &Session<H>, storage: &S, reason: &str) {
        let span = info_span!("Saving", reason);
        if let Err(e) = storage.save(session.document()).instrument(span).await {
            error!("Failed to save {} {e:?}", session.document().name);
        }
    }

    async fn finish(mut session: Session<H>, storage: &S, now: DateTime<Utc>) -> Result<Document> {
        if session.flush(now) {
            debug!("Committed the tail of the session");
        }
        session.stop();
        storage
            .save(session.document())
            .await
            .inspect_err(|e| error!("Failed to save on exit {e:?}"))?;
        Ok(session.document().clone())
    }
}

/// Frontend whose confirmation was already answered by an input line.
struct AnsweredFrontend<'a> {
    inner: &'a mut dyn Frontend,
    answer: bool,
}

impl Frontend for AnsweredFrontend<'_> {
    fn show_text_buffer(&mut self, name: &str, text: &str) -> Result<()> {
        self.inner.show_text_buffer(name, text)
    }

    fn copy_to_clipboard(&mut self, text: &str) -> Result<()> {
        self.inner.copy_to_clipboard(text)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        debug!("{prompt} answered with {}", self.answer);
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, time::Duration};

    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};
    use tokio_util::sync::CancellationToken;

    use crate::{
        cli::actions::run_action,
        host::{terminal::TerminalHost, Frontend, MockFrontend},
        session::{
            storage::{DocumentStorage, DocumentStorageImpl},
            Action, Document, RenderNotification,
        },
        tracker::{
            categories::{Category, ALL_TIME, RENDER_TIME, WORK_TIME},
            sampler::SamplerConfig,
        },
        utils::{clock::TestClock, logging::TEST_LOGGING},
    };

    use super::{HostMessage, TrackingLoop};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    async fn open_loop(
        dir: &Path,
        frontend: impl Frontend + 'static,
        shutdown: CancellationToken,
    ) -> Result<TrackingLoop<TerminalHost, DocumentStorageImpl>> {
        TrackingLoop::open(
            "forest",
            TerminalHost::new(),
            SamplerConfig::default(),
            DocumentStorageImpl::new(dir.to_owned())?,
            Box::new(frontend),
            Box::new(TestClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE))),
            shutdown,
        )
        .await
    }

    async fn send_at(writer: &mut DuplexStream, after_millis: u64, line: &str) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(after_millis)).await;
        writer.write_all(format!("{line}\n").as_bytes()).await?;
        Ok(())
    }

    fn assert_seconds(document: &Document, name: &str, expected: f64) {
        let actual = document.categories.get(name).map(Category::seconds);
        assert!(
            actual.is_some_and(|v| (v - expected).abs() < 0.01),
            "{name} is {actual:?}, expected {expected}"
        );
    }

    #[test]
    fn test_host_message_parsing() {
        assert_eq!(HostMessage::parse("  \n"), None);
        assert_eq!(
            HostMessage::parse("LEFTMOUSE\n"),
            Some(HostMessage::Event("LEFTMOUSE".into()))
        );
        assert_eq!(
            HostMessage::parse("RENDER_CANCEL"),
            Some(HostMessage::Render(RenderNotification::Cancel))
        );
        assert_eq!(
            HostMessage::parse("RESET\r\n"),
            Some(HostMessage::Action(Action::Reset))
        );
        assert_eq!(
            HostMessage::parse("reset"),
            Some(HostMessage::Event("reset".into()))
        );
    }

    /// Drives the loop on paused tokio time: one click, one render, then the input closes.
    #[tokio::test(start_paused = true)]
    async fn test_tracking_loop_until_input_closes() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = DocumentStorageImpl::new(dir.path().to_owned())?;
        let tracking = open_loop(dir.path(), MockFrontend::new(), CancellationToken::new()).await?;

        let (mut writer, reader) = tokio::io::duplex(256);
        let feeder = async move {
            send_at(&mut writer, 1500, "LEFTMOUSE").await?;
            send_at(&mut writer, 3000, "RENDER_INIT").await?;
            send_at(&mut writer, 2000, "RENDER_COMPLETE").await?;
            tokio::time::sleep(Duration::from_millis(1000)).await;
            drop(writer);
            anyhow::Ok(())
        };

        let (fed, document) = tokio::join!(feeder, tracking.run(BufReader::new(reader)));
        fed?;
        let document = document?;

        // Seven ticks plus the half second between the last tick and the end of input
        assert_seconds(&document, ALL_TIME, 7.5);
        assert_seconds(&document, WORK_TIME, 1.);
        assert_seconds(&document, RENDER_TIME, 2.);
        assert_eq!(storage.load("forest").await?, document);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracking_loop_stops_on_shutdown() -> Result<()> {
        let dir = tempdir()?;
        let storage = DocumentStorageImpl::new(dir.path().to_owned())?;
        let mut stored = Document::new("forest");
        stored.categories.add_seconds(ALL_TIME, 100.);
        storage.save(&stored).await?;

        let shutdown = CancellationToken::new();
        let tracking = open_loop(dir.path(), MockFrontend::new(), shutdown.clone()).await?;

        // Input never closes, only the shutdown ends the loop
        let (_writer, reader) = tokio::io::duplex(256);
        let (_, document) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(3500)).await;
                shutdown.cancel();
            },
            tracking.run(BufReader::new(reader)),
        );
        let document = document?;

        assert_seconds(&document, ALL_TIME, 103.5);
        assert!(document.categories.get(WORK_TIME).is_none());
        assert_eq!(storage.load("forest").await?, document);
        Ok(())
    }

    /// A reset from another process while the project is tracked must not be silently undone by
    /// the tracker's next save. It is refused instead, and goes through once tracking ended.
    #[tokio::test(start_paused = true)]
    async fn test_reset_from_another_process_while_tracking() -> Result<()> {
        let dir = tempdir()?;
        let storage = DocumentStorageImpl::new(dir.path().to_owned())?;
        let mut stored = Document::new("forest");
        stored.categories.add_seconds(ALL_TIME, 1000.);
        storage.save(&stored).await?;

        let shutdown = CancellationToken::new();
        let tracking = open_loop(dir.path(), MockFrontend::new(), shutdown.clone()).await?;
        assert!(open_loop(dir.path(), MockFrontend::new(), shutdown.clone())
            .await
            .is_err());

        let (_writer, reader) = tokio::io::duplex(256);
        let (refused, document) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                let mut frontend = MockFrontend::new();
                frontend.expect_confirm().never();
                let refused = run_action("forest", Action::Reset, &storage, &mut frontend).await;
                tokio::time::sleep(Duration::from_millis(2000)).await;
                shutdown.cancel();
                refused
            },
            tracking.run(BufReader::new(reader)),
        );
        let document = document?;

        let error = refused.unwrap_err();
        assert!(error.to_string().contains("forest is being tracked"));
        assert_seconds(&document, ALL_TIME, 1003.5);
        assert_eq!(storage.load("forest").await?, document);

        // The claim is gone with the loop
        let mut frontend = MockFrontend::new();
        frontend.expect_confirm().times(1).returning(|_| Ok(true));
        run_action("forest", Action::Reset, &storage, &mut frontend).await?;
        assert!(storage.load("forest").await?.categories.is_empty());
        Ok(())
    }

    /// Actions sent to the running tracker see and change the live totals.
    #[tokio::test(start_paused = true)]
    async fn test_action_lines_use_live_totals() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = DocumentStorageImpl::new(dir.path().to_owned())?;
        let mut stored = Document::new("forest");
        stored.categories.add_seconds(ALL_TIME, 1000.);
        storage.save(&stored).await?;

        let mut frontend = MockFrontend::new();
        frontend
            .expect_show_text_buffer()
            .withf(|name, text| name == "TimeMe" && text.contains("ALL TIME: 16m 42s"))
            .times(1)
            .returning(|_, _| Ok(()));
        frontend
            .expect_copy_to_clipboard()
            .withf(|text| text.contains("ALL TIME: 1s") && !text.contains("16m"))
            .times(1)
            .returning(|_| Ok(()));
        frontend.expect_confirm().never();

        let tracking = open_loop(dir.path(), frontend, CancellationToken::new()).await?;
        let observer = DocumentStorageImpl::new(dir.path().to_owned())?;
        let (mut writer, reader) = tokio::io::duplex(256);
        let feeder = async move {
            // 1000 stored seconds plus two ticks
            send_at(&mut writer, 2500, "PRINT").await?;
            // Declined, the answer line isn't an event
            send_at(&mut writer, 100, "RESET").await?;
            send_at(&mut writer, 100, "n").await?;
            send_at(&mut writer, 100, "RESET").await?;
            send_at(&mut writer, 100, "y").await?;
            tokio::time::sleep(Duration::from_millis(100)).await;
            let after_reset = observer.load("forest").await?;
            // One tick after the reset
            send_at(&mut writer, 500, "COPY").await?;
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(writer);
            anyhow::Ok(after_reset)
        };

        let (after_reset, document) = tokio::join!(feeder, tracking.run(BufReader::new(reader)));
        let after_reset = after_reset?;
        let document = document?;

        assert!(after_reset.categories.is_empty());
        // The tick at 3s after the reset, then the tail up to 3.7s
        assert_seconds(&document, ALL_TIME, 1.7);
        assert!(document.categories.get(WORK_TIME).is_none());
        assert_eq!(storage.load("forest").await?, document);
        Ok(())
    }
}
