//! Render loop
//!
//! Polls the dispatcher every `poll_interval_ms`, drains everything queued
//! into the frame table and redraws once per poll, when something arrived,
//! a highlight expired or the terminal was resized. In the log view every
//! update is printed as it is drained instead.
//!
//! The wait between polls doubles as the keyboard poll: `q` quits.

use std::fmt::Display;
use std::io::Write;
use std::time::Duration;

use canlink_core::config::{MonitorSettings, Radix, View};
use canlink_core::FrameUpdate;
use canlink_display::{log_line, FieldFormat, FrameTable};
use tracing::{debug, info};

use crate::channels::Dispatcher;
use crate::error::MonitorError;
use crate::tasks::tick::Clock;
use crate::terminal::{control_for, Control, Input, TerminalBackend};

/// Where drained updates go
pub enum Presenter<W: Write> {
    /// Redrawn table
    Table(TerminalBackend<W>),
    /// One line per update
    Log(W),
}

impl<W: Write> Presenter<W> {
    /// Presenter for `view`; `size` is only used by the table
    pub fn new(view: View, out: W, size: (u16, u16)) -> Self {
        match view {
            View::Table => Presenter::Table(TerminalBackend::new(out, size.0, size.1)),
            View::Log => Presenter::Log(out),
        }
    }
}

/// Why the render loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The ingest thread has stopped and everything it sent was shown
    IngestDone,
    /// The user quit while ingest was still running
    Quit,
}

/// State carried between polls
pub struct Renderer<K, F, W: Write> {
    table: FrameTable<K, F>,
    presenter: Presenter<W>,
    radix: Radix,
    /// Highlighted fields at the last redraw
    shown_highlights: usize,
    /// Redraw on the next poll regardless of changes
    stale_view: bool,
}

impl<K, F, W> Renderer<K, F, W>
where
    K: Ord + Display,
    F: FieldFormat,
    W: Write,
{
    pub fn new(settings: &MonitorSettings, presenter: Presenter<W>) -> Self {
        Self {
            table: FrameTable::new(settings.staleness_window_ms),
            presenter,
            radix: settings.format,
            shown_highlights: 0,
            stale_view: false,
        }
    }

    /// Frame table as of the last poll
    pub fn table(&self) -> &FrameTable<K, F> {
        &self.table
    }

    /// Prepare the terminal (table view only)
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if let Presenter::Table(backend) = &mut self.presenter {
            backend.init()?;
        }
        Ok(())
    }

    /// Give the terminal back
    ///
    /// Also happens on drop; call it explicitly before `process::exit`.
    pub fn shutdown(&mut self) {
        if let Presenter::Table(backend) = &mut self.presenter {
            let _ = backend.restore();
        }
    }

    /// Adopt a new terminal size and redraw on the next poll
    pub fn resize(&mut self, cols: u16, rows: u16) {
        if let Presenter::Table(backend) = &mut self.presenter {
            debug!("Terminal resized to {}x{}", cols, rows);
            backend.resize(cols, rows);
            self.stale_view = true;
        }
    }

    /// True when the view stays up after ingest ends, until the user quits
    fn holds_view(&self) -> bool {
        matches!(self.presenter, Presenter::Table(_))
    }

    /// Drain the dispatcher and redraw if needed
    ///
    /// Returns the number of updates drained.
    pub fn poll(
        &mut self,
        dispatcher: &Dispatcher<FrameUpdate<K, F>>,
        now_ms: u64,
    ) -> Result<usize, MonitorError> {
        let mut drained = 0;
        while let Some(update) = dispatcher.try_next() {
            if let Presenter::Log(out) = &mut self.presenter {
                writeln!(out, "{}", log_line(&update, self.radix))?;
            }
            self.table.apply(update);
            drained += 1;
        }

        match &mut self.presenter {
            Presenter::Table(backend) => {
                let highlighted = self.table.highlighted_count(now_ms);
                if drained > 0 || highlighted != self.shown_highlights || self.stale_view {
                    self.table.render(backend, self.radix, now_ms)?;
                    self.shown_highlights = highlighted;
                    self.stale_view = false;
                }
            }
            Presenter::Log(out) => out.flush()?,
        }

        Ok(drained)
    }
}

/// Run the render loop
///
/// The queue is drained one final time after `ingest_done` reports the
/// producer has stopped, so nothing it dispatched is lost. The log view
/// returns right after that; an interactive table view stays up until the
/// user quits.
pub fn render_loop<K, F, W, C>(
    dispatcher: &Dispatcher<FrameUpdate<K, F>>,
    renderer: &mut Renderer<K, F, W>,
    settings: &MonitorSettings,
    clock: &C,
    input: &mut dyn Input,
    ingest_done: impl Fn() -> bool,
) -> Result<LoopExit, MonitorError>
where
    K: Ord + Display,
    F: FieldFormat,
    W: Write,
    C: Clock,
{
    info!("Render loop started");
    renderer.start()?;

    let interval = Duration::from_millis(settings.poll_interval_ms);
    let mut finished = false;
    loop {
        // Checked before draining so the final drain sees everything
        let done = ingest_done();

        let drained = renderer.poll(dispatcher, clock.now_ms())?;
        if drained > 0 {
            debug!("Drained {} updates, {} rows", drained, renderer.table().len());
        }

        if done && !finished {
            finished = true;
            info!("Ingest finished, {} identifiers seen", renderer.table().len());
            if !(renderer.holds_view() && input.interactive()) {
                return Ok(LoopExit::IngestDone);
            }
        }

        if let Some(event) = input.wait(interval)? {
            match control_for(&event) {
                Some(Control::Quit) if finished => return Ok(LoopExit::IngestDone),
                Some(Control::Quit) => return Ok(LoopExit::Quit),
                Some(Control::Resize(cols, rows)) => renderer.resize(cols, rows),
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::NoInput;
    use canlink_core::BinaryUpdate;
    use canlink_display::DisplayBackend;
    use canlink_protocol::FrameId;
    use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::io;

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u64 {
            self.0
        }
    }

    /// Replays canned events, then quits
    struct ScriptedInput(VecDeque<Option<Event>>);

    impl Input for ScriptedInput {
        fn interactive(&self) -> bool {
            true
        }

        fn wait(&mut self, _timeout: Duration) -> io::Result<Option<Event>> {
            Ok(self.0.pop_front().unwrap_or_else(|| Some(quit_key())))
        }
    }

    fn quit_key() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE))
    }

    fn update(id: u64, data: &[u8], mask: &[bool], at: u64) -> BinaryUpdate {
        FrameUpdate {
            key: FrameId::standard(id),
            data: data.to_vec(),
            mask: mask.to_vec(),
            timestamp_ms: at,
        }
    }

    fn log_output(renderer: &Renderer<FrameId, u8, Vec<u8>>) -> String {
        match &renderer.presenter {
            Presenter::Log(out) => String::from_utf8(out.clone()).unwrap(),
            Presenter::Table(_) => panic!("expected log view"),
        }
    }

    fn table_backend(renderer: &Renderer<FrameId, u8, Vec<u8>>) -> &TerminalBackend<Vec<u8>> {
        match &renderer.presenter {
            Presenter::Table(backend) => backend,
            Presenter::Log(_) => panic!("expected table view"),
        }
    }

    fn table_output_len(renderer: &Renderer<FrameId, u8, Vec<u8>>) -> usize {
        table_backend(renderer).writer().len()
    }

    fn table_output(renderer: &Renderer<FrameId, u8, Vec<u8>>) -> String {
        String::from_utf8_lossy(table_backend(renderer).writer()).into_owned()
    }

    #[test]
    fn test_log_view_prints_each_update() {
        let settings = MonitorSettings {
            view: View::Log,
            ..MonitorSettings::default()
        };
        let dispatcher = Dispatcher::new();
        dispatcher.try_dispatch(update(0x123, &[0x80, 0x01], &[true, false], 0)).unwrap();
        dispatcher.try_dispatch(update(0x123, &[0x80, 0x02], &[false, true], 5)).unwrap();

        let mut renderer = Renderer::new(&settings, Presenter::new(View::Log, Vec::new(), (80, 24)));
        assert_eq!(renderer.poll(&dispatcher, 10).unwrap(), 2);

        let out = log_output(&renderer);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["     123 [2] 80* 01", "     123 [2] 80 02*"]);
        assert_eq!(renderer.table().len(), 1);
    }

    #[test]
    fn test_table_redraws_on_update_and_decay_only() {
        let settings = MonitorSettings::default();
        let dispatcher = Dispatcher::new();
        let mut renderer =
            Renderer::new(&settings, Presenter::new(View::Table, Vec::new(), (40, 10)));

        dispatcher.try_dispatch(update(0x100, &[1], &[true], 0)).unwrap();
        renderer.poll(&dispatcher, 0).unwrap();
        let after_update = table_output_len(&renderer);
        assert!(after_update > 0);

        // Nothing new, highlight still fresh
        renderer.poll(&dispatcher, 1_000).unwrap();
        assert_eq!(table_output_len(&renderer), after_update);

        // Highlight expired
        renderer.poll(&dispatcher, 2_001).unwrap();
        let after_decay = table_output_len(&renderer);
        assert!(after_decay > after_update);

        renderer.poll(&dispatcher, 5_000).unwrap();
        assert_eq!(table_output_len(&renderer), after_decay);
    }

    #[test]
    fn test_render_loop_final_drain() {
        let settings = MonitorSettings {
            view: View::Log,
            poll_interval_ms: 1,
            ..MonitorSettings::default()
        };
        let dispatcher = Dispatcher::new();
        let mut renderer = Renderer::new(&settings, Presenter::new(View::Log, Vec::new(), (80, 24)));

        let polls = Cell::new(0);
        let ingest_done = || {
            polls.set(polls.get() + 1);
            if polls.get() == 2 {
                // Producer queues one last update as it stops
                dispatcher.try_dispatch(update(0x7FF, &[0xAA], &[true], 0)).unwrap();
                return true;
            }
            false
        };

        let exit = render_loop(
            &dispatcher,
            &mut renderer,
            &settings,
            &FixedClock(0),
            &mut NoInput,
            ingest_done,
        )
        .unwrap();
        assert_eq!(exit, LoopExit::IngestDone);
        assert_eq!(log_output(&renderer), "     7FF [1] AA*\n");
    }

    #[test]
    fn test_quit_key_while_ingest_runs() {
        let settings = MonitorSettings::default();
        let dispatcher: Dispatcher<BinaryUpdate> = Dispatcher::new();
        let mut renderer =
            Renderer::new(&settings, Presenter::new(View::Table, Vec::new(), (40, 10)));
        let mut input = ScriptedInput(VecDeque::from([
            Some(Event::Resize(30, 5)),
            Some(quit_key()),
        ]));

        let exit = render_loop(
            &dispatcher,
            &mut renderer,
            &settings,
            &FixedClock(0),
            &mut input,
            || false,
        )
        .unwrap();

        assert_eq!(exit, LoopExit::Quit);
        assert_eq!(table_backend(&renderer).dimensions(), (30, 5));

        renderer.shutdown();
        let out = table_output(&renderer);
        // Alternate screen entered, then cursor shown and screen left
        assert!(out.starts_with("\x1b[?1049h"));
        assert!(out.contains("\x1b[?25h"));
        assert!(out.ends_with("\x1b[?1049l"));
    }

    #[test]
    fn test_resize_forces_redraw() {
        let settings = MonitorSettings::default();
        let dispatcher = Dispatcher::new();
        let mut renderer =
            Renderer::new(&settings, Presenter::new(View::Table, Vec::new(), (40, 10)));

        dispatcher.try_dispatch(update(0x100, &[1], &[true], 0)).unwrap();
        renderer.poll(&dispatcher, 0).unwrap();
        let before = table_output_len(&renderer);

        renderer.resize(20, 4);
        renderer.poll(&dispatcher, 10).unwrap();
        assert!(table_output_len(&renderer) > before);
    }

    #[test]
    fn test_table_stays_up_after_ingest_until_quit() {
        let settings = MonitorSettings::default();
        let dispatcher = Dispatcher::new();
        dispatcher.try_dispatch(update(0x100, &[1], &[true], 0)).unwrap();
        let mut renderer =
            Renderer::new(&settings, Presenter::new(View::Table, Vec::new(), (40, 10)));
        let mut input = ScriptedInput(VecDeque::from([None, None, Some(quit_key())]));

        let exit = render_loop(
            &dispatcher,
            &mut renderer,
            &settings,
            &FixedClock(0),
            &mut input,
            || true,
        )
        .unwrap();

        assert_eq!(exit, LoopExit::IngestDone);
        assert!(input.0.is_empty());
        assert_eq!(renderer.table().len(), 1);
    }
}
