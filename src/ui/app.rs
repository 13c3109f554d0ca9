//! Timeline viewer state and event loop

use crate::compile::Diagnostic;
use crate::snapshot::{Snapshot, TimelineDelta};
use crate::ui::panes::{GridScroll, TimelinePosition};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Grid,
    Variables,
    Source,
    Log,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: grid -> variables -> log -> source)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Grid => FocusedPane::Variables,
            FocusedPane::Variables => FocusedPane::Log,
            FocusedPane::Log => FocusedPane::Source,
            FocusedPane::Source => FocusedPane::Grid,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Grid => FocusedPane::Source,
            FocusedPane::Variables => FocusedPane::Grid,
            FocusedPane::Log => FocusedPane::Variables,
            FocusedPane::Source => FocusedPane::Log,
        }
    }
}

/// The main application state
pub struct App {
    /// Recorded generations to scrub through
    pub timeline: TimelineDelta,

    /// The program that produced the timeline
    pub source_code: String,

    /// Compile and runtime diagnostics
    pub diagnostics: Vec<Diagnostic>,

    /// Output of `print`
    pub log: Vec<String>,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Frame index under the cursor
    pub position: usize,

    /// Reconstruction of the frame at `position`
    pub current: Option<Snapshot>,

    /// Per-pane scroll offsets
    pub grid_scroll: GridScroll,
    pub variables_scroll: usize,
    pub source_scroll: usize,
    pub log_scroll: usize,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Delay between frames while playing
    pub play_interval: Duration,

    /// Last time a frame was advanced in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    /// Create a viewer positioned on the first frame
    pub fn new(
        timeline: TimelineDelta,
        source_code: String,
        diagnostics: Vec<Diagnostic>,
        log: Vec<String>,
    ) -> Self {
        let current = timeline.reconstruct_snapshot(0);
        let status_message = if timeline.is_empty() {
            String::from("No frames recorded")
        } else {
            String::from("Ready!")
        };
        App {
            timeline,
            source_code,
            diagnostics,
            log,
            focused_pane: FocusedPane::Grid,
            position: 0,
            current,
            grid_scroll: GridScroll::default(),
            variables_scroll: 0,
            source_scroll: 0,
            log_scroll: 0,
            should_quit: false,
            status_message,
            is_playing: false,
            play_interval: Duration::from_millis(200),
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or(Instant::now()),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= self.play_interval {
                if self.seek(self.position + 1) {
                    self.status_message = "Playing...".to_string();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps advancing
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn position(&self) -> TimelinePosition {
        TimelinePosition {
            frame: self.position,
            total: self.timeline.len(),
            memory_usage: self.timeline.memory_usage(),
        }
    }

    /// Move the cursor to frame `index`; false when it does not exist
    pub fn seek(&mut self, index: usize) -> bool {
        match self.timeline.reconstruct_snapshot(index) {
            Some(snapshot) => {
                self.position = index;
                self.current = Some(snapshot);
                true
            }
            None => false,
        }
    }

    /// Render the UI
    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: Grid (top) | Variables (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
            .split(columns[0]);

        // Right column: Source (top) | Output (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(columns[1]);

        if let Some(snapshot) = &self.current {
            super::panes::render_grid_pane(
                frame,
                left_rows[0],
                &snapshot.grid,
                snapshot.step,
                self.focused_pane == FocusedPane::Grid,
                &mut self.grid_scroll,
            );
            super::panes::render_variables_pane(
                frame,
                left_rows[1],
                &snapshot.variables,
                self.focused_pane == FocusedPane::Variables,
                &mut self.variables_scroll,
            );
        } else {
            super::panes::render_grid_pane(
                frame,
                left_rows[0],
                &crate::grid::Grid::new(0, 0),
                0,
                self.focused_pane == FocusedPane::Grid,
                &mut self.grid_scroll,
            );
            super::panes::render_variables_pane(
                frame,
                left_rows[1],
                &indexmap::IndexMap::new(),
                self.focused_pane == FocusedPane::Variables,
                &mut self.variables_scroll,
            );
        }

        super::panes::render_source_pane(
            frame,
            right_rows[0],
            &self.source_code,
            &self.diagnostics,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        super::panes::render_log_pane(
            frame,
            right_rows[1],
            &self.log,
            &self.diagnostics,
            self.focused_pane == FocusedPane::Log,
            &mut self.log_scroll,
        );

        super::panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            self.position(),
            self.diagnostics.iter().any(Diagnostic::is_error),
            self.is_playing,
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            // Number keys step forward N frames directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1) as usize;
                let start = self.position;
                for _ in 0..n {
                    if !self.seek(self.position + 1) {
                        break;
                    }
                }
                self.status_message =
                    format!("Stepped forward {} frame(s)", self.position - start);
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Up => self.scroll(-1),
            KeyCode::Down => self.scroll(1),
            KeyCode::Char('h') if self.focused_pane == FocusedPane::Grid => {
                self.grid_scroll.column = self.grid_scroll.column.saturating_sub(1);
            }
            KeyCode::Char('l') if self.focused_pane == FocusedPane::Grid => {
                self.grid_scroll.column = self.grid_scroll.column.saturating_add(1);
            }
            KeyCode::Char(' ') => {
                // Toggle auto-play (200ms debounce against key repeat)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(self.play_interval)
                            .unwrap_or(Instant::now());
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::End | KeyCode::Enter => {
                self.is_playing = false;
                if self.seek(self.timeline.len().saturating_sub(1)) {
                    self.status_message = "Jumped to end".to_string();
                }
            }
            KeyCode::Home | KeyCode::Backspace => {
                self.is_playing = false;
                if self.seek(0) {
                    self.status_message = "Jumped to start".to_string();
                }
            }
            _ => {}
        }
    }

    fn scroll(&mut self, delta: isize) {
        let offset = match self.focused_pane {
            FocusedPane::Grid => &mut self.grid_scroll.row,
            FocusedPane::Variables => &mut self.variables_scroll,
            FocusedPane::Source => &mut self.source_scroll,
            FocusedPane::Log => &mut self.log_scroll,
        };
        *offset = offset.saturating_add_signed(delta);
    }

    fn step_forward(&mut self) {
        if self.seek(self.position + 1) {
            self.status_message = "Stepped forward".to_string();
        } else {
            self.status_message = "Cannot step forward: at the last frame".to_string();
        }
    }

    fn step_backward(&mut self) {
        let moved = self.position > 0 && self.seek(self.position - 1);
        if moved {
            self.status_message = "Stepped backward".to_string();
        } else {
            self.status_message = "Cannot step backward: at the first frame".to_string();
        }
    }
}
