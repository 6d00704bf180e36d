use std::io;
use std::io::Write;
use std::time::Duration;
use std::time::Instant;

use crossterm::cursor;
use crossterm::event;
use crossterm::event::Event as CrossTermEvent;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyModifiers;
use crossterm::execute;
use crossterm::queue;
use crossterm::style;
use crossterm::terminal;
use thiserror::Error;

use ringlife::grid::Grid;
use ringlife::render::Canvas;
use ringlife::simulation::FrameSink;

/// Returned by the terminal sink when the user asks to quit.
#[derive(Debug, Error)]
#[error("Interrupted by user")]
pub struct Quit;

/// Draws every frame to the terminal and waits `interval` between frames.
///
/// Holds the terminal in raw mode on the alternate screen until dropped.
pub struct Terminal {
    stdout: io::Stdout,
    canvas: Canvas,
    interval: Duration,
}

impl Terminal {
    pub fn new(grid: &Grid, interval: Duration) -> io::Result<Self> {
        let mut stdout = io::stdout();

        terminal::enable_raw_mode()?;
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;

        Ok(Self {
            stdout,
            canvas: Canvas::for_grid(grid),
            interval,
        })
    }

    /// Poll for input for as long as `interval`. Returns whether the user asked to quit.
    fn wait(&self) -> io::Result<bool> {
        let start = Instant::now();

        loop {
            let left = self.interval.saturating_sub(start.elapsed());
            if !event::poll(left)? {
                return Ok(false);
            }

            if let Some(Event::Exit) = convert_event(event::read()?) {
                return Ok(true);
            }

            if left.is_zero() {
                return Ok(false);
            }
        }
    }
}

impl FrameSink for Terminal {
    fn frame(&mut self, generation: u64, grid: &Grid) -> anyhow::Result<()> {
        self.canvas.reset();
        self.canvas.draw(grid);
        let text = self.canvas.render();

        queue!(
            self.stdout,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0),
        )?;

        for line in text.lines() {
            queue!(self.stdout, style::Print(line), cursor::MoveToNextLine(1))?;
        }

        queue!(
            self.stdout,
            style::Print(format!(
                "generation {generation}, population {} (q to quit)",
                grid.population()
            )),
        )?;
        self.stdout.flush()?;

        if self.wait()? {
            return Err(Quit.into());
        }

        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // Nothing sensible to do if the terminal can't be restored
        let _ = execute!(self.stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

enum Event {
    Exit,
}

/// Converts a crossterm event into one we care about
fn convert_event(event: CrossTermEvent) -> Option<Event> {
    match event {
        CrossTermEvent::Key(
            KeyEvent {
                code: KeyCode::Char('q'),
                ..
            }
            | KeyEvent {
                code: KeyCode::Esc, ..
            }
            | KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            },
        ) => Some(Event::Exit),
        _ => None,
    }
}
