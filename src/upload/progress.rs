//! Transfer progress rendering
//!
//! A [`Render`] turns byte counts into text; renderers compose by wrapping one
//! another. A [`Display`] pairs a renderer with the sink it prints to and is handed
//! to a transfer as its tick observer. Terminal styling comes from an explicit
//! [`Palette`] value, there is no global colour state.

use crate::common::streams::Tick;
use std::io::Write;

const BAR_WIDTH: usize = 50;

pub trait Render: Send {
    /// Account for `n` more bytes and return the text to print
    fn tick(&mut self, n: u64) -> String;
}

fn fraction(progress: u64, total: u64) -> f64 {
    if total == 0 {
        1.0
    } else {
        progress as f64 / total as f64
    }
}

/// Fixed-width bar of `filled` and `unfilled` cells
pub fn bar(progress: u64, total: u64, filled: &str, unfilled: &str) -> String {
    let cells = ((BAR_WIDTH as f64 * fraction(progress, total)) as usize).min(BAR_WIDTH);
    format!("{}{}", filled.repeat(cells), unfilled.repeat(BAR_WIDTH - cells))
}

#[derive(Debug, Clone)]
pub struct Bar {
    filled: String,
    unfilled: String,
    length: u64,
    progress: u64,
}

impl Bar {
    pub fn new(filled: impl Into<String>, unfilled: impl Into<String>, length: u64) -> Self {
        Self {
            filled: filled.into(),
            unfilled: unfilled.into(),
            length,
            progress: 0,
        }
    }
}

impl Render for Bar {
    fn tick(&mut self, n: u64) -> String {
        self.progress += n;
        bar(self.progress, self.length, &self.filled, &self.unfilled)
    }
}

#[derive(Debug, Clone)]
pub struct Percentage {
    total: u64,
    progress: u64,
}

impl Percentage {
    pub fn new(total: u64) -> Self {
        Self { total, progress: 0 }
    }
}

impl Render for Percentage {
    fn tick(&mut self, n: u64) -> String {
        self.progress += n;
        format!("{:>6.2}%", fraction(self.progress, self.total) * 100.0)
    }
}

/// Cycles through `states`, one per tick
#[derive(Debug, Clone)]
pub struct Spinner {
    states: Vec<String>,
    ticks: usize,
}

impl Spinner {
    pub fn new<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            states: states.into_iter().map(Into::into).collect(),
            ticks: 0,
        }
    }
}

impl Render for Spinner {
    fn tick(&mut self, _n: u64) -> String {
        if self.states.is_empty() {
            return String::new();
        }
        self.ticks += 1;
        self.states[self.ticks % self.states.len()].clone()
    }
}

#[derive(Debug, Clone)]
pub struct Static(pub String);

impl Render for Static {
    fn tick(&mut self, _n: u64) -> String {
        self.0.clone()
    }
}

/// Concatenates the output of every inner renderer, all ticked with the same count
pub struct Many(pub Vec<Box<dyn Render>>);

impl Render for Many {
    fn tick(&mut self, n: u64) -> String {
        self.0.iter_mut().map(|r| r.tick(n)).collect()
    }
}

/// Forwards accumulated ticks only once at least `min_tick` bytes are pending,
/// on the first tick, or when the total is reached
pub struct MinTick {
    inner: Box<dyn Render>,
    total: u64,
    min_tick: u64,
    progress: u64,
    pending: u64,
    has_ticked: bool,
}

impl MinTick {
    pub fn new(inner: Box<dyn Render>, total: u64, min_tick: u64) -> Self {
        Self {
            inner,
            total,
            min_tick,
            progress: 0,
            pending: 0,
            has_ticked: false,
        }
    }
}

impl Render for MinTick {
    fn tick(&mut self, n: u64) -> String {
        self.pending += n;
        self.progress += n;

        if self.has_ticked && self.pending < self.min_tick && self.progress != self.total {
            return String::new();
        }

        self.has_ticked = true;
        let pending = std::mem::take(&mut self.pending);
        self.inner.tick(pending)
    }
}

/// Renders `display` instead of the inner renderer once the total is reached
pub struct OnFinalTick {
    inner: Box<dyn Render>,
    total: u64,
    display: String,
    progress: u64,
}

impl OnFinalTick {
    pub fn new(inner: Box<dyn Render>, total: u64, display: impl Into<String>) -> Self {
        Self {
            inner,
            total,
            display: display.into(),
            progress: 0,
        }
    }
}

impl Render for OnFinalTick {
    fn tick(&mut self, n: u64) -> String {
        self.progress += n;
        if self.progress >= self.total {
            return self.display.clone();
        }
        self.inner.tick(n)
    }
}

/// Emits a newline once the total is reached
#[derive(Debug, Clone)]
pub struct NewLineAtFinal {
    total: u64,
    progress: u64,
}

impl NewLineAtFinal {
    pub fn new(total: u64) -> Self {
        Self { total, progress: 0 }
    }
}

impl Render for NewLineAtFinal {
    fn tick(&mut self, n: u64) -> String {
        self.progress += n;
        if fraction(self.progress, self.total) >= 1.0 {
            "\n".to_string()
        } else {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canvas {
    Foreground = 38,
    Background = 48,
}

/// 256-colour escape codes. A disabled palette renders every code as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn ansi() -> Self {
        Self { enabled: true }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn color(&self, c: u8, canvas: Canvas) -> String {
        if !self.enabled {
            return String::new();
        }
        format!("\x1b[{}:5:{}m", canvas as u8, c)
    }

    pub fn fg(&self, c: u8) -> String {
        self.color(c, Canvas::Foreground)
    }

    pub fn bg(&self, c: u8) -> String {
        self.color(c, Canvas::Background)
    }

    pub fn reset(&self) -> String {
        self.code("\x1b[0m")
    }

    /// Move to column one and clear the line
    pub fn reset_line(&self) -> String {
        self.code("\x1b[G\x1b[K")
    }

    fn code(&self, code: &str) -> String {
        if self.enabled {
            code.to_string()
        } else {
            String::new()
        }
    }
}

/// One-line transfer indicator: `name [bar] percentage`, redrawn in place at most
/// once per percent, replaced by a done marker and a newline at the end
pub fn transfer(name: &str, total: u64, palette: Palette) -> Box<dyn Render> {
    let line = Many(vec![
        Box::new(Static(format!("{}{:<24} ", palette.reset_line(), name))),
        Box::new(Static(palette.fg(36))),
        Box::new(Bar::new("█", "░", total)),
        Box::new(Static(palette.reset())),
        Box::new(Static(" ".to_string())),
        Box::new(Percentage::new(total)),
    ]);

    let done = format!(
        "{}{:<24} {}done{} ({} bytes)",
        palette.reset_line(),
        name,
        palette.fg(32),
        palette.reset(),
        total
    );

    Box::new(Many(vec![
        Box::new(MinTick::new(
            Box::new(OnFinalTick::new(Box::new(line), total, done)),
            total,
            (total / 100).max(1),
        )),
        Box::new(NewLineAtFinal::new(total)),
    ]))
}

/// A renderer plus the sink it prints to
///
/// Writes to the sink are best effort: a write or flush error is ignored and the
/// transfer being observed carries on.
pub struct Display<W> {
    render: Box<dyn Render>,
    sink: W,
    started: bool,
}

impl<W: Write> Display<W> {
    pub fn new(render: Box<dyn Render>, sink: W) -> Self {
        Self {
            render,
            sink,
            started: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Tick for Display<W> {
    fn tick(&mut self, n: u64) {
        // End-of-stream reads report zero bytes and would redraw the final line.
        if n == 0 && self.started {
            return;
        }
        self.started = true;

        let text = self.render.tick(n);
        if text.is_empty() {
            return;
        }
        let _ = self.sink.write_all(text.as_bytes());
        let _ = self.sink.flush();
    }
}
