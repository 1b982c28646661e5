//! Per-image decision events and the sinks that record them.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use time::{macros::format_description, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Predominant(String),
    LowRatio(String),
    DecodeFailed(String),
}

impl Event {
    pub fn level(&self) -> &'static str {
        match self {
            Event::Predominant(_) | Event::LowRatio(_) => "INFO",
            Event::DecodeFailed(_) => "WARNING",
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Event::Predominant(name) | Event::LowRatio(name) | Event::DecodeFailed(name) => name,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Predominant(name) => write!(f, "Predominant face detected in: {}", name),
            Event::LowRatio(name) => write!(f, "Low face ratio in: {}", name),
            Event::DecodeFailed(name) => write!(f, "Failed to decode: {}", name),
        }
    }
}

pub trait EventSink {
    fn record(&mut self, event: &Event) -> Result<()>;
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn record(&mut self, event: &Event) -> Result<()> {
        (**self).record(event)
    }
}

/// Keeps events in memory.
impl EventSink for Vec<Event> {
    fn record(&mut self, event: &Event) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

/// Writes `<timestamp>:<LEVEL>:<message>` lines and optionally echoes the bare
/// message to stdout.
pub struct LogSink<W: Write> {
    writer: W,
    echo: bool,
}

impl<W: Write> LogSink<W> {
    pub fn new(writer: W, echo: bool) -> Self {
        Self { writer, echo }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LogSink<File> {
    /// Open `path` for appending, creating it if needed. Echo is on.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        Ok(Self::new(file, true))
    }
}

impl<W: Write> EventSink for LogSink<W> {
    fn record(&mut self, event: &Event) -> Result<()> {
        writeln!(self.writer, "{}:{}:{}", timestamp()?, event.level(), event)
            .context("writing event log")?;
        self.writer.flush().context("flushing event log")?;
        if self.echo {
            println!("{}", event);
        }
        Ok(())
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `2024-05-01 13:07:42,118`
fn timestamp() -> Result<String> {
    let format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second],[subsecond digits:3]");
    Ok(now().format(&format)?)
}
