//! Console handling for the simulator.
//!
//! Everything a running program or the stepper prints goes through a [`Console`],
//! and every command the stepper reads comes from a [`CommandSource`].
//! Program output is kept out of the `log` facade, so that it stays exact.
//!
//! This module includes:
//! - [`StdConsole`] and [`StdinSource`]: the process's standard streams.
//! - [`BufferedConsole`] and [`BufferedSource`]: in-memory buffers, useful for tests and embedding.
//! - [`ChannelConsole`] and [`ChannelSource`]: a threaded/channel implementation.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crossbeam_channel as cbc;

/// A sink for lines of simulator output.
pub trait Console {
    /// Writes a line to the standard output stream.
    fn out(&self, line: &str);

    /// Writes a line to the diagnostic stream.
    fn err(&self, line: &str);

    /// Writes a prompt (which is not followed by a new line).
    fn prompt(&self, prompt: &str);
}
impl dyn Console {} // assert Console is dyn safe

/// A source of stepper commands.
pub trait CommandSource {
    /// Blocks until a command line is available,
    /// returning `None` once the input has ended.
    ///
    /// The returned line does not include its line terminator.
    fn read_command(&mut self) -> Option<String>;
}

/// Console output to the process's stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdConsole;
impl Console for StdConsole {
    fn out(&self, line: &str) {
        println!("{line}");
    }

    fn err(&self, line: &str) {
        eprintln!("{line}");
    }

    fn prompt(&self, prompt: &str) {
        let mut stdout = std::io::stdout().lock();
        // A failed prompt write shouldn't stop the stepper.
        let _ = stdout.write_all(prompt.as_bytes())
            .and_then(|()| stdout.flush());
    }
}

/// Console output which is appended into shared line buffers.
///
/// The buffers can be read in code via [`BufferedConsole::output`] and [`BufferedConsole::errors`].
/// Cloning a `BufferedConsole` shares its buffers, so one clone can be given to the simulator
/// while another is kept to read what was written.
///
/// Prompts are not recorded.
///
/// ```
/// use bytevm::sim::io::{BufferedConsole, Console};
///
/// let console = BufferedConsole::new();
/// let handle = console.clone();
/// console.out("hello");
/// console.err("oh no");
/// assert_eq!(handle.output(), ["hello"]);
/// assert_eq!(handle.errors(), ["oh no"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferedConsole {
    output: Arc<RwLock<Vec<String>>>,
    errors: Arc<RwLock<Vec<String>>>,
}
impl BufferedConsole {
    /// Creates a new BufferedConsole.
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every line written to the output stream so far.
    pub fn output(&self) -> Vec<String> {
        write_guard(&self.output).clone()
    }
    /// A snapshot of every line written to the diagnostic stream so far.
    pub fn errors(&self) -> Vec<String> {
        write_guard(&self.errors).clone()
    }

    /// Empties both buffers.
    pub fn clear(&self) {
        write_guard(&self.output).clear();
        write_guard(&self.errors).clear();
    }
}
impl Console for BufferedConsole {
    fn out(&self, line: &str) {
        write_guard(&self.output).push(line.to_string());
    }

    fn err(&self, line: &str) {
        write_guard(&self.errors).push(line.to_string());
    }

    fn prompt(&self, _prompt: &str) {}
}

/// A poisoned buffer still holds every line written before the panic.
fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// A line sent by a [`ChannelConsole`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConsoleLine {
    /// A line on the standard output stream.
    Out(String),
    /// A line on the diagnostic stream.
    Err(String),
    /// A prompt.
    Prompt(String),
}

/// Console output which is sent through a channel.
///
/// If the receiving end has been dropped, output is discarded.
#[derive(Debug, Clone)]
pub struct ChannelConsole {
    tx: cbc::Sender<ConsoleLine>,
}
impl ChannelConsole {
    /// Creates a new channel console, and the receiver its output can be read from.
    pub fn new() -> (Self, cbc::Receiver<ConsoleLine>) {
        let (tx, rx) = cbc::unbounded();
        (Self { tx }, rx)
    }
}
impl Console for ChannelConsole {
    fn out(&self, line: &str) {
        let _ = self.tx.send(ConsoleLine::Out(line.to_string()));
    }

    fn err(&self, line: &str) {
        let _ = self.tx.send(ConsoleLine::Err(line.to_string()));
    }

    fn prompt(&self, prompt: &str) {
        let _ = self.tx.send(ConsoleLine::Prompt(prompt.to_string()));
    }
}

/// Commands read line-by-line from the process's stdin.
#[derive(Debug, Default)]
pub struct StdinSource;
impl CommandSource for StdinSource {
    fn read_command(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(strip_newline(line)),
            Err(e) => {
                log::error!("failed to read command from stdin: {e}");
                None
            }
        }
    }
}
fn strip_newline(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

/// Commands read from a pre-filled queue.
///
/// Once the queue is empty, the input has ended.
///
/// ```
/// use bytevm::sim::io::{BufferedSource, CommandSource};
///
/// let mut src = BufferedSource::from_iter(["step", "quit"]);
/// assert_eq!(src.read_command().as_deref(), Some("step"));
/// assert_eq!(src.read_command().as_deref(), Some("quit"));
/// assert_eq!(src.read_command(), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BufferedSource {
    lines: VecDeque<String>,
}
impl BufferedSource {
    /// Creates an empty BufferedSource.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of commands left in the queue.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}
impl<S: Into<String>> FromIterator<S> for BufferedSource {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self { lines: iter.into_iter().map(Into::into).collect() }
    }
}
impl CommandSource for BufferedSource {
    fn read_command(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Commands received from a channel.
///
/// Reading blocks until a command is sent.
/// Once every sender has been dropped, the input has ended.
#[derive(Debug, Clone)]
pub struct ChannelSource {
    rx: cbc::Receiver<String>,
}
impl ChannelSource {
    /// Creates a new channel source, and the sender commands can be sent through.
    pub fn new() -> (cbc::Sender<String>, Self) {
        let (tx, rx) = cbc::unbounded();
        (tx, Self { rx })
    }
}
impl CommandSource for ChannelSource {
    fn read_command(&mut self) -> Option<String> {
        self.rx.recv().ok()
    }
}
