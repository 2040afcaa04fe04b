//! Human-readable run log written off the search thread.
//!
//! Lines go through a bounded channel to a dedicated writer thread. Logging
//! never blocks the search: when the queue is full the line is dropped and
//! counted. Shutdown sends a stop sentinel and joins the writer, which has
//! flushed every line queued before it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread;

use log::warn;

/// Messages for the writer thread.
#[derive(Debug)]
enum LogMessage {
    Line(String),
    /// Write the final marker, flush and exit.
    Stop,
}

/// Handle to a run's log file.
pub struct RunLogger {
    sender: SyncSender<LogMessage>,
    writer_handle: Option<thread::JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
    path: PathBuf,
}

impl RunLogger {
    /// `{output_dir}/{test_name}/Logs/tensornas_{test_name}.log`
    pub fn path_for(output_dir: &Path, test_name: &str) -> PathBuf {
        output_dir
            .join(test_name)
            .join("Logs")
            .join(format!("tensornas_{test_name}.log"))
    }

    /// Start the writer thread. The file is created by the writer; if that
    /// fails it warns and discards lines instead of failing the run.
    pub fn new(output_dir: &Path, test_name: &str, capacity: usize) -> std::io::Result<Self> {
        let path = Self::path_for(output_dir, test_name);
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));

        let writer_path = path.clone();
        let writer_handle = thread::Builder::new()
            .name("tensornas-log".to_string())
            .spawn(move || write_lines(&writer_path, receiver))?;

        Ok(Self {
            sender,
            writer_handle: Some(writer_handle),
            dropped: Arc::new(AtomicU64::new(0)),
            path,
        })
    }

    /// Queue a line without blocking.
    pub fn log(&self, line: impl Into<String>) {
        match self.sender.try_send(LogMessage::Line(line.into())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Lines discarded so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the writer after it drains the queue. Returns the number of
    /// dropped lines.
    pub fn shutdown(mut self) -> u64 {
        self.stop();
        self.dropped()
    }

    fn stop(&mut self) {
        if let Some(handle) = self.writer_handle.take() {
            let _ = self.sender.send(LogMessage::Stop);
            let _ = handle.join();
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.stop();
    }
}

fn write_lines(path: &Path, receiver: Receiver<LogMessage>) {
    let file = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| File::create(path));

    let mut out = match file {
        Ok(f) => Some(BufWriter::new(f)),
        Err(err) => {
            warn!("Run log {} unavailable: {err}", path.display());
            None
        }
    };

    while let Ok(message) = receiver.recv() {
        let (line, last) = match message {
            LogMessage::Line(line) => (line, false),
            LogMessage::Stop => ("STOP".to_string(), true),
        };
        if let Some(w) = out.as_mut()
            && let Err(err) = writeln!(w, "{line}").and_then(|()| w.flush())
        {
            warn!("Run log write failed, disabling: {err}");
            out = None;
        }
        if last {
            break;
        }
    }
}
