//! Crawl spinner, plus a log writer that prints above it instead of through it.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

static PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

fn progress() -> &'static MultiProgress {
    PROGRESS.get_or_init(|| {
        let mp = MultiProgress::new();
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        mp
    })
}

/// Spinner counting the pages reported to handlers
pub fn crawl_spinner() -> ProgressBar {
    let spinner = progress().add(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::with_template("{spinner} {pos} pages seen ({elapsed}) {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

// A hidden display (stderr is not a terminal) swallows println
fn emit(line: &str) {
    let line = line.trim_end_matches('\r');
    let mp = progress();
    if mp.is_hidden() || mp.println(line).is_err() {
        eprintln!("{}", line);
    }
}

/// `MakeWriter` for `tracing-subscriber` that routes log lines through the
/// shared progress display
#[derive(Default, Clone)]
pub struct LogWriterFactory;

/// Collects bytes until a full line is available
pub struct LogWriter {
    pending: Vec<u8>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            emit(String::from_utf8_lossy(&line[..end]).as_ref());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            emit(String::from_utf8_lossy(&rest).as_ref());
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            pending: Vec::new(),
        }
    }
}
