//! Logging initialization.
//!
//! Every binary calls [`init_logging`] once at startup and uses the `tracing`
//! macros everywhere else. Output goes to stderr in compact form and,
//! optionally, to an append-only JSONL file that can be tailed with `jq`.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Append-only file writer shared by every log event.
#[derive(Clone)]
struct JsonlWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl JsonlWriter {
    fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for JsonlWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        // One event per line; flush so `tail -f` sees it immediately.
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for JsonlWriter {
    type Writer = JsonlWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the logging system.
///
/// * `level` - Default level filter, overridden by `RUST_LOG`.
/// * `log_file` - Optional JSONL sink. When it cannot be opened the service
///   keeps running with stderr output only.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(io::stderr)
        .with_filter(env_filter(level));

    let mut file_error = None;
    let json_layer = log_file.and_then(|path| match JsonlWriter::open(path) {
        Ok(writer) => Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_filter(env_filter(level)),
        ),
        Err(e) => {
            file_error = Some((path.display().to_string(), e));
            None
        }
    });

    let installed = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (log_file, file_error) {
        (_, Some((path, error))) => {
            tracing::warn!(path = %path, error = %error, "Log file unavailable, logging to stderr only");
        }
        (Some(path), None) => {
            tracing::debug!(path = %path.display(), "Logging initialized");
        }
        (None, None) => {}
    }
}
