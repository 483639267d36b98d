use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub const LOG_FILE_NAME: &str = "catalog-agent.log";

/// Writes every log line to the log file and, unless suppressed, to stderr.
#[derive(Clone)]
pub struct FileMirrorMakeWriter {
    pub file: Option<Arc<Mutex<File>>>,
    pub mirror_stderr: bool,
}

impl<'a> MakeWriter<'a> for FileMirrorMakeWriter {
    type Writer = FileMirrorWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileMirrorWriter {
            file: self.file.clone(),
            mirror_stderr: self.mirror_stderr,
        }
    }
}

pub struct FileMirrorWriter {
    file: Option<Arc<Mutex<File>>>,
    mirror_stderr: bool,
}

impl Write for FileMirrorWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file {
            let mut f = file.lock().unwrap_or_else(|e| e.into_inner());
            f.write_all(buf)?;
        }
        if self.mirror_stderr {
            std::io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file {
            file.lock().unwrap_or_else(|e| e.into_inner()).flush()?;
        }
        if self.mirror_stderr {
            std::io::stderr().flush()?;
        }
        Ok(())
    }
}

fn open_log_file(dir: &Path) -> Result<(Arc<Mutex<File>>, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
    Ok((Arc::new(Mutex::new(file)), path))
}

/// Install the global subscriber. Level defaults to INFO; `RUST_LOG` overrides it.
///
/// Returns the log file path when one could be opened. A second call is a no-op.
pub fn init_logging(log_dir: Option<&Path>, mirror_stderr: bool) -> Result<Option<PathBuf>> {
    let (file, path) = match log_dir {
        Some(dir) => {
            let (file, path) = open_log_file(dir)?;
            (Some(file), Some(path))
        }
        None => (None, None),
    };

    let make_writer = FileMirrorMakeWriter {
        file,
        mirror_stderr,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    Ok(path)
}
