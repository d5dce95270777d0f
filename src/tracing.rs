use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// Fans log output out to stderr and, once configured, an append-only file.
#[derive(Clone)]
struct SharedWriter {
    file: Arc<Mutex<Option<std::fs::File>>>,
}

struct MultiWriter {
    file: Arc<Mutex<Option<std::fs::File>>>,
}

impl SharedWriter {
    fn new() -> Self {
        Self {
            file: Arc::new(Mutex::new(None)),
        }
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedWriter {
    type Writer = MultiWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiWriter {
            file: self.file.clone(),
        }
    }
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = io::stderr().write(buf)?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.write_all(&buf[..written]);
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
        Ok(())
    }
}

static WRITER: OnceLock<SharedWriter> = OnceLock::new();

pub fn init(log_file: Option<&Path>) {
    let _ = tracing_log::LogTracer::init();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let writer = WRITER.get_or_init(SharedWriter::new).clone();
    set_log_file(log_file);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .try_init();
}

pub fn set_log_file(log_file: Option<&Path>) {
    let Some(writer) = WRITER.get() else {
        return;
    };
    let Ok(mut guard) = writer.file.lock() else {
        return;
    };
    *guard = log_file.and_then(|path| {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let _ = std::fs::create_dir_all(parent);
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });
}
