// Redacting writer for tracing-subscriber's fmt layer
use crate::redactor::PiiRedactor;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Wraps another `MakeWriter` so every log line is redacted before it is written.
///
/// The fmt layer asks for a fresh writer per event, writes the whole formatted
/// line into it and drops it, so buffering until flush or drop redacts whole
/// lines at a time.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    redactor: Arc<PiiRedactor>,
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(redactor: Arc<PiiRedactor>, inner: M) -> Self {
        Self { redactor, inner }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a> + 'a,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new(Arc::clone(&self.redactor), self.inner.make_writer())
    }
}

/// Buffers writes and emits the redacted text on flush or drop
pub struct RedactingWriter<W: Write> {
    redactor: Arc<PiiRedactor>,
    buffer: Vec<u8>,
    inner: W,
}

impl<W: Write> RedactingWriter<W> {
    pub fn new(redactor: Arc<PiiRedactor>, inner: W) -> Self {
        Self {
            redactor,
            buffer: Vec::new(),
            inner,
        }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let redacted = self.redactor.redact(&String::from_utf8_lossy(&self.buffer));
            self.buffer.clear();
            self.inner.write_all(redacted.as_bytes())?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        // Nowhere to report a failed log write
        let _ = self.flush();
    }
}
