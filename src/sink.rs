//! Serialized byte sinks. The dump, stat and log outputs are written
//! from every worker thread, so each sink takes a mutex per write.

use log::warn;
use std::fs::File;
use std::io;
use std::io::Write;
use std::sync::Mutex;

/// A mutex-protected writer. A sink that was requested but could not be
/// opened is represented by an empty inner writer that silently
/// discards writes and succeeds on close.
pub struct SerialWriter {
    inner: Mutex<Option<Box<dyn Write + Send>>>,
}

impl SerialWriter {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        SerialWriter {
            inner: Mutex::new(Some(writer)),
        }
    }

    /// A nil-sink that drops everything.
    pub fn discard() -> Self {
        SerialWriter {
            inner: Mutex::new(None),
        }
    }

    /// Open a sink from its config value: empty or `stdout` selects
    /// standard output, anything else names a file to create. A file
    /// that cannot be created degrades to a discarding sink.
    pub fn open(target: &str) -> Self {
        match target {
            "" | "stdout" => SerialWriter::new(Box::new(io::stdout())),
            path => match File::create(path) {
                Ok(file) => SerialWriter::new(Box::new(file)),
                Err(e) => {
                    warn!("cannot open sink {}: {}; output discarded", path, e);
                    SerialWriter::discard()
                }
            },
        }
    }

    pub fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self.inner.lock().unwrap();
        match guard.as_mut() {
            Some(writer) => writer.write_all(bytes),
            None => Ok(()),
        }
    }

    pub fn write_str(&self, s: &str) -> io::Result<()> {
        self.write(s.as_bytes())
    }

    /// Flush and drop the inner writer. Further writes are discarded.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(mut writer) = guard.take() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_discard_accepts_writes() {
        let sink = SerialWriter::discard();
        assert!(sink.write(b"dropped").is_ok());
        sink.close();
        assert!(sink.write(b"after close").is_ok());
    }

    #[test]
    fn test_concurrent_writes_are_atomic_lines() {
        let buffer: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));

        struct Shared(Arc<Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = Arc::new(SerialWriter::new(Box::new(Shared(buffer.clone()))));
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let sink = sink.clone();
                scope.spawn(move || {
                    for i in 0..100 {
                        sink.write_str(&format!("{} {}\n", worker, i)).unwrap();
                    }
                });
            }
        });

        let data = buffer.lock().unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        assert_eq!(text.lines().count(), 400);
        for line in text.lines() {
            assert_eq!(line.split_whitespace().count(), 2);
        }
    }
}
