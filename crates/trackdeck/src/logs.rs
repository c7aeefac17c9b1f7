//! Bridges `tracing` output into the TUI logs modal.
//!
//! Stderr is not usable while the alternate screen is active, so the
//! subscriber writes formatted lines into a channel the UI drains each tick.

use std::io;

use crossbeam_channel::Sender;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
pub(crate) struct LogChannel {
    tx: Sender<String>,
}

impl LogChannel {
    pub(crate) fn new(tx: Sender<String>) -> Self {
        Self { tx }
    }
}

impl<'a> MakeWriter<'a> for LogChannel {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            tx: self.tx.clone(),
        }
    }
}

pub(crate) struct LogWriter {
    tx: Sender<String>,
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines() {
            if !line.trim().is_empty() {
                let _ = self.tx.send(line.to_string());
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::io::Write;

    #[test]
    fn writer_forwards_each_line() {
        let (tx, rx) = unbounded();
        let mut writer = LogChannel::new(tx).make_writer();
        writer.write_all(b"one\ntwo\n\n").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
        assert!(rx.try_recv().is_err());
    }
}
