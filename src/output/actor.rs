//! Writer actor owning the protocol sink.
//!
//! Single-writer pattern: one thread owns the sink and processes commands
//! from a bounded channel. Each block arrives as one command and is written
//! with a single `write_all`, so blocks from different jobs never interleave.

use std::io::Write;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use crate::output::OutputError;

// =============================================================================
// Commands
// =============================================================================

/// Commands sent to the writer actor.
#[derive(Debug)]
pub enum Command {
    /// Write one complete block and flush it.
    Write(String),
    /// Flush the sink and acknowledge.
    Flush(oneshot::Sender<Result<(), OutputError>>),
    /// Graceful shutdown after every queued block is written.
    Shutdown,
}

// =============================================================================
// Actor
// =============================================================================

/// Sink writer actor.
///
/// The actor stops at the first failed write. Dropping the receiver makes
/// every later send fail, which is how jobs learn the pipe is gone.
pub struct WriterActor {
    sink: Box<dyn Write + Send>,
    rx: mpsc::Receiver<Command>,
}

impl WriterActor {
    /// Spawn the writer thread.
    pub fn spawn(
        sink: Box<dyn Write + Send>,
        channel_capacity: usize,
    ) -> Result<(JoinHandle<()>, mpsc::Sender<Command>), OutputError> {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let mut actor = WriterActor { sink, rx };
        let handle = thread::Builder::new()
            .name("plugind-output".to_string())
            .spawn(move || actor.run())?;
        Ok((handle, tx))
    }

    fn run(&mut self) {
        tracing::debug!("Output writer started");

        while let Some(cmd) = self.rx.blocking_recv() {
            match cmd {
                Command::Write(block) => {
                    if let Err(e) = self.write(&block) {
                        tracing::error!(error = %e, "Output write failed, closing writer");
                        break;
                    }
                }
                Command::Flush(ack) => {
                    let _ = ack.send(self.sink.flush().map_err(OutputError::from));
                }
                Command::Shutdown => {
                    let _ = self.sink.flush();
                    break;
                }
            }
        }

        self.rx.close();
        tracing::debug!("Output writer stopped");
    }

    fn write(&mut self, block: &str) -> std::io::Result<()> {
        self.sink.write_all(block.as_bytes())?;
        self.sink.flush()
    }
}
