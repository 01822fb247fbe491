//! Output builder and handles.

use std::io::Write;
use std::thread::JoinHandle;

use crate::output::actor::WriterActor;
use crate::output::{OutputError, OutputWriter};

/// Default number of queued blocks before senders wait.
const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Builder for the output writer.
pub struct OutputBuilder {
    sink: Box<dyn Write + Send>,
    channel_capacity: usize,
}

impl OutputBuilder {
    /// Write protocol text to `sink`.
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Write protocol text to standard output.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Set the number of blocks queued before senders wait.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Spawn the writer thread and return its handles.
    pub fn build(self) -> Result<OutputHandles, OutputError> {
        let (actor_handle, tx) = WriterActor::spawn(self.sink, self.channel_capacity)?;
        Ok(OutputHandles {
            writer: OutputWriter::new(tx),
            actor_handle: Some(actor_handle),
        })
    }
}

/// Handles to the running output writer.
pub struct OutputHandles {
    /// Cloneable writer handed to every job.
    pub writer: OutputWriter,
    actor_handle: Option<JoinHandle<()>>,
}

impl OutputHandles {
    /// Write every queued block, then stop the writer thread.
    pub async fn shutdown(mut self) -> Result<(), OutputError> {
        // A closed channel means the thread already stopped on its own.
        let _ = self.writer.shutdown().await;

        if let Some(handle) = self.actor_handle.take() {
            tokio::task::spawn_blocking(move || handle.join())
                .await
                .map_err(|e| OutputError::Io(std::io::Error::other(e)))?
                .map_err(|_| OutputError::Io(std::io::Error::other("output thread panicked")))?;
        }
        Ok(())
    }
}

impl Drop for OutputHandles {
    fn drop(&mut self) {
        if self.actor_handle.is_some() {
            self.writer.try_shutdown();
        }
    }
}
