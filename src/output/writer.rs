//! Job-facing handle to the writer actor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};

use crate::output::OutputError;
use crate::output::actor::Command;

/// Cloneable sender of protocol blocks.
///
/// Sending awaits channel capacity instead of dropping: a lost block would
/// leave the parent with a half-declared chart.
#[derive(Clone)]
pub struct OutputWriter {
    tx: mpsc::Sender<Command>,
    blocks: Arc<AtomicU64>,
}

impl std::fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputWriter")
            .field("blocks", &self.blocks_sent())
            .finish_non_exhaustive()
    }
}

impl OutputWriter {
    pub(crate) fn new(tx: mpsc::Sender<Command>) -> Self {
        Self {
            tx,
            blocks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of blocks accepted by the writer across all clones.
    pub fn blocks_sent(&self) -> u64 {
        self.blocks.load(Ordering::Relaxed)
    }

    /// Queue one complete block. Empty blocks are skipped.
    pub async fn write_block(&self, block: String) -> Result<(), OutputError> {
        if block.is_empty() {
            return Ok(());
        }
        self.tx
            .send(Command::Write(block))
            .await
            .map_err(|_| OutputError::ChannelClosed)?;
        self.blocks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Wait until every block queued before this call has reached the sink.
    pub async fn flush(&self) -> Result<(), OutputError> {
        let (ack, done) = oneshot::channel();
        self.tx
            .send(Command::Flush(ack))
            .await
            .map_err(|_| OutputError::ChannelClosed)?;
        done.await.map_err(|_| OutputError::ChannelClosed)?
    }

    pub(crate) async fn shutdown(&self) -> Result<(), OutputError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| OutputError::ChannelClosed)
    }

    pub(crate) fn try_shutdown(&self) {
        let _ = self.tx.try_send(Command::Shutdown);
    }

    /// Whether the writer thread has stopped accepting blocks.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
