use bytes::{Buf, Bytes};
use futures::StreamExt;

use crate::adapters::ChunkStream;
use crate::model::error::AdapterError;

/// Offset-addressed reads over a forward-only chunk stream. Satisfies an
/// offset by discarding exactly that many bytes from the stream start, so
/// the cost of `read_at` is linear in the offset. Scoped to a single call;
/// dropping it closes the underlying stream.
pub struct ReadAtAdapter {
    stream: ChunkStream,
    pending: Bytes,
}

impl ReadAtAdapter {
    pub fn new(stream: ChunkStream) -> Self {
        Self {
            stream,
            pending: Bytes::new(),
        }
    }

    /// Reads up to `buf.len()` bytes starting at `offset`. Returns the
    /// number of bytes read; zero means the offset is at or past the end
    /// of the object.
    pub async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<usize, AdapterError> {
        self.discard(offset).await?;
        self.fill(buf).await
    }

    async fn discard(&mut self, mut remaining: u64) -> Result<(), AdapterError> {
        while remaining > 0 {
            if self.pending.is_empty() {
                match self.stream.next().await {
                    // a chunk may straddle the offset; the tail stays
                    // buffered in `pending` for the read that follows
                    Some(chunk) => self.pending = chunk?,
                    None => return Ok(()),
                }
                continue;
            }

            let skip = (self.pending.len() as u64).min(remaining) as usize;
            self.pending.advance(skip);
            remaining -= skip as u64;
        }

        Ok(())
    }

    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize, AdapterError> {
        let mut filled = 0;

        while filled < buf.len() {
            if self.pending.is_empty() {
                match self.stream.next().await {
                    Some(chunk) => self.pending = chunk?,
                    None => break,
                }
                continue;
            }

            let take = self.pending.len().min(buf.len() - filled);
            buf[filled..filled + take].copy_from_slice(&self.pending[..take]);
            self.pending.advance(take);
            filled += take;
        }

        Ok(filled)
    }
}
