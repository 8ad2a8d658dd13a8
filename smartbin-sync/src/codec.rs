//! JSON codec for bus frames.

use crate::error::{SyncError, SyncResult};
use crate::protocol::{InboundFrame, OutboundFrame};

/// Maximum frame size (16 MB). A full-state response for a large
/// installation runs to a few MB.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encodes and decodes bus frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Decodes one inbound text frame.
    pub fn decode(&self, text: &str) -> SyncResult<InboundFrame> {
        self.check_size(text.len())?;
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes one outbound frame.
    pub fn encode(&self, frame: &OutboundFrame) -> SyncResult<String> {
        let text = serde_json::to_string(frame)?;
        self.check_size(text.len())?;
        Ok(text)
    }

    fn check_size(&self, size: usize) -> SyncResult<()> {
        if size > self.max_frame_size {
            return Err(SyncError::FrameTooLarge {
                size,
                limit: self.max_frame_size,
            });
        }
        Ok(())
    }
}
