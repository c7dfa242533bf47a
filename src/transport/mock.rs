//! # Mock Transport
//!
//! In-memory transport for tests: records everything sent and plays back
//! scripted reply chunks. Chunk boundaries are preserved exactly as
//! scripted so tests can simulate replies arriving split mid-frame.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::error::CommunicationError;

use super::Transport;

/// Scripted test double for [`Transport`].
#[derive(Debug, Default)]
pub struct MockTransport {
    sent: Vec<Vec<u8>>,
    replies: VecDeque<Vec<Vec<u8>>>,
    connected: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            replies: VecDeque::new(),
            connected: true,
        }
    }

    /// Script the chunks returned by the next `receive` call. Each call
    /// to this method feeds exactly one future `receive`.
    pub fn push_reply(&mut self, chunks: Vec<Vec<u8>>) {
        self.replies.push_back(chunks);
    }

    /// Every buffer passed to `send`, in order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// All sent buffers concatenated.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.concat()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<(), CommunicationError> {
        if !self.connected {
            return Err(CommunicationError::NotConnected);
        }
        self.sent.push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self) -> Result<Vec<Vec<u8>>, CommunicationError> {
        if !self.connected {
            return Err(CommunicationError::NotConnected);
        }
        Ok(self.replies.pop_front().unwrap_or_default())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn dispose(&mut self) -> Result<(), CommunicationError> {
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sends_in_order() {
        let mut mock = MockTransport::new();
        mock.send(b"first").await.unwrap();
        mock.send(b"second").await.unwrap();
        assert_eq!(mock.sent(), &[b"first".to_vec(), b"second".to_vec()]);
        assert_eq!(mock.sent_bytes(), b"firstsecond");
    }

    #[tokio::test]
    async fn test_scripted_replies_play_back_once() {
        let mut mock = MockTransport::new();
        mock.push_reply(vec![b"\x06\r".to_vec(), b"\n".to_vec()]);

        let chunks = mock.receive().await.unwrap();
        assert_eq!(chunks, vec![b"\x06\r".to_vec(), b"\n".to_vec()]);
        assert!(mock.receive().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disposed_transport_rejects_io() {
        let mut mock = MockTransport::new();
        mock.dispose().await.unwrap();
        assert!(!mock.is_connected());
        assert!(matches!(
            mock.send(b"x").await,
            Err(CommunicationError::NotConnected)
        ));
    }
}
