use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::error::BotError;
use crate::message::SessionMessage;
use crate::types::QueueSnapshot;

/// Default mailbox buffer size for a player session.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// The single-consumer mailbox feeding one player session.
///
/// User commands and sink completion events are pushed through the same
/// bounded Tokio mpsc channel, so the consuming session task serializes
/// every state mutation without locks. The accept flag is mirrored on a
/// watch channel so producers can halt early without touching session
/// state.
pub struct Mailbox {
    tx: mpsc::Sender<SessionMessage>,
    rx: Option<mpsc::Receiver<SessionMessage>>,
    accept_tx: Option<watch::Sender<bool>>,
    accept_rx: watch::Receiver<bool>,
}

impl Mailbox {
    /// Create a new mailbox with the default buffer size.
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new mailbox with a custom buffer size.
    pub fn with_buffer_size(buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer);
        let (accept_tx, accept_rx) = watch::channel(true);
        Self {
            tx,
            rx: Some(rx),
            accept_tx: Some(accept_tx),
            accept_rx,
        }
    }

    /// A raw sender into the mailbox, for the output sink's completion
    /// events.
    pub fn sender(&self) -> mpsc::Sender<SessionMessage> {
        self.tx.clone()
    }

    /// A cloneable handle for command surface and resolver producers.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.tx.clone(),
            accept: self.accept_rx.clone(),
        }
    }

    /// Take the message receiver (can only be taken once).
    pub fn take_rx(&mut self) -> Option<mpsc::Receiver<SessionMessage>> {
        debug!("session mailbox receiver taken");
        self.rx.take()
    }

    /// Take the accept-flag publisher (can only be taken once).
    pub fn take_accept_tx(&mut self) -> Option<watch::Sender<bool>> {
        self.accept_tx.take()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle onto a session's mailbox.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionMessage>,
    accept: watch::Receiver<bool>,
}

impl SessionHandle {
    /// Post a message to the session.
    pub async fn send(&self, msg: SessionMessage) -> Result<(), BotError> {
        self.tx.send(msg).await.map_err(|_| BotError::MailboxClosed)
    }

    /// Whether the session is currently accepting new tracks. Producers
    /// check this before each append; the session re-checks on receipt, so
    /// a concurrent clear can never be raced past.
    pub fn accepting(&self) -> bool {
        *self.accept.borrow()
    }

    /// Request a point-in-time snapshot of the queue state.
    pub async fn snapshot(&self) -> Result<QueueSnapshot, BotError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionMessage::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| BotError::MailboxClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Track;

    #[tokio::test]
    async fn test_mailbox_send_receive() {
        let mut mailbox = Mailbox::new();
        let mut rx = mailbox.take_rx().unwrap();
        let handle = mailbox.handle();

        handle
            .send(SessionMessage::Enqueue(Track::new("a", "https://x/a")))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            SessionMessage::Enqueue(track) => assert_eq!(track.title, "a"),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mailbox_take_rx_once() {
        let mut mailbox = Mailbox::new();
        assert!(mailbox.take_rx().is_some());
        assert!(mailbox.take_rx().is_none()); // second take is None
    }

    #[tokio::test]
    async fn test_mailbox_backpressure() {
        let mut mailbox = Mailbox::with_buffer_size(2);
        let _rx = mailbox.take_rx().unwrap();
        let tx = mailbox.sender();

        // Fill the buffer.
        for _ in 0..2 {
            tx.send(SessionMessage::Skip).await.unwrap();
        }

        // Third send should not complete immediately (buffer full).
        assert!(tx.try_send(SessionMessage::Skip).is_err());
    }

    #[tokio::test]
    async fn test_accept_flag_mirrors_publisher() {
        let mut mailbox = Mailbox::new();
        let accept_tx = mailbox.take_accept_tx().unwrap();
        let handle = mailbox.handle();

        assert!(handle.accepting());
        accept_tx.send(false).unwrap();
        assert!(!handle.accepting());
    }
}
