use tokio::sync::oneshot;

use crate::types::{QueueSnapshot, Track};

/// Messages consumed by a player session's mailbox.
///
/// Every mutation of a session flows through this enum, user commands and
/// the output sink's completion events alike, so the session task is the
/// single writer of queue and flag state.
#[derive(Debug)]
pub enum SessionMessage {
    /// Resolver → session: append a resolved track to the queue tail.
    Enqueue(Track),
    /// Command surface → session: a new playback request started, accept
    /// appends again.
    AcceptNew,
    /// Command surface → session: stop the active track; the sink's
    /// completion event drives the advance.
    Skip,
    /// Command surface → session: pause the active track.
    Pause,
    /// Command surface → session: resume the paused track.
    Resume,
    /// Command surface → session: empty the queue and block in-flight
    /// resolution from appending more. Does not stop the active track.
    Clear,
    /// Command surface → session: leaving voice. Empties the queue,
    /// blocks appends, drops the playing state.
    Reset,
    /// Output sink → session: the playback attempt finished, naturally or
    /// not. Delivered exactly once per attempt.
    TrackEnded { errored: bool },
    /// Command surface → session: reply with a queue snapshot.
    Snapshot(oneshot::Sender<QueueSnapshot>),
}
