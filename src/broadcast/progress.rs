use tokio::sync::broadcast;
use tracing::trace;

use crate::models::progress::ProgressSnapshot;

/// Fan-out of progress snapshots to every connected stats listener.
///
/// Listeners hold a receiver; dropping it (client disconnect) detaches them.
/// A listener that falls more than `capacity` snapshots behind skips ahead
/// instead of growing an unbounded queue.
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<ProgressSnapshot>,
}

impl ProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Push a snapshot to current listeners, returning how many received it
    pub fn publish(&self, snapshot: ProgressSnapshot) -> usize {
        match self.sender.send(snapshot) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("No stats listeners connected, snapshot dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressSnapshot> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
