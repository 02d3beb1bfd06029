//! Player lifecycle events
//!
//! Events are emitted when playback state changes (ready, play, stop,
//! fully-loaded, frame changes) and observed by external consumers over a
//! channel. Fire-and-forget: emitting never blocks and never fails.

use crossbeam_channel::Sender;

use crate::index_list::FrameIdx;

/// Lifecycle events, each carrying the player's current frame index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Enough frames are available to begin rendering.
    Ready { idx: FrameIdx },
    Play { idx: FrameIdx },
    Stop { idx: FrameIdx },
    /// Every frame in the sequence has settled (loaded or failed).
    FullyLoaded { idx: FrameIdx },
    FrameChanged { idx: FrameIdx },
}

/// Sending side of the player's event channel. Cheap to clone; the player
/// holds one and emits through it without caring whether anyone listens.
#[derive(Clone, Debug)]
pub struct PlayerEventSender {
    sender: Option<Sender<PlayerEvent>>,
}

impl PlayerEventSender {
    /// Wrap a connected channel sender.
    pub fn new(sender: Sender<PlayerEvent>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sender with no channel behind it; every emit is a no-op.
    pub fn dummy() -> Self {
        Self { sender: None }
    }

    /// Send an event. An absent or dropped receiver is ignored.
    pub fn emit(&self, event: PlayerEvent) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(event);
        }
    }
}

impl Default for PlayerEventSender {
    fn default() -> Self {
        Self::dummy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_to_connected_channel() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sender = PlayerEventSender::new(tx);
        sender.emit(PlayerEvent::Ready { idx: 3 });
        sender.emit(PlayerEvent::FrameChanged { idx: 4 });
        assert_eq!(rx.try_recv(), Ok(PlayerEvent::Ready { idx: 3 }));
        assert_eq!(rx.try_recv(), Ok(PlayerEvent::FrameChanged { idx: 4 }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dummy_and_dropped_receiver_are_silent() {
        PlayerEventSender::dummy().emit(PlayerEvent::Stop { idx: 0 });

        let (tx, rx) = crossbeam_channel::unbounded();
        let sender = PlayerEventSender::new(tx);
        drop(rx);
        sender.emit(PlayerEvent::Stop { idx: 0 });
    }
}
