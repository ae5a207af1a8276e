use crate::broadcast::event::NoteEvent;
use crate::model::owner::OwnerId;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type Channels = HashMap<OwnerId, Vec<Sender<NoteEvent>>>;

/// Fan-out hub keyed by owner identity.
///
/// Writers sharing one hub commit through [`ChangeBroadcaster::in_order`], so
/// each channel sees events in the order the mutations committed.
#[derive(Debug, Default)]
pub struct ChangeBroadcaster {
    channels: Mutex<Channels>,
    lanes: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a live subscription on the channel of an authenticated identity.
    pub fn subscribe(&self, identity: &OwnerId) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let mut channels = self.lock();
        let subscribers = channels.entry(identity.clone()).or_default();
        subscribers.push(sender);
        debug!(
            "event=broadcast_subscribe module=broadcast status=ok subscriber_count={}",
            subscribers.len()
        );
        Subscription {
            owner: identity.clone(),
            receiver,
        }
    }

    /// Delivers `event` to every live subscriber of `channel`.
    ///
    /// Returns the number of subscribers reached. Disconnected subscribers
    /// are pruned; an event whose owner differs from `channel` is dropped.
    pub fn publish(&self, channel: &OwnerId, event: NoteEvent) -> usize {
        if &event.owner != channel {
            warn!(
                "event=broadcast_publish module=broadcast status=dropped error_code=owner_mismatch kind={} note_id={}",
                event.kind.topic(),
                event.note_id
            );
            return 0;
        }

        let mut channels = self.lock();
        let Some(subscribers) = channels.get_mut(channel) else {
            return 0;
        };
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        let delivered = subscribers.len();
        if subscribers.is_empty() {
            channels.remove(channel);
        }

        debug!(
            "event=broadcast_publish module=broadcast status=ok kind={} note_id={} delivered={delivered}",
            event.kind.topic(),
            event.note_id
        );
        delivered
    }

    /// Runs `commit` while holding the commit lane of `channel`.
    ///
    /// A mutation and the publish of its event must both happen inside
    /// `commit`; two lanes of different owners never block each other.
    pub fn in_order<T>(&self, channel: &OwnerId, commit: impl FnOnce() -> T) -> T {
        let lane = {
            let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(lanes.entry(channel.clone()).or_default())
        };
        let _turn = lane.lock().unwrap_or_else(PoisonError::into_inner);
        commit()
    }

    /// Number of subscribers registered on `channel`, including ones not yet pruned.
    pub fn subscriber_count(&self, channel: &OwnerId) -> usize {
        self.lock().get(channel).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Channels> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving end of one live connection. Dropping it disconnects.
#[derive(Debug)]
pub struct Subscription {
    owner: OwnerId,
    receiver: Receiver<NoteEvent>,
}

impl Subscription {
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// Returns the next pending event without waiting.
    pub fn try_next(&self) -> Option<NoteEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<NoteEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Takes every event delivered so far.
    pub fn drain(&self) -> Vec<NoteEvent> {
        self.receiver.try_iter().collect()
    }
}
