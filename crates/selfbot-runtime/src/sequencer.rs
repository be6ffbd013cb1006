//! Sequencing lanes.
//!
//! Each lane is a bounded FIFO drained by a single task. A channel always maps
//! to the same lane, so its messages are dispatched one at a time in arrival
//! order while other lanes make progress independently.
//!
//! An actor can write in several channels at once. [`ActorGate`] keeps that
//! actor's dispatches from overlapping across lanes: a lane takes the actor's
//! lock before dispatching and releases it when the dispatch completes.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use selfbot_core::{ActorId, ChannelId, InboundMessage};
use selfbot_framework::{DispatchOutcome, Dispatcher};

/// One async lock per actor with a dispatch in flight.
///
/// Locks are created on demand and dropped once no lane holds or waits on
/// them. Waiters are served in FIFO order.
#[derive(Debug, Default)]
pub struct ActorGate {
    locks: DashMap<ActorId, Arc<Mutex<()>>>,
}

impl ActorGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches `message` while holding its actor's lock.
    pub async fn dispatch(
        &self,
        dispatcher: &Dispatcher,
        message: InboundMessage,
    ) -> DispatchOutcome {
        let actor = message.actor.clone();
        let lock = Arc::clone(self.locks.entry(actor.clone()).or_default().value());

        let outcome = {
            let _guard = lock.lock().await;
            dispatcher.dispatch(message).await
        };

        drop(lock);
        self.locks.remove_if(&actor, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    /// Actors with a dispatch running or queued on the gate.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

/// A fixed set of lanes feeding one dispatcher.
pub struct LaneSet {
    senders: Vec<mpsc::Sender<InboundMessage>>,
    handles: Vec<JoinHandle<u64>>,
    gate: Arc<ActorGate>,
}

impl LaneSet {
    /// Spawns `workers` lanes, each with a queue of `capacity` messages.
    ///
    /// Both values are clamped to at least 1.
    pub fn spawn(dispatcher: Dispatcher, workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let capacity = capacity.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        let gate = Arc::new(ActorGate::new());

        for lane in 0..workers {
            let (tx, rx) = mpsc::channel(capacity);
            senders.push(tx);
            handles.push(tokio::spawn(run_lane(
                lane,
                dispatcher.clone(),
                Arc::clone(&gate),
                rx,
            )));
        }

        debug!(workers, capacity, "Dispatch lanes started");
        Self {
            senders,
            handles,
            gate,
        }
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// The lane a channel is pinned to.
    pub fn lane_for(&self, channel: &ChannelId) -> usize {
        let mut hasher = DefaultHasher::new();
        channel.as_str().hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }

    pub fn gate(&self) -> &ActorGate {
        &self.gate
    }

    /// Queues a message on its channel's lane, waiting while the lane is full.
    ///
    /// Returns `false` if the lane has already stopped.
    pub async fn submit(&self, message: InboundMessage) -> bool {
        let lane = self.lane_for(&message.channel);
        trace!(lane, channel = %message.channel, actor = %message.actor, "Queueing message");
        match self.senders[lane].send(message).await {
            Ok(()) => true,
            Err(_) => {
                warn!(lane, "Dispatch lane is closed, dropping message");
                false
            }
        }
    }

    /// Closes every lane and waits for queued messages to finish.
    ///
    /// Returns the number of messages dispatched over the lanes' lifetime.
    pub async fn shutdown(self) -> u64 {
        drop(self.senders);

        join_all(self.handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(lane, joined)| match joined {
                Ok(processed) => processed,
                Err(e) => {
                    warn!(lane, error = %e, "Dispatch lane ended abnormally");
                    0
                }
            })
            .sum()
    }
}

impl std::fmt::Debug for LaneSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneSet")
            .field("lanes", &self.senders.len())
            .finish()
    }
}

async fn run_lane(
    lane: usize,
    dispatcher: Dispatcher,
    gate: Arc<ActorGate>,
    mut rx: mpsc::Receiver<InboundMessage>,
) -> u64 {
    let mut processed = 0;
    while let Some(message) = rx.recv().await {
        gate.dispatch(&dispatcher, message).await;
        processed += 1;
    }
    trace!(lane, processed, "Dispatch lane drained");
    processed
}
