//! Event Bus implementation.
//!
//! An explicitly owned bus: the session creates one and hands an `Arc` to
//! every component that publishes or listens.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::events::{AppEvent, EventCategory, ProgressEvent};
use crate::data::JobId;

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Filter to receive only specific events
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
    /// Receive progress events of one job only.
    Job(JobId),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
            EventFilter::Job(id) => event.job_id() == Some(*id),
        }
    }
}

type EventHandler = Arc<dyn Fn(AppEvent) + Send + Sync>;

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for broadcast. Slow receivers lose the oldest events.
    pub channel_capacity: usize,
    /// Number of final job events kept for streams that fell behind.
    pub final_event_history: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            final_event_history: 64,
        }
    }
}

/// Most recent final events, oldest first.
type FinalEvents = Arc<Mutex<VecDeque<ProgressEvent>>>;

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Publish/subscribe hub for application events
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
    finals: FinalEvents,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new event bus with default configuration
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create a new event bus with custom configuration
    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
            finals: Arc::new(Mutex::new(VecDeque::new())),
            config,
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Handlers run on the publishing thread. They are collected before
    /// being called, so a handler may unsubscribe itself.
    pub fn publish(&self, event: AppEvent) -> Result<usize, EventBusError> {
        if let AppEvent::Job(progress) = &event {
            if progress.is_final() {
                self.remember_final(progress.clone());
            }
        }

        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in &matching {
            handler(event.clone());
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count + matching.len()),
            Err(_) if matching.is_empty() => Err(EventBusError::NoSubscribers),
            Err(_) => Ok(matching.len()),
        }
    }

    fn remember_final(&self, progress: ProgressEvent) {
        let limit = self.config.final_event_history.max(1);
        let mut finals = self.finals.lock();
        finals.push_back(progress);
        while finals.len() > limit {
            finals.pop_front();
        }
    }

    /// The final event of a job, if it is still remembered
    pub fn final_event(&self, job_id: JobId) -> Option<ProgressEvent> {
        find_final(&self.finals, job_id)
    }

    /// Publish a job progress update
    pub fn publish_progress(&self, progress: ProgressEvent) {
        // Nobody listening is fine for progress.
        let _ = self.publish(AppEvent::Job(progress));
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler is called on the publishing thread, so it should
    /// return quickly.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Subscribe to the progress of a single job
    pub fn subscribe_job<F>(&self, job_id: JobId, handler: F) -> SubscriptionId
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.subscribe(EventFilter::Job(job_id), move |event| {
            if let AppEvent::Job(progress) = event {
                handler(progress);
            }
        })
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    /// Get a receiver for manual event polling
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Async stream of one job's progress, ending after its final event
    ///
    /// Dropping the stream unsubscribes it.
    pub fn progress_stream(&self, job_id: JobId) -> JobProgressStream {
        JobProgressStream {
            job_id,
            receiver: self.sender.subscribe(),
            finals: self.finals.clone(),
            finished: false,
        }
    }

    /// Get the number of handler subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Get the current configuration
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("config", &self.config)
            .finish()
    }
}

/// Progress events of a single job
///
/// When the receiver lags, the oldest updates are skipped; the newer ones
/// supersede them. A final event pushed out of the channel by later traffic
/// is recovered from the bus's final event history.
pub struct JobProgressStream {
    job_id: JobId,
    receiver: broadcast::Receiver<AppEvent>,
    finals: FinalEvents,
    finished: bool,
}

fn find_final(finals: &FinalEvents, job_id: JobId) -> Option<ProgressEvent> {
    finals
        .lock()
        .iter()
        .rev()
        .find(|progress| progress.job_id == job_id)
        .cloned()
}

impl JobProgressStream {
    /// The job being followed
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Next progress update, `None` once the final event was returned
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.recv().await {
                Ok(AppEvent::Job(progress)) if progress.job_id == self.job_id => {
                    self.finished = progress.is_final();
                    return Some(progress);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("{} progress stream skipped {} events", self.job_id, skipped);
                    if let Some(progress) = find_final(&self.finals, self.job_id) {
                        self.finished = true;
                        return Some(progress);
                    }
                    continue;
                }
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    /// Wait for the final event, discarding intermediate updates
    pub async fn final_event(mut self) -> Option<ProgressEvent> {
        let mut last = None;
        while let Some(progress) = self.next().await {
            last = Some(progress);
        }
        last.filter(ProgressEvent::is_final)
    }
}
