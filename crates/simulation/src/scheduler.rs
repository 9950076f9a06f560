//! Deterministic event scheduler.
//!
//! The scheduler owns the event queue, the current virtual time, the entity
//! registry and the random streams. Callbacks receive `&mut Scheduler`, so a
//! running event can read the clock, touch entities, draw random numbers and
//! schedule follow-up events without any global state.

use crate::event_queue::{EventHandle, EventQueue};
use crate::{EntityRegistry, RandomStreamManager, SimConfig, SimError};
use netsim_types::{SimDuration, SimTime};
use tracing::{debug, trace};

/// Deferred action run when its event fires.
pub type Callback = Box<dyn FnOnce(&mut Scheduler)>;

/// Statistics collected by the scheduler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Events accepted by the queue.
    pub events_scheduled: u64,
    /// Callbacks invoked.
    pub events_executed: u64,
    /// Events cancelled before they ran.
    pub events_cancelled: u64,
    /// Events discarded because they fell after the stop time.
    pub events_dropped: u64,
}

impl SchedulerStats {
    /// Events still unaccounted for (scheduled but neither run, cancelled nor
    /// dropped).
    pub fn outstanding(&self) -> u64 {
        self.events_scheduled
            - self.events_executed
            - self.events_cancelled
            - self.events_dropped
    }
}

/// Single-threaded discrete-event scheduler.
///
/// Exactly one callback runs at a time, to completion, before the next event
/// is selected. Given the same configuration and the same sequence of
/// scheduling calls, execution order and random draws are identical.
pub struct Scheduler {
    /// Pending events, ordered by (time, sequence).
    queue: EventQueue<Callback>,

    /// Current virtual time.
    now: SimTime,

    /// Simulated objects.
    entities: EntityRegistry,

    /// Per-purpose random streams.
    random: RandomStreamManager,

    /// Statistics.
    stats: SchedulerStats,

    /// Set by [`Scheduler::stop`]; checked between events.
    stop_requested: bool,

    config: SimConfig,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Scheduler {
    /// Create a scheduler at time zero.
    pub fn new(config: SimConfig) -> Self {
        Self {
            queue: EventQueue::new(),
            now: SimTime::ZERO,
            entities: EntityRegistry::new(),
            random: RandomStreamManager::new(config),
            stats: SchedulerStats::default(),
            stop_requested: false,
            config,
        }
    }

    /// The configuration this scheduler was built with.
    pub fn config(&self) -> SimConfig {
        self.config
    }

    /// Current virtual time.
    ///
    /// Inside a callback this is the time the running event was scheduled for.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Get statistics.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        &mut self.entities
    }

    pub fn random(&self) -> &RandomStreamManager {
        &self.random
    }

    pub fn random_mut(&mut self) -> &mut RandomStreamManager {
        &mut self.random
    }

    /// Schedule a callback at an absolute time.
    ///
    /// Fails with [`SimError::InvalidTime`] if `time` is before [`now`](Self::now).
    pub fn schedule_at<F>(
        &mut self,
        time: SimTime,
        callback: F,
    ) -> Result<EventHandle, SimError>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        let handle = self.queue.insert(self.now, time, Box::new(callback))?;
        self.stats.events_scheduled += 1;
        trace!(
            now = %self.now,
            at = %time,
            sequence = handle.sequence(),
            "Event scheduled"
        );
        Ok(handle)
    }

    /// Schedule a callback `delay` after the current time.
    ///
    /// Fails with [`SimError::NegativeDelay`] if `delay` is negative.
    pub fn schedule_after<F>(
        &mut self,
        delay: SimDuration,
        callback: F,
    ) -> Result<EventHandle, SimError>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        if delay.is_negative() {
            return Err(SimError::NegativeDelay(delay));
        }
        let time = self
            .now
            .checked_add(delay)
            .ok_or(SimError::TimeOverflow {
                now: self.now,
                delay,
            })?;
        self.schedule_at(time, callback)
    }

    /// Schedule a callback at the current time, after everything already
    /// queued for this instant.
    pub fn schedule_now<F>(&mut self, callback: F) -> Result<EventHandle, SimError>
    where
        F: FnOnce(&mut Scheduler) + 'static,
    {
        self.schedule_at(self.now, callback)
    }

    /// Cancel a pending event.
    ///
    /// Idempotent. Returns `true` only if the event was still pending;
    /// cancelling an event that already ran does nothing.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let cancelled = self.queue.cancel(handle);
        if cancelled {
            self.stats.events_cancelled += 1;
            debug!(
                at = %handle.time(),
                sequence = handle.sequence(),
                "Event cancelled"
            );
        }
        cancelled
    }

    /// Whether the event is still waiting to run.
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.queue.is_pending(handle)
    }

    /// Number of live pending events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next live event, if any.
    pub fn next_event_time(&mut self) -> Option<SimTime> {
        self.queue.peek_time()
    }

    /// Ask the running loop to return after the current callback.
    ///
    /// Pending events stay queued; a later `run` resumes them.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    /// Execute exactly one event.
    ///
    /// Returns `false` if the queue was empty.
    pub fn step(&mut self) -> Result<bool, SimError> {
        match self.queue.pop_earliest() {
            Some(event) => {
                let time = event.time();
                let sequence = event.sequence();
                self.execute(time, sequence, event.into_payload())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run until the queue is empty, [`stop`](Self::stop) is called, or the
    /// next event lies after `stop_time`.
    ///
    /// Events scheduled exactly at `stop_time` still run. When the stop time
    /// is reached, every later event is dropped without error and counted in
    /// [`SchedulerStats::events_dropped`], and the clock is left at
    /// `stop_time`.
    pub fn run(&mut self, stop_time: Option<SimTime>) -> Result<(), SimError> {
        let Some(stop_time) = stop_time else {
            while !self.take_stop_request() && self.step()? {}
            debug!(
                now = %self.now,
                executed = self.stats.events_executed,
                "Simulation finished"
            );
            return Ok(());
        };

        if self.run_until(stop_time)? {
            return Ok(());
        }

        let dropped = self.queue.clear();
        if dropped > 0 {
            self.stats.events_dropped += dropped as u64;
            debug!(
                stop_time = %stop_time,
                dropped,
                "Stop time reached, dropping remaining events"
            );
        }
        Ok(())
    }

    /// Run every event due at or before `end_time`, then advance the clock to
    /// `end_time`.
    ///
    /// Later events stay queued, so a simulation can be driven in steps.
    /// Returns `true` if the loop ended early because of [`stop`](Self::stop).
    pub fn run_until(&mut self, end_time: SimTime) -> Result<bool, SimError> {
        trace!(now = %self.now, end_time = %end_time, "Running simulation step");

        while let Some(next) = self.queue.peek_time() {
            if next > end_time {
                debug!(
                    remaining_events = self.queue.len(),
                    "Time limit reached"
                );
                break;
            }

            self.step()?;

            if self.take_stop_request() {
                debug!(now = %self.now, "Stop requested");
                return Ok(true);
            }
        }

        // Advance even if events ran out, so polling loops make progress.
        if self.now < end_time {
            self.now = end_time;
        }

        Ok(false)
    }

    fn execute(
        &mut self,
        time: SimTime,
        sequence: u64,
        callback: Callback,
    ) -> Result<(), SimError> {
        if time < self.now {
            return Err(SimError::TimeRegression {
                from: self.now,
                to: time,
            });
        }

        self.now = time;
        self.stats.events_executed += 1;
        trace!(time = %time, sequence, "Processing event");

        callback(self);
        Ok(())
    }

    fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("queue", &self.queue)
            .field("entities", &self.entities.len())
            .field("stats", &self.stats)
            .finish()
    }
}
