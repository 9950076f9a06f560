//! Reproducible random streams.
//!
//! Each `(purpose, owner)` pair gets its own ChaCha8 generator whose key is
//! derived from the global seed, the run number, the purpose and the owner.
//! Two streams never share state, so adding draws to one model cannot shift
//! the numbers another model sees.

use crate::{SimConfig, SimError};
use netsim_types::EntityId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::fmt;

/// Domain separator for stream key derivation.
const STREAM_KEY_CONTEXT: &[u8] = b"netsim random stream v1";

/// Who a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamOwner {
    /// Not tied to any entity (e.g. scenario-wide choices).
    Global,
    /// Owned by a single entity.
    Entity(EntityId),
}

impl From<EntityId> for StreamOwner {
    fn from(id: EntityId) -> Self {
        StreamOwner::Entity(id)
    }
}

impl fmt::Display for StreamOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamOwner::Global => f.write_str("Global"),
            StreamOwner::Entity(id) => write!(f, "{id}"),
        }
    }
}

/// Handle to a stream held by a [`RandomStreamManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(u32);

impl StreamHandle {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// One isolated pseudo-random sequence.
pub struct RandomStream {
    owner: StreamOwner,
    purpose: String,
    seed: u64,
    run: u32,
    rng: ChaCha8Rng,
    draws: u64,
}

impl RandomStream {
    fn new(config: SimConfig, purpose: &str, owner: StreamOwner) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(STREAM_KEY_CONTEXT);
        hasher.update(&config.seed.to_le_bytes());
        hasher.update(&config.run.to_le_bytes());
        match owner {
            StreamOwner::Global => {
                hasher.update(&[0u8]);
            }
            StreamOwner::Entity(id) => {
                hasher.update(&[1u8]);
                hasher.update(&id.0.to_le_bytes());
            }
        }
        // Length prefix keeps ("ab", x) and ("a", "b"x) apart.
        hasher.update(&(purpose.len() as u64).to_le_bytes());
        hasher.update(purpose.as_bytes());

        Self {
            owner,
            purpose: purpose.to_owned(),
            seed: config.seed,
            run: config.run,
            rng: ChaCha8Rng::from_seed(*hasher.finalize().as_bytes()),
            draws: 0,
        }
    }

    pub fn owner(&self) -> StreamOwner {
        self.owner
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run(&self) -> u32 {
        self.run
    }

    /// Number of draws made through the manager's `draw_*` methods.
    pub fn draws(&self) -> u64 {
        self.draws
    }
}

impl fmt::Debug for RandomStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomStream")
            .field("owner", &self.owner)
            .field("purpose", &self.purpose)
            .field("seed", &self.seed)
            .field("run", &self.run)
            .field("draws", &self.draws)
            .finish()
    }
}

/// Hands out and draws from per-`(purpose, owner)` streams.
#[derive(Debug)]
pub struct RandomStreamManager {
    config: SimConfig,
    streams: Vec<RandomStream>,
    index: HashMap<(String, StreamOwner), StreamHandle>,
}

impl RandomStreamManager {
    /// Create a manager for the given seed and run.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            streams: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn config(&self) -> SimConfig {
        self.config
    }

    /// Get the stream for `(purpose, owner)`, creating it on first use.
    ///
    /// Repeated calls with the same arguments return the same handle, so draws
    /// continue one sequence instead of restarting it.
    pub fn stream_for(&mut self, purpose: &str, owner: impl Into<StreamOwner>) -> StreamHandle {
        let owner = owner.into();
        if let Some(&handle) = self.index.get(&(purpose.to_owned(), owner)) {
            return handle;
        }

        let handle = StreamHandle(self.streams.len() as u32);
        self.streams.push(RandomStream::new(self.config, purpose, owner));
        self.index.insert((purpose.to_owned(), owner), handle);
        handle
    }

    /// Get a stream's metadata.
    pub fn get(&self, handle: StreamHandle) -> Result<&RandomStream, SimError> {
        self.streams
            .get(handle.0 as usize)
            .ok_or(SimError::UnknownStream(handle.0))
    }

    /// Direct access to a stream's generator, for models that need a
    /// distribution not covered by the `draw_*` helpers.
    pub fn rng(&mut self, handle: StreamHandle) -> Result<&mut ChaCha8Rng, SimError> {
        Ok(&mut self.stream_mut(handle)?.rng)
    }

    /// Draw a float uniformly from `[min, max)`.
    ///
    /// Returns `min` when `min == max`. Fails with
    /// [`SimError::ExhaustedOrInvalidRange`] if `min > max` or the bounds or
    /// their span are not finite.
    pub fn draw_uniform(
        &mut self,
        handle: StreamHandle,
        min: f64,
        max: f64,
    ) -> Result<f64, SimError> {
        let span = max - min;
        if !(min.is_finite() && max.is_finite() && span.is_finite()) || min > max {
            return Err(SimError::ExhaustedOrInvalidRange { min, max });
        }
        let stream = self.stream_mut(handle)?;
        stream.draws += 1;
        let unit: f64 = stream.rng.gen();
        Ok(min + unit * span)
    }

    /// Draw an integer uniformly from `[min, max]` (both inclusive).
    pub fn draw_uniform_int(
        &mut self,
        handle: StreamHandle,
        min: i64,
        max: i64,
    ) -> Result<i64, SimError> {
        if min > max {
            return Err(SimError::ExhaustedOrInvalidRange {
                min: min as f64,
                max: max as f64,
            });
        }
        let stream = self.stream_mut(handle)?;
        stream.draws += 1;
        Ok(stream.rng.gen_range(min..=max))
    }

    /// Draw from an exponential distribution with the given mean.
    pub fn draw_exponential(&mut self, handle: StreamHandle, mean: f64) -> Result<f64, SimError> {
        if !mean.is_finite() || mean <= 0.0 {
            return Err(SimError::ExhaustedOrInvalidRange {
                min: 0.0,
                max: mean,
            });
        }
        let stream = self.stream_mut(handle)?;
        stream.draws += 1;
        let unit: f64 = stream.rng.gen();
        Ok(-mean * (1.0 - unit).ln())
    }

    /// Number of streams created so far.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    fn stream_mut(&mut self, handle: StreamHandle) -> Result<&mut RandomStream, SimError> {
        self.streams
            .get_mut(handle.0 as usize)
            .ok_or(SimError::UnknownStream(handle.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(manager: &mut RandomStreamManager, handle: StreamHandle, n: usize) -> Vec<f64> {
        (0..n)
            .map(|_| manager.draw_uniform(handle, 0.0, 1.0).unwrap())
            .collect()
    }

    #[test]
    fn test_same_arguments_same_handle() {
        let mut manager = RandomStreamManager::new(SimConfig::default());
        let a = manager.stream_for("mobility", EntityId(0));
        let b = manager.stream_for("mobility", EntityId(0));
        assert_eq!(a, b);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_repeated_stream_for_continues_sequence() {
        let mut manager = RandomStreamManager::new(SimConfig::default());
        let first = manager.stream_for("traffic", EntityId(3));
        let mut observed = draws(&mut manager, first, 3);
        let again = manager.stream_for("traffic", EntityId(3));
        observed.extend(draws(&mut manager, again, 3));

        let mut reference = RandomStreamManager::new(SimConfig::default());
        let handle = reference.stream_for("traffic", EntityId(3));
        assert_eq!(observed, draws(&mut reference, handle, 6));
        assert_eq!(manager.get(first).unwrap().draws(), 6);
    }

    #[test]
    fn test_entity_streams_are_independent() {
        let mut interleaved = RandomStreamManager::new(SimConfig::default());
        let a = interleaved.stream_for("mobility", EntityId(0));
        let b = interleaved.stream_for("mobility", EntityId(1));
        let mut a_seen = Vec::new();
        let mut b_seen = Vec::new();
        for _ in 0..5 {
            a_seen.push(interleaved.draw_uniform(a, 0.0, 1.0).unwrap());
            b_seen.push(interleaved.draw_uniform(b, 0.0, 1.0).unwrap());
        }

        let mut alone = RandomStreamManager::new(SimConfig::default());
        let a_alone = alone.stream_for("mobility", EntityId(0));
        assert_eq!(a_seen, draws(&mut alone, a_alone, 5));

        let mut alone = RandomStreamManager::new(SimConfig::default());
        let b_alone = alone.stream_for("mobility", EntityId(1));
        assert_eq!(b_seen, draws(&mut alone, b_alone, 5));

        assert_ne!(a_seen, b_seen);
    }

    #[test]
    fn test_purpose_seed_and_run_separate_streams() {
        let base = SimConfig::new(1, 1);
        let sample = |config: SimConfig, purpose: &str| {
            let mut manager = RandomStreamManager::new(config);
            let handle = manager.stream_for(purpose, StreamOwner::Global);
            draws(&mut manager, handle, 4)
        };

        let reference = sample(base, "mobility");
        assert_eq!(reference, sample(base, "mobility"));
        assert_ne!(reference, sample(base, "traffic"));
        assert_ne!(reference, sample(base.with_run(2), "mobility"));
        assert_ne!(reference, sample(base.with_seed(2), "mobility"));
    }

    #[test]
    fn test_uniform_bounds() {
        let mut manager = RandomStreamManager::new(SimConfig::default());
        let handle = manager.stream_for("bounds", StreamOwner::Global);
        for _ in 0..1_000 {
            let v = manager.draw_uniform(handle, 5.0, 10.0).unwrap();
            assert!((5.0..10.0).contains(&v));
            let i = manager.draw_uniform_int(handle, -2, 2).unwrap();
            assert!((-2..=2).contains(&i));
        }
        assert_eq!(manager.draw_uniform(handle, 4.0, 4.0).unwrap(), 4.0);
        assert_eq!(manager.draw_uniform_int(handle, 7, 7).unwrap(), 7);
    }

    #[test]
    fn test_invalid_ranges() {
        let mut manager = RandomStreamManager::new(SimConfig::default());
        let handle = manager.stream_for("bounds", StreamOwner::Global);
        assert!(matches!(
            manager.draw_uniform(handle, 2.0, 1.0),
            Err(SimError::ExhaustedOrInvalidRange { .. })
        ));
        assert!(matches!(
            manager.draw_uniform(handle, 0.0, f64::INFINITY),
            Err(SimError::ExhaustedOrInvalidRange { .. })
        ));
        assert!(matches!(
            manager.draw_uniform(handle, -f64::MAX, f64::MAX),
            Err(SimError::ExhaustedOrInvalidRange { .. })
        ));
        assert!(matches!(
            manager.draw_uniform_int(handle, 3, 2),
            Err(SimError::ExhaustedOrInvalidRange { .. })
        ));
        assert!(matches!(
            manager.draw_exponential(handle, 0.0),
            Err(SimError::ExhaustedOrInvalidRange { .. })
        ));
        assert_eq!(manager.get(handle).unwrap().draws(), 0, "Failed draws consume nothing");
    }

    #[test]
    fn test_unknown_stream() {
        let mut manager = RandomStreamManager::new(SimConfig::default());
        let mut other = RandomStreamManager::new(SimConfig::default());
        other.stream_for("x", StreamOwner::Global);
        let foreign = other.stream_for("y", StreamOwner::Global);
        assert_eq!(
            manager.draw_uniform(foreign, 0.0, 1.0).unwrap_err(),
            SimError::UnknownStream(1)
        );
    }

    #[test]
    fn test_exponential_is_positive() {
        let mut manager = RandomStreamManager::new(SimConfig::default());
        let handle = manager.stream_for("jitter", StreamOwner::Global);
        for _ in 0..100 {
            assert!(manager.draw_exponential(handle, 0.01).unwrap() >= 0.0);
        }
    }
}
