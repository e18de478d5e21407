use crate::errors::PowercapReadError;
use crate::sensors::utils::read_microjoules;
use crate::sensors::{DomainKey, EnergyDomain};
use std::collections::HashMap;

/// Turns raw energy_uj readings into per-observation deltas.
///
/// Holds the last raw value seen for each [`DomainKey`]. The first
/// observation of a key only sets the baseline and yields 0.
#[derive(Debug, Default)]
pub struct DeltaTracker {
    state: HashMap<DomainKey, u64>,
    evict_stale: bool,
}

impl DeltaTracker {
    pub fn new() -> DeltaTracker {
        DeltaTracker::default()
    }

    /// Same as [`DeltaTracker::new`], but [`DeltaTracker::retain`] drops
    /// state for domains that disappeared when `evict_stale` is true.
    pub fn with_eviction(evict_stale: bool) -> DeltaTracker {
        DeltaTracker {
            state: HashMap::new(),
            evict_stale,
        }
    }

    /// Reads the counter of `domain` and returns the microjoules consumed
    /// since the previous observation of the same key.
    ///
    /// On a read error the state is left as is and the error is returned,
    /// the caller skips this domain for the current sample.
    pub fn observe(&mut self, domain: &EnergyDomain) -> Result<u64, PowercapReadError> {
        let current = read_microjoules(&domain.counter_uj_path())?;
        let key = domain.key();
        let previous = self.state.get(&key).copied().unwrap_or(current);

        let delta = if current >= previous {
            current - previous
        } else {
            let max_range = match read_microjoules(&domain.max_range_uj_path()) {
                Ok(max_range) => Some(max_range),
                Err(error) => {
                    warn!(
                        "Counter of {} wrapped but max range is unavailable, reporting 0: {}",
                        key, error
                    );
                    None
                }
            };
            let delta = compute_delta(previous, current, max_range);
            debug!(
                "Counter of {} wrapped: previous {} current {} max_range {:?} delta {}",
                key, previous, current, max_range, delta
            );
            delta
        };

        trace!("{}: previous {} current {} delta {}", key, previous, current, delta);
        self.state.insert(key, current);
        Ok(delta)
    }

    /// Drops the state of every key not in `keys`, if eviction is enabled.
    /// Returns how many keys were evicted.
    pub fn retain(&mut self, keys: &[DomainKey]) -> usize {
        if !self.evict_stale {
            return 0;
        }
        let before = self.state.len();
        self.state.retain(|k, _| keys.contains(k));
        let evicted = before - self.state.len();
        if evicted > 0 {
            debug!("Evicted {} stale domain(s) from tracker state", evicted);
        }
        evicted
    }

    /// Last raw value observed for `key`.
    pub fn previous(&self, key: &DomainKey) -> Option<u64> {
        self.state.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

/// Energy consumed between two raw readings of the same counter.
///
/// When `current < previous` the counter wrapped and `max_range` is added
/// back. Without a max range the result is 0: a negative energy is never
/// returned.
pub fn compute_delta(previous: u64, current: u64, max_range: Option<u64>) -> u64 {
    if current >= previous {
        return current - previous;
    }
    match max_range {
        Some(max_range) => {
            let corrected = current as i128 - previous as i128 + max_range as i128;
            u64::try_from(corrected).unwrap_or(0)
        }
        None => 0,
    }
}
