use crate::clock::Clock;
use parking_lot::Mutex;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use std::sync::Arc;
use thiserror::Error as ThisError;
use ulid::Ulid;

///
/// UlidGenError
///

#[derive(Debug, ThisError)]
pub enum UlidGenError {
    #[error("monotonic error - overflow")]
    GeneratorOverflow,
}

///
/// UlidGen
///
/// Monotonic ULID generation over an injected clock. The stock generator
/// reads wall time directly, which would break deterministic harness runs,
/// so randomness and time are both injected here.
///

pub struct UlidGen {
    clock: Arc<dyn Clock>,
    state: Mutex<State>,
}

struct State {
    previous: Ulid,
    rng: Box<dyn RngCore + Send>,
}

impl UlidGen {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            clock,
            state: Mutex::new(State {
                previous: Ulid::nil(),
                rng,
            }),
        }
    }

    #[must_use]
    pub fn with_os_entropy(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, Box::new(StdRng::from_os_rng()))
    }

    /// Monotonic ULID generation; increments within the same millisecond.
    pub fn generate(&self) -> Result<Ulid, UlidGenError> {
        let mut state = self.state.lock();

        let last_ts = state.previous.timestamp_ms();
        let ts = self.clock.now_millis();

        // Same millisecond, or time went backward: increment instead of
        // drawing fresh randomness so ordering stays monotonic.
        if ts <= last_ts {
            let next = state
                .previous
                .increment()
                .ok_or(UlidGenError::GeneratorOverflow)?;
            state.previous = next;

            return Ok(next);
        }

        let random = u128::from(state.rng.next_u64()) << 64 | u128::from(state.rng.next_u64());
        let ulid = Ulid::from_parts(ts, random);
        state.previous = ulid;

        Ok(ulid)
    }
}

///
/// TESTS
///
