use core::ops::RangeInclusive;

use embedded_time::duration::Milliseconds;
use rand::{Rng, SeedableRng};

use crate::time::Millis;

/// A non-blocking timer that allows a fixed-delay or exponential-backoff retry,
/// that lives alongside some operation to retry.
///
/// It does not _contain_ the work to be done (e.g. `Box<fn()>`) because
/// we don't have the luxury of a memory allocator :)
///
/// The timer is armed when the work is first attempted, and
/// [`RetryTimer::what_should_i_do`] yields [`YouShould::Retry`]
/// at most `max_attempts` times before yielding [`YouShould::Cry`].
///
/// ```
/// use embedded_time::duration::Milliseconds;
/// use newt::retry::{Attempts, RetryTimer, Strategy, YouShould};
///
/// let strategy = Strategy::Exponential { init_min: Milliseconds(100),
///                                        init_max: Milliseconds(100) };
/// let mut retry = RetryTimer::new(Milliseconds(0), strategy, Attempts(2), Milliseconds(60_000));
///
/// assert_eq!(retry.what_should_i_do(Milliseconds(99)), Err(nb::Error::WouldBlock));
/// assert_eq!(retry.what_should_i_do(Milliseconds(100)), Ok(YouShould::Retry));
/// assert_eq!(retry.what_should_i_do(Milliseconds(300)), Ok(YouShould::Retry));
/// assert_eq!(retry.what_should_i_do(Milliseconds(700)), Ok(YouShould::Cry));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTimer {
  next_at: u64,
  delay: u64,
  strategy: Strategy,
  retries: Attempts,
  max_attempts: Attempts,
  max_delay: u64,
}

impl Default for RetryTimer {
  fn default() -> Self {
    Self { next_at: 0,
           delay: 0,
           strategy: Strategy::Delay { min: Milliseconds(0),
                                       max: Milliseconds(0) },
           retries: Attempts(0),
           max_attempts: Attempts(0),
           max_delay: 0 }
  }
}

/// A number of attempts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attempts(pub u16);

/// Result of [`RetryTimer.what_should_i_do`].
///
/// This tells you if a retry should be attempted or not.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum YouShould {
  /// Attempts have been exhausted and the work that is
  /// being retried should be considered poisoned.
  Cry,
  /// A retry should be performed
  Retry,
}

impl RetryTimer {
  /// Create a new retrier, armed as of `now`.
  pub fn new(Milliseconds(now): Millis,
             strategy: Strategy,
             max_attempts: Attempts,
             Milliseconds(max_delay): Millis)
             -> Self {
    let init = if strategy.has_jitter() {
      let mut rand = rand_chacha::ChaCha8Rng::seed_from_u64(now);
      rand.gen_range(strategy.range())
    } else {
      *strategy.range().start()
    };

    let delay = init.min(max_delay);

    Self { next_at: now.saturating_add(delay),
           delay,
           strategy,
           retries: Attempts(0),
           max_attempts,
           max_delay }
  }

  /// When the thing we keep trying fails, invoke this to
  /// tell the retrytimer "it failed again! what do I do??"
  ///
  /// Returns `nb::Error::WouldBlock` when we have not yet
  /// waited the appropriate amount of time to retry.
  pub fn what_should_i_do(&mut self,
                          Milliseconds(now): Millis)
                          -> nb::Result<YouShould, core::convert::Infallible> {
    if now < self.next_at {
      Err(nb::Error::WouldBlock)
    } else if self.retries >= self.max_attempts {
      Ok(YouShould::Cry)
    } else {
      self.retries.0 += 1;
      self.delay = self.strategy.next_delay(self.delay).min(self.max_delay);
      self.next_at = now.saturating_add(self.delay);
      Ok(YouShould::Retry)
    }
  }

  /// How many times we've been told to retry
  pub fn retries(&self) -> Attempts {
    self.retries
  }

  /// The delay that will be waited before the next decision
  pub fn delay(&self) -> Millis {
    Milliseconds(self.delay)
  }
}

/// Strategy to employ when retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  ///
  /// After each failed attempt, double the delay before retrying again.
  Exponential {
    /// Minimum (inclusive) delay for second attempt
    init_min: Millis,
    /// Maximum (inclusive) delay for second attempt
    init_max: Millis,
  },
  /// Generate a random delay between `min` and `max`,
  /// and wait until this delay has passed between attempts.
  Delay {
    /// Minimum (inclusive) delay for attempts
    min: Millis,
    /// Maximum (inclusive) delay for attempts
    max: Millis,
  },
}

impl Strategy {
  /// Are min & max delays the same? if so, we should probably skip the random number generation.
  pub fn has_jitter(&self) -> bool {
    let rng = self.range();
    rng.start() != rng.end()
  }

  /// Get the min & max durations as an inclusive range
  pub fn range(&self) -> RangeInclusive<u64> {
    match self {
      | &Self::Delay { min: Milliseconds(min),
                       max: Milliseconds(max), } => (min..=max),

      | &Self::Exponential { init_min: Milliseconds(min),
                             init_max: Milliseconds(max), } => (min..=max),
    }
  }

  fn next_delay(&self, prev: u64) -> u64 {
    match self {
      | Self::Exponential { .. } => prev.saturating_mul(2),
      | Self::Delay { .. } => prev,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  const NO_CAP: Millis = Milliseconds(u64::MAX);

  #[test]
  fn delay_retrier() {
    let mut retry = RetryTimer::new(Milliseconds(0),
                                    Strategy::Delay { min: Milliseconds(1000),
                                                      max: Milliseconds(1000) },
                                    Attempts(3),
                                    NO_CAP);

    // attempt 1 happens before asking what_should_i_do

    assert_eq!(retry.what_should_i_do(Milliseconds(999)).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(Milliseconds(1000)).unwrap(),
               YouShould::Retry);

    assert_eq!(retry.what_should_i_do(Milliseconds(1999)).unwrap_err(),
               nb::Error::WouldBlock);
    assert_eq!(retry.what_should_i_do(Milliseconds(2000)).unwrap(),
               YouShould::Retry);

    // a late tick pushes the next deadline out rather than
    // firing several retries back-to-back
    assert_eq!(retry.what_should_i_do(Milliseconds(10_000)).unwrap(),
               YouShould::Retry);
    assert_eq!(retry.what_should_i_do(Milliseconds(10_500)).unwrap_err(),
               nb::Error::WouldBlock);

    assert_eq!(retry.what_should_i_do(Milliseconds(11_000)).unwrap(),
               YouShould::Cry);
  }

  #[test]
  fn exponential_retrier() {
    let mut retry = RetryTimer::new(Milliseconds(0),
                                    Strategy::Exponential { init_min: Milliseconds(1000),
                                                            init_max: Milliseconds(1000) },
                                    Attempts(4),
                                    NO_CAP);

    let mut now = 0;
    let mut delays = vec![];

    loop {
      match retry.what_should_i_do(Milliseconds(now)) {
        | Ok(YouShould::Retry) => delays.push(retry.delay().0),
        | Ok(YouShould::Cry) => break,
        | Err(_) => (),
      }
      now += 1;
    }

    assert_eq!(delays, vec![2000, 4000, 8000, 16000]);
    assert_eq!(retry.retries(), Attempts(4));
    assert_eq!(now, 1000 + 2000 + 4000 + 8000 + 16000);
  }

  #[test]
  fn delay_is_capped() {
    let mut retry = RetryTimer::new(Milliseconds(0),
                                    Strategy::Exponential { init_min: Milliseconds(1000),
                                                            init_max: Milliseconds(1000) },
                                    Attempts(4),
                                    Milliseconds(3000));

    assert_eq!(retry.what_should_i_do(Milliseconds(1000)), Ok(YouShould::Retry));
    assert_eq!(retry.delay(), Milliseconds(2000u64));
    assert_eq!(retry.what_should_i_do(Milliseconds(3000)), Ok(YouShould::Retry));
    assert_eq!(retry.delay(), Milliseconds(3000u64));
    assert_eq!(retry.what_should_i_do(Milliseconds(6000)), Ok(YouShould::Retry));
    assert_eq!(retry.delay(), Milliseconds(3000u64));
  }

  #[test]
  fn jitter_stays_in_range() {
    let strategy = Strategy::Exponential { init_min: Milliseconds(2000),
                                           init_max: Milliseconds(3000) };

    (0..64).for_each(|seed| {
             let retry = RetryTimer::new(Milliseconds(seed), strategy, Attempts(4), NO_CAP);
             assert!((2000..=3000).contains(&retry.delay().0));
           });
  }
}
