use embedded_time::rate::Fraction;

/// [`Socket`](crate::net::Socket) for [`std::net::UdpSocket`]
pub mod net;

/// Implement [`embedded_time::Clock`] using [`std::time`] primitives
#[derive(Debug, Clone, Copy)]
pub struct Clock(std::time::Instant);

impl Default for Clock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock {
  /// Create a new clock, whose epoch is now
  pub fn new() -> Self {
    Self(std::time::Instant::now())
  }
}

impl embedded_time::Clock for Clock {
  type T = u64;

  // milliseconds
  const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000);

  fn try_now(&self) -> Result<embedded_time::Instant<Self>, embedded_time::clock::Error> {
    let elapsed = self.0.elapsed().as_millis();
    u64::try_from(elapsed).map(embedded_time::Instant::new)
                          .map_err(|_| embedded_time::clock::Error::Unspecified)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::time;

  #[test]
  fn clock_starts_near_zero() {
    let clock = Clock::new();
    let now = time::now(&clock).unwrap();
    assert!(now.0 < 1_000);
  }
}
