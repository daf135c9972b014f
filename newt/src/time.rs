use embedded_time::duration::Milliseconds;

/// A duration, in milliseconds
pub type Millis = Milliseconds<u64>;

/// Supertrait of [`embedded_time::Clock`] pinning the
/// type of "ticks" to u64
pub trait Clock: embedded_time::Clock<T = u64> {}
impl<C: embedded_time::Clock<T = u64>> Clock for C {}

/// Milliseconds elapsed since the clock's epoch.
///
/// Yields `None` when the clock can't be read or the
/// reading does not fit in milliseconds.
pub(crate) fn now<C: Clock>(clock: &C) -> Option<Millis> {
  clock.try_now()
       .ok()
       .and_then(|now| Millis::try_from(now.duration_since_epoch()).ok())
}
