use newt_msg::Token;
use no_std_net::SocketAddr;

use crate::config::MAX_OBSERVERS;
use crate::server::ResourceId;

/// A peer subscribed to a resource's notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
  /// Where notifications go
  pub addr: SocketAddr,
  /// Token of the registering request, echoed in every notification
  pub token: Token,
  /// The observed resource
  pub resource: ResourceId,
  /// Sequence number of the last notification sent
  pub last_seq: u32,
}

/// The set of observers, across every resource
#[derive(Debug, Clone, Copy)]
pub struct Observers {
  slots: [Option<Observer>; MAX_OBSERVERS],
  limit: usize,
}

/// The observer set is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserversFull;

impl Observers {
  pub(crate) fn new(limit: usize) -> Self {
    Self { slots: [None; MAX_OBSERVERS],
           limit: limit.min(MAX_OBSERVERS) }
  }

  /// Number of active observations
  pub fn len(&self) -> usize {
    self.iter().count()
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Iterate over every active observation
  pub fn iter(&self) -> impl Iterator<Item = &Observer> {
    self.slots.iter().filter_map(Option::as_ref)
  }

  /// Iterate over the observers of one resource
  pub fn of(&self, resource: ResourceId) -> impl Iterator<Item = &Observer> {
    self.iter().filter(move |o| o.resource == resource)
  }

  /// Register an observation.
  ///
  /// A peer observes a resource at most once; registering again
  /// replaces the token of the existing observation.
  pub(crate) fn add(&mut self, obs: Observer) -> Result<(), ObserversFull> {
    let same_peer = |s: &Option<Observer>| {
      matches!(s, Some(o) if o.addr == obs.addr && o.resource == obs.resource)
    };

    match self.slots.iter().position(same_peer) {
      | Some(ix) => {
        self.slots[ix] = Some(obs);
        Ok(())
      },
      | None if self.len() >= self.limit => Err(ObserversFull),
      | None => {
        let ix = self.slots.iter().position(Option::is_none).ok_or(ObserversFull)?;
        self.slots[ix] = Some(obs);
        Ok(())
      },
    }
  }

  /// Remove the observation a peer registered with `token`,
  /// yielding how many were removed (0 or 1).
  pub(crate) fn remove_by_token(&mut self, addr: SocketAddr, token: &Token) -> usize {
    self.remove_where(|o| o.addr == addr && o.token == *token)
  }

  /// Remove a peer's observation of a resource
  pub(crate) fn remove(&mut self, addr: SocketAddr, resource: ResourceId) -> usize {
    self.remove_where(|o| o.addr == addr && o.resource == resource)
  }

  pub(crate) fn record_sent(&mut self, addr: SocketAddr, resource: ResourceId, seq: u32) {
    self.slots
        .iter_mut()
        .filter_map(Option::as_mut)
        .filter(|o| o.addr == addr && o.resource == resource)
        .for_each(|o| o.last_seq = seq);
  }

  fn remove_where(&mut self, f: impl Fn(&Observer) -> bool) -> usize {
    let mut n = 0;
    for slot in self.slots.iter_mut() {
      if matches!(slot, Some(o) if f(o)) {
        *slot = None;
        n += 1;
      }
    }
    n
  }
}
