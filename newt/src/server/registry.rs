use newt_msg::Message;
use tinyvec::ArrayVec;

use super::{discovery, Exchange, Kind, Resource, ResourceId};
use crate::config::MAX_RESOURCES;
use crate::req::{Method, Methods};
use crate::resp::Resp;

/// Every resource slot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

/// Where a request should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
  /// To this resource
  Found(ResourceId),
  /// No resource lives at the request's path
  NotFound,
  /// The resource at the path does not accept the request's method
  MethodNotAllowed,
}

/// `(url, attributes)` of every entry, in registration order
type Links<'a, 'r> = core::iter::Map<core::slice::Iter<'a, Entry<'r>>, fn(&'a Entry<'r>) -> (&'a str, &'a str)>;

#[derive(Default)]
struct Entry<'r> {
  /// `None` for `/.well-known/core`
  res: Option<&'r mut dyn Resource>,
  seq: u32,
  next_trigger: Option<u64>,
}

impl<'r> Entry<'r> {
  fn url(&self) -> &str {
    self.res.as_ref().map(|r| r.url()).unwrap_or(discovery::URL)
  }

  fn attributes(&self) -> &str {
    self.res.as_ref().map(|r| r.attributes()).unwrap_or("")
  }

  fn methods(&self) -> Methods {
    self.res.as_ref().map(|r| r.methods()).unwrap_or(Methods::GET)
  }

  fn kind(&self) -> Kind {
    self.res.as_ref().map(|r| r.kind()).unwrap_or(Kind::Plain)
  }

  fn link(&self) -> (&str, &str) {
    (self.url(), self.attributes())
  }
}

/// Append-only list of resources served by a node.
///
/// `/.well-known/core` is always the first.
pub struct Registry<'r> {
  entries: ArrayVec<[Entry<'r>; MAX_RESOURCES]>,
}

impl<'r> core::fmt::Debug for Registry<'r> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_list()
     .entries(self.entries.iter().map(Entry::url))
     .finish()
  }
}

impl<'r> Default for Registry<'r> {
  fn default() -> Self {
    let mut entries = ArrayVec::new();
    entries.push(Entry::default());
    Self { entries }
  }
}

impl<'r> Registry<'r> {
  /// Add a resource
  pub fn activate(&mut self, res: &'r mut dyn Resource) -> Result<ResourceId, RegistryFull> {
    if self.entries.len() >= MAX_RESOURCES {
      return Err(RegistryFull);
    }

    log::debug!("activating {}", res.url());
    self.entries.push(Entry { res: Some(res),
                              seq: 0,
                              next_trigger: None });
    Ok(ResourceId(self.entries.len() - 1))
  }

  /// Number of resources, including `/.well-known/core`
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Find the resource a request is addressed to
  pub fn dispatch(&self, req: &Message) -> Dispatch {
    let found = self.entries
                    .iter()
                    .position(|e| req.path_eq(e.url()))
                    .map(ResourceId);

    match (found, Method::from_code(req.code)) {
      | (None, _) => Dispatch::NotFound,
      | (Some(id), Some(method)) if self.entries[id.0].methods().allows(method) => {
        Dispatch::Found(id)
      },
      | (Some(_), _) => Dispatch::MethodNotAllowed,
    }
  }

  #[allow(missing_docs)]
  pub fn url(&self, id: ResourceId) -> Option<&str> {
    self.entries.get(id.0).map(Entry::url)
  }

  #[allow(missing_docs)]
  pub fn kind(&self, id: ResourceId) -> Option<Kind> {
    self.entries.get(id.0).map(Entry::kind)
  }

  /// Sequence number of the last notification triggered for a resource
  pub fn sequence(&self, id: ResourceId) -> Option<u32> {
    self.entries.get(id.0).map(|e| e.seq)
  }

  pub(crate) fn bump_sequence(&mut self, id: ResourceId) -> Option<u32> {
    self.entries.get_mut(id.0).map(|e| {
                                 e.seq = e.seq.wrapping_add(1);
                                 e.seq
                               })
  }

  pub(crate) fn handle(&mut self, id: ResourceId, ex: &mut Exchange<'_, '_>) {
    if id == ResourceId::DISCOVERY {
      discovery::handle(self.links(), ex);
    } else if let Some(Entry { res: Some(res), .. }) = self.entries.get_mut(id.0) {
      res.handle(ex);
    }
  }

  pub(crate) fn notify(&mut self, id: ResourceId, resp: &mut Resp<'_>) -> bool {
    match self.entries.get_mut(id.0) {
      | Some(Entry { res: Some(res), .. }) => res.notify(resp),
      | _ => false,
    }
  }

  /// Periodic resources whose period has elapsed at `now`.
  ///
  /// A periodic resource's first period starts the first time it is polled.
  pub(crate) fn take_due(&mut self, now: u64) -> ArrayVec<[ResourceId; MAX_RESOURCES]> {
    let mut due = ArrayVec::new();

    for (ix, e) in self.entries.iter_mut().enumerate() {
      let period = match e.kind() {
        | Kind::Periodic { period } => period.0,
        | _ => continue,
      };

      match e.next_trigger {
        | Some(at) if now >= at => {
          e.next_trigger = Some(now + period);
          due.push(ResourceId(ix));
        },
        | None => e.next_trigger = Some(now + period),
        | _ => (),
      }
    }

    due
  }

  fn links<'a>(&'a self) -> Links<'a, 'r> {
    self.entries
        .iter()
        .map(Entry::link as fn(&'a Entry<'r>) -> (&'a str, &'a str))
  }
}
