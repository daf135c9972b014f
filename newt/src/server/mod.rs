use crate::core::separate::{SeparateSlot, SlotOccupied};
use crate::req::{Methods, Req};
use crate::resp::Resp;
use crate::time::Millis;

/// `/.well-known/core`
pub mod discovery;

/// The resource registry
pub mod registry;

#[doc(inline)]
pub use registry::{Dispatch, Registry};

/// Index of an activated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
  /// The id of `/.well-known/core`, always the first resource
  pub const DISCOVERY: ResourceId = ResourceId(0);
}

/// How a resource produces notifications for its observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  /// Not observable
  Plain,
  /// Observable; notifications are pushed when the application calls
  /// [`Core::trigger`](crate::core::Core::trigger)
  Event,
  /// Observable; triggered by [`Core::tick`](crate::core::Core::tick)
  /// every `period`
  Periodic {
    #[allow(missing_docs)]
    period: Millis,
  },
}

impl Kind {
  /// May peers observe this resource?
  pub fn is_observable(&self) -> bool {
    !matches!(self, Kind::Plain)
  }
}

/// Something living at a URL on this node
///
/// ```
/// use core::fmt::Write;
///
/// use newt::req::Methods;
/// use newt::server::{Exchange, Resource};
///
/// struct Hello;
///
/// impl Resource for Hello {
///   fn url(&self) -> &str {
///     "hello"
///   }
///
///   fn methods(&self) -> Methods {
///     Methods::GET
///   }
///
///   fn attributes(&self) -> &str {
///     "title=\"Hello world\";ct=0"
///   }
///
///   fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
///     write!(ex.resp(), "Hello, world!").ok();
///   }
/// }
/// ```
pub trait Resource {
  /// The `/`-separated path of this resource, without a leading slash
  fn url(&self) -> &str;

  /// Methods the handler accepts; requests with any other
  /// method are answered with 4.05 Method Not Allowed.
  fn methods(&self) -> Methods;

  /// Link-format attributes advertised by `/.well-known/core`,
  /// e.g. `title="Temperature";ct=0`
  fn attributes(&self) -> &str {
    ""
  }

  #[allow(missing_docs)]
  fn kind(&self) -> Kind {
    Kind::Plain
  }

  /// Handle a request.
  ///
  /// Either populate [`Exchange::resp`], use the offset to produce
  /// the response in blocks (see [`crate::blockwise`]), or
  /// [`Exchange::accept`] the request and answer it later.
  fn handle(&mut self, ex: &mut Exchange<'_, '_>);

  /// Build a notification for this resource's observers.
  ///
  /// Return `false` to skip notifying.
  fn notify(&mut self, resp: &mut Resp<'_>) -> bool {
    let _ = resp;
    false
  }
}

/// What the handler decided to do with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
  Respond,
  Deferred,
  Dropped,
}

/// A request being handled, along with the response being built for it
#[derive(Debug)]
pub struct Exchange<'x, 'a> {
  req: Req<'a>,
  resp: Resp<'x>,
  preferred_size: u16,
  offset: i32,
  separate: &'x mut SeparateSlot,
  outcome: Outcome,
}

impl<'x, 'a> Exchange<'x, 'a> {
  pub(crate) fn new(req: Req<'a>,
                    resp: Resp<'x>,
                    preferred_size: u16,
                    offset: i32,
                    separate: &'x mut SeparateSlot)
                    -> Self {
    Self { req,
           resp,
           preferred_size,
           offset,
           separate,
           outcome: Outcome::Respond }
  }

  /// The request being handled
  pub fn req(&self) -> &Req<'a> {
    &self.req
  }

  /// The response to populate
  pub fn resp(&mut self) -> &mut Resp<'x> {
    &mut self.resp
  }

  /// The block size the response will be sent in
  pub fn preferred_size(&self) -> u16 {
    self.preferred_size
  }

  /// Byte offset of the block being asked for
  pub fn offset(&self) -> i32 {
    self.offset
  }

  /// Move the offset to say how far into the representation we got.
  ///
  /// See [`crate::blockwise`].
  pub fn set_offset(&mut self, offset: i32) {
    self.offset = offset;
  }

  /// Defer the response.
  ///
  /// Nothing will be sent for this request until the application calls
  /// [`Core::resume_separate`](crate::core::Core::resume_separate).
  /// Only one request may be deferred at a time.
  pub fn accept(&mut self) -> Result<(), SlotOccupied> {
    self.separate.accept(self.req.as_addrd())?;
    self.outcome = Outcome::Deferred;
    Ok(())
  }

  /// Send nothing at all in response to this request
  pub fn reject(&mut self) {
    self.outcome = Outcome::Dropped;
  }

  /// Is a separate response already pending?
  pub fn separate_pending(&self) -> bool {
    self.separate.is_occupied()
  }

  pub(crate) fn finish(self) -> (Resp<'x>, i32, Outcome) {
    (self.resp, self.offset, self.outcome)
  }
}
