use newt_msg::{Block, Message, Token};
use no_std_net::SocketAddr;

use crate::net::Addrd;

/// Request methods
pub mod method;

#[doc(inline)]
pub use method::{Method, Methods};

/// An inbound request, as seen by a resource handler
///
/// ```
/// use newt::net::Addrd;
/// use newt::req::{Method, Req};
/// use newt_msg::{code, Id, Message, Type};
///
/// let mut msg = Message::new(Type::Con, code::POST, Id(1));
/// msg.set_uri_path("rd").unwrap();
/// msg.set_uri_query("ep=node-1&rt=sensor").unwrap();
/// msg.set_payload(b"lt=60&note=hi");
///
/// let req = Req::new(Addrd(msg, "10.0.0.1:5683".parse().unwrap()));
/// assert_eq!(req.method(), Some(Method::POST));
/// assert_eq!(req.query_variable("rt"), Some("sensor"));
/// assert_eq!(req.post_variable("lt"), Some("60"));
/// assert_eq!(req.post_variable("ep"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Req<'a>(Addrd<Message<'a>>);

impl<'a> Req<'a> {
  #[allow(missing_docs)]
  pub fn new(msg: Addrd<Message<'a>>) -> Self {
    Self(msg)
  }

  /// The request message
  pub fn msg(&self) -> &Message<'a> {
    self.0.data()
  }

  /// Who sent the request
  pub fn addr(&self) -> SocketAddr {
    self.0.addr()
  }

  #[allow(missing_docs)]
  pub fn as_addrd(&self) -> Addrd<&Message<'a>> {
    self.0.as_ref()
  }

  /// `None` if this message is not a request
  pub fn method(&self) -> Option<Method> {
    Method::from_code(self.msg().code)
  }

  #[allow(missing_docs)]
  pub fn token(&self) -> Token {
    self.msg().token
  }

  #[allow(missing_docs)]
  pub fn payload(&self) -> &'a [u8] {
    self.msg().payload.0
  }

  /// The payload, if it is valid UTF-8
  pub fn payload_str(&self) -> Option<&'a str> {
    core::str::from_utf8(self.payload()).ok()
  }

  /// The block of the response the client asked for
  pub fn block2(&self) -> Option<Block> {
    self.msg().block2()
  }

  /// Does the request ask to observe the resource?
  pub fn observe(&self) -> Option<u32> {
    self.msg().observe()
  }

  /// Find `name=value` among the Uri-Query arguments
  pub fn query_variable(&self, name: &str) -> Option<&'a str> {
    let msg = *self.msg();
    let found = msg.uri_query()
                   .filter_map(|arg| core::str::from_utf8(arg).ok())
                   .find_map(|arg| variable(arg, name));
    found
  }

  /// Find `name=value` in a `&`-separated form payload
  pub fn post_variable(&self, name: &str) -> Option<&'a str> {
    self.payload_str()
        .and_then(|form| form.split('&').find_map(|arg| variable(arg, name)))
  }
}

fn variable<'a>(arg: &'a str, name: &str) -> Option<&'a str> {
  match arg.split_once('=') {
    | Some((k, v)) if k == name => Some(v),
    | None if arg == name => Some(""),
    | _ => None,
  }
}
