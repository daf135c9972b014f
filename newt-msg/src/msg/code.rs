#[cfg(feature = "alloc")]
use std_alloc::string::{String, ToString};

/// # Message Code
/// 8-bit unsigned integer, split into a 3-bit class (most
/// significant bits) and a 5-bit detail (least significant bits),
/// written `c.dd`.
///
/// A class of 0 indicates a request (or, for 0.00, an empty message),
/// classes 2, 4 and 5 are success, client error and server error responses.
///
/// Classes 6 and 7 never appear on the wire; see [`Code::sendable`].
///
/// # Examples
/// ```
/// use newt_msg::Code;
/// assert_eq!(Code { class: 2, detail: 5 }.to_string(), "2.05".to_string())
/// ```
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Code {
  /// The "class" of message codes identify it as a request or response, and provides the class of response status:
  ///
  /// |class|meaning|
  /// |---|---|
  /// |`0`|Message is a request|
  /// |`2`|Message is a success response|
  /// |`4`|Message is a client error response|
  /// |`5`|Message is a server error response|
  /// |`6`|Internal failure that must be reported as 5.00|
  pub class: u8,

  /// 2-digit integer (range `[0, 32)`) that provides granular information about the response status.
  ///
  /// For requests this is the method.
  pub detail: u8,
}

/// Whether a code is for a request, response, or empty message
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum CodeKind {
  /// A request code (0.01 - 0.31)
  Request,
  /// A response code ([2-5].xx)
  Response,
  /// EMPTY (0.00)
  Empty,
}

impl Code {
  /// Create a new Code
  ///
  /// ```
  /// use newt_msg::Code;
  ///
  /// let content = Code::new(2, 05);
  /// ```
  pub const fn new(class: u8, detail: u8) -> Self {
    Self { class, detail }
  }

  /// Get the human string representation of a message code
  ///
  /// # Returns
  /// A `char` array
  ///
  /// This is to avoid unnecessary heap allocation,
  /// you can create a `String` with `FromIterator::<String>::from_iter`,
  /// or if the `alloc` feature is enabled there is a `ToString` implementation provided for Code.
  /// ```
  /// use newt_msg::Code;
  ///
  /// let code = Code { class: 2, detail: 5 };
  /// let chars = code.to_human();
  /// let string = String::from_iter(chars);
  /// assert_eq!(string, "2.05".to_string());
  /// ```
  pub fn to_human(&self) -> [char; 4] {
    let to_char = |d: u8| char::from_digit((d % 10).into(), 10).unwrap_or('?');
    [to_char(self.class),
     '.',
     to_char(self.detail / 10),
     to_char(self.detail % 10)]
  }

  /// Get whether this code is for a request, response, or empty message
  ///
  /// ```
  /// use newt_msg::{Code, CodeKind};
  ///
  /// assert_eq!(Code::new(0, 0).kind(), CodeKind::Empty);
  /// assert_eq!(Code::new(0, 1).kind(), CodeKind::Request);
  /// assert_eq!(Code::new(2, 5).kind(), CodeKind::Response);
  /// ```
  pub fn kind(&self) -> CodeKind {
    match (self.class, self.detail) {
      | (0, 0) => CodeKind::Empty,
      | (0, _) => CodeKind::Request,
      | _ => CodeKind::Response,
    }
  }

  /// Is this one of the four methods this dialect defines (GET, POST, PUT, DELETE)?
  pub fn is_method(&self) -> bool {
    self.class == 0 && (1..=4).contains(&self.detail)
  }

  /// Is this a 2.xx code?
  pub fn is_success(&self) -> bool {
    self.class == 2
  }

  /// Codes with a class of 6 or above are internal sentinels
  /// (see [`MEMORY_ALLOCATION_ERROR`], [`PACKET_SERIALIZATION_ERROR`])
  /// and must never be sent to a peer.
  pub fn is_internal(&self) -> bool {
    u8::from(*self) >= u8::from(MEMORY_ALLOCATION_ERROR)
  }

  /// Clamp internal codes to [`INTERNAL_SERVER_ERROR`],
  /// leaving any other code as-is.
  ///
  /// ```
  /// use newt_msg::code::{Code, INTERNAL_SERVER_ERROR, MEMORY_ALLOCATION_ERROR, NOT_FOUND};
  ///
  /// assert_eq!(MEMORY_ALLOCATION_ERROR.sendable(), INTERNAL_SERVER_ERROR);
  /// assert_eq!(NOT_FOUND.sendable(), NOT_FOUND);
  /// ```
  pub fn sendable(self) -> Code {
    if self.is_internal() {
      INTERNAL_SERVER_ERROR
    } else {
      self
    }
  }
}

#[cfg(feature = "alloc")]
impl ToString for Code {
  fn to_string(&self) -> String {
    String::from_iter(self.to_human())
  }
}

impl From<u8> for Code {
  fn from(b: u8) -> Self {
    let class = b >> 5;
    let detail = b & 0b0011111;

    Code { class, detail }
  }
}

impl From<Code> for u8 {
  fn from(code: Code) -> u8 {
    let class = code.class << 5;
    let detail = code.detail & 0b0011111;

    class | detail
  }
}

macro_rules! code {
  ($(#[$meta:meta])* $name:ident = $c:literal * $d:literal) => {
    $(#[$meta])*
    #[allow(clippy::zero_prefixed_literal)]
    pub const $name: Code = Code::new($c, $d);
  };
}

code!(
  /// 0.00 Empty message
  EMPTY = 0 * 00
);

// 0.xx
code!(
  /// 0.01 GET
  GET = 0 * 01
);
code!(
  /// 0.02 POST
  POST = 0 * 02
);
code!(
  /// 0.03 PUT
  PUT = 0 * 03
);
code!(
  /// 0.04 DELETE
  DELETE = 0 * 04
);

// 2.xx
code!(
  /// 2.01 Created
  CREATED = 2 * 01
);
code!(
  /// 2.02 Deleted
  DELETED = 2 * 02
);
code!(
  /// 2.03 Valid
  VALID = 2 * 03
);
code!(
  /// 2.04 Changed
  CHANGED = 2 * 04
);
code!(
  /// 2.05 Content
  CONTENT = 2 * 05
);

// 4.xx
code!(
  /// 4.00 Bad Request
  BAD_REQUEST = 4 * 00
);
code!(
  /// 4.01 Unauthorized
  UNAUTHORIZED = 4 * 01
);
code!(
  /// 4.02 Bad Option
  ///
  /// Sent for malformed or unsupported critical options,
  /// and for block requests past the end of a representation.
  BAD_OPTION = 4 * 02
);
code!(
  /// 4.03 Forbidden
  FORBIDDEN = 4 * 03
);
code!(
  /// 4.04 Not Found
  NOT_FOUND = 4 * 04
);
code!(
  /// 4.05 Method Not Allowed
  METHOD_NOT_ALLOWED = 4 * 05
);
code!(
  /// 4.12 Precondition Failed
  PRECONDITION_FAILED = 4 * 12
);
code!(
  /// 4.13 Request Entity Too Large
  REQUEST_ENTITY_TOO_LARGE = 4 * 13
);
code!(
  /// 4.15 Unsupported Media Type
  UNSUPPORTED_MEDIA_TYPE = 4 * 15
);

// 5.xx
code!(
  /// 5.00 Internal Server Error
  INTERNAL_SERVER_ERROR = 5 * 00
);
code!(
  /// 5.01 Not Implemented
  NOT_IMPLEMENTED = 5 * 01
);
code!(
  /// 5.02 Bad Gateway
  BAD_GATEWAY = 5 * 02
);
code!(
  /// 5.03 Service Unavailable
  SERVICE_UNAVAILABLE = 5 * 03
);
code!(
  /// 5.04 Gateway Timeout
  GATEWAY_TIMEOUT = 5 * 04
);
code!(
  /// 5.05 Proxying Not Supported
  PROXYING_NOT_SUPPORTED = 5 * 05
);

// 6.xx, never sent
code!(
  /// A transaction (or other fixed slot) could not be allocated
  MEMORY_ALLOCATION_ERROR = 6 * 00
);
code!(
  /// A response did not fit in its send buffer
  PACKET_SERIALIZATION_ERROR = 6 * 01
);

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_eqb;

  #[test]
  fn parse_code() {
    let byte = 0b_01_000101u8;
    let code = Code::from(byte);
    assert_eq!(code, Code { class: 2, detail: 5 })
  }

  #[test]
  fn serialize_code() {
    let code = Code { class: 2, detail: 5 };
    let actual: u8 = code.into();
    let expected = 0b_010_00101u8;
    assert_eqb!(actual, expected)
  }

  #[test]
  fn constants_split_class_and_detail() {
    assert_eq!(EMPTY, Code::new(0, 0));
    assert_eq!(DELETE, Code::new(0, 4));
    assert_eq!(CONTENT, Code::new(2, 5));
    assert_eq!(PRECONDITION_FAILED, Code::new(4, 12));
    assert_eq!(PROXYING_NOT_SUPPORTED, Code::new(5, 5));
    assert_eq!(u8::from(BAD_OPTION), 0b_100_00010);
  }

  #[test]
  fn internal_codes() {
    assert_eq!(u8::from(MEMORY_ALLOCATION_ERROR), 192);
    assert_eq!(u8::from(PACKET_SERIALIZATION_ERROR), 193);
    assert!(PACKET_SERIALIZATION_ERROR.is_internal());
    assert!(!PROXYING_NOT_SUPPORTED.is_internal());
    assert_eq!(Code::from(255).sendable(), INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn methods() {
    assert!(GET.is_method());
    assert!(DELETE.is_method());
    assert!(!EMPTY.is_method());
    assert!(!Code::new(0, 5).is_method());
    assert!(!CONTENT.is_method());
  }
}
