/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Transaction ID
pub mod id;

/// Message Options
pub mod opt;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::{Code, CodeKind};
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

/// Max-Age assumed when a response carries no Max-Age option, in seconds
pub const DEFAULT_MAX_AGE: u32 = 60;

/// Message payload; a view into the buffer the message
/// was parsed from or will be serialized from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Payload<'a>(pub &'a [u8]);

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (request, response, empty)
/// |  |
/// |  |  Number of options (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) oc: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let oc = b & 0b1111u8; // last 4 bits

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               oc })
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let oc = b.oc & 0b1111;

    ver | ty | oc
  }
}

/// # CoAP Messages
/// This struct is a view of a draft-07 CoAP message.
///
/// It never owns option values or the payload; those borrow
/// either the datagram it was parsed from or whatever buffers
/// the caller built it from, so a `Message<'a>` cannot outlive them.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |Ver| T |  OC   |      Code     |          Transaction ID       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Options (if any) ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   Payload (if any) ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The option count is not stored; it is derived from [`Message::opts`] and
/// [`Message::token`] when serializing (see [`Message::option_count`]).
///
/// ```
/// use newt_msg::{code, Block, Id, Message, Type};
///
/// let mut req = Message::new(Type::Con, code::GET, Id(1));
/// req.set_uri_path("sensors/temperature").unwrap();
/// req.set_block2(Block::new(64, 2, false)).unwrap();
///
/// assert!(req.path_eq("sensors/temperature"));
/// assert_eq!(req.block2().map(|b| b.num()), Some(2));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Message<'a> {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// Options other than the token, kept in ascending order
  pub opts: Opts<'a>,
  /// see [`Payload`]
  pub payload: Payload<'a>,
}

impl<'a> Message<'a> {
  /// Create a message with no token, options or payload
  pub fn new(ty: Type, code: Code, id: Id) -> Self {
    Self { id,
           ty,
           ver: Version::default(),
           token: Token::default(),
           code,
           opts: Opts::default(),
           payload: Payload(&[]) }
  }

  /// Number of options this message will carry on the wire,
  /// including the token and any fence-posts
  pub fn option_count(&self) -> usize {
    let mut count = 0;
    crate::to_bytes::walk_options(self, |_, _| {
      count += 1;
      Ok(())
    }).ok();
    count
  }

  /// Get the first value of an option
  pub fn get(&self, number: OptNumber) -> Option<OptValue<'a>> {
    self.opts.iter().find(|o| o.number == number).map(|o| o.value)
  }

  /// Get all values of a repeatable option, in order
  pub fn get_all(&self, number: OptNumber) -> impl Iterator<Item = OptValue<'a>> + '_ {
    self.opts
        .iter()
        .filter(move |o| o.number == number)
        .map(|o| o.value)
  }

  /// Does this message have an option?
  pub fn has(&self, number: OptNumber) -> bool {
    self.opts.iter().any(|o| o.number == number)
  }

  /// Replace all values of an option with `value`
  pub fn set(&mut self, number: OptNumber, value: impl Into<OptValue<'a>>) -> Result<(), SetOptionError> {
    self.remove(number);
    self.add(number, value)
  }

  /// Add a value for an option, after any existing values for it
  pub fn add(&mut self, number: OptNumber, value: impl Into<OptValue<'a>>) -> Result<(), SetOptionError> {
    let value = value.into();

    match number.max_len() {
      | Some(max) if value.len() > max => {
        return Err(SetOptionError::ValueTooLong { number,
                                                  len: value.len() })
      },
      | _ => (),
    }

    if self.opts.len() >= MAX_OPTIONS {
      return Err(SetOptionError::TooManyOptions);
    }

    let ix = self.opts
                 .iter()
                 .position(|o| o.number > number)
                 .unwrap_or(self.opts.len());
    self.opts.insert(ix, Opt { number, value });
    Ok(())
  }

  /// Remove all values of an option
  pub fn remove(&mut self, number: OptNumber) {
    self.opts.retain(|o| o.number != number);
  }

  fn set_segments(&mut self,
                  number: OptNumber,
                  value: &'a str,
                  sep: char)
                  -> Result<(), SetOptionError> {
    self.remove(number);
    value.split(sep)
         .filter(|s| !s.is_empty())
         .try_for_each(|s| self.add(number, s))
  }

  fn str_of(&self, number: OptNumber) -> Option<&'a str> {
    self.get(number)
        .and_then(|v| v.as_bytes())
        .and_then(|bs| core::str::from_utf8(bs).ok())
  }

  /// Set the token, failing if it is longer than 8 bytes
  pub fn set_token(&mut self, token: &[u8]) -> Result<(), SetOptionError> {
    Token::from_bytes(token).map(|t| self.token = t)
                            .ok_or(SetOptionError::ValueTooLong { number: TOKEN,
                                                                  len: token.len() })
  }

  /// Get the Content-Type
  pub fn content_type(&self) -> Option<ContentFormat> {
    self.get(CONTENT_TYPE)
        .and_then(|v| v.as_uint())
        .map(|n| ContentFormat::from(n as u16))
  }

  /// Set the Content-Type
  pub fn set_content_type(&mut self, format: ContentFormat) -> Result<(), SetOptionError> {
    self.set(CONTENT_TYPE, u32::from(u16::from(format)))
  }

  /// Get the first Accept value
  pub fn accept(&self) -> Option<ContentFormat> {
    self.get(ACCEPT)
        .and_then(|v| v.as_uint())
        .map(|n| ContentFormat::from(n as u16))
  }

  /// Get the Max-Age, see [`DEFAULT_MAX_AGE`] for its value when absent
  pub fn max_age(&self) -> Option<u32> {
    self.get(MAX_AGE).and_then(|v| v.as_uint())
  }

  /// Set the Max-Age
  pub fn set_max_age(&mut self, seconds: u32) -> Result<(), SetOptionError> {
    self.set(MAX_AGE, seconds)
  }

  /// Get the ETag
  pub fn etag(&self) -> Option<&'a [u8]> {
    self.get(ETAG).and_then(|v| v.as_bytes())
  }

  /// Set the ETag (1-8 bytes)
  pub fn set_etag(&mut self, etag: &'a [u8]) -> Result<(), SetOptionError> {
    self.set(ETAG, etag)
  }

  /// Get the first If-Match value
  pub fn if_match(&self) -> Option<&'a [u8]> {
    self.get(IF_MATCH).and_then(|v| v.as_bytes())
  }

  /// Set If-Match
  pub fn set_if_match(&mut self, etag: &'a [u8]) -> Result<(), SetOptionError> {
    self.set(IF_MATCH, etag)
  }

  /// Is If-None-Match present?
  pub fn if_none_match(&self) -> bool {
    self.has(IF_NONE_MATCH)
  }

  /// Add If-None-Match
  pub fn set_if_none_match(&mut self) -> Result<(), SetOptionError> {
    self.set(IF_NONE_MATCH, OptValue::Bytes(&[]))
  }

  /// Get the Uri-Host
  pub fn uri_host(&self) -> Option<&'a str> {
    self.str_of(URI_HOST)
  }

  /// Set the Uri-Host
  pub fn set_uri_host(&mut self, host: &'a str) -> Result<(), SetOptionError> {
    self.set(URI_HOST, host)
  }

  /// Get the segments of the Uri-Path
  pub fn uri_path(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
    self.get_all(URI_PATH).filter_map(|v| v.as_bytes())
  }

  /// Set the Uri-Path, one option per non-empty `/`-separated segment
  pub fn set_uri_path(&mut self, path: &'a str) -> Result<(), SetOptionError> {
    self.set_segments(URI_PATH, path, '/')
  }

  /// Does the Uri-Path match a `/`-separated path?
  ///
  /// Leading, trailing and repeated slashes are ignored.
  pub fn path_eq(&self, path: &str) -> bool {
    let mut want = path.split('/').filter(|s| !s.is_empty());
    let mut have = self.uri_path();

    loop {
      match (want.next(), have.next()) {
        | (None, None) => break true,
        | (Some(w), Some(h)) if w.as_bytes() == h => continue,
        | _ => break false,
      }
    }
  }

  /// Get the `&`-separated arguments of the Uri-Query
  pub fn uri_query(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
    self.get_all(URI_QUERY).filter_map(|v| v.as_bytes())
  }

  /// Set the Uri-Query, one option per non-empty `&`-separated argument
  pub fn set_uri_query(&mut self, query: &'a str) -> Result<(), SetOptionError> {
    self.set_segments(URI_QUERY, query, '&')
  }

  /// Get the segments of the Location-Path
  pub fn location_path(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
    self.get_all(LOCATION_PATH).filter_map(|v| v.as_bytes())
  }

  /// Set the Location-Path, one option per non-empty `/`-separated segment
  pub fn set_location_path(&mut self, path: &'a str) -> Result<(), SetOptionError> {
    self.set_segments(LOCATION_PATH, path, '/')
  }

  /// Get the arguments of the Location-Query
  pub fn location_query(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
    self.get_all(LOCATION_QUERY).filter_map(|v| v.as_bytes())
  }

  /// Set the Location-Query, one option per non-empty `&`-separated argument
  pub fn set_location_query(&mut self, query: &'a str) -> Result<(), SetOptionError> {
    self.set_segments(LOCATION_QUERY, query, '&')
  }

  /// Get the Observe value
  pub fn observe(&self) -> Option<u32> {
    self.get(OBSERVE).and_then(|v| v.as_uint())
  }

  /// Set Observe. Sequence numbers wrap at 16 bits.
  pub fn set_observe(&mut self, seq: u32) -> Result<(), SetOptionError> {
    self.set(OBSERVE, seq & 0xFFFF)
  }

  /// Get the Block2 option
  pub fn block2(&self) -> Option<Block> {
    self.get(BLOCK2).and_then(|v| v.as_uint()).map(Block::from)
  }

  /// Set the Block2 option
  pub fn set_block2(&mut self, block: Block) -> Result<(), SetOptionError> {
    self.set(BLOCK2, u32::from(block))
  }

  /// Get the Block1 option
  pub fn block1(&self) -> Option<Block> {
    self.get(BLOCK1).and_then(|v| v.as_uint()).map(Block::from)
  }

  /// Set the Block1 option
  pub fn set_block1(&mut self, block: Block) -> Result<(), SetOptionError> {
    self.set(BLOCK1, u32::from(block))
  }

  /// Set the payload
  pub fn set_payload(&mut self, payload: &'a [u8]) {
    self.payload = Payload(payload);
  }
}
