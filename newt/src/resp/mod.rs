use core::fmt::Write;

use newt_msg::{Block, Code, ContentFormat, Id, Message, SetOptionError, Token, Type};
use tinyvec::ArrayVec;
use toad_writable::Writable;

/// Response codes
pub mod code;

/// A response under construction.
///
/// Small header values live inline, the payload is written
/// into a scratch buffer owned by the engine.
///
/// ```
/// use core::fmt::Write;
///
/// use newt::resp::{code, Resp};
/// use newt_msg::ContentFormat;
///
/// let mut buf = [0u8; 64];
/// let mut resp = Resp::new(&mut buf);
/// resp.set_code(code::CHANGED);
/// resp.set_content_type(ContentFormat::Text);
/// write!(resp, "poll = {}s", 15).unwrap();
///
/// assert_eq!(resp.code(), code::CHANGED);
/// assert_eq!(resp.payload(), b"poll = 15s");
/// ```
#[derive(Debug)]
pub struct Resp<'s> {
  code: Code,
  content_type: Option<ContentFormat>,
  max_age: Option<u32>,
  etag: Option<ArrayVec<[u8; 8]>>,
  location_path: Writable<ArrayVec<[u8; 64]>>,
  observe: Option<u32>,
  block2: Option<Block>,
  buf: &'s mut [u8],
  len: usize,
}

impl<'s> Resp<'s> {
  /// Create a 2.05 Content response writing its payload into `buf`
  pub fn new(buf: &'s mut [u8]) -> Self {
    Self { code: code::CONTENT,
           content_type: None,
           max_age: None,
           etag: None,
           location_path: Default::default(),
           observe: None,
           block2: None,
           buf,
           len: 0 }
  }

  #[allow(missing_docs)]
  pub fn code(&self) -> Code {
    self.code
  }

  #[allow(missing_docs)]
  pub fn set_code(&mut self, code: Code) {
    self.code = code;
  }

  #[allow(missing_docs)]
  pub fn set_content_type(&mut self, format: ContentFormat) {
    self.content_type = Some(format);
  }

  #[allow(missing_docs)]
  pub fn set_max_age(&mut self, seconds: u32) {
    self.max_age = Some(seconds);
  }

  /// Set the ETag; tags longer than 8 bytes are truncated
  pub fn set_etag(&mut self, etag: &[u8]) {
    self.etag = Some(etag.iter().copied().take(8).collect());
  }

  /// Set the Location-Path, e.g. the path of a resource created by a POST.
  ///
  /// Yields `Err` if the path does not fit.
  pub fn set_location_path(&mut self, path: &str) -> core::fmt::Result {
    let mut location: Writable<ArrayVec<[u8; 64]>> = Default::default();
    location.write_str(path)?;
    self.location_path = location;
    Ok(())
  }

  pub(crate) fn set_observe(&mut self, seq: u32) {
    self.observe = Some(seq);
  }

  pub(crate) fn set_block2(&mut self, block: Block) {
    self.block2 = Some(block);
  }

  /// The payload written so far
  pub fn payload(&self) -> &[u8] {
    &self.buf[..self.len]
  }

  /// How many payload bytes fit
  pub fn capacity(&self) -> usize {
    self.buf.len()
  }

  /// Replace the payload, truncating it to [`Resp::capacity`].
  ///
  /// Yields the number of bytes copied.
  pub fn set_payload(&mut self, bytes: &[u8]) -> usize {
    let n = bytes.len().min(self.buf.len());
    self.buf[..n].copy_from_slice(&bytes[..n]);
    self.len = n;
    n
  }

  /// Append to the payload as many of `bytes` as fit,
  /// yielding how many did.
  pub fn extend(&mut self, bytes: &[u8]) -> usize {
    let n = bytes.len().min(self.buf.len() - self.len);
    self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
    self.len += n;
    n
  }

  /// Drop everything past the first `len` payload bytes
  pub fn truncate(&mut self, len: usize) {
    self.len = self.len.min(len);
  }

  /// Keep only `len` payload bytes starting at `start`
  pub(crate) fn slice(&mut self, start: usize, len: usize) {
    let start = start.min(self.len);
    let end = (start + len).min(self.len);
    self.buf.copy_within(start..end, 0);
    self.len = end - start;
  }

  /// Build the response message
  pub fn to_message(&self, ty: Type, id: Id, token: Token) -> Result<Message<'_>, SetOptionError> {
    let mut msg = Message::new(ty, self.code.sendable(), id);
    msg.token = token;

    if let Some(format) = self.content_type {
      msg.set_content_type(format)?;
    }

    if let Some(seconds) = self.max_age {
      msg.set_max_age(seconds)?;
    }

    if let Some(etag) = self.etag.as_ref() {
      msg.set_etag(etag)?;
    }

    if !self.location_path.as_str().is_empty() {
      msg.set_location_path(self.location_path.as_str())?;
    }

    if let Some(seq) = self.observe {
      msg.set_observe(seq)?;
    }

    if let Some(block) = self.block2 {
      msg.set_block2(block)?;
    }

    msg.set_payload(self.payload());
    Ok(msg)
  }
}

impl<'s> Write for Resp<'s> {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    let bytes = s.as_bytes();
    let end = self.len + bytes.len();

    if end > self.buf.len() {
      return Err(core::fmt::Error);
    }

    self.buf[self.len..end].copy_from_slice(bytes);
    self.len = end;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn write_past_capacity_fails() {
    let mut buf = [0u8; 4];
    let mut resp = Resp::new(&mut buf);

    assert!(write!(resp, "abc").is_ok());
    assert!(write!(resp, "de").is_err());
    assert_eq!(resp.payload(), b"abc");
  }

  #[test]
  fn slice() {
    let mut buf = [0u8; 16];
    let mut resp = Resp::new(&mut buf);
    resp.set_payload(b"0123456789");
    resp.slice(4, 100);
    assert_eq!(resp.payload(), b"456789");
  }

  #[test]
  fn message_carries_headers() {
    let mut buf = [0u8; 16];
    let mut resp = Resp::new(&mut buf);
    resp.set_code(code::CREATED);
    resp.set_location_path("rd/4521").unwrap();
    resp.set_max_age(30);

    let msg = resp.to_message(Type::Ack, Id(3), Token::default()).unwrap();
    assert_eq!(msg.code, code::CREATED);
    assert_eq!(msg.max_age(), Some(30));
    assert_eq!(msg.location_path().collect::<Vec<_>>(),
               vec![b"rd".as_ref(), b"4521".as_ref()]);
  }
}
