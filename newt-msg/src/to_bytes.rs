use crate::*;

/// The most bytes that the header and options of a message may occupy.
///
/// Buffers for whole messages are expected to be this plus
/// whatever payload size the application allows.
pub const MAX_HEADER_SIZE: usize = 128;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to write `self` into `buf`, yielding the number of bytes written.
  ///
  /// ```
  /// use newt_msg::{code, Id, Message, TryIntoBytes, Type};
  ///
  /// let mut msg = Message::new(Type::Con, code::GET, Id(1));
  /// msg.set_uri_path("hello").unwrap();
  ///
  /// let mut buf = [0u8; 64];
  /// let n = msg.try_into_bytes(&mut buf).unwrap();
  /// assert_eq!(&buf[..n], &[0b0100_0001, 0b0000_0001, 0, 1, 0b1001_0101, b'h', b'e', b'l', b'l', b'o']);
  /// ```
  fn try_into_bytes(&self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// Reserved capacity was not enough for size of message
  #[allow(missing_docs)]
  TooLong { capacity: usize, size: usize },
  /// The message needs more than 15 options (including fence-posts and the token)
  TooManyOptions(usize),
  /// The header and options exceed [`MAX_HEADER_SIZE`]
  HeaderTooLong(usize),
  /// An option value was longer than 270 bytes
  #[allow(missing_docs)]
  OptionValueTooLong { number: OptNumber, len: usize },
}

/// The longest option value expressible with the 4-bit
/// length and 1 extension byte
const MAX_OPT_VALUE_LEN: usize = 15 + 255;

/// Walk the options of a message in the order they appear on the wire,
/// yielding `(delta, value)` for each, including the token and any
/// fence-posts needed to bridge large deltas.
pub(crate) fn walk_options<'a, F>(msg: &Message<'a>, mut f: F) -> Result<(), MessageToBytesError>
  where F: FnMut(u8, &[u8]) -> Result<(), MessageToBytesError>
{
  let mut current = 0u16;
  let mut token_done = msg.token.is_empty();

  for opt in msg.opts.iter() {
    if !token_done && opt.number > TOKEN {
      emit(&mut current, TOKEN, msg.token.as_bytes(), &mut f)?;
      token_done = true;
    }

    emit(&mut current, opt.number, opt.value.encode().as_ref(), &mut f)?;
  }

  if !token_done {
    emit(&mut current, TOKEN, msg.token.as_bytes(), &mut f)?;
  }

  Ok(())
}

fn emit<F>(current: &mut u16,
           number: OptNumber,
           value: &[u8],
           f: &mut F)
           -> Result<(), MessageToBytesError>
  where F: FnMut(u8, &[u8]) -> Result<(), MessageToBytesError>
{
  if value.len() > MAX_OPT_VALUE_LEN {
    return Err(MessageToBytesError::OptionValueTooLong { number,
                                                         len: value.len() });
  }

  while number.0 - *current > 15 {
    let delta = FENCE_POST.0 - (*current % FENCE_POST.0);
    f(delta as u8, &[])?;
    *current += delta;
  }

  f((number.0 - *current) as u8, value)?;
  *current = number.0;
  Ok(())
}

/// The 4-bit length nibble and optional extension byte for an option value
pub(crate) fn opt_len(len: usize) -> (u8, Option<u8>) {
  match len {
    | n if n >= 15 => (15, Some((n - 15) as u8)),
    | n => (n as u8, None),
  }
}

impl<'a> TryIntoBytes for Message<'a> {
  type Error = MessageToBytesError;

  fn try_into_bytes(&self, buf: &mut [u8]) -> Result<usize, Self::Error> {
    let capacity = buf.len();
    if capacity < 4 {
      return Err(Self::Error::TooLong { capacity,
                                        size: 4 });
    }

    let mut pos = 4usize;
    let mut count = 0usize;

    walk_options(self, |delta, value| {
      let (len, ext) = opt_len(value.len());
      let size = pos + 1 + usize::from(ext.is_some()) + value.len();

      if size > MAX_HEADER_SIZE {
        return Err(MessageToBytesError::HeaderTooLong(size));
      }

      if size > capacity {
        return Err(MessageToBytesError::TooLong { capacity,
                                                  size });
      }

      buf[pos] = delta << 4 | len;
      pos += 1;

      if let Some(ext) = ext {
        buf[pos] = ext;
        pos += 1;
      }

      buf[pos..pos + value.len()].copy_from_slice(value);
      pos += value.len();
      count += 1;
      Ok(())
    })?;

    if count > MAX_OPTIONS {
      return Err(Self::Error::TooManyOptions(count));
    }

    let size = pos + self.payload.0.len();
    if size > capacity {
      return Err(Self::Error::TooLong { capacity,
                                        size });
    }

    buf[0] = Byte1 { ver: self.ver,
                     ty: self.ty,
                     oc: count as u8 }.into();
    buf[1] = self.code.into();
    buf[2..4].copy_from_slice(&<[u8; 2]>::from(self.id));
    buf[pos..size].copy_from_slice(self.payload.0);

    Ok(size)
  }
}
