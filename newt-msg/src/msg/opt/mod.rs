use tinyvec::ArrayVec;

/// Well-known options
pub mod known;

pub use known::*;

/// # Option Number
///
/// Options are identified by number and carried in ascending order,
/// each encoded as the delta from the number before it.
///
/// Odd numbers are "critical"; a receiver that does not understand a
/// critical option must reject the message. Even numbers are "elective"
/// and may be silently ignored.
///
/// Multiples of 14 are reserved as fence-posts, empty options
/// that exist only to bridge deltas larger than the 4 bits available.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u16);

impl OptNumber {
  /// Is this a critical option?
  pub fn is_critical(&self) -> bool {
    self.0 & 1 == 1
  }

  /// Is this a fence-post?
  pub fn is_fence_post(&self) -> bool {
    self.0 != 0 && self.0 % FENCE_POST.0 == 0
  }

  /// Is this option number one this crate understands?
  pub fn is_known(&self) -> bool {
    self.max_len().is_some()
  }

  /// The longest value permitted for a known option,
  /// `None` for unknown options.
  pub fn max_len(&self) -> Option<usize> {
    match *self {
      | CONTENT_TYPE | ACCEPT | URI_PORT | OBSERVE => Some(2),
      | MAX_AGE => Some(4),
      | BLOCK1 | BLOCK2 => Some(3),
      | ETAG | IF_MATCH | TOKEN => Some(8),
      | IF_NONE_MATCH => Some(0),
      | PROXY_URI | URI_HOST | LOCATION_PATH | LOCATION_QUERY | URI_PATH | URI_QUERY => Some(270),
      | _ => None,
    }
  }
}

/// The value of an option.
///
/// Values parsed off the wire are always [`OptValue::Bytes`],
/// pointing into the buffer the message was parsed from.
///
/// Integer options set locally are stored as [`OptValue::Uint`]
/// and encoded with as few bytes as possible (zero is encoded
/// as an empty value).
#[derive(Copy, Clone, Debug)]
pub enum OptValue<'a> {
  /// Raw bytes (strings, opaque values)
  Bytes(&'a [u8]),
  /// An unsigned integer
  Uint(u32),
}

impl<'a> Default for OptValue<'a> {
  fn default() -> Self {
    OptValue::Bytes(&[])
  }
}

impl<'a> OptValue<'a> {
  /// Interpret this value as a big-endian unsigned integer,
  /// yielding `None` if it is longer than 4 bytes.
  ///
  /// ```
  /// use newt_msg::OptValue;
  ///
  /// assert_eq!(OptValue::Bytes(&[1, 0]).as_uint(), Some(256));
  /// assert_eq!(OptValue::Bytes(&[]).as_uint(), Some(0));
  /// assert_eq!(OptValue::Uint(12).as_uint(), Some(12));
  /// ```
  pub fn as_uint(&self) -> Option<u32> {
    match self {
      | OptValue::Uint(n) => Some(*n),
      | OptValue::Bytes(bs) if bs.len() <= 4 => {
        Some(bs.iter().fold(0u32, |n, b| (n << 8) | u32::from(*b)))
      },
      | OptValue::Bytes(_) => None,
    }
  }

  /// Get the raw bytes of this value, `None` for integers.
  pub fn as_bytes(&self) -> Option<&'a [u8]> {
    match self {
      | OptValue::Bytes(bs) => Some(bs),
      | OptValue::Uint(_) => None,
    }
  }

  /// Get the bytes that this value is encoded as on the wire
  pub fn encode(&self) -> Encoded<'a> {
    match self {
      | OptValue::Bytes(bs) => Encoded::Borrowed(bs),
      | OptValue::Uint(n) => Encoded::Owned(uint_bytes(*n)),
    }
  }

  /// Length of this value on the wire
  pub fn len(&self) -> usize {
    self.encode().as_ref().len()
  }

  /// Does this value have a length of zero?
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl<'a> PartialEq for OptValue<'a> {
  fn eq(&self, other: &Self) -> bool {
    self.encode().as_ref() == other.encode().as_ref()
  }
}

impl<'a> Eq for OptValue<'a> {}

impl<'a> From<&'a [u8]> for OptValue<'a> {
  fn from(bs: &'a [u8]) -> Self {
    OptValue::Bytes(bs)
  }
}

impl<'a> From<&'a str> for OptValue<'a> {
  fn from(s: &'a str) -> Self {
    OptValue::Bytes(s.as_bytes())
  }
}

impl<'a> From<u32> for OptValue<'a> {
  fn from(n: u32) -> Self {
    OptValue::Uint(n)
  }
}

/// The encoded bytes of an [`OptValue`]
#[derive(Clone, Copy, Debug)]
pub enum Encoded<'a> {
  /// A value that was already bytes
  Borrowed(&'a [u8]),
  /// An integer encoded as big-endian bytes
  Owned(ArrayVec<[u8; 4]>),
}

impl<'a> AsRef<[u8]> for Encoded<'a> {
  fn as_ref(&self) -> &[u8] {
    match self {
      | Encoded::Borrowed(bs) => bs,
      | Encoded::Owned(bs) => bs,
    }
  }
}

/// Encode an integer option value, dropping leading zero bytes
pub(crate) fn uint_bytes(n: u32) -> ArrayVec<[u8; 4]> {
  n.to_be_bytes()
   .iter()
   .copied()
   .skip_while(|b| *b == 0)
   .collect()
}

/// A single option carried by a [`Message`](crate::Message)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Opt<'a> {
  /// See [`OptNumber`]
  pub number: OptNumber,
  /// See [`OptValue`]
  pub value: OptValue<'a>,
}

/// The most options a message can carry; the option count
/// header field is 4 bits wide and fence-posts count against it.
pub const MAX_OPTIONS: usize = 15;

/// Fixed-capacity collection of options in a message
pub type Opts<'a> = ArrayVec<[Opt<'a>; MAX_OPTIONS]>;

/// Errors encounterable when adding an option to a message
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SetOptionError {
  /// The message already has [`MAX_OPTIONS`] options
  TooManyOptions,
  /// The value is longer than the option allows
  #[allow(missing_docs)]
  ValueTooLong { number: OptNumber, len: usize },
}
