use super::code::{self, Code};
use super::OptNumber;

/// Errors encounterable while parsing a message from bytes
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Eq, Ord)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Version field was not 1
  InvalidVersion(u8),

  /// The message type is invalid (see [`Type`](crate::Type) for information & valid values)
  InvalidType(u8),

  /// Token option was longer than 8 bytes
  InvalidTokenLength(u8),

  /// A known option's value was longer than it is allowed to be
  #[allow(missing_docs)]
  OptionValueTooLong { number: OptNumber, len: usize },

  /// An option number this crate does not understand
  /// was marked critical (odd)
  UnsupportedCriticalOption(OptNumber),
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }

  /// The response code that should be sent
  /// to the peer that sent us this garbage
  ///
  /// ```
  /// use newt_msg::{code, MessageParseError, OptNumber};
  ///
  /// assert_eq!(MessageParseError::InvalidVersion(2).code(), code::BAD_REQUEST);
  /// assert_eq!(MessageParseError::UnsupportedCriticalOption(OptNumber(25)).code(),
  ///            code::BAD_OPTION);
  /// ```
  pub fn code(&self) -> Code {
    match self {
      | Self::UnexpectedEndOfStream | Self::InvalidVersion(_) | Self::InvalidType(_) => {
        code::BAD_REQUEST
      },
      | Self::InvalidTokenLength(_)
      | Self::OptionValueTooLong { .. }
      | Self::UnsupportedCriticalOption(_) => code::BAD_OPTION,
    }
  }

  /// A short human-readable description,
  /// used as the payload of the error response.
  pub fn diagnostic(&self) -> &'static str {
    match self {
      | Self::UnexpectedEndOfStream => "Message truncated",
      | Self::InvalidVersion(_) => "Wrong version",
      | Self::InvalidType(_) => "Invalid message type",
      | Self::InvalidTokenLength(_) => "Token length exceeded",
      | Self::OptionValueTooLong { .. } => "Option value too long",
      | Self::UnsupportedCriticalOption(_) => "Unsupported critical option",
    }
  }
}
