use tinyvec::ArrayVec;

/// # Message Token
///
/// Opaque 0-8 byte value used to correlate requests and responses,
/// independent of the transaction [`Id`](crate::Id).
///
/// In this dialect of CoAP the token travels as an option
/// (number 11) rather than in the fixed header, so an empty token
/// is simply omitted from the message.
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Debug, Default)]
pub struct Token(pub ArrayVec<[u8; 8]>);

impl Token {
  /// Take an arbitrary-length sequence of bytes and turn it into an opaque message token
  ///
  /// Currently uses the BLAKE2 hashing algorithm, but this may change in the future.
  ///
  /// ```
  /// use newt_msg::Token;
  ///
  /// let my_token = Token::opaque(&[0, 1, 2]);
  /// assert_eq!(my_token.len(), 8);
  /// ```
  pub fn opaque(data: &[u8]) -> Token {
    use blake2::digest::consts::U8;
    use blake2::{Blake2b, Digest};

    let mut digest = Blake2b::<U8>::new();
    digest.update(data);
    Token(Into::<[u8; 8]>::into(digest.finalize()).into())
  }

  /// Copy a token from a byte slice, yielding `None`
  /// when it is longer than 8 bytes.
  pub fn from_bytes(bytes: &[u8]) -> Option<Token> {
    if bytes.len() > 8 {
      None
    } else {
      Some(Token(bytes.iter().copied().collect()))
    }
  }

  /// Is this token empty?
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Length of this token, in bytes
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Borrow the token bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_bytes() {
    assert_eq!(Token::from_bytes(&[1, 2]).map(|t| t.len()), Some(2));
    assert_eq!(Token::from_bytes(&[0; 9]), None);
    assert!(Token::from_bytes(&[]).unwrap().is_empty());
  }

  #[test]
  fn opaque_is_deterministic() {
    assert_eq!(Token::opaque(b"abc"), Token::opaque(b"abc"));
    assert_ne!(Token::opaque(b"abc"), Token::opaque(b"abd"));
  }
}
