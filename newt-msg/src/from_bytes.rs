use crate::cursor::Cursor;
use crate::*;

/// Trait for converting a sequence of bytes into some data structure
/// that borrows from them
pub trait TryFromBytes<'a>: Sized {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert from some sequence of bytes
  /// into `Self`
  fn try_from_bytes(bytes: &'a [u8]) -> Result<Self, Self::Error>;
}

impl<'a> TryFromBytes<'a> for Message<'a> {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: &'a [u8]) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Byte1 { ver, ty, oc } = bytes.next().ok_or_else(MessageParseError::eof)?.try_into()?;

    if ver != Version(1) {
      return Err(MessageParseError::InvalidVersion(ver.0));
    }

    let code: Code = bytes.next().ok_or_else(MessageParseError::eof)?.into();
    let id = match bytes.take_exact(2) {
      | Some(&[a, b]) => Id::from_be_bytes([a, b]),
      | _ => return Err(MessageParseError::eof()),
    };

    let mut token = Token::default();
    let mut opts = Opts::default();
    let mut current = 0u16;

    for _ in 0..oc {
      let header = bytes.next().ok_or_else(MessageParseError::eof)?;
      let delta = u16::from(header >> 4);
      let mut len = usize::from(header & 0b1111);

      if len == 15 {
        len += usize::from(bytes.next().ok_or_else(MessageParseError::eof)?);
      }

      let number = OptNumber(current + delta);
      let value = bytes.take_exact(len).ok_or_else(MessageParseError::eof)?;
      current = number.0;

      if number == TOKEN {
        token = Token::from_bytes(value).ok_or(MessageParseError::InvalidTokenLength(len.min(255) as u8))?;
        continue;
      }

      match number.max_len() {
        | None if number.is_critical() => {
          return Err(MessageParseError::UnsupportedCriticalOption(number))
        },
        // fence-posts and unknown elective options
        | None => continue,
        | Some(max) if len > max => {
          return Err(MessageParseError::OptionValueTooLong { number, len })
        },
        | Some(_) => opts.push(Opt { number,
                                     value: OptValue::Bytes(value) }),
      }
    }

    Ok(Message { id,
                 ty,
                 ver,
                 token,
                 code,
                 opts,
                 payload: Payload(bytes.take_until_end()) })
  }
}

/// Peek at the transaction id of a datagram that may not
/// parse as a whole message, so an error response can still
/// reference it.
pub fn peek_id(bytes: &[u8]) -> Option<Id> {
  match bytes.get(2..4) {
    | Some(&[a, b]) => Some(Id::from_be_bytes([a, b])),
    | _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_msg() {
    let (expect, bytes) = crate::test_msg();
    assert_eq!(Message::try_from_bytes(&bytes).unwrap(), expect)
  }

  #[test]
  fn parse_byte1() {
    let byte = 0b_01_10_0011u8;
    let byte = Byte1::try_from(byte).unwrap();
    assert_eq!(byte,
               Byte1 { ver: Version(1),
                       ty: Type::Ack,
                       oc: 3 })
  }

  #[test]
  fn parse_id() {
    assert_eq!(peek_id(&[0, 0, 0, 1]), Some(Id(1)));
    assert_eq!(peek_id(&[0, 0, 0]), None);
  }

  #[test]
  fn wrong_version() {
    let bytes = [0b_10_00_0000u8, 1, 0, 1];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::InvalidVersion(2)));
  }

  #[test]
  fn truncated() {
    assert_eq!(Message::try_from_bytes(&[0b_01_00_0000u8, 1]),
               Err(MessageParseError::UnexpectedEndOfStream));

    // 1 option announced, option says 4 bytes but there are 2
    let bytes = [0b_01_00_0001u8, 1, 0, 1, 0b1001_0100, b'a', b'b'];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::UnexpectedEndOfStream));
  }

  #[test]
  fn unknown_critical_option() {
    // fence-post(14), then 14 + 11 = 25 (odd, unknown)
    let bytes = [0b_01_00_0010u8, 1, 0, 1, 0b1110_0000, 0b1011_0001, 0];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::UnsupportedCriticalOption(OptNumber(25))));
  }

  #[test]
  fn unknown_elective_option_is_skipped() {
    // fence-post(14), then 14 + 2 = 16 (even, unknown)
    let bytes = [0b_01_00_0010u8, 1, 0, 1, 0b1110_0000, 0b0010_0001, 7, b'h', b'i'];
    let msg = Message::try_from_bytes(&bytes).unwrap();
    assert!(msg.opts.is_empty());
    assert_eq!(msg.payload.0, b"hi");
  }

  #[test]
  fn token_too_long() {
    let mut bytes = vec![0b_01_00_0001u8, 1, 0, 1, 0b1011_1001];
    bytes.extend([0u8; 9]);
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::InvalidTokenLength(9)));
  }

  #[test]
  fn block2_too_long() {
    // content-type(1), fence-post(14), block2(17) with 4 bytes
    let bytes = [0b_01_00_0011u8, 1, 0, 1, 0b0001_0000, 0b1101_0000, 0b0011_0100, 0, 0, 0, 1];
    assert_eq!(Message::try_from_bytes(&bytes),
               Err(MessageParseError::OptionValueTooLong { number: BLOCK2,
                                                           len: 4 }));
  }

  #[test]
  fn populated_message_survives_serialization() {
    let mut msg = Message::new(Type::Con, code::PUT, Id(0xBEEF));
    msg.set_token(&[1, 2, 3, 4]).unwrap();
    msg.set_uri_host("node").unwrap();
    msg.set_uri_path("config/poll").unwrap();
    msg.set_uri_query("a=1&b=2").unwrap();
    msg.set_content_type(ContentFormat::Text).unwrap();
    msg.set_max_age(30).unwrap();
    msg.set_etag(&[9, 9]).unwrap();
    msg.set_if_match(&[7]).unwrap();
    msg.set_block2(Block::new(64, 3, true)).unwrap();
    msg.set_payload(b"15");

    let mut buf = [0u8; 128];
    let n = msg.try_into_bytes(&mut buf).unwrap();
    let parsed = Message::try_from_bytes(&buf[..n]).unwrap();

    assert_eq!(parsed, msg);
    assert_eq!(parsed.block2(), Some(Block::new(64, 3, true)));
    assert_eq!(parsed.max_age(), Some(30));
    assert_eq!(parsed.content_type(), Some(ContentFormat::Text));
    assert_eq!(parsed.uri_host(), Some("node"));
    assert!(parsed.path_eq("config/poll"));
    assert_eq!(parsed.token.as_bytes(), &[1, 2, 3, 4]);
    assert_eq!(parsed.option_count(), msg.option_count());
  }
}
