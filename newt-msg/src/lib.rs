//! Low-level representation of CoAP draft-07 messages.
//!
//! The most notable item in `newt_msg` is [`Message`];
//! a CoAP message very close to the actual byte layout.
//!
//! ## Draft-07
//! This crate speaks the pre-standard dialect of CoAP that predates RFC 7252,
//! which differs on the wire in a few important ways:
//! - the header carries a 4-bit **option count** instead of a token length
//! - the token is an option (number 11) rather than a header field
//! - option lengths of 15 are extended by a single byte, and option deltas
//!   larger than 15 are bridged with empty "fence-post" options (multiples of 14)
//! - there is no payload marker; the payload is everything after the last option
//! - Block2 is option 17, Block1 is option 19, Observe is option 10
//!
//! ## Allocation
//! `Message` does not require an allocator. Options and payloads are borrowed
//! slices with a fixed upper bound on their number ([`MAX_OPTIONS`]),
//! so a parsed message is a view of the datagram it was parsed from.
//!
//! ```
//! use newt_msg::{code, ContentFormat, Id, Message, TryFromBytes, TryIntoBytes, Type};
//!
//! let mut msg = Message::new(Type::Con, code::CONTENT, Id(1));
//! msg.set_content_type(ContentFormat::Text).unwrap();
//! msg.set_payload(b"22.5");
//!
//! let mut buf = [0u8; 64];
//! let n = msg.try_into_bytes(&mut buf).unwrap();
//!
//! let parsed = Message::try_from_bytes(&buf[..n]).unwrap();
//! assert_eq!(parsed.payload.0, b"22.5");
//! ```

#![doc(html_root_url = "https://docs.rs/newt-msg/0.3.0")]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

pub(crate) mod cursor;

#[doc(hidden)]
pub mod from_bytes;

/// Message structs
pub mod msg;

#[doc(hidden)]
pub mod to_bytes;

#[doc(inline)]
pub use from_bytes::{peek_id, TryFromBytes};
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use to_bytes::{MessageToBytesError, TryIntoBytes, MAX_HEADER_SIZE};

#[cfg(test)]
pub(crate) fn test_msg() -> (Message<'static>, Vec<u8>) {
  let header: [u8; 4] = 0b0100_0010_0100_0101_0000_0000_0000_0001_u32.to_be_bytes();
  let content_type: [u8; 2] = [0b0001_0001, 50];
  let token: [u8; 2] = [0b1010_0001, 254];
  let payload = b"hello, world!";
  let bytes = [header.as_ref(),
               content_type.as_ref(),
               token.as_ref(),
               payload.as_ref()].concat();

  let mut msg = Message::new(Type::Con, Code { class: 2, detail: 5 }, Id(1));
  msg.token = Token(tinyvec::array_vec!([u8; 8] => 254));
  msg.set_content_type(ContentFormat::Json).unwrap();
  msg.set_payload(payload);

  (msg, bytes)
}

#[cfg(test)]
pub(crate) mod tests {
  /// Assert two values are equal, printing them as binary on failure
  #[macro_export]
  macro_rules! assert_eqb {
    ($actual:expr, $expected:expr) => {
      if $actual != $expected {
        panic!("expected {:08b} to equal {:08b}", $actual, $expected)
      }
    };
  }

  /// Assert two byte iterables are equal, printing them as binary on failure
  #[macro_export]
  macro_rules! assert_eqb_iter {
    ($actual:expr, $expected:expr) => {
      if $actual.iter().ne($expected.iter()) {
        panic!("expected {:?} to equal {:?}",
               $actual.iter()
                      .map(|b| format!("{:08b}", b))
                      .collect::<Vec<_>>(),
               $expected.iter()
                        .map(|b| format!("{:08b}", b))
                        .collect::<Vec<_>>())
      }
    };
  }
}
