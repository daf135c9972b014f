use newt_msg::{Id, MessageParseError, MessageToBytesError, SetOptionError};

use crate::client::Failure;
use crate::net::Socket;
use crate::platform::PlatformTypes;

/// The context that an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
  /// We were polling the socket for a datagram
  Polling,
  /// We were sending the message with this transaction id
  SendingMessage(Id),
  /// We were handling a request with this transaction id
  HandlingRequest(Id),
  /// We were checking on open transactions & periodic resources
  Ticking,
  /// No particular context
  None,
}

impl When {
  /// Construct a specific error from the context the error occurred in
  pub fn what<P: PlatformTypes>(self, what: What<P>) -> Error<P> {
    Error { when: self, what }
  }
}

/// An error encounterable from within Core
#[derive(Debug)]
pub struct Error<P: PlatformTypes> {
  /// What happened?
  pub what: What<P>,
  /// What were we doing when it happened?
  pub when: When,
}

impl<P: PlatformTypes> Error<P> {
  /// Is this error `FromBytes`?
  pub fn message_parse_error(&self) -> Option<&MessageParseError> {
    match self.what {
      | What::FromBytes(ref e) => Some(e),
      | _ => None,
    }
  }
}

/// A contextless error with some additional debug data attached.
#[derive(Debug)]
pub enum What<P: PlatformTypes> {
  /// Some socket operation (e.g. sending a datagram) failed
  SockError(<<P as PlatformTypes>::Socket as Socket>::Error),
  /// Parsing a message from bytes failed
  FromBytes(MessageParseError),
  /// Serializing a message to bytes failed
  ToBytes(MessageToBytesError),
  /// Adding an option to an outbound message failed
  SetOption(SetOptionError),
  /// Every transaction slot is taken
  TransactionPoolExhausted,
  /// A separate response is already pending
  SeparateSlotOccupied,
  /// No open transaction has this id
  NoSuchTransaction(Id),
  /// [`Core::resume_separate`](crate::core::Core::resume_separate) was
  /// called without a separate response pending
  NoSeparateRequest,
  /// The clock failed to provide timing.
  ///
  /// See [`embedded_time::clock::Error`]
  ClockError,
  /// Every resource slot is taken
  RegistryFull,
  /// There's no activated resource with this id
  NoSuchResource,
  /// A [`BlockingRequest`](crate::client::BlockingRequest) was abandoned
  RequestFailed(Failure),
}

impl<P: PlatformTypes> PartialEq for What<P> where <P::Socket as Socket>::Error: PartialEq
{
  fn eq(&self, other: &Self) -> bool {
    use What::*;

    match (self, other) {
      | (SockError(a), SockError(b)) => a == b,
      | (FromBytes(a), FromBytes(b)) => a == b,
      | (ToBytes(a), ToBytes(b)) => a == b,
      | (SetOption(a), SetOption(b)) => a == b,
      | (NoSuchTransaction(a), NoSuchTransaction(b)) => a == b,
      | (RequestFailed(a), RequestFailed(b)) => a == b,
      | (TransactionPoolExhausted, TransactionPoolExhausted)
      | (SeparateSlotOccupied, SeparateSlotOccupied)
      | (NoSeparateRequest, NoSeparateRequest)
      | (ClockError, ClockError)
      | (RegistryFull, RegistryFull)
      | (NoSuchResource, NoSuchResource) => true,
      | _ => false,
    }
  }
}
