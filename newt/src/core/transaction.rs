use newt_msg::{Code, Id, Message, MessageToBytesError, Token, TryIntoBytes, Type};
use no_std_net::SocketAddr;

use crate::config::{MAX_OPEN_TRANSACTIONS, TRANSACTION_BUFFER_SIZE};
use crate::retry::RetryTimer;

/// Caller-chosen context attached to a message we send,
/// handed back alongside the reply (or the lack of one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag(pub u32);

/// An in-flight message exchange, owning the serialized bytes
/// of the message we sent so it can be retransmitted.
#[derive(Debug, Clone, Copy)]
pub struct Transaction {
  tid: Id,
  addr: SocketAddr,
  ty: Type,
  code: Code,
  token: Token,
  buffer: [u8; TRANSACTION_BUFFER_SIZE],
  len: usize,
  pub(crate) retry: Option<RetryTimer>,
  pub(crate) tag: Option<Tag>,
  pub(crate) acked: bool,
}

impl Transaction {
  fn new(tid: Id, addr: SocketAddr) -> Self {
    Self { tid,
           addr,
           ty: Type::Non,
           code: Code::new(0, 0),
           token: Token::default(),
           buffer: [0; TRANSACTION_BUFFER_SIZE],
           len: 0,
           retry: None,
           tag: None,
           acked: false }
  }

  /// Serialize a message into this transaction's buffer
  pub fn serialize(&mut self, msg: &Message) -> Result<usize, MessageToBytesError> {
    let len = msg.try_into_bytes(&mut self.buffer)?;
    self.len = len;
    self.ty = msg.ty;
    self.code = msg.code;
    self.token = msg.token;
    Ok(len)
  }

  /// Attach a [`Tag`] that will be handed back with the reply
  pub fn set_tag(&mut self, tag: Tag) {
    self.tag = Some(tag);
  }

  /// The serialized message
  pub fn bytes(&self) -> &[u8] {
    &self.buffer[..self.len]
  }

  #[allow(missing_docs)]
  pub fn tid(&self) -> Id {
    self.tid
  }

  /// The peer this exchange is with
  pub fn addr(&self) -> SocketAddr {
    self.addr
  }

  /// Type of the serialized message
  pub fn ty(&self) -> Type {
    self.ty
  }

  /// Code of the serialized message
  pub fn code(&self) -> Code {
    self.code
  }

  #[allow(missing_docs)]
  pub fn token(&self) -> Token {
    self.token
  }

  #[allow(missing_docs)]
  pub fn tag(&self) -> Option<Tag> {
    self.tag
  }

  /// How many times has this message been retransmitted?
  pub fn retransmissions(&self) -> u16 {
    self.retry.map(|r| r.retries().0).unwrap_or(0)
  }
}

/// Fixed-capacity set of open transactions
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pool {
  slots: [Option<Transaction>; MAX_OPEN_TRANSACTIONS],
  limit: usize,
}

impl Pool {
  pub(crate) fn new(limit: usize) -> Self {
    Self { slots: [None; MAX_OPEN_TRANSACTIONS],
           limit: limit.max(1).min(MAX_OPEN_TRANSACTIONS) }
  }

  pub(crate) fn len(&self) -> usize {
    self.slots.iter().filter(|s| s.is_some()).count()
  }

  /// Claim a slot, yielding its index.
  ///
  /// Fails when `limit` transactions are open, or one with this
  /// id & peer already is.
  pub(crate) fn open(&mut self, tid: Id, addr: SocketAddr) -> Option<usize> {
    if self.len() >= self.limit || self.position_from(tid, addr).is_some() {
      return None;
    }

    let ix = self.slots.iter().position(Option::is_none)?;
    self.slots[ix] = Some(Transaction::new(tid, addr));
    Some(ix)
  }

  pub(crate) fn position(&self, tid: Id) -> Option<usize> {
    self.slots
        .iter()
        .position(|s| matches!(s, Some(t) if t.tid == tid))
  }

  /// Find the exchange with `tid` on the peer `addr`
  pub(crate) fn position_from(&self, tid: Id, addr: SocketAddr) -> Option<usize> {
    self.slots
        .iter()
        .position(|s| matches!(s, Some(t) if t.tid == tid && t.addr == addr))
  }

  /// Find an exchange whose response can only be matched
  /// by token: a CON request that was acked empty, or a NON request
  pub(crate) fn position_acked(&self, addr: SocketAddr, token: &Token) -> Option<usize> {
    if token.is_empty() {
      return None;
    }

    self.slots
        .iter()
        .position(|s| matches!(s, Some(t) if t.acked && t.addr == addr && t.token == *token))
  }

  pub(crate) fn get(&self, ix: usize) -> Option<&Transaction> {
    self.slots.get(ix).and_then(Option::as_ref)
  }

  pub(crate) fn get_mut(&mut self, ix: usize) -> Option<&mut Transaction> {
    self.slots.get_mut(ix).and_then(Option::as_mut)
  }

  pub(crate) fn take(&mut self, ix: usize) -> Option<Transaction> {
    self.slots.get_mut(ix).and_then(Option::take)
  }
}

#[cfg(test)]
mod tests {
  use newt_msg::code;

  use super::*;
  use crate::test::addr;

  #[test]
  fn pool_respects_limit() {
    let mut pool = Pool::new(2);
    assert!(pool.open(Id(1), addr(1)).is_some());
    assert!(pool.open(Id(2), addr(1)).is_some());
    assert!(pool.open(Id(3), addr(1)).is_none());

    let ix = pool.position(Id(1)).unwrap();
    pool.take(ix);
    assert!(pool.open(Id(3), addr(1)).is_some());
    assert_eq!(pool.len(), 2);
  }

  #[test]
  fn pool_rejects_duplicate_tid_per_peer() {
    let mut pool = Pool::new(4);
    let first = pool.open(Id(1), addr(1)).unwrap();
    assert!(pool.open(Id(1), addr(1)).is_none());

    let other = pool.open(Id(1), addr(2)).unwrap();
    assert_ne!(first, other);
    assert_eq!(pool.position_from(Id(1), addr(2)), Some(other));
    assert_eq!(pool.position_from(Id(1), addr(1)), Some(first));
  }

  #[test]
  fn serialize() {
    let mut pool = Pool::new(1);
    let ix = pool.open(Id(40), addr(1)).unwrap();
    let t = pool.get_mut(ix).unwrap();

    let msg = Message::new(Type::Con, code::GET, Id(40));
    let n = t.serialize(&msg).unwrap();

    assert_eq!(n, 4);
    assert_eq!(&t.bytes()[2..4], &[0, 40]);
    assert_eq!(t.ty(), Type::Con);
    assert_eq!(t.code(), code::GET);
  }
}
