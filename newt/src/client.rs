//! Fetching a (possibly multi-block) resource from a remote endpoint.
//!
//! [`BlockingRequest`] is a state machine driven by the caller: it sends
//! one block request per cycle through a [`Core`], and is advanced by the
//! [`Event`]s `Core::poll` yields and the [`NoReply`]s `Core::tick` yields.
//! Each block is delivered as soon as it arrives; the next one is requested
//! while the server says there is more.
//!
//! [`crate::blocking::Client`] drives it to completion over a real socket.

use newt_msg::{Block, Id, Message, Type};

use crate::core::transaction::Tag;
use crate::core::{Core, Error, Event, NoReply, What, When};
use crate::net::Addrd;
use crate::platform::PlatformTypes;

/// How many replies carrying the wrong block we tolerate
/// before giving up on a fetch
pub const MAX_BLOCK_ERRORS: u8 = 4;

/// Why a fetch was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
  /// There was no free transaction to send a block request with
  TransactionPoolExhausted,
  /// The server never answered a block request
  NoReply,
  /// The server replied with the wrong block [`MAX_BLOCK_ERRORS`] times
  TooManyBlockErrors,
  /// The server reset a block request
  Reset,
}

/// Where a [`BlockingRequest`] is at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
  /// Nothing sent yet
  Idle,
  /// A block request is being sent
  Sending,
  /// A block request was sent and we're waiting on its reply
  AwaitingReply {
    /// Transaction id of the block request
    tid: Id,
  },
  /// A block was delivered and the server has more
  Delivering,
  /// A reply carried the wrong block; the same block will be requested again
  Retrying,
  /// The last block was delivered
  Complete,
  /// The fetch was abandoned
  Failed(Failure),
}

/// A request for every block of a resource
#[derive(Debug, Clone, Copy)]
pub struct BlockingRequest<'a> {
  req: Addrd<Message<'a>>,
  tag: Tag,
  block_num: u32,
  block_size: u16,
  block_errors: u8,
  state: State,
}

impl<'a> BlockingRequest<'a> {
  /// Create a request fetching `req` block by block.
  ///
  /// Blocks after the first are requested with `block_size`
  /// (or the size the server picked, once it has replied).
  /// `tag` identifies this request's replies among the events a [`Core`] yields.
  pub fn new(req: Addrd<Message<'a>>, tag: Tag, block_size: u16) -> Self {
    let block_size = req.data().block2().map(|b| b.size()).unwrap_or(block_size);

    Self { req,
           tag,
           block_num: 0,
           block_size,
           block_errors: 0,
           state: State::Idle }
  }

  #[allow(missing_docs)]
  pub fn state(&self) -> State {
    self.state
  }

  /// Number of the block that will be requested next
  pub fn block_num(&self) -> u32 {
    self.block_num
  }

  /// How many replies carried the wrong block so far
  pub fn block_errors(&self) -> u8 {
    self.block_errors
  }

  /// Does [`BlockingRequest::send`] need to be called?
  pub fn wants_send(&self) -> bool {
    matches!(self.state, State::Idle | State::Delivering | State::Retrying)
  }

  /// Has the fetch completed or failed?
  pub fn is_finished(&self) -> bool {
    matches!(self.state, State::Complete | State::Failed(_))
  }

  /// Send the request for the current block, if one is due.
  ///
  /// Running out of transactions fails the fetch; any
  /// other error is yielded and the send may be attempted again.
  pub fn send<P: PlatformTypes>(&mut self, core: &mut Core<'_, P>) -> Result<(), Error<P>> {
    if !self.wants_send() {
      return Ok(());
    }

    let before = self.state;
    self.state = State::Sending;

    let mut msg = *self.req.data();
    if self.block_num > 0 {
      msg.set_block2(Block::new(self.block_size, self.block_num, false))
         .map_err(|e| When::None.what(What::SetOption(e)))?;
    }

    match core.send_request(Addrd(&msg, self.req.addr()), Some(self.tag)) {
      | Ok(sent) => {
        log::debug!("requested block {} of {:?} (tid {})",
                    self.block_num,
                    self.tag,
                    sent.tid.0);
        self.state = State::AwaitingReply { tid: sent.tid };
        Ok(())
      },
      | Err(Error { what: What::TransactionPoolExhausted,
                    .. }) => {
        log::warn!("no free transaction for block {}", self.block_num);
        self.state = State::Failed(Failure::TransactionPoolExhausted);
        Ok(())
      },
      | Err(e) => {
        self.state = before;
        Err(e)
      },
    }
  }

  /// Advance on an event yielded by [`Core::poll`].
  ///
  /// Yields the reply when it carries the block we asked for.
  pub fn handle<'b>(&mut self, ev: &Event<'b>) -> Option<Addrd<Message<'b>>> {
    let awaiting = match self.state {
      | State::AwaitingReply { tid } => tid,
      | _ => return None,
    };

    let msg = match ev {
      | Event::Reply { tid, tag, msg } if *tid == awaiting && *tag == Some(self.tag) => *msg,
      | _ => return None,
    };

    if msg.data().ty == Type::Reset {
      log::warn!("{} reset block request {}", msg.addr(), awaiting.0);
      self.state = State::Failed(Failure::Reset);
      return None;
    }

    let replied = msg.data().block2();
    let num = replied.map(|b| b.num()).unwrap_or(0);

    if num != self.block_num {
      self.block_errors += 1;
      log::warn!("asked for block {}, got {} ({} of {} errors)",
                 self.block_num,
                 num,
                 self.block_errors,
                 MAX_BLOCK_ERRORS);

      self.state = if self.block_errors >= MAX_BLOCK_ERRORS {
        State::Failed(Failure::TooManyBlockErrors)
      } else {
        State::Retrying
      };

      return None;
    }

    if let Some(block) = replied {
      self.block_size = block.size();
    }

    self.block_num += 1;
    self.state = match replied {
      | Some(block) if block.more() => State::Delivering,
      | _ => State::Complete,
    };

    Some(msg)
  }

  /// Advance on an exchange yielded by [`Core::tick`]
  pub fn gave_up(&mut self, no_reply: &NoReply) {
    if matches!(self.state, State::AwaitingReply { tid } if tid == no_reply.tid) {
      log::warn!("{} never answered block {}", no_reply.addr, self.block_num);
      self.state = State::Failed(Failure::NoReply);
    }
  }
}

#[cfg(test)]
mod tests {
  use newt_msg::{code, Message, Type};

  use super::*;
  use crate::config::Config;
  use crate::test::{addr, parse, ClockMock, Platform, SockMock};

  fn fetch<'a>() -> BlockingRequest<'a> {
    let mut msg = Message::new(Type::Con, code::GET, Id(0));
    msg.set_uri_path("big").unwrap();
    BlockingRequest::new(Addrd(msg, addr(2)), Tag(1), 64)
  }

  fn reply(tid: Id, block: Option<Block>) -> Message<'static> {
    let mut msg = Message::new(Type::Ack, code::CONTENT, tid);
    if let Some(block) = block {
      msg.set_block2(block).unwrap();
    }
    msg
  }

  fn core<'r>() -> (Core<'r, Platform>, crate::test::Dgrams) {
    let sock = SockMock::new();
    let tx = sock.tx.clone();
    (Core::new_config(Config::default(), ClockMock::new(), sock), tx)
  }

  fn awaiting(req: &BlockingRequest) -> Id {
    match req.state() {
      | State::AwaitingReply { tid } => tid,
      | other => panic!("{:?}", other),
    }
  }

  #[test]
  fn fetches_every_block() {
    let (mut core, tx) = core();
    let mut req = fetch();
    let mut delivered = 0;

    for num in 0..3 {
      assert!(req.wants_send());
      req.send(&mut core).unwrap();

      let sent = SockMock::take_sent(&tx);
      assert_eq!(parse(&sent[0]).block2().map(|b| b.num()),
                 if num == 0 { None } else { Some(num) });

      let tid = awaiting(&req);
      let rep = reply(tid, Some(Block::new(64, num, num < 2)));
      let ev = Event::Reply { tid,
                              tag: Some(Tag(1)),
                              msg: Addrd(rep, addr(2)) };

      if req.handle(&ev).is_some() {
        delivered += 1;
      }
    }

    assert_eq!(delivered, 3);
    assert_eq!(req.state(), State::Complete);
    assert!(req.is_finished());
  }

  #[test]
  fn wrong_block_is_retried_then_abandoned() {
    let (mut core, _) = core();
    let mut req = fetch();

    for n in 1..=MAX_BLOCK_ERRORS {
      req.send(&mut core).unwrap();
      let tid = awaiting(&req);
      let ev = Event::Reply { tid,
                              tag: Some(Tag(1)),
                              msg: Addrd(reply(tid, Some(Block::new(64, 3, true))), addr(2)) };

      assert_eq!(req.handle(&ev), None);
      assert_eq!(req.block_errors(), n);
      assert_eq!(req.block_num(), 0);
    }

    assert_eq!(req.state(), State::Failed(Failure::TooManyBlockErrors));
  }

  #[test]
  fn unanswered_block_fails() {
    let (mut core, _) = core();
    let mut req = fetch();
    req.send(&mut core).unwrap();

    let tid = awaiting(&req);
    req.gave_up(&NoReply { tid,
                           addr: addr(2),
                           tag: Some(Tag(1)) });

    assert_eq!(req.state(), State::Failed(Failure::NoReply));
  }

  #[test]
  fn pool_exhaustion_fails() {
    let sock = SockMock::new();
    let config = Config { max_open_transactions: 1,
                          ..Config::default() };
    let mut core = Core::<Platform>::new_config(config, ClockMock::new(), sock);

    let mut other = Message::new(Type::Con, code::GET, Id(0));
    other.set_uri_path("other").unwrap();
    core.send_request(Addrd(&other, addr(3)), None).unwrap();

    let mut req = fetch();
    req.send(&mut core).unwrap();
    assert_eq!(req.state(), State::Failed(Failure::TransactionPoolExhausted));
  }

  #[test]
  fn other_replies_are_ignored() {
    let (mut core, _) = core();
    let mut req = fetch();
    req.send(&mut core).unwrap();

    let tid = awaiting(&req);
    let ev = Event::Reply { tid,
                            tag: Some(Tag(2)),
                            msg: Addrd(reply(tid, None), addr(2)) };

    assert_eq!(req.handle(&ev), None);
    assert_eq!(req.state(), State::AwaitingReply { tid });
  }
}
