use embedded_time::duration::Milliseconds;
use newt_msg::{code, peek_id, Code, Id, Message, Token, TryFromBytes, TryIntoBytes, Type, MAX_HEADER_SIZE};
use no_std_net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use rand::{Rng, SeedableRng};
use tinyvec::ArrayVec;

mod error;
#[doc(inline)]
pub use error::*;

/// Message exchanges we have yet to finish
pub mod transaction;

/// Peers subscribed to resources
pub mod observe;

/// Responses produced after the request handler returned
pub mod separate;

use observe::{Observer, Observers};
use separate::SeparateSlot;
use transaction::{Pool, Tag, Transaction};

use crate::blockwise::{self, Window};
use crate::config::{Config, MAX_OBSERVERS, MAX_OPEN_TRANSACTIONS, MAX_PAYLOAD_SIZE, TRANSACTION_BUFFER_SIZE};
use crate::logging;
use crate::net::{Addrd, Socket};
use crate::platform::PlatformTypes;
use crate::req::{Method, Req};
use crate::resp::Resp;
use crate::retry::{Attempts, RetryTimer, Strategy, YouShould};
use crate::server::{Dispatch, Exchange, Outcome, Registry, Resource, ResourceId};
use crate::time::{self, Millis};

/// Something that happened as a result of an inbound datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'b> {
  /// We answered a request
  Responded {
    #[allow(missing_docs)]
    addr: SocketAddr,
    /// Transaction id of the request
    tid: Id,
    /// Code of the response we sent
    code: Code,
  },
  /// A resource deferred its response to a request
  Deferred {
    #[allow(missing_docs)]
    addr: SocketAddr,
    #[allow(missing_docs)]
    tid: Id,
  },
  /// A resource chose not to answer a request
  Dropped {
    #[allow(missing_docs)]
    addr: SocketAddr,
    #[allow(missing_docs)]
    tid: Id,
  },
  /// We could not handle a datagram and answered it with an error
  Recovered {
    #[allow(missing_docs)]
    addr: SocketAddr,
    #[allow(missing_docs)]
    tid: Id,
    /// Code of the error response
    code: Code,
  },
  /// A peer acknowledged a CON request of ours without responding yet
  Acked {
    #[allow(missing_docs)]
    addr: SocketAddr,
    #[allow(missing_docs)]
    tid: Id,
  },
  /// The reply (a response, or a reset) to a message we sent
  Reply {
    /// Transaction id of the message we sent
    tid: Id,
    /// The tag we attached to the message we sent
    tag: Option<Tag>,
    #[allow(missing_docs)]
    msg: Addrd<Message<'b>>,
  },
  /// A message that matches nothing we sent,
  /// e.g. an observe notification
  Unmatched(Addrd<Message<'b>>),
}

/// A confirmable message that never got a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoReply {
  /// Transaction id of the message
  pub tid: Id,
  /// The peer that never answered
  pub addr: SocketAddr,
  /// The tag we attached to the message
  pub tag: Option<Tag>,
}

impl Default for NoReply {
  fn default() -> Self {
    Self { tid: Id(0),
           addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
           tag: None }
  }
}

/// Every exchange given up on during one [`Core::tick`]
pub type GaveUp = ArrayVec<[NoReply; MAX_OPEN_TRANSACTIONS]>;

/// Identity of a request we sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
  #[allow(missing_docs)]
  pub tid: Id,
  #[allow(missing_docs)]
  pub token: Token,
}

/// What the engine decided to do with a request after its handler ran
enum Handled {
  Respond(Code),
  Deferred,
  Dropped,
  Unserializable,
}

/// Handler outcome carrying the response to send, if any
enum Served<'s> {
  Respond(Resp<'s>),
  Deferred,
  Dropped,
}

/// A CoAP protocol engine, serving resources and sending requests
/// over one socket.
///
/// The engine does nothing on its own; feed it datagrams with
/// [`Core::poll`] (or [`Core::handle_datagram`]) and call [`Core::tick`]
/// periodically to retransmit unacknowledged messages & trigger
/// periodic resources.
#[allow(missing_debug_implementations)]
pub struct Core<'r, P: PlatformTypes> {
  config: Config,
  pub(crate) clock: P::Clock,
  sock: P::Socket,
  registry: Registry<'r>,
  transactions: Pool,
  observers: Observers,
  separate: SeparateSlot,
  scratch: [u8; MAX_PAYLOAD_SIZE],
  tid: u16,
  tokens_issued: u16,
}

impl<'r, P: PlatformTypes> Core<'r, P> {
  /// Creates a new Core with the default runtime behavior
  pub fn new(clock: P::Clock, sock: P::Socket) -> Self {
    Self::new_config(Config::default(), clock, sock)
  }

  /// Create a new core with custom runtime behavior
  pub fn new_config(config: Config, clock: P::Clock, sock: P::Socket) -> Self {
    let tid = match config.msg.tid_seed {
      | 0 => {
        let seed = time::now(&clock).map(|Milliseconds(ms)| ms).unwrap_or(0);
        rand_chacha::ChaCha8Rng::seed_from_u64(seed).gen()
      },
      | seed => seed,
    };

    Self { config,
           clock,
           sock,
           registry: Registry::default(),
           transactions: Pool::new(config.open_transaction_limit()),
           observers: Observers::new(config.observer_limit()),
           separate: SeparateSlot::default(),
           scratch: [0; MAX_PAYLOAD_SIZE],
           tid,
           tokens_issued: 0 }
  }

  #[allow(missing_docs)]
  pub fn config(&self) -> &Config {
    &self.config
  }

  #[allow(missing_docs)]
  pub fn sock(&self) -> &P::Socket {
    &self.sock
  }

  #[allow(missing_docs)]
  pub fn clock(&self) -> &P::Clock {
    &self.clock
  }

  /// Serve a resource.
  ///
  /// Resources are matched in the order they were activated.
  pub fn activate(&mut self, res: &'r mut dyn Resource) -> Result<ResourceId, Error<P>> {
    self.registry
        .activate(res)
        .map_err(|_| When::None.what(What::RegistryFull))
  }

  /// The resources we serve
  pub fn registry(&self) -> &Registry<'r> {
    &self.registry
  }

  /// Peers observing our resources
  pub fn observers(&self) -> &Observers {
    &self.observers
  }

  /// Is a request waiting on [`Core::resume_separate`]?
  pub fn separate_pending(&self) -> bool {
    self.separate.is_occupied()
  }

  fn now(&self, when: When) -> Result<Millis, Error<P>> {
    time::now(&self.clock).ok_or_else(|| when.what(What::ClockError))
  }

  /// Get the next transaction id
  pub fn next_tid(&mut self) -> Id {
    self.tid = self.tid.wrapping_add(1);
    Id(self.tid)
  }

  fn next_token(&mut self, when: When) -> Result<Token, Error<P>> {
    let Milliseconds(now) = self.now(when)?;
    self.tokens_issued = self.tokens_issued.wrapping_add(1);

    #[allow(clippy::many_single_char_names)]
    let bytes = {
      let ([a, b], [c, d, e, f, g, h, i, j], [k, l]) = (self.config.msg.token_seed.to_be_bytes(),
                                                         now.to_be_bytes(),
                                                         self.tokens_issued.to_be_bytes());
      [a, b, c, d, e, f, g, h, i, j, k, l]
    };

    Ok(Token::opaque(&bytes))
  }

  /// Receive a datagram from the socket, if there is one, and handle it.
  pub fn poll<'b>(&mut self, buf: &'b mut [u8]) -> nb::Result<Event<'b>, Error<P>> {
    let when = When::Polling;
    let Addrd(n, addr) = self.sock
                             .recv(buf)
                             .map_err(|e| e.map(|e| when.what(What::SockError(e))))?;

    let buf: &'b [u8] = buf;
    self.handle_datagram(Addrd(&buf[..n], addr))
        .map_err(nb::Error::Other)
  }

  /// Handle a datagram received from a peer.
  ///
  /// Requests are dispatched to the activated resources and answered,
  /// replies are matched to the messages we sent.
  /// Datagrams that don't parse are answered with an error
  /// response when their transaction id can be recovered.
  pub fn handle_datagram<'b>(&mut self, dgram: Addrd<&'b [u8]>) -> Result<Event<'b>, Error<P>> {
    let addr = dgram.addr();
    log::trace!("recvd {}b <- {}", dgram.data().len(), addr);

    match Message::try_from_bytes(dgram.unwrap()) {
      | Ok(msg) => {
        log::trace!("recvd {} <- {}", logging::msg_summary(&msg).as_str(), addr);

        if msg.code.is_method() {
          self.handle_request(Addrd(msg, addr))
        } else {
          self.handle_reply(Addrd(msg, addr))
        }
      },
      | Err(e) => {
        log::warn!("dgram from {} did not parse: {:?}", addr, e);

        match peek_id(dgram.data()) {
          | Some(tid) => self.recover(addr, tid, Token::default(), e.code(), e.diagnostic()),
          | None => Err(When::Polling.what(What::FromBytes(e))),
        }
      },
    }
  }

  fn handle_request<'b>(&mut self, req: Addrd<Message<'b>>) -> Result<Event<'b>, Error<P>> {
    let addr = req.addr();
    let Message { id: tid, ty, token, .. } = *req.data();

    let ix = match self.transactions.open(tid, addr) {
      | Some(ix) => ix,
      | None => {
        log::warn!("no free transaction for request {} from {}", tid.0, addr);
        return self.recover(addr,
                            tid,
                            token,
                            code::MEMORY_ALLOCATION_ERROR,
                            "Transaction buffer allocation failed");
      },
    };

    let (rep_ty, rep_id) = match ty {
      | Type::Con => (Type::Ack, tid),
      | _ => (Type::Non, self.next_tid()),
    };
    let chunk = self.config.chunk_size();

    let handled = {
      let Self { registry,
                 observers,
                 separate,
                 scratch,
                 transactions,
                 .. } = self;

      match serve(registry, observers, separate, scratch, chunk, req) {
        | Served::Deferred => Handled::Deferred,
        | Served::Dropped => Handled::Dropped,
        | Served::Respond(resp) => {
          let staged =
            resp.to_message(rep_ty, rep_id, token)
                .map_err(|e| log::warn!("response to {} has invalid options: {:?}", tid.0, e))
                .and_then(|msg| {
                  log::trace!("responding {} -> {}", logging::msg_summary(&msg).as_str(), addr);
                  transactions.get_mut(ix)
                              .ok_or(())?
                              .serialize(&msg)
                              .map_err(|e| log::warn!("response to {} does not fit: {:?}", tid.0, e))
                });

          match staged {
            | Ok(_) => Handled::Respond(resp.code().sendable()),
            | Err(()) => Handled::Unserializable,
          }
        },
      }
    };

    match handled {
      | Handled::Respond(code) => {
        self.send_slot(ix, When::SendingMessage(tid))?;
        Ok(Event::Responded { addr, tid, code })
      },
      | Handled::Deferred => {
        log::debug!("request {} from {} will be answered separately", tid.0, addr);
        self.transactions.take(ix);
        Ok(Event::Deferred { addr, tid })
      },
      | Handled::Dropped => {
        log::debug!("request {} from {} dropped", tid.0, addr);
        self.transactions.take(ix);
        Ok(Event::Dropped { addr, tid })
      },
      | Handled::Unserializable => {
        self.transactions.take(ix);
        self.recover(addr,
                     tid,
                     token,
                     code::PACKET_SERIALIZATION_ERROR,
                     "Packet serialization failed")
      },
    }
  }

  fn handle_reply<'b>(&mut self, msg: Addrd<Message<'b>>) -> Result<Event<'b>, Error<P>> {
    let addr = msg.addr();
    let Message { id: tid, ty, code, token, .. } = *msg.data();

    if ty == Type::Reset && !token.is_empty() && self.remove_observer_by_token(addr, &token) > 0 {
      log::info!("{} reset a notification, no longer observing", addr);
    }

    if ty == Type::Con {
      self.ack(Addrd(tid, addr))?;
    }

    let ix = self.transactions
                 .position_from(tid, addr)
                 .or_else(|| self.transactions.position_acked(addr, &token));

    let ix = match ix {
      | Some(ix) => ix,
      | None => return Ok(Event::Unmatched(msg)),
    };

    if ty == Type::Ack && code == code::EMPTY {
      log::debug!("{} acked {}, awaiting separate response", addr, tid.0);
      let now = self.now(When::Polling)?;
      let wait = self.exchange_lifetime_timer(now);

      if let Some(t) = self.transactions.get_mut(ix) {
        t.acked = true;
        t.retry = Some(wait);
      }

      return Ok(Event::Acked { addr, tid });
    }

    match self.transactions.take(ix) {
      | Some(t) => Ok(Event::Reply { tid: t.tid(),
                                     tag: t.tag(),
                                     msg }),
      | None => Ok(Event::Unmatched(msg)),
    }
  }

  /// A timer that gives up after [`Con::max_retry_delay`](crate::config::Con::max_retry_delay)
  /// without retrying.
  fn exchange_lifetime_timer(&self, now: Millis) -> RetryTimer {
    let Milliseconds(wait) = self.config.msg.con.max_retry_delay;
    RetryTimer::new(now,
                    Strategy::Delay { min: Milliseconds(wait),
                                      max: Milliseconds(wait) },
                    Attempts(0),
                    Milliseconds(wait))
  }

  fn ack(&mut self, to: Addrd<Id>) -> Result<(), Error<P>> {
    let when = When::SendingMessage(*to.data());
    let ack = Message::new(Type::Ack, code::EMPTY, *to.data());

    let mut buf = [0u8; 4];
    let n = ack.try_into_bytes(&mut buf)
               .map_err(|e| when.what(What::ToBytes(e)))?;

    Self::send_dgram(&self.sock, Addrd(&buf[..n], to.addr()), when)
  }

  fn recover<'b>(&mut self,
                 addr: SocketAddr,
                 tid: Id,
                 token: Token,
                 code: Code,
                 diagnostic: &str)
                 -> Result<Event<'b>, Error<P>> {
    self.send_error(addr, tid, token, code, diagnostic)?;
    Ok(Event::Recovered { addr,
                          tid,
                          code: code.sendable() })
  }

  /// Answer a request with an error code and a diagnostic payload,
  /// without going through a transaction.
  fn send_error(&mut self,
                addr: SocketAddr,
                tid: Id,
                token: Token,
                code: Code,
                diagnostic: &str)
                -> Result<(), Error<P>> {
    let when = When::HandlingRequest(tid);

    let mut msg = Message::new(Type::Ack, code.sendable(), tid);
    msg.token = token;
    msg.set_payload(diagnostic.as_bytes());

    let mut buf = [0u8; MAX_HEADER_SIZE + 64];
    let n = msg.try_into_bytes(&mut buf)
               .map_err(|e| when.what(What::ToBytes(e)))?;

    log::debug!("replying {} -> {}", logging::msg_summary(&msg).as_str(), addr);
    Self::send_dgram(&self.sock, Addrd(&buf[..n], addr), when)
  }

  fn send_dgram(sock: &P::Socket, dgram: Addrd<&[u8]>, when: When) -> Result<(), Error<P>> {
    nb::block!(sock.send(dgram)).map_err(|e| when.what(What::SockError(e)))?;
    log::trace!("sent {}b -> {}", dgram.data().len(), dgram.addr());
    Ok(())
  }

  /// Open a transaction.
  ///
  /// Fails with [`What::TransactionPoolExhausted`] when
  /// [`Config::max_open_transactions`] are already open, or if
  /// a transaction with this id is.
  pub fn new_transaction(&mut self, tid: Id, addr: SocketAddr) -> Result<&mut Transaction, Error<P>> {
    let when = When::SendingMessage(tid);
    let ix = self.open_slot(tid, addr)?;

    self.transactions
        .get_mut(ix)
        .ok_or_else(|| when.what(What::NoSuchTransaction(tid)))
  }

  fn open_slot(&mut self, tid: Id, addr: SocketAddr) -> Result<usize, Error<P>> {
    self.transactions
        .open(tid, addr)
        .ok_or_else(|| When::SendingMessage(tid).what(What::TransactionPoolExhausted))
  }

  /// Serialize `msg` into a fresh transaction for `addr`, yielding its slot
  fn stage(&mut self, msg: &Message, addr: SocketAddr, tag: Option<Tag>) -> Result<usize, Error<P>> {
    let when = When::SendingMessage(msg.id);
    let ix = self.open_slot(msg.id, addr)?;

    let staged = match self.transactions.get_mut(ix) {
      | Some(t) => {
        if let Some(tag) = tag {
          t.set_tag(tag);
        }

        t.serialize(msg).map_err(|e| when.what(What::ToBytes(e)))
      },
      | None => Err(when.what(What::NoSuchTransaction(msg.id))),
    };

    match staged {
      | Ok(_) => Ok(ix),
      | Err(e) => {
        self.transactions.take(ix);
        Err(e)
      },
    }
  }

  /// Find an open transaction
  pub fn get_transaction_by_tid(&self, tid: Id) -> Option<&Transaction> {
    self.transactions
        .position(tid)
        .and_then(|ix| self.transactions.get(ix))
  }

  /// Close a transaction, yielding it if it was open
  pub fn clear_transaction(&mut self, tid: Id) -> Option<Transaction> {
    self.transactions
        .position(tid)
        .and_then(|ix| self.transactions.take(ix))
  }

  /// Send the message serialized into a transaction.
  ///
  /// CON messages stay open and are retransmitted by [`Core::tick`] until
  /// they are answered. NON requests stay open until a response with their
  /// token arrives. Any other transaction is closed once sent.
  pub fn send_transaction(&mut self, tid: Id) -> Result<(), Error<P>> {
    let when = When::SendingMessage(tid);
    let ix = self.transactions
                 .position(tid)
                 .ok_or_else(|| when.what(What::NoSuchTransaction(tid)))?;

    self.send_slot(ix, when)
  }

  fn send_slot(&mut self, ix: usize, when: When) -> Result<(), Error<P>> {
    let (ty, is_request, tid) = match self.transactions.get(ix) {
      | Some(t) => (t.ty(), t.code().is_method(), t.tid()),
      | None => return Err(when.what(What::NoSuchTransaction(Id(0)))),
    };

    let timer = match (ty, is_request) {
      | (Type::Con, _) => {
        let now = self.now(when)?;
        let con = self.config.msg.con;
        Some((RetryTimer::new(now, con.retry_strategy, con.max_attempts, con.max_retry_delay), false))
      },
      | (Type::Non, true) => {
        let now = self.now(when)?;
        Some((self.exchange_lifetime_timer(now), true))
      },
      | _ => None,
    };

    let Self { transactions, sock, .. } = self;
    let t = transactions.get_mut(ix)
                        .ok_or_else(|| when.what(What::NoSuchTransaction(tid)))?;

    let stays_open = timer.is_some();
    if let Some((retry, acked)) = timer {
      t.retry = Some(retry);
      t.acked = acked;
    }

    let sent = Self::send_dgram(sock, Addrd(t.bytes(), t.addr()), when);

    if !stays_open || sent.is_err() {
      transactions.take(ix);
    }

    sent
  }

  /// Send a request, giving it a fresh transaction id and
  /// (if it has none) a token.
  ///
  /// The reply will be yielded by [`Core::poll`] as an [`Event::Reply`]
  /// carrying `tag`.
  pub fn send_request(&mut self, req: Addrd<&Message>, tag: Option<Tag>) -> Result<Sent, Error<P>> {
    let tid = self.next_tid();
    let when = When::SendingMessage(tid);

    let mut msg = **req.data();
    msg.id = tid;
    if msg.token.is_empty() {
      msg.token = self.next_token(when)?;
    }

    log::trace!("sending {} -> {}", logging::msg_summary(&msg).as_str(), req.addr());

    let ix = self.stage(&msg, req.addr(), tag)?;
    self.send_slot(ix, when)?;
    Ok(Sent { tid, token: msg.token })
  }

  /// Send a response (or any other message) as-is, through a transaction
  /// keyed by the message's own id.
  pub fn send_response(&mut self, rep: Addrd<&Message>) -> Result<(), Error<P>> {
    let tid = rep.data().id;
    let when = When::SendingMessage(tid);

    log::trace!("sending {} -> {}",
                logging::msg_summary(rep.data()).as_str(),
                rep.addr());

    let ix = self.stage(rep.data(), rep.addr(), None)?;
    self.send_slot(ix, when)
  }

  /// Build the response to the request a resource deferred
  /// with [`Exchange::accept`], freeing the separate response slot.
  ///
  /// Populate it and hand it to [`Core::send_response`].
  pub fn resume_separate(&mut self, code: Code) -> Result<Addrd<Message<'static>>, Error<P>> {
    let when = When::None;
    let ctx = self.separate
                  .take()
                  .ok_or_else(|| when.what(What::NoSeparateRequest))?;

    ctx.resume(code).map_err(|e| when.what(What::SetOption(e)))
  }

  /// Retransmit unacknowledged CON messages that are due,
  /// giving up on those out of attempts.
  pub fn check_transactions(&mut self) -> Result<GaveUp, Error<P>> {
    let now = self.now(When::Ticking)?;
    let max_attempts = self.config.msg.con.max_attempts;
    let mut gave_up = GaveUp::default();

    let Self { transactions, sock, .. } = self;

    for ix in 0..MAX_OPEN_TRANSACTIONS {
      let should = match transactions.get_mut(ix).and_then(|t| t.retry.as_mut()) {
        | Some(retry) => retry.what_should_i_do(now),
        | None => continue,
      };

      match should {
        | Err(nb::Error::WouldBlock) => (),
        | Err(nb::Error::Other(never)) => match never {},
        | Ok(YouShould::Retry) => {
          if let Some(t) = transactions.get(ix) {
            log::debug!("retransmitting {} -> {} ({} of {})",
                        t.tid().0,
                        t.addr(),
                        t.retransmissions(),
                        max_attempts.0);

            let when = When::SendingMessage(t.tid());
            if let Err(e) = Self::send_dgram(sock, Addrd(t.bytes(), t.addr()), when) {
              log::warn!("retransmitting {} failed: {:?}", t.tid().0, e.what);
            }
          }
        },
        | Ok(YouShould::Cry) => {
          if let Some(t) = transactions.take(ix) {
            log::warn!("{} never answered {}, giving up", t.addr(), t.tid().0);
            gave_up.push(NoReply { tid: t.tid(),
                                   addr: t.addr(),
                                   tag: t.tag() });
          }
        },
      }
    }

    Ok(gave_up)
  }

  /// Do the periodic work: [`Core::check_transactions`], and
  /// [`Core::trigger`] every periodic resource whose period elapsed.
  pub fn tick(&mut self) -> Result<GaveUp, Error<P>> {
    let gave_up = self.check_transactions()?;

    let Milliseconds(now) = self.now(When::Ticking)?;
    for id in self.registry.take_due(now) {
      self.trigger(id)?;
    }

    Ok(gave_up)
  }

  /// Notify the observers of a resource that it changed.
  ///
  /// Bumps the resource's sequence number and asks it for a
  /// notification (see [`Resource::notify`]), which is sent to
  /// every observer. Yields the number of observers notified.
  pub fn trigger(&mut self, resource: ResourceId) -> Result<usize, Error<P>> {
    let when = When::Ticking;
    let seq = self.registry
                  .bump_sequence(resource)
                  .ok_or_else(|| when.what(What::NoSuchResource))?;

    let mut payload = [0u8; MAX_PAYLOAD_SIZE];
    let mut resp = Resp::new(&mut payload);

    if !self.registry.notify(resource, &mut resp) {
      return Ok(0);
    }

    let notification = resp.to_message(Type::Non, Id(0), Token::default())
                           .map_err(|e| when.what(What::SetOption(e)))?;

    self.notify_subscribers(resource, seq, &notification)
  }

  /// Send a notification to every observer of a resource.
  ///
  /// Each observer gets a NON copy of `notification` carrying its own
  /// token, a fresh transaction id and `sequence` as the Observe value.
  /// Peers we fail to reach are skipped.
  pub fn notify_subscribers(&mut self,
                            resource: ResourceId,
                            sequence: u32,
                            notification: &Message)
                            -> Result<usize, Error<P>> {
    let observers = self.observers
                        .of(resource)
                        .copied()
                        .map(Some)
                        .collect::<ArrayVec<[Option<Observer>; MAX_OBSERVERS]>>();

    let mut buf = [0u8; TRANSACTION_BUFFER_SIZE];
    let mut notified = 0;

    for obs in observers.into_iter().flatten() {
      let mut msg = *notification;
      msg.ty = Type::Non;
      msg.id = self.next_tid();
      msg.token = obs.token;

      let when = When::SendingMessage(msg.id);
      msg.set_observe(sequence)
         .map_err(|e| when.what(What::SetOption(e)))?;

      let n = msg.try_into_bytes(&mut buf)
                 .map_err(|e| when.what(What::ToBytes(e)))?;

      match Self::send_dgram(&self.sock, Addrd(&buf[..n], obs.addr), when) {
        | Ok(()) => {
          self.observers.record_sent(obs.addr, resource, sequence);
          notified += 1;
        },
        | Err(e) => log::warn!("notifying {} failed: {:?}", obs.addr, e.what),
      }
    }

    log::debug!("notified {} observers of {:?} (seq {})",
                notified,
                self.registry.url(resource),
                sequence);
    Ok(notified)
  }

  /// Forget the observation a peer registered with `token`,
  /// yielding how many were removed.
  pub fn remove_observer_by_token(&mut self, addr: SocketAddr, token: &Token) -> usize {
    self.observers.remove_by_token(addr, token)
  }

  /// Forget a peer's observation of a resource
  pub fn remove_observer(&mut self, addr: SocketAddr, resource: ResourceId) -> usize {
    self.observers.remove(addr, resource)
  }
}

/// Dispatch a request to its resource and build the response
fn serve<'s>(registry: &mut Registry<'_>,
             observers: &mut Observers,
             separate: &'s mut SeparateSlot,
             scratch: &'s mut [u8],
             chunk: u16,
             req: Addrd<Message<'_>>)
             -> Served<'s> {
  let mut resp = Resp::new(scratch);

  let id = match registry.dispatch(req.data()) {
    | Dispatch::Found(id) => id,
    | Dispatch::NotFound => {
      resp.set_code(code::NOT_FOUND);
      return Served::Respond(resp);
    },
    | Dispatch::MethodNotAllowed => {
      resp.set_code(code::METHOD_NOT_ALLOWED);
      return Served::Respond(resp);
    },
  };

  let requested = req.data().block2();
  let size = blockwise::block_size(requested, chunk);
  let offset = blockwise::block_offset(requested, chunk);

  let mut ex = Exchange::new(Req::new(req), resp, size, offset, separate);
  registry.handle(id, &mut ex);
  let (mut resp, new_offset, outcome) = ex.finish();

  match outcome {
    | Outcome::Deferred => return Served::Deferred,
    | Outcome::Dropped => return Served::Dropped,
    | Outcome::Respond => (),
  }

  match blockwise::window(requested, chunk, new_offset, resp.payload().len()) {
    | Window::Whole => (),
    | Window::OutOfScope => {
      resp.set_code(code::BAD_OPTION);
      resp.set_payload(b"Block out of scope");
    },
    | Window::Block { block, start, len } => {
      resp.slice(start, len);
      resp.set_block2(block);
    },
  }

  observe(registry, observers, id, req, &mut resp);
  Served::Respond(resp)
}

/// Register or drop observations as a side effect of a successful request
fn observe(registry: &Registry<'_>,
           observers: &mut Observers,
           resource: ResourceId,
           req: Addrd<Message<'_>>,
           resp: &mut Resp<'_>) {
  let observable = registry.kind(resource)
                           .map(|k| k.is_observable())
                           .unwrap_or(false);

  if !observable || !resp.code().is_success() {
    return;
  }

  let msg = req.data();
  match (msg.observe(), Method::from_code(msg.code)) {
    | (Some(_), Some(Method::GET)) => {
      let seq = registry.sequence(resource).unwrap_or(0);
      let obs = Observer { addr: req.addr(),
                           token: msg.token,
                           resource,
                           last_seq: seq };

      match observers.add(obs) {
        | Ok(()) => {
          log::debug!("{} observing {:?}", req.addr(), registry.url(resource));
          resp.set_observe(seq);
        },
        | Err(_) => {
          log::warn!("no room for {} to observe {:?}", req.addr(), registry.url(resource));
          resp.set_code(code::SERVICE_UNAVAILABLE);
          resp.set_payload(b"Too many observers");
        },
      }
    },
    | (Some(_), _) => (),
    | (None, _) => {
      if observers.remove(req.addr(), resource) > 0 {
        log::debug!("{} stopped observing {:?}", req.addr(), registry.url(resource));
      }
    },
  }
}

#[cfg(test)]
mod tests;
