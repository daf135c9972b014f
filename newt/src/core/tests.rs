use core::fmt::Write;

use embedded_time::duration::Milliseconds;
use newt_msg::{code, Block, ContentFormat, Id, Message, Token, Type};

use super::*;
use crate::blockwise::NO_MORE;
use crate::config::Msg;
use crate::req::Methods;
use crate::server::Kind;
use crate::test::{addr, parse, ClockMock, Dgrams, Platform, SockMock};

fn setup<'r>(config: Config) -> (Core<'r, Platform>, Dgrams, Dgrams) {
  let sock = SockMock::new();
  let (rx, tx) = (sock.rx.clone(), sock.tx.clone());
  let config = Config { msg: Msg { tid_seed: 100,
                                   ..config.msg },
                        ..config };

  (Core::new_config(config, ClockMock::new(), sock), rx, tx)
}

fn req(ty: Type, code: Code, path: &'static str, id: u16) -> Message<'static> {
  let mut msg = Message::new(ty, code, Id(id));
  msg.set_uri_path(path).unwrap();
  msg.set_token(&id.to_be_bytes()).unwrap();
  msg
}

struct Poll(u32);

impl Resource for Poll {
  fn url(&self) -> &str {
    "config/poll"
  }

  fn methods(&self) -> Methods {
    Methods::GET | Methods::PUT
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    let put = ex.req().method() == Some(Method::PUT);

    if put {
      match ex.req().payload_str().and_then(|s| s.trim().parse().ok()) {
        | Some(secs) => {
          self.0 = secs;
          ex.resp().set_code(code::CHANGED);
        },
        | None => ex.resp().set_code(code::BAD_REQUEST),
      }
    } else {
      ex.resp().set_content_type(ContentFormat::Text);
      write!(ex.resp(), "{}", self.0).ok();
    }
  }
}

/// 600 bytes, written one block at a time
struct Big;

impl Big {
  const LEN: usize = 600;

  fn byte(n: usize) -> u8 {
    (n % 251) as u8
  }
}

impl Resource for Big {
  fn url(&self) -> &str {
    "big"
  }

  fn methods(&self) -> Methods {
    Methods::GET
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    let start = ex.offset() as usize;
    let end = (start + ex.preferred_size() as usize).min(Self::LEN);
    let block = (start..end).map(Self::byte).collect::<Vec<_>>();

    ex.resp().set_payload(&block);
    ex.set_offset(if end >= Self::LEN { NO_MORE } else { end as i32 });
  }
}

/// 1000 bytes, written whole every time
struct Blob;

impl Resource for Blob {
  fn url(&self) -> &str {
    "blob"
  }

  fn methods(&self) -> Methods {
    Methods::GET
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    let blob = (0..1000).map(Big::byte).collect::<Vec<_>>();
    ex.resp().set_payload(&blob);
  }
}

/// Answers separately, and notifies its observers on demand
struct Temperature;

impl Resource for Temperature {
  fn url(&self) -> &str {
    "sensors/temperature"
  }

  fn methods(&self) -> Methods {
    Methods::GET
  }

  fn kind(&self) -> Kind {
    Kind::Event
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    if ex.req().observe().is_some() {
      write!(ex.resp(), "22.5").ok();
    } else if ex.accept().is_err() {
      ex.reject();
    }
  }

  fn notify(&mut self, resp: &mut Resp<'_>) -> bool {
    write!(resp, "23.0").is_ok()
  }
}

#[test]
fn get_then_put_then_get() {
  let mut poll = Poll(30);
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut poll).unwrap();

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "config/poll", 1), addr(1)));
  let mut put = req(Type::Con, code::PUT, "config/poll", 2);
  put.set_payload(b"15");
  SockMock::send_msg(&rx, Addrd(put, addr(1)));
  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "config/poll", 3), addr(1)));

  let mut buf = [0u8; 1152];
  for id in 1..=3 {
    assert!(matches!(core.poll(&mut buf), Ok(Event::Responded { tid: Id(n), .. }) if n == id));
  }

  let sent = SockMock::take_sent(&tx);
  let sent = sent.iter().map(parse).collect::<Vec<_>>();

  assert_eq!(sent.len(), 3);
  assert!(sent.iter().all(|m| m.ty == Type::Ack));
  assert_eq!(sent[0].payload.0, b"30");
  assert_eq!(sent[0].content_type(), Some(ContentFormat::Text));
  assert_eq!(sent[1].code, code::CHANGED);
  assert_eq!(sent[2].payload.0, b"15");
  assert_eq!(sent[2].token, Token::from_bytes(&3u16.to_be_bytes()).unwrap());

  assert_eq!(core.transactions.len(), 0);
}

#[test]
fn non_request_gets_non_response_with_fresh_id() {
  let mut poll = Poll(30);
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut poll).unwrap();

  SockMock::send_msg(&rx, Addrd(req(Type::Non, code::GET, "config/poll", 7), addr(1)));
  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();

  let sent = SockMock::take_sent(&tx);
  let rep = parse(&sent[0]);
  assert_eq!(rep.ty, Type::Non);
  assert_ne!(rep.id, Id(7));
  assert_eq!(rep.token, Token::from_bytes(&7u16.to_be_bytes()).unwrap());
}

#[test]
fn not_found_and_method_not_allowed() {
  let mut poll = Poll(30);
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut poll).unwrap();

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "nope", 1), addr(1)));
  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::DELETE, "config/poll", 2), addr(1)));

  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();
  core.poll(&mut buf).unwrap();

  let sent = SockMock::take_sent(&tx);
  assert_eq!(parse(&sent[0]).code, code::NOT_FOUND);
  assert_eq!(parse(&sent[1]).code, code::METHOD_NOT_ALLOWED);
}

#[test]
fn garbage_with_an_id_gets_an_error() {
  let (mut core, _, tx) = setup(Config::default());

  // version 0
  let dgram = [0b0000_0000, 1, 0, 9];
  let ev = core.handle_datagram(Addrd(&dgram[..], addr(1))).unwrap();

  assert!(matches!(ev, Event::Recovered { tid: Id(9), .. }));
  let sent = SockMock::take_sent(&tx);
  let rep = parse(&sent[0]);
  assert_eq!(rep.ty, Type::Ack);
  assert_eq!(rep.id, Id(9));
  assert_eq!(rep.code, code::BAD_REQUEST);
  assert_eq!(rep.payload.0, b"Wrong version");

  assert!(core.handle_datagram(Addrd(&[0u8, 1][..], addr(1))).is_err());
}

#[test]
fn pool_exhaustion_is_answered() {
  let config = Config { max_open_transactions: 2,
                        ..Config::default() };
  let mut poll = Poll(30);
  let (mut core, rx, tx) = setup(config);
  core.activate(&mut poll).unwrap();

  let out = req(Type::Con, code::GET, "sensors", 0);
  let a = core.send_request(Addrd(&out, addr(2)), None).unwrap();
  let b = core.send_request(Addrd(&out, addr(3)), None).unwrap();
  SockMock::take_sent(&tx);

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "config/poll", 1), addr(1)));
  let mut buf = [0u8; 1152];
  let ev = core.poll(&mut buf).unwrap();

  assert!(matches!(ev, Event::Recovered { code: c, .. } if c == code::INTERNAL_SERVER_ERROR));

  let sent = SockMock::take_sent(&tx);
  let rep = parse(&sent[0]);
  assert_eq!(rep.ty, Type::Ack);
  assert_eq!(rep.id, Id(1));
  assert_eq!(rep.code, code::INTERNAL_SERVER_ERROR);
  assert_eq!(rep.payload.0, b"Transaction buffer allocation failed");

  assert!(core.get_transaction_by_tid(a.tid).is_some());
  assert!(core.get_transaction_by_tid(b.tid).is_some());
  assert!(core.send_request(Addrd(&out, addr(4)), None).is_err());
}

#[test]
fn con_is_retransmitted_then_given_up_on() {
  let (mut core, _, tx) = setup(Config::default());

  let out = req(Type::Con, code::GET, "sensors", 0);
  let sent = core.send_request(Addrd(&out, addr(2)), Some(Tag(7))).unwrap();
  assert_eq!(SockMock::take_sent(&tx).len(), 1);

  let mut gave_up = Vec::new();
  for _ in 0..200 {
    core.clock.advance(1_000);
    gave_up.extend(core.tick().unwrap());
  }

  let resent = SockMock::take_sent(&tx);
  assert_eq!(resent.len(), 4);
  assert!(resent.iter().all(|d| parse(d).id == sent.tid));

  assert_eq!(gave_up,
             vec![NoReply { tid: sent.tid,
                            addr: addr(2),
                            tag: Some(Tag(7)) }]);
  assert!(core.get_transaction_by_tid(sent.tid).is_none());
}

#[test]
fn piggybacked_reply_is_matched() {
  let (mut core, rx, _) = setup(Config::default());

  let out = req(Type::Con, code::GET, "sensors", 0);
  let sent = core.send_request(Addrd(&out, addr(2)), Some(Tag(1))).unwrap();

  let mut rep = Message::new(Type::Ack, code::CONTENT, sent.tid);
  rep.token = sent.token;
  rep.set_payload(b"hi");
  SockMock::send_msg(&rx, Addrd(rep, addr(2)));

  let mut buf = [0u8; 1152];
  match core.poll(&mut buf).unwrap() {
    | Event::Reply { tid, tag, msg } => {
      assert_eq!(tid, sent.tid);
      assert_eq!(tag, Some(Tag(1)));
      assert_eq!(msg.data().payload.0, b"hi");
    },
    | other => panic!("{:?}", other),
  }

  assert!(core.get_transaction_by_tid(sent.tid).is_none());
}

#[test]
fn same_id_from_another_peer_is_served() {
  let mut poll = Poll(30);
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut poll).unwrap();

  let out = req(Type::Con, code::GET, "sensors", 0);
  let sent = core.send_request(Addrd(&out, addr(3)), None).unwrap();
  SockMock::take_sent(&tx);

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "config/poll", sent.tid.0), addr(1)));

  let mut buf = [0u8; 1152];
  assert!(matches!(core.poll(&mut buf), Ok(Event::Responded { .. })));

  let sent_back = SockMock::take_sent(&tx);
  assert_eq!(sent_back.len(), 1);
  assert_eq!(sent_back[0].addr(), addr(1));

  let rep = parse(&sent_back[0]);
  assert_eq!(rep.ty, Type::Ack);
  assert_eq!(rep.id, sent.tid);
  assert_eq!(rep.code, code::CONTENT);
  assert_eq!(rep.payload.0, b"30");

  assert!(core.get_transaction_by_tid(sent.tid).is_some());
}

#[test]
fn separate_reply_is_matched_by_token() {
  let (mut core, rx, tx) = setup(Config::default());

  let out = req(Type::Con, code::GET, "sensors", 0);
  let sent = core.send_request(Addrd(&out, addr(2)), Some(Tag(2))).unwrap();
  SockMock::take_sent(&tx);

  SockMock::send_msg(&rx, Addrd(Message::new(Type::Ack, code::EMPTY, sent.tid), addr(2)));

  let mut rep = Message::new(Type::Con, code::CONTENT, Id(900));
  rep.token = sent.token;
  SockMock::send_msg(&rx, Addrd(rep, addr(2)));

  let mut buf = [0u8; 1152];
  assert_eq!(core.poll(&mut buf).unwrap(),
             Event::Acked { addr: addr(2),
                            tid: sent.tid });

  // acked: no more retransmissions
  core.clock.advance(10_000);
  assert!(core.tick().unwrap().is_empty());
  assert!(SockMock::take_sent(&tx).is_empty());

  let mut buf = [0u8; 1152];
  assert!(matches!(core.poll(&mut buf).unwrap(),
                   Event::Reply { tid, tag: Some(Tag(2)), .. } if tid == sent.tid));

  let acks = SockMock::take_sent(&tx);
  assert_eq!(acks.len(), 1);
  let ack = parse(&acks[0]);
  assert_eq!((ack.ty, ack.code, ack.id), (Type::Ack, code::EMPTY, Id(900)));
}

#[test]
fn server_picks_block_size_for_oversized_representation() {
  let mut big = Big;
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut big).unwrap();

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "big", 1), addr(1)));
  let mut next = req(Type::Con, code::GET, "big", 2);
  next.set_block2(Block::new(512, 1, false)).unwrap();
  SockMock::send_msg(&rx, Addrd(next, addr(1)));

  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();
  core.poll(&mut buf).unwrap();

  let sent = SockMock::take_sent(&tx);
  let (first, second) = (parse(&sent[0]), parse(&sent[1]));

  assert_eq!(first.block2(), Some(Block::new(512, 0, true)));
  assert_eq!(first.payload.0.len(), 512);
  assert_eq!(second.block2(), Some(Block::new(512, 1, false)));
  assert_eq!(second.payload.0.len(), 88);

  let whole = first.payload.0.iter().chain(second.payload.0).copied().collect::<Vec<_>>();
  assert_eq!(whole, (0..Big::LEN).map(Big::byte).collect::<Vec<_>>());
}

#[test]
fn blocks_are_cut_from_whole_representation() {
  let mut blob = Blob;
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut blob).unwrap();

  let mut buf = [0u8; 1152];
  let mut rebuilt = Vec::new();

  for num in 0..=16 {
    let mut msg = req(Type::Con, code::GET, "blob", num as u16 + 1);
    msg.set_block2(Block::new(64, num, false)).unwrap();
    SockMock::send_msg(&rx, Addrd(msg, addr(1)));
    core.poll(&mut buf).unwrap();

    let sent = SockMock::take_sent(&tx);
    let rep = parse(&sent[0]);

    if num < 16 {
      assert_eq!(rep.block2(), Some(Block::new(64, num, num < 15)));
      rebuilt.extend_from_slice(rep.payload.0);
    } else {
      assert_eq!(rep.code, code::BAD_OPTION);
      assert_eq!(rep.payload.0, b"Block out of scope");
    }
  }

  assert_eq!(rebuilt, (0..1000).map(Big::byte).collect::<Vec<_>>());
}

#[test]
fn discovery_lists_resources() {
  let mut poll = Poll(30);
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut poll).unwrap();

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, ".well-known/core", 1), addr(1)));
  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();

  let sent = SockMock::take_sent(&tx);
  let rep = parse(&sent[0]);
  assert_eq!(rep.content_type(), Some(ContentFormat::LinkFormat));
  assert_eq!(rep.payload.0, b"</.well-known/core>,</config/poll>");
  assert_eq!(rep.block2(), Some(Block::new(512, 0, false)));
}

#[test]
fn separate_response() {
  let mut temp = Temperature;
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut temp).unwrap();

  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "sensors/temperature", 1), addr(1)));
  SockMock::send_msg(&rx, Addrd(req(Type::Con, code::GET, "sensors/temperature", 2), addr(2)));

  let mut buf = [0u8; 1152];
  assert_eq!(core.poll(&mut buf).unwrap(),
             Event::Deferred { addr: addr(1),
                               tid: Id(1) });
  assert_eq!(core.poll(&mut buf).unwrap(),
             Event::Dropped { addr: addr(2),
                              tid: Id(2) });
  assert!(SockMock::take_sent(&tx).is_empty());
  assert!(core.separate_pending());

  let mut rep = core.resume_separate(code::CONTENT).unwrap();
  rep.data_mut().set_payload(b" 21.5\n");
  core.send_response(rep.as_ref()).unwrap();

  let sent = SockMock::take_sent(&tx);
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].addr(), addr(1));

  let rep = parse(&sent[0]);
  assert_eq!(rep.ty, Type::Ack);
  assert_eq!(rep.id, Id(1));
  assert_eq!(rep.token, Token::from_bytes(&1u16.to_be_bytes()).unwrap());
  assert_eq!(rep.payload.0, b" 21.5\n");

  assert!(!core.separate_pending());
  assert!(core.resume_separate(code::CONTENT).is_err());
}

#[test]
fn observers_are_notified_until_they_reset() {
  let mut temp = Temperature;
  let (mut core, rx, tx) = setup(Config::default());
  let id = core.activate(&mut temp).unwrap();

  for (peer, tid) in [(1, 1), (2, 2)] {
    let mut msg = req(Type::Con, code::GET, "sensors/temperature", tid);
    msg.set_observe(0).unwrap();
    SockMock::send_msg(&rx, Addrd(msg, addr(peer)));
  }

  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();
  core.poll(&mut buf).unwrap();
  assert_eq!(core.observers().len(), 2);

  let regs = SockMock::take_sent(&tx);
  assert!(regs.iter().all(|d| parse(d).observe() == Some(0)));

  assert_eq!(core.trigger(id).unwrap(), 2);
  let notes = SockMock::take_sent(&tx);
  assert_eq!(notes.len(), 2);

  let note = notes.iter().find(|d| d.addr() == addr(1)).map(parse).unwrap();
  assert_eq!(note.ty, Type::Non);
  assert_eq!(note.observe(), Some(1));
  assert_eq!(note.token, Token::from_bytes(&1u16.to_be_bytes()).unwrap());
  assert_eq!(note.payload.0, b"23.0");

  let mut rst = Message::new(Type::Reset, code::EMPTY, note.id);
  rst.token = note.token;
  SockMock::send_msg(&rx, Addrd(rst, addr(1)));
  core.poll(&mut buf).unwrap();
  assert_eq!(core.observers().len(), 1);

  assert_eq!(core.trigger(id).unwrap(), 1);
  let notes = SockMock::take_sent(&tx);
  assert_eq!(notes.len(), 1);
  assert_eq!(notes[0].addr(), addr(2));
  assert_eq!(parse(&notes[0]).observe(), Some(2));
}

#[test]
fn observers_beyond_capacity_are_refused() {
  let config = Config { max_observers: 1,
                        ..Config::default() };
  let mut temp = Temperature;
  let (mut core, rx, tx) = setup(config);
  core.activate(&mut temp).unwrap();

  for (peer, tid) in [(1, 1), (2, 2)] {
    let mut msg = req(Type::Con, code::GET, "sensors/temperature", tid);
    msg.set_observe(0).unwrap();
    SockMock::send_msg(&rx, Addrd(msg, addr(peer)));
  }

  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();
  core.poll(&mut buf).unwrap();

  let sent = SockMock::take_sent(&tx);
  assert_eq!(parse(&sent[1]).code, code::SERVICE_UNAVAILABLE);
  assert_eq!(parse(&sent[1]).payload.0, b"Too many observers");
  assert_eq!(core.observers().len(), 1);
}

#[test]
fn periodic_resources_are_triggered_by_tick() {
  struct Heartbeat(u32);

  impl Resource for Heartbeat {
    fn url(&self) -> &str {
      "debug/heartbeat"
    }

    fn methods(&self) -> Methods {
      Methods::GET
    }

    fn kind(&self) -> Kind {
      Kind::Periodic { period: Milliseconds(5_000) }
    }

    fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
      write!(ex.resp(), "{}", self.0).ok();
    }

    fn notify(&mut self, resp: &mut Resp<'_>) -> bool {
      self.0 += 1;
      write!(resp, "{}", self.0).is_ok()
    }
  }

  let mut beat = Heartbeat(0);
  let (mut core, rx, tx) = setup(Config::default());
  core.activate(&mut beat).unwrap();

  let mut msg = req(Type::Con, code::GET, "debug/heartbeat", 1);
  msg.set_observe(0).unwrap();
  SockMock::send_msg(&rx, Addrd(msg, addr(1)));
  let mut buf = [0u8; 1152];
  core.poll(&mut buf).unwrap();
  SockMock::take_sent(&tx);

  core.tick().unwrap();
  for _ in 0..5 {
    core.clock.advance(1_000);
    core.tick().unwrap();
  }

  let notes = SockMock::take_sent(&tx);
  assert_eq!(notes.len(), 1);
  assert_eq!(parse(&notes[0]).payload.0, b"1");
}
