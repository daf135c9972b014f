use std::cell::{Cell, RefCell};
use std::fmt::Write;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use embedded_time::duration::Milliseconds;
use newt::config::NODE_PORT;
use newt::core::{Core, Error, What, When};
use newt::net::Addrd;
use newt::platform::Std;
use newt::req::{Method, Methods};
use newt::resp::{code, Resp};
use newt::server::{Exchange, Kind, Resource};
use newt_msg::{ContentFormat, Message};
use rand::{Rng, SeedableRng};

/// A temperature reading is served inline when it is younger than this
const FRESH_FOR: Duration = Duration::from_secs(5);

/// State shared by the resources and the main loop, in tenths of a degree
struct Node {
  started: Instant,
  poll_secs: Cell<u8>,
  threshold: Cell<i16>,
  temperature: Cell<i16>,
  last_reported: Cell<i16>,
  last_read: Cell<Option<Instant>>,
  read_requested: Cell<bool>,
  identifier: RefCell<String>,
  rng: Cell<rand_chacha::ChaCha8Rng>,
}

impl Node {
  fn new() -> Self {
    Self { started: Instant::now(),
           poll_secs: Cell::new(3),
           threshold: Cell::new(10),
           temperature: Cell::new(215),
           last_reported: Cell::new(215),
           last_read: Cell::new(None),
           read_requested: Cell::new(false),
           identifier: RefCell::new("newt-node".into()),
           rng: Cell::new(rand_chacha::ChaCha8Rng::seed_from_u64(61616)) }
  }

  fn fresh(&self) -> bool {
    matches!(self.last_read.get(), Some(at) if at.elapsed() < FRESH_FOR)
  }

  /// Take a reading, yielding whether it moved past the threshold
  /// since the last one reported to observers
  fn read(&self) -> bool {
    let mut rng = self.rng.replace(rand_chacha::ChaCha8Rng::seed_from_u64(0));
    let temp = self.temperature.get() + rng.gen_range(-8..=8);
    self.rng.set(rng);

    self.temperature.set(temp);
    self.last_read.set(Some(Instant::now()));
    log::info!("Temp: {}", Tenths(temp));

    let last = self.last_reported.get();
    if (temp - last).abs() > self.threshold.get() {
      self.last_reported.set(temp);
      true
    } else {
      false
    }
  }
}

/// Formats tenths of a degree as `d.d`
struct Tenths(i16);

impl std::fmt::Display for Tenths {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    write!(f, "{}{}.{}", sign, (self.0 / 10).abs(), (self.0 % 10).abs())
  }
}

struct Temperature<'a>(&'a Node);

impl<'a> Resource for Temperature<'a> {
  fn url(&self) -> &str {
    "sensors/temperature"
  }

  fn methods(&self) -> Methods {
    Methods::GET
  }

  fn attributes(&self) -> &str {
    "title=\"Temperature\";ct=0;rt=\"temperature:C\""
  }

  fn kind(&self) -> Kind {
    Kind::Event
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    if self.0.fresh() {
      ex.resp().set_content_type(ContentFormat::Text);
      write!(ex.resp(), " {}\n", Tenths(self.0.temperature.get())).ok();
      return;
    }

    if ex.accept().is_err() {
      ex.resp().set_code(code::SERVICE_UNAVAILABLE);
      write!(ex.resp(), "AlreadyInUse").ok();
      return;
    }

    self.0.read_requested.set(true);
  }

  fn notify(&mut self, resp: &mut Resp<'_>) -> bool {
    resp.set_content_type(ContentFormat::Text);
    write!(resp, " {}\n", Tenths(self.0.temperature.get())).is_ok()
  }
}

struct Poll<'a>(&'a Node);

impl<'a> Resource for Poll<'a> {
  fn url(&self) -> &str {
    "config/poll"
  }

  fn methods(&self) -> Methods {
    Methods::GET | Methods::PUT
  }

  fn attributes(&self) -> &str {
    "title=\"Polling interval\";ct=0;rt=\"time:s\""
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    ex.resp().set_content_type(ContentFormat::Text);

    if ex.req().method() == Some(Method::GET) {
      write!(ex.resp(), "{}", self.0.poll_secs.get()).ok();
      return;
    }

    let secs = ex.req()
                 .payload_str()
                 .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
                 .and_then(|s| s.parse::<u8>().ok())
                 .filter(|secs| (1..255).contains(secs));

    match secs {
      | Some(secs) => {
        self.0.poll_secs.set(secs);
        ex.resp().set_code(code::CHANGED);
        write!(ex.resp(), "Successfully set poll intervall").ok();
      },
      | None => {
        ex.resp().set_code(code::BAD_REQUEST);
        write!(ex.resp(), "Payload format: aa, e.g. 15 sets the poll interval to 15 seconds").ok();
      },
    }
  }
}

struct Threshold<'a>(&'a Node);

impl<'a> Threshold<'a> {
  /// Parses `t`, `tt`, `t.t` or `tt.t` into tenths of a degree
  fn parse(s: &str) -> Option<i16> {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    match s.split_once('.') {
      | None if digits(s) && s.len() <= 2 => s.parse::<i16>().ok().map(|d| d * 10),
      | Some((whole, tenth)) if digits(whole) && whole.len() <= 2 && digits(tenth) && tenth.len() == 1 => {
        Some(whole.parse::<i16>().ok()? * 10 + tenth.parse::<i16>().ok()?)
      },
      | _ => None,
    }
  }
}

impl<'a> Resource for Threshold<'a> {
  fn url(&self) -> &str {
    "config/threshold"
  }

  fn methods(&self) -> Methods {
    Methods::GET | Methods::PUT
  }

  fn attributes(&self) -> &str {
    "title=\"Threshold temperature\";ct=0;rt=\"temperature:C\""
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    ex.resp().set_content_type(ContentFormat::Text);

    if ex.req().method() == Some(Method::GET) {
      write!(ex.resp(), "{}", Tenths(self.0.threshold.get())).ok();
      return;
    }

    match ex.req().payload_str().and_then(Self::parse) {
      | Some(tenths) => {
        self.0.threshold.set(tenths);
        ex.resp().set_code(code::CHANGED);
      },
      | None => {
        ex.resp().set_code(code::BAD_REQUEST);
        write!(ex.resp(), "Payload format: tt.t, e.g. 1.0 sets the threshold to 1.0 deg").ok();
      },
    }
  }
}

/// Longest identifier we keep
const MAX_IDENTIFIER_LEN: usize = 50;

struct Identifier<'a>(&'a Node);

impl<'a> Resource for Identifier<'a> {
  fn url(&self) -> &str {
    "config/identifier"
  }

  fn methods(&self) -> Methods {
    Methods::GET | Methods::PUT
  }

  fn attributes(&self) -> &str {
    "title=\"Identifier\";rt=\"id\""
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    ex.resp().set_content_type(ContentFormat::Text);

    if ex.req().method() == Some(Method::GET) {
      write!(ex.resp(), "{}", self.0.identifier.borrow()).ok();
      return;
    }

    match ex.req().payload_str().filter(|id| id.len() > 3) {
      | Some(id) => {
        let mut kept = id.to_string();
        while kept.len() > MAX_IDENTIFIER_LEN {
          kept.pop();
        }

        log::info!("identifier is now {:?}", kept);
        self.0.identifier.replace(kept);
        ex.resp().set_code(code::CHANGED);
      },
      | None => ex.resp().set_code(code::BAD_REQUEST),
    }
  }
}

struct Version;

impl Resource for Version {
  fn url(&self) -> &str {
    "debug/version"
  }

  fn methods(&self) -> Methods {
    Methods::GET
  }

  fn attributes(&self) -> &str {
    "title=\"Version Number\";rt=\"string\""
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    ex.resp().set_content_type(ContentFormat::Text);
    write!(ex.resp(), "{}", env!("CARGO_PKG_VERSION")).ok();
  }
}

struct Heartbeat<'a>(&'a Node);

impl<'a> Heartbeat<'a> {
  fn beat(&self, resp: &mut Resp<'_>) -> std::fmt::Result {
    write!(resp,
           "version:{},uptime:{},temp:{}",
           env!("CARGO_PKG_VERSION"),
           self.0.started.elapsed().as_secs(),
           Tenths(self.0.temperature.get()))
  }
}

impl<'a> Resource for Heartbeat<'a> {
  fn url(&self) -> &str {
    "debug/heartbeat"
  }

  fn methods(&self) -> Methods {
    Methods::GET
  }

  fn attributes(&self) -> &str {
    "title=\"Heartbeat\";obs;rt=\"heartbeat\""
  }

  fn kind(&self) -> Kind {
    Kind::Periodic { period: Milliseconds(60_000) }
  }

  fn handle(&mut self, ex: &mut Exchange<'_, '_>) {
    self.beat(ex.resp()).ok();
  }

  fn notify(&mut self, resp: &mut Resp<'_>) -> bool {
    self.beat(resp).is_ok()
  }
}

/// Answer the request `sensors/temperature` deferred
fn finalize(core: &mut Core<'_, Std>, node: &Node) -> Result<(), Error<Std>> {
  let text = format!(" {}\n", Tenths(node.temperature.get()));

  let rep = core.resume_separate(code::CONTENT)?;
  let addr = rep.addr();
  let mut msg: Message<'_> = rep.unwrap();

  msg.set_content_type(ContentFormat::Text)
     .map_err(|e| When::None.what(What::SetOption(e)))?;
  msg.set_payload(text.as_bytes());

  core.send_response(Addrd(&msg, addr))
}

fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();

  let node = Node::new();
  let mut temperature = Temperature(&node);
  let mut threshold = Threshold(&node);
  let mut poll = Poll(&node);
  let mut heartbeat = Heartbeat(&node);
  let mut identifier = Identifier(&node);
  let mut version = Version;

  let sock = UdpSocket::bind(("0.0.0.0", NODE_PORT)).unwrap();
  sock.set_nonblocking(true).unwrap();

  let mut core = Core::<Std>::new(newt::std::Clock::new(), sock);
  let temperature = core.activate(&mut temperature).unwrap();
  core.activate(&mut threshold).unwrap();
  core.activate(&mut poll).unwrap();
  core.activate(&mut heartbeat).unwrap();
  core.activate(&mut identifier).unwrap();
  core.activate(&mut version).unwrap();

  log::info!("serving {:?} on {}", core.registry(), NODE_PORT);

  let mut buf = [0u8; 1152];
  let mut next_read = Instant::now();

  loop {
    match core.poll(&mut buf) {
      | Ok(ev) => log::debug!("{:?}", ev),
      | Err(nb::Error::WouldBlock) => std::thread::sleep(Duration::from_millis(10)),
      | Err(nb::Error::Other(e)) => log::warn!("{:?}", e.what),
    }

    if let Err(e) = core.tick() {
      log::warn!("{:?}", e.what);
    }

    if node.read_requested.replace(false) || Instant::now() >= next_read {
      next_read = Instant::now() + Duration::from_secs(node.poll_secs.get() as u64);

      if node.read() {
        if let Err(e) = core.trigger(temperature) {
          log::warn!("notifying observers failed: {:?}", e.what);
        }
      }

      if core.separate_pending() {
        if let Err(e) = finalize(&mut core, &node) {
          log::warn!("separate response failed: {:?}", e.what);
        }
      }
    }
  }
}
