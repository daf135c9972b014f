use newt_msg::{Message, MAX_HEADER_SIZE};

use crate::client::{BlockingRequest, Failure, State};
use crate::config::{Config, MAX_PAYLOAD_SIZE};
use crate::core::transaction::Tag;
use crate::core::{Core, Error, What, When};
use crate::net::Addrd;
use crate::platform::PlatformTypes;
#[cfg(feature = "std")]
use crate::platform::Std;

/// Platform struct containing things needed to make a new Client.
///
/// This is used for bring-your-own platform use cases, like embedded.
#[derive(Clone, Debug)]
pub struct ClientConfig<Clock, Socket> {
  /// The clock that the engine will use
  /// to keep track of time.
  ///
  /// For `std` platforms, this is [`crate::std::Clock`].
  pub clock: Clock,
  /// The network abstraction that the engine
  /// will use to interact with the network.
  ///
  /// For `std` platforms, this is [`std::net::UdpSocket`].
  pub sock: Socket,
}

/// A blocking CoAP client, fetching resources block by block
#[allow(missing_debug_implementations)]
pub struct Client<P: PlatformTypes> {
  core: Core<'static, P>,
  tags: u32,
}

/// Helper methods on Client Results
pub trait ClientResultExt<T, P: PlatformTypes> {
  /// If the server never answered, consider that Ok(None).
  ///
  /// Usually used to handle sending non-confirmable requests that
  /// the server may have received but not responded to.
  fn timeout_ok(self) -> Result<Option<T>, Error<P>>;
}

impl<T, P: PlatformTypes> ClientResultExt<T, P> for Result<T, Error<P>> {
  fn timeout_ok(self) -> Result<Option<T>, Error<P>> {
    match self {
      | Ok(t) => Ok(Some(t)),
      | Err(Error { what: What::RequestFailed(Failure::NoReply),
                    .. }) => Ok(None),
      | Err(e) => Err(e),
    }
  }
}

#[cfg(feature = "std")]
impl Client<Std> {
  /// Create a new Client bound to `0.0.0.0:port`
  ///
  /// ```no_run
  /// use newt::blocking::Client;
  /// use newt::net::Addrd;
  /// use newt_msg::{code, Id, Message, Type};
  ///
  /// let mut client = Client::new_std(1111).unwrap();
  ///
  /// let mut req = Message::new(Type::Con, code::GET, Id(0));
  /// req.set_uri_path(".well-known/core").unwrap();
  ///
  /// client.fetch(Addrd(req, "127.0.0.1:5683".parse().unwrap()), |rep| {
  ///         print!("{}", String::from_utf8_lossy(rep.data().payload.0));
  ///       })
  ///       .unwrap();
  /// ```
  pub fn new_std(port: u16) -> std::io::Result<Self> {
    Client::<Std>::new_std_config(port, Config::default())
  }

  /// Create a new std client with a specific runtime config
  pub fn new_std_config(port: u16, config: Config) -> std::io::Result<Self> {
    let clock = crate::std::Clock::new();
    let sock = std::net::UdpSocket::bind(("0.0.0.0", port))?;
    sock.set_nonblocking(true)?;

    Ok(Client::<Std>::new_config(config, ClientConfig { clock, sock }))
  }
}

impl<P: PlatformTypes> Client<P> {
  /// Create a new request client
  pub fn new(ClientConfig { clock, sock }: ClientConfig<P::Clock, P::Socket>) -> Self {
    Self::new_config(Config::default(), ClientConfig { clock, sock })
  }

  /// Create a new request client with a specific runtime config
  pub fn new_config(config: Config,
                    ClientConfig { clock, sock }: ClientConfig<P::Clock, P::Socket>)
                    -> Self {
    Self { core: Core::new_config(config, clock, sock),
           tags: 0 }
  }

  /// The engine this client sends with
  pub fn core(&mut self) -> &mut Core<'static, P> {
    &mut self.core
  }

  /// Send a request and wait for every block of the response.
  ///
  /// `on_block` is invoked with each block as it arrives. Datagrams that
  /// are not replies to this request are handled by the engine (e.g.
  /// requests are answered with 4.04) and otherwise ignored.
  ///
  /// Fails with [`What::RequestFailed`] when the fetch is abandoned.
  /// Datagrams that do not parse are logged and skipped.
  /// The transaction of an unanswered block request is closed
  /// before any error is yielded.
  pub fn fetch<F>(&mut self, req: Addrd<Message<'_>>, on_block: F) -> Result<(), Error<P>>
    where F: FnMut(Addrd<&Message<'_>>)
  {
    self.tags = self.tags.wrapping_add(1);
    let chunk = self.core.config().chunk_size();
    let mut request = BlockingRequest::new(req, Tag(self.tags), chunk);

    let res = self.drive(&mut request, on_block);

    if let (Err(_), State::AwaitingReply { tid }) = (&res, request.state()) {
      log::debug!("abandoning block request {}", tid.0);
      self.core.clear_transaction(tid);
    }

    res
  }

  fn drive<F>(&mut self, request: &mut BlockingRequest<'_>, mut on_block: F) -> Result<(), Error<P>>
    where F: FnMut(Addrd<&Message<'_>>)
  {
    let mut buf = [0u8; MAX_HEADER_SIZE + MAX_PAYLOAD_SIZE];

    loop {
      request.send(&mut self.core)?;

      match request.state() {
        | State::Complete => return Ok(()),
        | State::Failed(failure) => return Err(When::None.what(What::RequestFailed(failure))),
        | _ => (),
      }

      for no_reply in self.core.tick()? {
        request.gave_up(&no_reply);
      }

      match self.core.poll(&mut buf) {
        | Ok(ev) => {
          if let Some(rep) = request.handle(&ev) {
            on_block(rep.as_ref());
          }
        },
        | Err(nb::Error::WouldBlock) => Self::idle(),
        | Err(nb::Error::Other(Error { what: What::FromBytes(e),
                                       .. })) => {
          log::warn!("skipping unparseable datagram: {:?}", e);
        },
        | Err(nb::Error::Other(e)) => {
          log::error!("{:?}", e.what);
          return Err(e);
        },
      }
    }
  }

  #[cfg(feature = "std")]
  fn idle() {
    std::thread::sleep(std::time::Duration::from_millis(5));
  }

  #[cfg(not(feature = "std"))]
  fn idle() {}
}
