use no_std_net::{SocketAddr, ToSocketAddrs};

/// A value paired with the peer it was received from or is sent to
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  #[allow(missing_docs)]
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(&self.0, self.1)
  }

  /// Drop the peer address
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Transform the value, keeping the peer address
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  #[allow(missing_docs)]
  pub fn data(&self) -> &T {
    &self.0
  }

  #[allow(missing_docs)]
  pub fn data_mut(&mut self) -> &mut T {
    &mut self.0
  }

  /// The peer
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A datagram socket.
///
/// The engine only sends datagrams to addresses and pulls the next
/// received datagram, so this is all a platform needs to provide.
/// Both operations are non-blocking.
pub trait Socket: Sized {
  #[allow(missing_docs)]
  type Error: core::fmt::Debug;

  /// The address this socket is bound to
  fn local_addr(&self) -> SocketAddr;

  /// Bind to the first address `addr` yields, in non-blocking mode
  fn bind_raw<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error>;

  /// Send a datagram
  fn send(&self, dgram: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Receive the next datagram into `buffer`, yielding its length and sender.
  ///
  /// Bytes that do not fit in `buffer` are discarded.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;
}
