use core::fmt::Debug;
use core::marker::PhantomData;

use crate::net::Socket;
use crate::time::Clock;

/// The types a [`Core`](crate::core::Core) is parameterized by:
/// something to tell time with and something to talk to the network with.
pub trait PlatformTypes: Sized + 'static + Debug {
  /// What should we use to keep track of time?
  type Clock: Clock;

  /// What should we use for networking?
  type Socket: Socket;
}

/// Implementor of [`PlatformTypes`] for any clock & socket
///
/// ```
/// use newt::platform::{Platform, PlatformTypes};
///
/// type MyPlatform = Platform<newt::std::Clock, std::net::UdpSocket>;
///
/// fn socket_of<P: PlatformTypes>() {}
/// socket_of::<MyPlatform>();
/// ```
pub struct Platform<Clk, Sock>(PhantomData<(Clk, Sock)>)
  where Clk: Clock + 'static,
        Sock: Socket + 'static;

impl<Clk: Clock + 'static, Sock: Socket + 'static> Debug for Platform<Clk, Sock> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "Platform::<_, _>(_)")
  }
}

impl<Clk: Clock + 'static, Sock: Socket + 'static> Clone for Platform<Clk, Sock> {
  fn clone(&self) -> Self {
    Self(PhantomData)
  }
}

impl<Clk: Clock + 'static, Sock: Socket + 'static> Copy for Platform<Clk, Sock> {}

impl<Clk: Clock + 'static, Sock: Socket + 'static> PlatformTypes for Platform<Clk, Sock> {
  type Clock = Clk;
  type Socket = Sock;
}

/// Uses [`std::net::UdpSocket`] for networking
/// and [`crate::std::Clock`] for timing
#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
pub type Std = Platform<crate::std::Clock, std::net::UdpSocket>;
