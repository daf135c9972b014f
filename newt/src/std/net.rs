use std::io;
use std::net::UdpSocket;

use no_std_net::ToSocketAddrs;

use crate::net::{Addrd, Socket};

pub(crate) fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

/// Conversions between `no_std_net` and `std::net` addresses
pub(crate) mod convert {
  use std::net;

  pub(crate) fn to_std(addr: no_std_net::SocketAddr) -> net::SocketAddr {
    match addr {
      | no_std_net::SocketAddr::V4(v4) => {
        let [a, b, c, d] = v4.ip().octets();
        net::SocketAddr::V4(net::SocketAddrV4::new(net::Ipv4Addr::new(a, b, c, d), v4.port()))
      },
      | no_std_net::SocketAddr::V6(v6) => {
        let [a, b, c, d, e, f, g, h] = v6.ip().segments();
        net::SocketAddr::V6(net::SocketAddrV6::new(net::Ipv6Addr::new(a, b, c, d, e, f, g, h),
                                                   v6.port(),
                                                   v6.flowinfo(),
                                                   v6.scope_id()))
      },
    }
  }

  pub(crate) fn from_std(addr: net::SocketAddr) -> no_std_net::SocketAddr {
    match addr {
      | net::SocketAddr::V4(v4) => {
        let [a, b, c, d] = v4.ip().octets();
        no_std_net::SocketAddr::V4(no_std_net::SocketAddrV4::new(no_std_net::Ipv4Addr::new(a, b, c, d),
                                                                 v4.port()))
      },
      | net::SocketAddr::V6(v6) => {
        let [a, b, c, d, e, f, g, h] = v6.ip().segments();
        let ip = no_std_net::Ipv6Addr::new(a, b, c, d, e, f, g, h);
        no_std_net::SocketAddr::V6(no_std_net::SocketAddrV6::new(ip,
                                                                 v6.port(),
                                                                 v6.flowinfo(),
                                                                 v6.scope_id()))
      },
    }
  }
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn local_addr(&self) -> no_std_net::SocketAddr {
    UdpSocket::local_addr(self).map(convert::from_std)
                               .unwrap_or_else(|_| {
                                 no_std_net::SocketAddr::new(no_std_net::Ipv4Addr::UNSPECIFIED.into(), 0)
                               })
  }

  fn bind_raw<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error> {
    let addrs = addr.to_socket_addrs()
                    .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?
                    .map(convert::to_std)
                    .collect::<Vec<_>>();

    let sock = UdpSocket::bind(addrs.as_slice())?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.send_to(msg.data(), convert::to_std(msg.addr()))
        .map(|_| ())
        .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, convert::from_std(addr)))
        .map_err(io_to_nb)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn addrs_survive_conversion() {
    let v4 = no_std_net::SocketAddr::new(no_std_net::Ipv4Addr::new(10, 0, 0, 7).into(), 61616);
    assert_eq!(convert::from_std(convert::to_std(v4)), v4);
    assert_eq!(convert::to_std(v4), "10.0.0.7:61616".parse::<std::net::SocketAddr>().unwrap());
  }

  #[test]
  fn empty_socket_would_block() {
    let local = no_std_net::SocketAddr::new(no_std_net::Ipv4Addr::LOCALHOST.into(), 0);
    let sock = <UdpSocket as Socket>::bind_raw(local).unwrap();
    let mut buf = [0u8; 8];
    assert!(matches!(Socket::recv(&sock, &mut buf), Err(nb::Error::WouldBlock)));
  }
}
