/// Version of the CoAP protocol that the message adheres to.
///
/// The only version this crate will parse is 1.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Version(pub u8);

impl Default for Version {
  fn default() -> Self {
    Version(1)
  }
}
