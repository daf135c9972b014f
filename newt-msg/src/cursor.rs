/// A cursor over a borrowed byte slice.
///
/// Unlike a `std::io::Cursor`, everything this yields
/// borrows from the underlying buffer rather than the cursor,
/// so parsed messages can outlive the cursor that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor<'a> {
  bytes: &'a [u8],
  cursor: usize,
}

impl<'a> Cursor<'a> {
  pub(crate) fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, cursor: 0 }
  }

  /// Take the next byte
  pub(crate) fn next(&mut self) -> Option<u8> {
    self.take_exact(1).map(|a| a[0])
  }

  /// Take exactly `n` bytes, without moving the cursor
  /// if there are fewer than `n` remaining.
  pub(crate) fn take_exact(&mut self, n: usize) -> Option<&'a [u8]> {
    if n > self.remaining() {
      None
    } else {
      let out = &self.bytes[self.cursor..self.cursor + n];
      self.cursor += n;
      Some(out)
    }
  }

  /// Take everything after the cursor
  pub(crate) fn take_until_end(&mut self) -> &'a [u8] {
    let out = &self.bytes[self.cursor..];
    self.cursor = self.bytes.len();
    out
  }

  pub(crate) fn remaining(&self) -> usize {
    self.bytes.len() - self.cursor
  }

  pub(crate) fn position(&self) -> usize {
    self.cursor
  }
}
