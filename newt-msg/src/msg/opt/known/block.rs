/// Three items of information may need to be transferred in a
/// Block (Block1 or Block2) option:
/// * the size of the block ([`Block::size`])
/// * whether more blocks are following ([`Block::more`])
/// * the relative number of the block ([`Block::num`]) within a sequence of blocks with the given size.
///
/// These are packed into a single integer of up to 3 bytes:
///
/// ```text
/// num (up to 20 bits) | more (1 bit) | size exponent (3 bits)
/// ```
///
/// where the block size is `2^(szx + 4)`, so between 16 and 1024 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Block(u32);

impl Block {
  /// The largest block number that fits in 3 bytes
  pub const MAX_NUM: u32 = (1 << 20) - 1;

  /// Create a block, rounding `size` down to the nearest power of two in `[16, 1024]`.
  pub fn new(size: u16, num: u32, more: bool) -> Self {
    let num = num.min(Self::MAX_NUM) << 4;
    let more = u32::from(more) << 3;
    let size = size.max(16).min(1024);
    let log2 = 15 - size.leading_zeros();
    let szx = log2 - 4;

    Self(num | more | szx)
  }

  #[allow(missing_docs)]
  pub fn size(&self) -> u16 {
    let szx = (self.0 & 0b111).min(6);
    2u16.pow(szx + 4)
  }

  #[allow(missing_docs)]
  pub fn more(&self) -> bool {
    (self.0 & 0b1000) >> 3 == 1
  }

  #[allow(missing_docs)]
  pub fn num(&self) -> u32 {
    self.0 >> 4
  }

  /// Byte offset of the start of this block
  ///
  /// ```
  /// use newt_msg::Block;
  ///
  /// assert_eq!(Block::new(64, 3, true).offset(), 192);
  /// ```
  pub fn offset(&self) -> usize {
    self.num() as usize * self.size() as usize
  }
}

impl From<Block> for u32 {
  fn from(b: Block) -> Self {
    b.0
  }
}

impl From<u32> for Block {
  fn from(n: u32) -> Self {
    Block(n)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn block() {
    let b = Block(33);
    assert_eq!(b.size(), 32);
    assert_eq!(b.num(), 2);
    assert_eq!(b.more(), false);

    let b = Block(59);
    assert_eq!(b.size(), 128);
    assert_eq!(b.num(), 3);
    assert_eq!(b.more(), true);

    assert_eq!(Block::new(32, 2, false), Block(33));
    assert_eq!(Block::new(128, 3, true), Block(59));
  }

  #[test]
  fn size_rounds_down_to_nearest_power_of_two() {
    assert_eq!(Block::new(0, 1, false).size(), 16);
    assert_eq!(Block::new(17, 1, false).size(), 16);
    assert_eq!(Block::new(33, 1, false).size(), 32);
    assert_eq!(Block::new(512, 1, false).size(), 512);
    assert_eq!(Block::new(1000, 1, false).size(), 512);
    assert_eq!(Block::new(2048, 1, false).size(), 1024);
  }

  #[test]
  fn reserved_size_exponent_is_clamped() {
    assert_eq!(Block(0b0111).size(), 1024);
  }
}
