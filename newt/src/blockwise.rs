//! Splitting response payloads into Block2 blocks.
//!
//! Resource handlers are handed a byte offset along with the request.
//! A handler that ignores it writes its whole representation every time
//! and leaves the offset as-is; the engine then cuts the requested block
//! out of the payload. A handler that produces its representation piece
//! by piece writes only the requested block and moves the offset forward,
//! or sets it to [`NO_MORE`] once the last piece has been written.

use newt_msg::Block;

/// Offset value meaning "the payload just written is the last piece"
pub const NO_MORE: i32 = -1;

/// What to do with a handler's payload before sending it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
  /// Send the payload as-is, without a Block2 option
  Whole,
  /// The requested block starts past the end of the payload
  OutOfScope,
  /// Send `len` bytes starting at `start`, along with a Block2 option
  Block {
    #[allow(missing_docs)]
    block: Block,
    #[allow(missing_docs)]
    start: usize,
    #[allow(missing_docs)]
    len: usize,
  },
}

/// The block size used to answer a request: the size the client asked
/// for, capped at our `chunk` size.
pub fn block_size(requested: Option<Block>, chunk: u16) -> u16 {
  requested.map(|b| b.size().min(chunk)).unwrap_or(chunk)
}

/// The byte offset a request's Block2 option points to,
/// using the block size returned by [`block_size`].
pub fn block_offset(requested: Option<Block>, chunk: u16) -> i32 {
  requested.map(|b| (b.num() as u64 * block_size(requested, chunk) as u64).min(i32::MAX as u64) as i32)
           .unwrap_or(0)
}

/// Decide which part of a `payload_len`-byte payload answers a request,
/// given the Block2 option it carried and the offset the handler left behind.
///
/// ```
/// use newt::blockwise::{window, Window};
/// use newt_msg::Block;
///
/// // a handler unaware of blockwise transfer wrote 100 bytes
/// // for a request asking for the second 32-byte block
/// let requested = Block::new(32, 1, false);
/// assert_eq!(window(Some(requested), 512, 32, 100),
///            Window::Block { block: Block::new(32, 1, true),
///                            start: 32,
///                            len: 32 });
/// ```
pub fn window(requested: Option<Block>, chunk: u16, new_offset: i32, payload_len: usize) -> Window {
  let size = block_size(requested, chunk);

  match requested {
    | Some(req) => {
      let offset = block_offset(requested, chunk);

      if new_offset == offset {
        let offset = offset as usize;
        if offset >= payload_len {
          return Window::OutOfScope;
        }

        let remaining = payload_len - offset;
        let more = remaining > size as usize;
        Window::Block { block: Block::new(size, req.num(), more),
                        start: offset,
                        len: remaining.min(size as usize) }
      } else {
        let more = new_offset != NO_MORE || payload_len > size as usize;
        Window::Block { block: Block::new(size, req.num(), more),
                        start: 0,
                        len: payload_len.min(size as usize) }
      }
    },
    | None if new_offset != 0 => Window::Block { block: Block::new(chunk, 0, new_offset != NO_MORE),
                                                 start: 0,
                                                 len: payload_len.min(chunk as usize) },
    | None => Window::Whole,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unaware_handler_blocks_reconstruct_payload() {
    let payload = (0..1000u32).map(|n| n as u8).collect::<Vec<_>>();
    let mut rebuilt = Vec::new();

    for num in 0..16 {
      let req = Block::new(64, num, false);
      match window(Some(req), 512, block_offset(Some(req), 512), payload.len()) {
        | Window::Block { block, start, len } => {
          assert_eq!(block.num(), num);
          assert_eq!(block.more(), num < 15);
          rebuilt.extend_from_slice(&payload[start..start + len]);
        },
        | other => panic!("block {} got {:?}", num, other),
      }
    }

    assert_eq!(rebuilt, payload);

    let req = Block::new(64, 16, false);
    assert_eq!(window(Some(req), 512, 1024, payload.len()), Window::OutOfScope);
  }

  #[test]
  fn requested_size_is_capped_at_chunk() {
    let req = Block::new(1024, 1, false);
    assert_eq!(block_size(Some(req), 256), 256);
    assert_eq!(window(Some(req), 256, 256, 600),
               Window::Block { block: Block::new(256, 1, true),
                               start: 256,
                               len: 256 });
  }

  #[test]
  fn aware_handler() {
    let req = Block::new(64, 2, false);

    // more to come
    assert_eq!(window(Some(req), 512, 192, 64),
               Window::Block { block: Block::new(64, 2, true),
                               start: 0,
                               len: 64 });

    // last piece
    assert_eq!(window(Some(req), 512, NO_MORE, 10),
               Window::Block { block: Block::new(64, 2, false),
                               start: 0,
                               len: 10 });
  }

  #[test]
  fn unsolicited_block() {
    assert_eq!(window(None, 512, 0, 600), Window::Whole);
    assert_eq!(window(None, 512, 512, 600),
               Window::Block { block: Block::new(512, 0, true),
                               start: 0,
                               len: 512 });
    assert_eq!(window(None, 512, NO_MORE, 100),
               Window::Block { block: Block::new(512, 0, false),
                               start: 0,
                               len: 100 });
  }
}
