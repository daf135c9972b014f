use core::fmt::Write;

use newt_msg::ContentFormat;

use super::Exchange;
use crate::blockwise::NO_MORE;
use crate::resp::{code, Resp};

/// Path of the discovery resource
pub const URL: &str = ".well-known/core";

/// Copies the part of a stream of strings that falls
/// in the window `[skip, skip + limit)` into a response
struct Window<'a, 's> {
  out: &'a mut Resp<'s>,
  skip: usize,
  limit: usize,
  seen: usize,
  written: usize,
}

impl<'a, 's> Write for Window<'a, 's> {
  fn write_str(&mut self, s: &str) -> core::fmt::Result {
    let start = self.seen;
    self.seen += s.len();

    let from = self.skip.max(start) - start;
    let to = (self.skip + self.limit).min(self.seen).saturating_sub(start);

    if from < to {
      self.written += self.out.extend(&s.as_bytes()[from..to]);
    }

    Ok(())
  }
}

/// Serve the CoRE link-format listing of `links` (url & attributes of
/// every resource), starting at the exchange's offset and writing at most
/// one block.
///
/// The listing is rendered from the start on every request,
/// so no state is kept between the requests for consecutive blocks.
pub(crate) fn handle<'l>(links: impl Iterator<Item = (&'l str, &'l str)>, ex: &mut Exchange<'_, '_>) {
  let offset = ex.offset().max(0) as usize;
  let limit = ex.preferred_size() as usize;

  let mut window = Window { out: ex.resp(),
                            skip: offset,
                            limit,
                            seen: 0,
                            written: 0 };

  let mut links = links.peekable();
  while let Some((url, attrs)) = links.next() {
    let sep = if attrs.is_empty() { "" } else { ";" };
    let comma = if links.peek().is_some() { "," } else { "" };
    write!(window, "</{}>{}{}{}", url, sep, attrs, comma).ok();
  }

  let (written, total) = (window.written, window.seen);

  if written > 0 {
    ex.resp().set_content_type(ContentFormat::LinkFormat);
  } else {
    ex.resp().set_code(code::BAD_OPTION);
    ex.resp().set_payload(b"Block out of scope");
  }

  if offset + written >= total {
    ex.set_offset(NO_MORE);
  } else {
    ex.set_offset((offset + written) as i32);
  }
}

#[cfg(test)]
mod tests {
  use newt_msg::{code::GET, Id, Message, Type};

  use super::*;
  use crate::core::separate::SeparateSlot;
  use crate::net::Addrd;
  use crate::req::Req;
  use crate::test::addr;

  const LINKS: [(&str, &str); 3] = [(URL, ""),
                                    ("config/poll", "title=\"Polling interval\";ct=0"),
                                    ("sensors/temperature", "ct=0")];

  const LISTING: &str = "</.well-known/core>,\
                         </config/poll>;title=\"Polling interval\";ct=0,\
                         </sensors/temperature>;ct=0";

  fn serve(size: u16, offset: i32) -> (Vec<u8>, newt_msg::Code, i32) {
    let msg = Message::new(Type::Con, GET, Id(1));
    let mut buf = [0u8; 128];
    let mut slot = SeparateSlot::default();
    let mut ex = Exchange::new(Req::new(Addrd(msg, addr(1))),
                               Resp::new(&mut buf),
                               size,
                               offset,
                               &mut slot);

    handle(LINKS.iter().copied(), &mut ex);
    let (resp, offset, _) = ex.finish();
    (resp.payload().to_vec(), resp.code(), offset)
  }

  #[test]
  fn whole_listing() {
    let (payload, code, offset) = serve(128, 0);
    assert_eq!(core::str::from_utf8(&payload).unwrap(), LISTING);
    assert_eq!(code, code::CONTENT);
    assert_eq!(offset, NO_MORE);
  }

  #[test]
  fn listing_in_blocks() {
    let mut listing = Vec::new();
    let mut offset = 0;

    while offset != NO_MORE {
      let (payload, _, next) = serve(16, offset);
      assert!(payload.len() <= 16);
      listing.extend(payload);
      offset = next;
    }

    assert_eq!(core::str::from_utf8(&listing).unwrap(), LISTING);
  }

  #[test]
  fn block_exactly_ending_the_listing_has_no_more() {
    let (_, _, offset) = serve(16, LISTING.len() as i32 - 16);
    assert_eq!(offset, NO_MORE);
  }

  #[test]
  fn past_the_end() {
    let (payload, code, _) = serve(16, LISTING.len() as i32);
    assert_eq!(payload, b"Block out of scope");
    assert_eq!(code, code::BAD_OPTION);
  }
}
