use core::fmt::Write;

use newt_msg::Message;
use tinyvec::ArrayVec;
use toad_writable::Writable;

pub(crate) fn msg_summary(msg: &Message) -> Writable<ArrayVec<[u8; 96]>> {
  let mut buf: Writable<ArrayVec<[u8; 96]>> = Default::default();
  let [a, b, c, d] = msg.code.to_human();
  write!(buf,
         "{:?} {}{}{}{} tid {} with {} opts and {}b payload",
         msg.ty,
         a,
         b,
         c,
         d,
         msg.id.0,
         msg.opts.len(),
         msg.payload.0.len()).ok();
  buf
}
