use newt_msg::{Block, Code, Id, Message, SetOptionError, Token, Type};
use no_std_net::SocketAddr;

use crate::net::Addrd;

/// Everything needed to answer a request after
/// the handler that received it has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparateContext {
  /// The requester
  pub addr: SocketAddr,
  /// Transaction id of the request
  pub tid: Id,
  /// Type of the request
  pub ty: Type,
  /// Token of the request
  pub token: Token,
  /// Block2 option of the request, if any
  pub block2: Option<Block>,
}

impl SeparateContext {
  /// Build the deferred response.
  ///
  /// A confirmable request is answered with an ACK, anything else with a NON,
  /// both carrying the original transaction id & token.
  pub fn resume(&self, code: Code) -> Result<Addrd<Message<'static>>, SetOptionError> {
    let ty = match self.ty {
      | Type::Con => Type::Ack,
      | _ => Type::Non,
    };

    let mut msg = Message::new(ty, code.sendable(), self.tid);
    msg.token = self.token;

    if let Some(block) = self.block2 {
      msg.set_block2(Block::new(block.size(), block.num(), false))?;
    }

    Ok(Addrd(msg, self.addr))
  }
}

/// The slot holding the (single) pending separate response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeparateSlot(Option<SeparateContext>);

/// A separate response is already pending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotOccupied;

impl SeparateSlot {
  /// Capture a request for deferred handling
  pub fn accept(&mut self, req: Addrd<&Message>) -> Result<(), SlotOccupied> {
    if self.0.is_some() {
      return Err(SlotOccupied);
    }

    let msg = req.data();
    self.0 = Some(SeparateContext { addr: req.addr(),
                                    tid: msg.id,
                                    ty: msg.ty,
                                    token: msg.token,
                                    block2: msg.block2() });
    Ok(())
  }

  /// Is a separate response pending?
  pub fn is_occupied(&self) -> bool {
    self.0.is_some()
  }

  #[allow(missing_docs)]
  pub fn get(&self) -> Option<&SeparateContext> {
    self.0.as_ref()
  }

  /// Free the slot, yielding the context it held
  pub fn take(&mut self) -> Option<SeparateContext> {
    self.0.take()
  }
}
