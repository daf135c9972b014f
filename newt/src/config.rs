use embedded_time::duration::Milliseconds;
use newt_msg::{Block, MAX_HEADER_SIZE};

use crate::retry::{Attempts, Strategy};
use crate::time::Millis;

/// The port CoAP servers listen on by default
pub const COAP_PORT: u16 = 5683;

/// The port sensor nodes listen on
pub const NODE_PORT: u16 = 61616;

/// Compile-time ceiling on [`Config::max_open_transactions`]
pub const MAX_OPEN_TRANSACTIONS: usize = 8;

/// Compile-time ceiling on [`Config::max_observers`]
pub const MAX_OBSERVERS: usize = 8;

/// How many resources (including `.well-known/core`) may be activated
pub const MAX_RESOURCES: usize = 16;

/// The largest block size the engine will ever use
pub const MAX_CHUNK_SIZE: u16 = 1024;

/// Size of the scratch buffer resource handlers write response payloads into
pub const MAX_PAYLOAD_SIZE: usize = MAX_CHUNK_SIZE as usize;

/// Size of the buffer each transaction serializes its message into
pub const TRANSACTION_BUFFER_SIZE: usize = MAX_HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Configuration options related to outbound CON messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Con {
  /// Retry strategy for CON messages that
  /// have not yet been acknowledged.
  ///
  /// Defaults to an exponential retry strategy
  /// with an initial timeout between 2 and 3 seconds:
  /// ```
  /// use embedded_time::duration::Milliseconds;
  /// use newt::config::Con;
  /// use newt::retry::Strategy;
  ///
  /// assert_eq!(Con::default().retry_strategy,
  ///            Strategy::Exponential { init_min: Milliseconds(2_000),
  ///                                    init_max: Milliseconds(3_000) });
  /// ```
  pub retry_strategy: Strategy,
  /// Number of times we are allowed to resend a CON message
  /// before giving up on it.
  ///
  /// Defaults to 4 attempts.
  /// ```
  /// use newt::config::Con;
  /// use newt::retry::Attempts;
  ///
  /// assert_eq!(Con::default().max_attempts, Attempts(4));
  /// ```
  pub max_attempts: Attempts,
  /// Upper bound on the delay between two transmissions.
  ///
  /// Defaults to 60 seconds.
  pub max_retry_delay: Millis,
}

impl Default for Con {
  fn default() -> Self {
    Con { retry_strategy: Strategy::Exponential { init_min: Milliseconds(2_000),
                                                  init_max: Milliseconds(3_000) },
          max_attempts: Attempts(4),
          max_retry_delay: Milliseconds(60_000) }
  }
}

/// Configuration options related to parsing & handling messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msg {
  /// Seed for the first transaction id we hand out.
  ///
  /// Nodes sharing a network should use distinct seeds so
  /// their transaction ids don't collide after a reboot.
  ///
  /// Defaults to 0, which means "pick one at random".
  pub tid_seed: u16,
  /// Seed used to generate message [`Token`](newt_msg::Token)s,
  /// customizable to allow for your application to generate tokens
  /// less guessably.
  ///
  /// ```
  /// use newt::config::Msg;
  ///
  /// assert_eq!(Msg::default().token_seed, 0);
  /// ```
  pub token_seed: u16,
  /// See [`Con`]
  pub con: Con,
  /// The largest block we will send, and the block size we
  /// split oversized responses into when the client did not ask for one.
  ///
  /// Rounded down to a power of two between 16 and [`MAX_CHUNK_SIZE`].
  ///
  /// ```
  /// use newt::config::Msg;
  ///
  /// assert_eq!(Msg::default().max_chunk_size, 512);
  /// ```
  pub max_chunk_size: u16,
}

impl Default for Msg {
  fn default() -> Self {
    Msg { tid_seed: 0,
          token_seed: 0,
          con: Con::default(),
          max_chunk_size: 512 }
  }
}

/// Runtime config, allows you to configure how the engine behaves
/// within the capacities fixed at compile time.
///
/// ```
/// use newt::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.max_open_transactions, 4);
/// assert_eq!(config.max_observers, 4);
/// assert_eq!(config.chunk_size(), 512);
///
/// let config = Config { max_open_transactions: 1000,
///                       ..Config::default() };
/// assert_eq!(config.open_transaction_limit(), newt::config::MAX_OPEN_TRANSACTIONS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// See [`Msg`]
  pub msg: Msg,
  /// How many transactions may be in flight at once.
  ///
  /// May be as low as 1. Values above [`MAX_OPEN_TRANSACTIONS`]
  /// are treated as [`MAX_OPEN_TRANSACTIONS`].
  pub max_open_transactions: usize,
  /// How many observers (across all resources) we track at once.
  ///
  /// Values above [`MAX_OBSERVERS`] are treated as [`MAX_OBSERVERS`].
  pub max_observers: usize,
}

impl Default for Config {
  fn default() -> Self {
    Config { msg: Msg::default(),
             max_open_transactions: 4,
             max_observers: 4 }
  }
}

impl Config {
  /// The block size actually used when chunking responses
  ///
  /// ```
  /// use newt::config::{Config, Msg};
  ///
  /// let config = Config { msg: Msg { max_chunk_size: 100,
  ///                                  ..Msg::default() },
  ///                       ..Config::default() };
  /// assert_eq!(config.chunk_size(), 64);
  /// ```
  pub fn chunk_size(&self) -> u16 {
    Block::new(self.msg.max_chunk_size.min(MAX_CHUNK_SIZE), 0, false).size()
  }

  /// [`Config::max_open_transactions`], bounded by capacity
  pub fn open_transaction_limit(&self) -> usize {
    self.max_open_transactions.max(1).min(MAX_OPEN_TRANSACTIONS)
  }

  /// [`Config::max_observers`], bounded by capacity
  pub fn observer_limit(&self) -> usize {
    self.max_observers.min(MAX_OBSERVERS)
  }
}
