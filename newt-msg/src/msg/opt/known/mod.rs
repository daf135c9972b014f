use super::OptNumber;

/// Block1 / Block2 values
pub mod block;
pub use block::*;

/// Content-Type values
pub mod content_format;
pub use content_format::*;

macro_rules! opt {
  ($(#[$meta:meta])* $name:ident = $n:literal) => {
    $(#[$meta])*
    pub const $name: OptNumber = OptNumber($n);
  };
}

opt!(
  /// Content-Type, see [`ContentFormat`]
  CONTENT_TYPE = 1
);
opt!(
  /// Max-Age in seconds (defaults to 60 when absent)
  MAX_AGE = 2
);
opt!(
  /// Proxy-Uri
  PROXY_URI = 3
);
opt!(
  /// ETag
  ETAG = 4
);
opt!(
  /// Uri-Host
  URI_HOST = 5
);
opt!(
  /// Location-Path, one option per path segment
  LOCATION_PATH = 6
);
opt!(
  /// Uri-Port
  URI_PORT = 7
);
opt!(
  /// Location-Query, one option per `&`-separated argument
  LOCATION_QUERY = 8
);
opt!(
  /// Uri-Path, one option per path segment
  URI_PATH = 9
);
opt!(
  /// Observe; on a request it registers interest in a resource,
  /// on a notification it carries the sequence number.
  OBSERVE = 10
);
opt!(
  /// Token, see [`Token`](crate::Token)
  TOKEN = 11
);
opt!(
  /// Accept
  ACCEPT = 12
);
opt!(
  /// If-Match
  IF_MATCH = 13
);
opt!(
  /// The first fence-post option number
  FENCE_POST = 14
);
opt!(
  /// Uri-Query, one option per `&`-separated argument
  URI_QUERY = 15
);
opt!(
  /// Block2, see [`Block`]
  BLOCK2 = 17
);
opt!(
  /// Block1, see [`Block`]
  BLOCK1 = 19
);
opt!(
  /// If-None-Match
  IF_NONE_MATCH = 21
);
