use core::ops::BitOr;

use newt_msg::{code, Code};

/// Request method
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Method(Code);

impl core::fmt::Display for Method {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self.0.detail {
      | 1 => write!(f, "GET"),
      | 2 => write!(f, "POST"),
      | 3 => write!(f, "PUT"),
      | _ => write!(f, "DELETE"),
    }
  }
}

impl Method {
  #[allow(missing_docs)]
  pub const GET: Method = Method(code::GET);
  #[allow(missing_docs)]
  pub const POST: Method = Method(code::POST);
  #[allow(missing_docs)]
  pub const PUT: Method = Method(code::PUT);
  #[allow(missing_docs)]
  pub const DELETE: Method = Method(code::DELETE);

  /// Get the method of a request code, if it is one
  ///
  /// ```
  /// use newt::req::Method;
  /// use newt_msg::code;
  ///
  /// assert_eq!(Method::from_code(code::PUT), Some(Method::PUT));
  /// assert_eq!(Method::from_code(code::CONTENT), None);
  /// ```
  pub fn from_code(code: Code) -> Option<Method> {
    if code.is_method() {
      Some(Method(code))
    } else {
      None
    }
  }

  #[allow(missing_docs)]
  pub fn code(&self) -> Code {
    self.0
  }

  /// This method's bit in a [`Methods`] mask, `1 << (code - 1)`
  pub fn mask(&self) -> u8 {
    1 << (u8::from(self.0) - 1)
  }
}

/// A set of [`Method`]s a resource accepts
///
/// ```
/// use newt::req::{Method, Methods};
///
/// let methods = Methods::GET | Methods::PUT;
/// assert_eq!(methods, Methods(0b0101));
/// assert!(methods.allows(Method::PUT));
/// assert!(!methods.allows(Method::POST));
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Methods(pub u8);

impl Methods {
  #[allow(missing_docs)]
  pub const GET: Methods = Methods(1);
  #[allow(missing_docs)]
  pub const POST: Methods = Methods(1 << 1);
  #[allow(missing_docs)]
  pub const PUT: Methods = Methods(1 << 2);
  #[allow(missing_docs)]
  pub const DELETE: Methods = Methods(1 << 3);

  /// Is `method` in this set?
  pub fn allows(&self, method: Method) -> bool {
    self.0 & method.mask() != 0
  }
}

impl BitOr for Methods {
  type Output = Methods;

  fn bitor(self, rhs: Methods) -> Methods {
    Methods(self.0 | rhs.0)
  }
}

impl From<Method> for Methods {
  fn from(m: Method) -> Self {
    Methods(m.mask())
  }
}
