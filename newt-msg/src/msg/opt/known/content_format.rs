/// Content-Type
///
/// Media types registered for the draft-07 Content-Type option.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentFormat {
  /// `text/plain; charset=utf-8`
  Text,
  /// `text/xml`
  TextXml,
  /// `text/csv`
  Csv,
  /// `text/html`
  Html,
  /// `image/gif`
  Gif,
  /// `image/jpeg`
  Jpeg,
  /// `image/png`
  Png,
  /// `image/tiff`
  Tiff,
  /// `audio/raw`
  AudioRaw,
  /// `video/raw`
  VideoRaw,
  /// `application/link-format`
  LinkFormat,
  /// `application/xml`
  Xml,
  /// `application/octet-stream`
  OctetStream,
  /// `application/rdf+xml`
  RdfXml,
  /// `application/soap+xml`
  SoapXml,
  /// `application/atom+xml`
  AtomXml,
  /// `application/xmpp+xml`
  XmppXml,
  /// `application/exi`
  Exi,
  /// `application/fastinfoset`
  FastInfoset,
  /// `application/soap+fastinfoset`
  SoapFastInfoset,
  /// `application/json`
  Json,
  /// `application/x-obix-binary`
  ObixBinary,
  /// Another content format
  Other(u16),
}

impl From<ContentFormat> for u16 {
  fn from(f: ContentFormat) -> Self {
    use ContentFormat::*;
    match f {
      | Text => 0,
      | TextXml => 1,
      | Csv => 2,
      | Html => 3,
      | Gif => 21,
      | Jpeg => 22,
      | Png => 23,
      | Tiff => 24,
      | AudioRaw => 25,
      | VideoRaw => 26,
      | LinkFormat => 40,
      | Xml => 41,
      | OctetStream => 42,
      | RdfXml => 43,
      | SoapXml => 44,
      | AtomXml => 45,
      | XmppXml => 46,
      | Exi => 47,
      | FastInfoset => 48,
      | SoapFastInfoset => 49,
      | Json => 50,
      | ObixBinary => 51,
      | Other(n) => n,
    }
  }
}

impl From<u16> for ContentFormat {
  fn from(n: u16) -> Self {
    use ContentFormat::*;
    match n {
      | 0 => Text,
      | 1 => TextXml,
      | 2 => Csv,
      | 3 => Html,
      | 21 => Gif,
      | 22 => Jpeg,
      | 23 => Png,
      | 24 => Tiff,
      | 25 => AudioRaw,
      | 26 => VideoRaw,
      | 40 => LinkFormat,
      | 41 => Xml,
      | 42 => OctetStream,
      | 43 => RdfXml,
      | 44 => SoapXml,
      | 45 => AtomXml,
      | 46 => XmppXml,
      | 47 => Exi,
      | 48 => FastInfoset,
      | 49 => SoapFastInfoset,
      | 50 => Json,
      | 51 => ObixBinary,
      | n => Other(n),
    }
  }
}
