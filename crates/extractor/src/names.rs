//! Entry name decoding.
//!
//! Zip entries carry a general purpose flag (bit 11) declaring that the
//! name is UTF-8. Archives produced by older Chinese-locale tools leave the
//! flag clear and store names in GB18030, so those are decoded explicitly
//! instead of through the CP437 fallback the zip format prescribes.

use encoding_rs::GB18030;
use std::borrow::Cow;

/// Decodes a raw entry name according to its UTF-8 flag.
///
/// # Examples
///
/// ```
/// use encoding_rs::GB18030;
/// use extractor::names::decode_name;
///
/// assert_eq!(decode_name("页面/".as_bytes(), true), "页面/");
///
/// let (legacy, _, _) = GB18030.encode("页面/");
/// assert_eq!(decode_name(&legacy, false), "页面/");
/// ```
pub fn decode_name(raw: &[u8], utf8_flag: bool) -> Cow<'_, str> {
    if utf8_flag {
        String::from_utf8_lossy(raw)
    } else {
        let (decoded, _) = GB18030.decode_without_bom_handling(raw);
        decoded
    }
}

/// Returns the decoded name of an archive entry from its raw bytes and the
/// name the zip reader reported for it.
///
/// The zip reader decodes flagged names as UTF-8 and unflagged ones as
/// CP437, and the two only agree on ASCII. A name that matches its UTF-8
/// reading therefore either carries the flag or is plain ASCII, which
/// decodes the same in every supported encoding.
pub fn entry_name(raw: &[u8], reported: &str, legacy_encoding: bool) -> String {
    if !legacy_encoding || raw.is_ascii() {
        return reported.to_string();
    }

    let utf8_flag = reported == String::from_utf8_lossy(raw);
    decode_name(raw, utf8_flag).into_owned()
}
