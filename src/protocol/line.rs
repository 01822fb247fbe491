//! Line-level formatting shared by the protocol entities.

use std::fmt;

/// Single-quoted protocol field.
///
/// The parent's parser has no escape syntax, so embedded quotes are dropped.
pub(crate) struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("'")?;
        for part in self.0.split('\'') {
            f.write_str(part)?;
        }
        f.write_str("'")
    }
}

/// Space-joined `hidden`/`obsolete` flag field.
pub(crate) fn flags(hidden: bool, obsolete: bool) -> &'static str {
    match (hidden, obsolete) {
        (false, false) => "",
        (true, false) => "hidden",
        (false, true) => "obsolete",
        (true, true) => "hidden obsolete",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_strips_quotes() {
        assert_eq!(Quoted("plain").to_string(), "'plain'");
        assert_eq!(Quoted("it's").to_string(), "'its'");
        assert_eq!(Quoted("").to_string(), "''");
    }

    #[test]
    fn test_flags() {
        assert_eq!(flags(false, false), "");
        assert_eq!(flags(true, true), "hidden obsolete");
        assert_eq!(flags(false, true), "obsolete");
    }
}
