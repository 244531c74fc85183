use std::convert::Infallible;

const ESCAPE: char = '\\';

/// Finds `open ... close` spans in a text and replaces each one with whatever
/// the handler returns for the span content.
///
/// A delimiter directly preceded by a backslash is literal: the backslash is
/// dropped and the delimiter kept. An open delimiter without a matching close
/// is emitted verbatim along with the rest of the input.
#[derive(Debug, Clone, Copy)]
pub struct TokenScanner<'d> {
    open: &'d str,
    close: &'d str,
    keep_escapes: bool,
}

impl<'d> TokenScanner<'d> {
    pub const fn new(open: &'d str, close: &'d str) -> Self {
        Self {
            open,
            close,
            keep_escapes: false,
        }
    }

    /// Leaves escape characters in the output and in span content, for passes
    /// that rewrite markers which a later pass will scan again.
    pub const fn keep_escapes(mut self) -> Self {
        self.keep_escapes = true;
        self
    }

    fn escape_len(&self) -> usize {
        if self.keep_escapes { 0 } else { ESCAPE.len_utf8() }
    }

    pub const fn bind_markers() -> TokenScanner<'static> {
        TokenScanner::new("#{", "}")
    }

    pub const fn substitutions() -> TokenScanner<'static> {
        TokenScanner::new("${", "}")
    }

    pub fn parse<F>(&self, text: &str, mut handler: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let result: Result<String, Infallible> = self.try_parse(text, |content| Ok(handler(content)));
        match result {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }

    pub fn try_parse<F, E>(&self, text: &str, mut handler: F) -> Result<String, E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        if text.is_empty() {
            return Ok(String::new());
        }
        let Some(mut start) = text.find(self.open) else {
            return Ok(text.to_string());
        };

        let mut out = String::with_capacity(text.len());
        let mut content = String::new();
        // everything before `offset` has been consumed
        let mut offset = 0;

        loop {
            if is_escaped(text, start) {
                out.push_str(&text[offset..start - self.escape_len()]);
                out.push_str(self.open);
                offset = start + self.open.len();
            } else {
                content.clear();
                out.push_str(&text[offset..start]);
                offset = start + self.open.len();

                let mut end = text[offset..].find(self.close).map(|i| i + offset);
                while let Some(close_at) = end {
                    if close_at > offset && is_escaped(text, close_at) {
                        content.push_str(&text[offset..close_at - self.escape_len()]);
                        content.push_str(self.close);
                        offset = close_at + self.close.len();
                        end = text[offset..].find(self.close).map(|i| i + offset);
                    } else {
                        content.push_str(&text[offset..close_at]);
                        break;
                    }
                }

                match end {
                    Some(close_at) => {
                        out.push_str(&handler(&content)?);
                        offset = close_at + self.close.len();
                    }
                    None => {
                        // unterminated, keep the rest as is
                        out.push_str(&text[start..]);
                        offset = text.len();
                    }
                }
            }

            match text[offset..].find(self.open) {
                Some(next) => start = next + offset,
                None => break,
            }
        }

        if offset < text.len() {
            out.push_str(&text[offset..]);
        }
        Ok(out)
    }

    /// Reports whether at least one unescaped, terminated span exists.
    pub fn contains_span(&self, text: &str) -> bool {
        let mut found = false;
        self.parse(text, |_| {
            found = true;
            String::new()
        });
        found
    }
}

fn is_escaped(text: &str, at: usize) -> bool {
    at > 0 && text[..at].ends_with(ESCAPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upper(text: &str) -> String {
        TokenScanner::new("${", "}").parse(text, |content| content.to_uppercase())
    }

    #[test]
    fn test_replaces_every_span() {
        assert_eq!("a X b YY c", upper("a ${x} b ${yy} c"));
        assert_eq!("XY", upper("${x}${y}"));
    }

    #[test]
    fn test_no_span() {
        assert_eq!("select 1", upper("select 1"));
        assert_eq!("", upper(""));
    }

    #[test]
    fn test_empty_input_skips_handler() {
        let mut called = false;
        let out = TokenScanner::bind_markers().parse("", |_| {
            called = true;
            String::new()
        });
        assert_eq!("", out);
        assert!(!called);
    }

    #[test]
    fn test_escaped_open() {
        let out = TokenScanner::bind_markers().parse("\\#{x}", |_| "?".to_string());
        assert_eq!("#{x}", out);
        let out = TokenScanner::bind_markers().parse("\\#{x} #{y}", |c| format!("<{c}>"));
        assert_eq!("#{x} <y>", out);
    }

    #[test]
    fn test_escaped_close() {
        let out = upper("${a\\}b}");
        assert_eq!("A}B", out);
    }

    #[test]
    fn test_unterminated() {
        assert_eq!("a ${x", upper("a ${x"));
        assert_eq!("A and ${b", upper("${a} and ${b"));
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!("é X ü", upper("é ${x} ü"));
    }

    #[test]
    fn test_try_parse_propagates() {
        let res: Result<String, &str> =
            TokenScanner::bind_markers().try_parse("a #{b} c", |_| Err("boom"));
        assert_eq!(Err("boom"), res);
    }

    #[test]
    fn test_keep_escapes() {
        let scanner = TokenScanner::bind_markers().keep_escapes();
        let out = scanner.parse("\\#{x} #{a\\}b}", |c| format!("#{{{c}!}}"));
        assert_eq!("\\#{x} #{a\\}b!}", out);
    }

    #[test]
    fn test_contains_span() {
        let scanner = TokenScanner::substitutions();
        assert!(scanner.contains_span("order by ${col}"));
        assert!(!scanner.contains_span("order by \\${col}"));
        assert!(!scanner.contains_span("order by ${col"));
        assert!(!scanner.contains_span("where id = #{id}"));
    }
}
