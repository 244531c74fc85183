use std::fmt::Write;

use crate::dialect::Dialect;

/// Writes the SQL that surrounds bind markers, and the placeholder token that
/// replaces each one.
pub(crate) struct FormatContext<'a, W: Write> {
    pub(crate) writer: &'a mut W,
    pub(crate) dialect: Dialect,
    pub(crate) placeholder: usize,
}

impl<'a, W: Write> FormatContext<'a, W> {
    pub fn new(writer: &'a mut W, dialect: Dialect) -> Self {
        Self {
            writer,
            dialect,
            placeholder: 0,
        }
    }

    pub(crate) fn write_placeholder(&mut self) -> std::fmt::Result {
        self.placeholder += 1;
        if self.dialect.numbered_placeholders() {
            write!(self.writer, "${}", self.placeholder)
        } else {
            self.writer.write_char('?')
        }
    }
}

// single spaces in place of whitespace runs, leaving quoted literals alone
pub(crate) fn shrink_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for char in sql.chars() {
        if let Some(q) = quote {
            out.push(char);
            if char == q {
                quote = None;
            }
            continue;
        }
        if char.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if char == '\'' || char == '"' {
            quote = Some(char);
        }
        out.push(char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(dialect: Dialect, count: usize) -> String {
        let mut str = String::new();
        let mut context = FormatContext::new(&mut str, dialect);
        for index in 0..count {
            if index > 0 {
                context.writer.write_str(", ").unwrap();
            }
            context.write_placeholder().unwrap();
        }
        str
    }

    #[test]
    fn test_placeholder_styles() {
        assert_eq!("?, ?, ?", placeholders(Dialect::Generic, 3));
        assert_eq!("?, ?", placeholders(Dialect::MySql, 2));
        assert_eq!("?", placeholders(Dialect::Sqlite, 1));
        assert_eq!("$1, $2, $3", placeholders(Dialect::Postgres, 3));
    }

    #[test]
    fn test_placeholder_count_past_u16() {
        let mut str = String::new();
        let mut context = FormatContext::new(&mut str, Dialect::Postgres);
        context.placeholder = usize::from(u16::MAX);
        context.write_placeholder().unwrap();
        assert_eq!("$65536", str);
    }

    #[test]
    fn test_shrink_whitespace() {
        assert_eq!(
            "select * from t where a = 'x  y'",
            shrink_whitespace("  select *\n  from t\twhere a = 'x  y'  ")
        );
        assert_eq!("", shrink_whitespace(" \n "));
    }
}
