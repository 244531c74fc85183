/// One step of a property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Name(&'a str),
    Index(&'a str),
}

/// Iterates the segments of `a.b[0].c` as `Name(a) Name(b) Index(0) Name(c)`.
#[derive(Debug, Clone)]
pub struct PropertyPath<'a> {
    rest: &'a str,
}

impl<'a> PropertyPath<'a> {
    pub fn new(path: &'a str) -> Self {
        Self { rest: path.trim() }
    }

    /// Leading name of the path, `user` for `user.roles[0]`.
    pub fn root(path: &'a str) -> &'a str {
        let path = path.trim();
        let end = path.find(['.', '[']).unwrap_or(path.len());
        &path[..end]
    }
}

impl<'a> Iterator for PropertyPath<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest.strip_prefix('.').unwrap_or(self.rest);
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }

        if let Some(inner) = rest.strip_prefix('[') {
            let (key, tail) = match inner.find(']') {
                Some(end) => (&inner[..end], &inner[end + 1..]),
                None => (inner, ""),
            };
            self.rest = tail;
            return Some(Segment::Index(key));
        }

        let end = rest.find(['.', '[']).unwrap_or(rest.len());
        self.rest = &rest[end..];
        Some(Segment::Name(&rest[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        let segments: Vec<_> = PropertyPath::new("user.roles[0].name").collect();
        assert_eq!(
            vec![
                Segment::Name("user"),
                Segment::Name("roles"),
                Segment::Index("0"),
                Segment::Name("name"),
            ],
            segments
        );
    }

    #[test]
    fn test_single_and_empty() {
        assert_eq!(vec![Segment::Name("id")], PropertyPath::new(" id ").collect::<Vec<_>>());
        assert_eq!(0, PropertyPath::new("").count());
    }

    #[test]
    fn test_map_key_index() {
        let segments: Vec<_> = PropertyPath::new("attrs[color][0]").collect();
        assert_eq!(
            vec![
                Segment::Name("attrs"),
                Segment::Index("color"),
                Segment::Index("0"),
            ],
            segments
        );
    }

    #[test]
    fn test_root() {
        assert_eq!("user", PropertyPath::root("user.roles[0]"));
        assert_eq!("list", PropertyPath::root("list[1]"));
        assert_eq!("id", PropertyPath::root("id"));
    }
}
