/// A source location: file ID + byte offset range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub file_id: u16,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    pub fn dummy() -> Self {
        Self {
            file_id: 0,
            start: 0,
            end: 0,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(self.file_id, other.file_id);
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// 1-based line and column of the span start within `source`.
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let upto = (self.start as usize).min(source.len());
        let prefix = &source.as_bytes()[..upto];
        let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
        let col = match prefix.iter().rposition(|&b| b == b'\n') {
            Some(nl) => upto - nl,
            None => upto + 1,
        };
        (line, col)
    }
}

/// A value annotated with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let src = "coin C {\n  action a() {}\n}";
        assert_eq!(Span::new(0, 0, 4).line_col(src), (1, 1));
        assert_eq!(Span::new(0, 11, 17).line_col(src), (2, 3));
    }

    #[test]
    fn test_merge() {
        let a = Span::new(0, 4, 8);
        let b = Span::new(0, 2, 6);
        assert_eq!(a.merge(b), Span::new(0, 2, 8));
    }
}
