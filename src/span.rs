use miette::SourceSpan;

/// Byte position relative to start of source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Idx(pub u32);

/// Holds a view into a source.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub struct Span {
    start: Idx,
    len: u32,
}

impl Span {
    pub fn new(start: Idx, len: u32) -> Self {
        Span { start, len }
    }

    /// Span covering both `self` and `other`.
    pub fn join(self, other: Span) -> Self {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        Span {
            start,
            len: u32::try_from(end - start.0 as usize).unwrap_or(u32::MAX),
        }
    }

    pub fn offs(&self) -> usize {
        self.start.0 as usize
    }

    pub fn end(&self) -> usize {
        self.offs() + self.len as usize
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.offs()..self.end()
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len as usize)
    }
}
