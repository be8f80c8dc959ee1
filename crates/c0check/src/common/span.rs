//! Source locations

/// Byte range inside one source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub file: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { file: 0, start, end }
    }

    pub fn in_file(file: usize, start: usize, end: usize) -> Self {
        Self { file, start, end }
    }

    /// Location of compiler-provided declarations; no reporter file has
    /// this id
    pub fn builtin() -> Self {
        Self { file: usize::MAX, start: 0, end: 0 }
    }

    pub fn is_builtin(&self) -> bool {
        self.file == usize::MAX
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(self, other: Span) -> Span {
        if self.file != other.file {
            return self;
        }
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}
