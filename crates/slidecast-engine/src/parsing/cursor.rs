/// A byte cursor over the document source with explicit mark/reset.
///
/// Block parsers advance the cursor as they recognise syntax. A parser that
/// gives up restores the position it was handed through [`Cursor::reset`],
/// so the next candidate (or literal accumulation) sees the same bytes.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The full document source.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor at the start of `s`.
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Returns the current byte position.
    pub fn pos(&self) -> usize {
        self.i
    }

    /// Returns true if at end of input.
    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    /// The byte immediately before the cursor, if any.
    pub fn prev(&self) -> Option<u8> {
        self.i
            .checked_sub(1)
            .and_then(|i| self.s.as_bytes().get(i).copied())
    }

    /// Checks if the remaining input starts with the given byte pattern.
    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.s
            .as_bytes()
            .get(self.i..)
            .is_some_and(|rest| rest.starts_with(pat))
    }

    /// Advances by one byte, returning the consumed byte.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        Some(b)
    }

    /// Advances by `n` bytes, stopping at end of input.
    pub fn bump_n(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    /// Consumes `pat` if the remaining input starts with it.
    pub fn eat(&mut self, pat: &[u8]) -> bool {
        if self.starts_with(pat) {
            self.bump_n(pat.len());
            true
        } else {
            false
        }
    }

    /// Consumes bytes while `pred` holds and returns the consumed slice.
    pub fn take_while(&mut self, mut pred: impl FnMut(u8) -> bool) -> &'a str {
        let start = self.i;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.i += 1;
        }
        self.slice(start, self.i)
    }

    /// Finds the next occurrence of `pat` at or after the cursor, returning
    /// its absolute byte offset without moving.
    pub fn find(&self, pat: &[u8]) -> Option<usize> {
        let rest = self.s.as_bytes().get(self.i..)?;
        if pat.is_empty() || pat.len() > rest.len() {
            return None;
        }
        rest.windows(pat.len())
            .position(|w| w == pat)
            .map(|off| self.i + off)
    }

    /// Offset of the last occurrence of `pat` anywhere in the source.
    pub fn rfind(&self, pat: &[u8]) -> Option<usize> {
        if pat.is_empty() || pat.len() > self.s.len() {
            return None;
        }
        self.s.as_bytes().windows(pat.len()).rposition(|w| w == pat)
    }

    /// Returns the current position as a mark for [`Cursor::reset`].
    pub fn mark(&self) -> usize {
        self.i
    }

    /// Rewinds (or forwards) the cursor to a previously taken mark.
    pub fn reset(&mut self, mark: usize) {
        self.i = mark.min(self.s.len());
    }

    /// Returns the source between two byte offsets.
    ///
    /// Offsets handed out by the parsers always sit on ASCII delimiters, so
    /// they are char boundaries; anything else yields an empty slice.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        self.s.get(start..end).unwrap_or("")
    }
}
