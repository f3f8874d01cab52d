/// Outcome of feeding input to a [`StreamSelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The candidate at this index matched completely.
    Match(usize),
    /// No candidate can match any more.
    NoMatch,
    /// The input so far is a prefix of some candidate; feed more.
    Pending,
}

/// Incremental prefix matcher over a sorted list of byte strings.
///
/// Input arrives in arbitrary chunks; the selector keeps its place between
/// calls, so splitting the input never changes the result. Candidates must
/// be sorted so that candidates sharing a prefix are adjacent (plain byte
/// order, or ASCII-case-insensitive order when case folding is enabled).
///
/// Candidates must be prefix-free: a candidate matches as soon as all of its
/// bytes have been seen, so one that is a strict prefix of another always
/// wins over the longer one. A zero
/// byte in a candidate that lines up with a zero byte of input terminates
/// that candidate successfully right there.
#[derive(Debug, Clone)]
pub struct StreamSelector<'a> {
    candidates: &'a [&'a [u8]],
    index: usize,
    cursor: usize,
    fold_case: bool,
}

impl<'a> StreamSelector<'a> {
    pub const fn new(candidates: &'a [&'a [u8]]) -> Self {
        Self {
            candidates,
            index: 0,
            cursor: 0,
            fold_case: false,
        }
    }

    /// Compares ASCII letters case-insensitively.
    pub const fn fold_case(mut self) -> Self {
        self.fold_case = true;
        self
    }

    /// Starts over with a new candidate list, keeping the case setting.
    pub fn reset(&mut self, candidates: &'a [&'a [u8]]) {
        self.candidates = candidates;
        self.index = 0;
        self.cursor = 0;
    }

    /// Index of the candidate currently being followed.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of bytes of the current candidate matched so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Consumes bytes from `input` until the outcome is decided or the input
    /// runs out. Returns the outcome and the number of bytes consumed; the
    /// byte that ruled out the last candidate is not consumed.
    pub fn feed(&mut self, input: &[u8]) -> (Selection, usize) {
        let mut used = 0;
        loop {
            let Some(candidate) = self.candidates.get(self.index) else {
                return (Selection::NoMatch, used);
            };
            if self.cursor == candidate.len() {
                return (Selection::Match(self.index), used);
            }
            let Some(&byte) = input.get(used) else {
                return (Selection::Pending, used);
            };
            if self.same(candidate[self.cursor], byte) {
                used += 1;
                self.cursor += 1;
                if byte == 0 {
                    return (Selection::Match(self.index), used);
                }
            } else if !self.advance() {
                return (Selection::NoMatch, used);
            }
        }
    }

    fn same(&self, a: u8, b: u8) -> bool {
        if self.fold_case {
            a.eq_ignore_ascii_case(&b)
        } else {
            a == b
        }
    }

    /// Moves to the next candidate sharing the prefix matched so far.
    fn advance(&mut self) -> bool {
        let candidates = self.candidates;
        let matched = &candidates[self.index][..self.cursor];
        while self.index + 1 < candidates.len() {
            self.index += 1;
            let next = candidates[self.index];
            if next.len() >= self.cursor
                && next[..self.cursor]
                    .iter()
                    .zip(matched)
                    .all(|(&a, &b)| self.same(a, b))
            {
                return true;
            }
        }
        self.index = candidates.len();
        false
    }
}
