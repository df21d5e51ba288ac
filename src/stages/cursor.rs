use crate::models::{Label, Side, SlotMeta};

/// Positions into one source's columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCursor {
    /// Alignment slot (indexes identity markers)
    pub raw: usize,
    /// Detokenized position (indexes tokens, shapes and scores)
    pub detok: usize,
    /// Disfluency position (indexes disfluency tags)
    pub disfluency: usize,
}

impl SourceCursor {
    fn step(self, consumed: bool) -> Self {
        let step = usize::from(consumed);
        Self {
            raw: self.raw + 1,
            detok: self.detok + step,
            disfluency: self.disfluency + step,
        }
    }
}

/// Cursors for both sources, threaded through the walk by value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorSet {
    pub a: SourceCursor,
    pub b: SourceCursor,
}

impl CursorSet {
    pub fn get(&self, side: Side) -> SourceCursor {
        match side {
            Side::A => self.a,
            Side::B => self.b,
        }
    }

    /// Cursors after consuming one combined label.
    ///
    /// Raw cursors follow the label's advance rule; the derived cursors also
    /// hold still on special slots and on the first half of a split token.
    pub fn advance(self, label: Label, meta: SlotMeta) -> Self {
        let next = |side: Side| {
            let cursor = self.get(side);
            if !label.advances(side) {
                return cursor;
            }
            cursor.step(!meta.is_special() && !meta.split(side))
        };
        Self {
            a: next(Side::A),
            b: next(Side::B),
        }
    }
}
