use super::{FrequentWords, ShapeCategory, ShapeSummary, UnknownShapeCode};

/// Surface form recorded for the end-of-sequence sentinel
pub const EOS_TOKEN: &str = "<EOS>";
/// Disfluency tags that mark fluent speech
pub const FLUENT_TAGS: [&str; 2] = ["C", "O"];
/// Tag recorded where no disfluency annotation exists
pub const FLUENT_TAG: &str = "O";

/// One side's tokens, shapes, scores and disfluency tags for a segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenView {
    pub tokens: Vec<String>,
    pub shapes: Vec<ShapeCategory>,
    pub primary_scores: Vec<f64>,
    pub secondary_scores: Vec<f64>,
    pub disfluency: Vec<String>,
}

/// Disfluency context around an error run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisfluencyFlags {
    /// The token before the run is disfluent
    pub prev: bool,
    /// Some token inside the run is disfluent
    pub current: bool,
    /// The closing context token is disfluent
    pub next: bool,
}

/// Derived statistics for one view of a segment
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewSummary {
    pub shape: Option<ShapeSummary>,
    pub disfluency: DisfluencyFlags,
    pub top_n: bool,
    pub surprisal: Option<f64>,
    pub secondary_surprisal: Option<f64>,
}

impl TokenView {
    /// Record a token and its shape category
    pub fn set_token(&mut self, token: &str, shape_code: i64) -> Result<(), UnknownShapeCode> {
        let shape = ShapeCategory::for_token(token, shape_code)?;
        self.tokens.push(token.to_string());
        self.shapes.push(shape);
        Ok(())
    }

    pub fn set_score(&mut self, primary: f64, secondary: f64) {
        self.primary_scores.push(primary);
        self.secondary_scores.push(secondary);
    }

    pub fn set_disfluency(&mut self, tag: &str) {
        self.disfluency.push(tag.to_string());
    }

    /// Close the view with the end-of-sequence sentinel
    pub fn set_end_of_sequence(&mut self, primary: f64, secondary: f64) {
        self.tokens.push(EOS_TOKEN.to_string());
        self.shapes.push(ShapeCategory::EndOfSequence);
        self.set_score(primary, secondary);
        self.set_disfluency(FLUENT_TAG);
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn summarize(&self, top_n: &FrequentWords, counterpart: &TokenView) -> ViewSummary {
        ViewSummary {
            shape: ShapeSummary::of(&self.shapes),
            disfluency: self.disfluency_flags(),
            top_n: self.is_frequent_single(top_n),
            surprisal: surprisal_delta(&self.primary_scores, &counterpart.primary_scores),
            secondary_surprisal: surprisal_delta(
                &self.secondary_scores,
                &counterpart.secondary_scores,
            ),
        }
    }

    fn disfluency_flags(&self) -> DisfluencyFlags {
        let tags: Vec<bool> = self.disfluency.iter().map(|t| is_disfluent(t)).collect();
        if tags.len() < 2 {
            return DisfluencyFlags::default();
        }
        let last = tags.len() - 1;
        DisfluencyFlags {
            prev: tags[0],
            current: tags[1..last].iter().any(|d| *d),
            next: tags[last],
        }
    }

    /// A single error token followed by its context, where the error token is frequent
    fn is_frequent_single(&self, top_n: &FrequentWords) -> bool {
        match self.tokens.as_slice() {
            [word, _context] => top_n.contains(word),
            _ => false,
        }
    }
}

pub fn is_disfluent(tag: &str) -> bool {
    !FLUENT_TAGS.contains(&tag)
}

fn mean_log2(scores: &[f64]) -> f64 {
    scores.iter().map(|p| p.log2()).sum::<f64>() / scores.len() as f64
}

/// Mean log2-probability of `scores` minus that of `counterpart`.
/// Absent when there is no real error token on this side.
pub fn surprisal_delta(scores: &[f64], counterpart: &[f64]) -> Option<f64> {
    if scores.len() <= 1 || counterpart.is_empty() {
        return None;
    }
    Some(mean_log2(scores) - mean_log2(counterpart))
}
