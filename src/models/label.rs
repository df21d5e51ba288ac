use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which of the two annotations errors are measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    A,
    B,
}

impl Side {
    /// Column prefix used for this side in flat output
    pub fn prefix(self) -> &'static str {
        match self {
            Side::A => "a_",
            Side::B => "b_",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "a"),
            Side::B => write!(f, "b"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(Side::A),
            "b" => Ok(Side::B),
            other => Err(format!("unknown side '{}', expected 'a' or 'b'", other)),
        }
    }
}

/// One operation of the combined edit script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Both sources hold the same token
    Aligned,
    /// Stylistic difference already rewritten upstream; behaves as aligned
    Reconciled,
    /// Token exists only in A
    InsertA,
    /// Token exists only in B
    DeleteA,
    /// Substitution, A half
    SubstituteA,
    /// Substitution, B half
    SubstituteB,
    /// Stylistic continuation present only in A
    ContinueA,
    /// Stylistic continuation present only in B
    ContinueB,
}

impl Label {
    /// Wire spelling of this label
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Aligned => "O",
            Label::Reconciled => "CONT",
            Label::InsertA => "INS",
            Label::DeleteA => "DEL",
            Label::SubstituteA => "SUB_TREE",
            Label::SubstituteB => "SUB_MS",
            Label::ContinueA => "CONT_TREE",
            Label::ContinueB => "CONT_MS",
        }
    }

    /// Whether this operation consumes a slot of the given source
    pub fn advances(self, side: Side) -> bool {
        match (self, side) {
            (Label::Aligned | Label::Reconciled, _) => true,
            (Label::InsertA | Label::SubstituteA | Label::ContinueA, Side::A) => true,
            (Label::DeleteA | Label::SubstituteB | Label::ContinueB, Side::B) => true,
            _ => false,
        }
    }

    /// Whether this operation counts toward an error run for the given reference
    pub fn is_error(self, reference: Side) -> bool {
        if self.is_continuation() {
            return false;
        }
        match self {
            Label::SubstituteA | Label::SubstituteB => true,
            Label::InsertA => reference == Side::A,
            Label::DeleteA => reference == Side::B,
            _ => false,
        }
    }

    /// Continuation markers advance one source but never open or extend a run
    pub fn is_continuation(self) -> bool {
        matches!(self, Label::ContinueA | Label::ContinueB)
    }

    pub fn is_substitution(self) -> bool {
        matches!(self, Label::SubstituteA | Label::SubstituteB)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "O" => Ok(Label::Aligned),
            "CONT" => Ok(Label::Reconciled),
            "INS" => Ok(Label::InsertA),
            "DEL" => Ok(Label::DeleteA),
            "SUB_TREE" => Ok(Label::SubstituteA),
            "SUB_MS" => Ok(Label::SubstituteB),
            "CONT_TREE" => Ok(Label::ContinueA),
            "CONT_MS" => Ok(Label::ContinueB),
            other => Err(other.to_string()),
        }
    }
}
