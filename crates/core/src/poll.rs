#![forbid(unsafe_code)]

use crate::ids::{MotionId, PollId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MotionPoll {
    pub id: PollId,
    pub motion_id: MotionId,
    pub poll_number: i64,
    pub votes_cast: Option<i64>,
    pub votes_invalid: Option<i64>,
    pub created_at_ms: i64,
}

/// Next number in a motion's poll sequence. `counter` is the highest number
/// ever handed out, so deleted polls never give their number back.
pub fn next_poll_number(max_existing: Option<i64>, counter: i64) -> i64 {
    max_existing.unwrap_or(0).max(counter).max(0) + 1
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteValue {
    Yes,
    No,
    Abstain,
}

impl VoteValue {
    pub const ALL: [VoteValue; 3] = [VoteValue::Yes, VoteValue::No, VoteValue::Abstain];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Abstain => "Abstain",
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteValue {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Yes" => Ok(Self::Yes),
            "No" => Ok(Self::No),
            "Abstain" => Ok(Self::Abstain),
            _ => Err("unknown vote value"),
        }
    }
}

/// Raw counts as entered for one poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub yes: i64,
    pub no: i64,
    pub abstain: i64,
    pub votes_cast: Option<i64>,
    pub votes_invalid: Option<i64>,
}

impl VoteCounts {
    pub fn get(&self, value: VoteValue) -> i64 {
        match value {
            VoteValue::Yes => self.yes,
            VoteValue::No => self.no,
            VoteValue::Abstain => self.abstain,
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        let all = [
            Some(self.yes),
            Some(self.no),
            Some(self.abstain),
            self.votes_cast,
            self.votes_invalid,
        ];
        if all.into_iter().flatten().any(|count| count < 0) {
            return Err("vote counts must not be negative");
        }
        if self.total().is_none() {
            return Err("vote counts are too large");
        }
        Ok(())
    }

    /// Sum of the per-value counts, `None` on overflow.
    pub fn total(&self) -> Option<i64> {
        self.yes.checked_add(self.no)?.checked_add(self.abstain)
    }
}

/// Which aggregate counters a tally reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountingPolicy {
    pub count_invalid: bool,
    pub count_cast: bool,
}

impl Default for CountingPolicy {
    fn default() -> Self {
        Self {
            count_invalid: true,
            count_cast: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Tally {
    pub yes: i64,
    pub no: i64,
    pub abstain: i64,
    pub invalid: Option<i64>,
    pub cast: Option<i64>,
}

impl Tally {
    pub fn yes_share(&self) -> Option<f64> {
        let decisive = self.yes as f64 + self.no as f64;
        if decisive <= 0.0 {
            return None;
        }
        Some(self.yes as f64 / decisive)
    }
}

pub fn tally(counts: &VoteCounts, policy: &CountingPolicy) -> Tally {
    let cast = counts.votes_cast.unwrap_or_else(|| {
        counts
            .yes
            .saturating_add(counts.no)
            .saturating_add(counts.abstain)
    });
    Tally {
        yes: counts.yes,
        no: counts.no,
        abstain: counts.abstain,
        invalid: policy
            .count_invalid
            .then(|| counts.votes_invalid.unwrap_or(0)),
        cast: policy.count_cast.then_some(cast),
    }
}
