use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::game_question::Letter;

/// Lifelines a player can spend once per game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintKind {
    FiftyFifty,
    AudienceHelp,
    FriendCall,
}

impl HintKind {
    pub const ALL: [HintKind; 3] = [
        HintKind::FiftyFifty,
        HintKind::AudienceHelp,
        HintKind::FriendCall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HintKind::FiftyFifty => "fifty_fifty",
            HintKind::AudienceHelp => "audience_help",
            HintKind::FriendCall => "friend_call",
        }
    }
}

impl std::fmt::Display for HintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single lifeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintResult {
    /// The two options left on screen.
    FiftyFifty(Vec<Letter>),
    /// Vote share per option, in percent.
    AudienceHelp(BTreeMap<Letter, u32>),
    /// What the friend said on the phone.
    FriendCall(String),
}

impl HintResult {
    pub fn kind(&self) -> HintKind {
        match self {
            HintResult::FiftyFifty(_) => HintKind::FiftyFifty,
            HintResult::AudienceHelp(_) => HintKind::AudienceHelp,
            HintResult::FriendCall(_) => HintKind::FriendCall,
        }
    }
}

/// Hints applied to one game question, keyed by hint kind.
///
/// Stored as:
/// ```json
/// {
///   "fifty_fifty": ["a", "b"],
///   "audience_help": {"a": 42, "b": 11, "c": 37, "d": 10},
///   "friend_call": "Vasily thinks the answer is option A"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpHash {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_fifty: Option<Vec<Letter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_help: Option<BTreeMap<Letter, u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friend_call: Option<String>,
}

impl HelpHash {
    pub fn is_empty(&self) -> bool {
        self.fifty_fifty.is_none() && self.audience_help.is_none() && self.friend_call.is_none()
    }

    pub fn contains(&self, kind: HintKind) -> bool {
        match kind {
            HintKind::FiftyFifty => self.fifty_fifty.is_some(),
            HintKind::AudienceHelp => self.audience_help.is_some(),
            HintKind::FriendCall => self.friend_call.is_some(),
        }
    }

    /// Stores a hint result. Entries are never overwritten; returns `false`
    /// if one of that kind is already present.
    pub fn record(&mut self, result: HintResult) -> bool {
        if self.contains(result.kind()) {
            return false;
        }

        match result {
            HintResult::FiftyFifty(letters) => self.fifty_fifty = Some(letters),
            HintResult::AudienceHelp(votes) => self.audience_help = Some(votes),
            HintResult::FriendCall(message) => self.friend_call = Some(message),
        }
        true
    }
}

#[derive(Debug, Deserialize)]
pub struct HelpRequest {
    pub help_type: HintKind,
}
