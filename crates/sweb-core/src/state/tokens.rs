// # Challenge Token Set
//
// Tokens this engine has published during the current process lifetime.
//
// ## Purpose
//
// The stale-record sweep must tell "records I just created" apart from
// "records a previous failed run left behind". Every token is recorded before
// its TXT record is added, and the set is never pruned within a run, so a
// sweep for a second challenge at the same label keeps the first one's record.
//
// ## Crash Behavior
//
// - All tokens are lost on restart
// - A sweep in the next run treats every existing TXT value as stale

/// Append-only set of validation tokens
///
/// # Example
///
/// ```rust
/// use sweb_core::state::ChallengeTokens;
///
/// let mut tokens = ChallengeTokens::new();
/// tokens.record("abc");
/// tokens.record("abc");
///
/// assert!(tokens.contains("abc"));
/// assert!(!tokens.contains("def"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChallengeTokens {
    tokens: Vec<String>,
}

impl ChallengeTokens {
    /// Create an empty token set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token as owned by this run
    ///
    /// Duplicates are kept; only membership matters.
    pub fn record(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    /// Check whether a TXT value was published by this run
    pub fn contains(&self, value: &str) -> bool {
        self.tokens.iter().any(|token| token == value)
    }

    /// Number of recorded tokens, duplicates included
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if no token has been recorded
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
