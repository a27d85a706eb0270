// # Challenge State
//
// In-process bookkeeping owned by one `ChallengeEngine`. Nothing here is
// persisted; a new process starts with empty state.

pub mod tokens;

pub use tokens::ChallengeTokens;
