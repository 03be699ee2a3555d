//! Free-text expense parsing.
//!
//! The AI backend does structured extraction; deterministic patterns take over
//! whenever it is unavailable or finds nothing.

pub mod candidate;
pub mod date;
pub mod fallback;
pub mod service;

pub use candidate::{DEFAULT_ACCOUNT, ParsedExpenseCandidate};
pub use date::DateResolver;
pub use fallback::{FallbackParser, PatternFamily};
pub use service::ConversationParser;
