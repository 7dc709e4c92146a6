//! Channel identity resolution and link aggregation.
//!
//! `normalize` → `tokenize` → `score` → `resolve` → `merge`, each usable on
//! its own. Nothing here performs I/O or keeps state between calls.

pub mod merge;
pub mod normalize;
pub mod resolve;
pub mod score;
pub mod tokenize;

pub use merge::{has_any_links, locale_cmp, merge, ChannelTable};
pub use normalize::normalize;
pub use resolve::{
    resolve, Candidate, EnrichedMatch, LabelOutcome, Resolution, Resolver, MATCH_THRESHOLD,
};
pub use score::{score, PreparedName, Scorer, ScoringPolicy};
pub use tokenize::{tokenize, Token, Vocabulary};
