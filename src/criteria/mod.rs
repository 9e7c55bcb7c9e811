// Criteria module
// The mutable reference collection of monitoring profiles, its seed data,
// and the hallucination guard over its title set

pub mod defaults;
pub mod guard;
pub mod record;
pub mod store;

pub use guard::{screen_title, MatchOutcome, NO_MATCHES};
pub use record::CriteriaRecord;
pub use store::CriteriaStore;
