// Declare the modules to re-export
pub mod connections;
pub mod core;
pub mod loggers;

// Re-export the types the binaries reach for most
pub use crate::connections::db_postgres::{DbError, Poll, PollStore};
pub use crate::connections::queue_redis::{QueueError, VoteQueue, VOTES_STREAM};
pub use crate::core::counts::{apply_counts, VoteCounts};
pub use crate::core::votes::find_votes;
