//! Built-in job handler implementations.

pub mod auto_close;
pub mod replay_prune;

pub use auto_close::AutoCloseJobHandler;
pub use replay_prune::ReplayPruneJobHandler;

/// Job type of the auto-close sweep.
pub const AUTO_CLOSE_JOB: &str = "auto_close";
/// Job type of replay-set pruning.
pub const REPLAY_PRUNE_JOB: &str = "replay_prune";
