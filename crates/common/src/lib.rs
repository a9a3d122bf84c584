/**
 * Permission vocabulary.
 *  - The closed set of actions that can be
 *    granted over a graph node
 *  - Stable wire encodings for each action
 */
pub mod action;
/**
 * Retrying mutation driver.
 * Repeats a remote write until it reports
 *  success, threading each attempt's outcome
 *  into the next attempt.
 */
pub mod retry;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::action::{Action, ActionParseError};
    pub use crate::retry::{
        Attempt, AttemptInput, Mutation, RetryBudget, RetryDriver, Run, Stop, WriteOutcome,
    };
    pub use crate::version::{build_info, BuildInfo};
}
