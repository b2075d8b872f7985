pub mod domain;
pub mod ports;
pub mod stats;
pub mod streak;
pub mod tracking;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use domain::{
    CheckIn, CheckInFilter, CheckInUpdate, Goal, GoalCategory, GoalProgress, GoalStatus,
    GoalUpdate, NewCheckIn, NewGoal, NewUser, Page, ProfileUpdate, PublicCheckIn, PublicGoal,
    User, UserCredentials,
};
pub use ports::{DatabaseService, PortError, PortResult, TokenStore};
pub use stats::GoalStats;
pub use streak::StreakSummary;
pub use tracking::{CheckInRequest, CheckInSubmission};
