//! Core rewards library for the study tracker.
//!
//! Provides:
//! - Trigger condition schema for points rules and achievements
//! - Progress tracking over study sessions
//! - Rule evaluation against progress updates
//! - Award ledger construction and verification
//! - Catalog redemption checks and exchange state machine

pub mod catalog;
pub mod clock;
pub mod condition;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod pipeline;
pub mod progress;
pub mod types;

pub use catalog::{can_redeem, new_exchange, total_cost, RedemptionContext};
pub use clock::{study_day, Clock, FixedClock, SystemClock};
pub use condition::TriggerCondition;
pub use error::{LedgerError, RedeemError, TransitionError, ValidationError};
pub use evaluator::{AchievementChange, Award, AwardSource, Evaluation, RuleSet, SkippedDefinition};
pub use ledger::{record_award, record_redemption, Ledger};
pub use pipeline::{process_study_event, EventOutcome};
pub use progress::{ProgressSnapshot, ProgressTracker, ProgressUpdate, TrackedEvent};
pub use types::{
    Achievement, AchievementConfig, Category, ExchangeRecord, ExchangeStatus, LedgerEntry,
    LedgerKind, Product, ProgressKey, ProgressKind, ProgressRecord, RewardRule, RuleConfig,
    StudySession, UserAchievementState, UNLIMITED,
};
