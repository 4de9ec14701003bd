use chrono::{DateTime, Duration, Utc};

use super::account::TrialMetadata;
use crate::shared::constants::{ACCESS_WINDOW_DAYS, FIRST_WEEK_DAYS};

/// What the password path must do for an account with trial metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialEvaluation {
    /// Persist `is_first_week = false` before deciding.
    pub end_first_week: bool,
    pub verdict: TrialVerdict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrialVerdict {
    /// Access is granted iff the password matches.
    RequirePassword,
    /// Access is refused whatever the password.
    Expired,
    /// The purchase timestamp lies in the future.
    NotYetValid,
}

/// Decay rule for the password path.
///
/// First week: `elapsed <= 7 days` needs only the password. Once
/// `elapsed > 7 days` the first-week flag is ended and the post-trial rule
/// applies in the same evaluation: `elapsed > 30 days` is expired, anything
/// else needs the password. Both bounds are inclusive.
pub fn evaluate_trial(metadata: &TrialMetadata, now: DateTime<Utc>) -> TrialEvaluation {
    let elapsed = now - metadata.purchase_timestamp;
    if elapsed < Duration::zero() {
        return TrialEvaluation {
            end_first_week: false,
            verdict: TrialVerdict::NotYetValid,
        };
    }

    let first_week = Duration::days(FIRST_WEEK_DAYS);
    if metadata.is_first_week && elapsed <= first_week {
        return TrialEvaluation {
            end_first_week: false,
            verdict: TrialVerdict::RequirePassword,
        };
    }

    let verdict = if elapsed > Duration::days(ACCESS_WINDOW_DAYS) {
        TrialVerdict::Expired
    } else {
        TrialVerdict::RequirePassword
    };
    TrialEvaluation {
        end_first_week: metadata.is_first_week,
        verdict,
    }
}
