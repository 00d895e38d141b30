//! Deadline gate
//!
//! Expiry is evaluated lazily at the moment of each cast attempt; nothing
//! runs in the background to close votes.

use super::error::{VotingError, VotingResult};
use super::types::{GrantApplication, Timestamp};

/// Voting is open while `now <= voting_deadline` (inclusive).
pub fn is_open(application: &GrantApplication, now: Timestamp) -> bool {
    now <= application.voting_deadline
}

/// Fail with `DeadlineExpired` once the deadline has passed.
pub fn ensure_open(application: &GrantApplication, now: Timestamp) -> VotingResult<()> {
    if is_open(application, now) {
        Ok(())
    } else {
        Err(VotingError::DeadlineExpired {
            deadline: application.voting_deadline,
        })
    }
}

/// Seconds left before voting closes (0 once closed)
pub fn remaining_secs(application: &GrantApplication, now: Timestamp) -> u64 {
    application
        .voting_deadline
        .as_secs()
        .saturating_sub(now.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::types::{ApplicationId, GrantType};

    fn application(deadline: u64) -> GrantApplication {
        GrantApplication {
            id: ApplicationId(1),
            reference_code: "CA123456".to_string(),
            submitter_name: "S".to_string(),
            candidate_full_name: "C".to_string(),
            grant_type: GrantType::Stsm,
            date: "2026-01-01".to_string(),
            place: "P".to_string(),
            amount_requested: 100.0,
            currency: "EUR".to_string(),
            description: String::new(),
            voting_deadline: Timestamp(deadline),
            is_active: true,
            created_at: Timestamp(0),
        }
    }

    #[test]
    fn test_open_until_deadline_inclusive() {
        let app = application(1_000);
        assert!(is_open(&app, Timestamp(999)));
        assert!(is_open(&app, Timestamp(1_000)));
        assert!(!is_open(&app, Timestamp(1_001)));
    }

    #[test]
    fn test_ensure_open_reports_deadline() {
        let app = application(1_000);
        assert!(ensure_open(&app, Timestamp(1_000)).is_ok());
        match ensure_open(&app, Timestamp(1_001)) {
            Err(VotingError::DeadlineExpired { deadline }) => assert_eq!(deadline, Timestamp(1_000)),
            other => panic!("Expected DeadlineExpired, got {:?}", other),
        }
    }

    #[test]
    fn test_inactive_flag_does_not_close_voting() {
        let mut app = application(1_000);
        app.is_active = false;
        assert!(is_open(&app, Timestamp(10)));
    }

    #[test]
    fn test_remaining_secs() {
        let app = application(1_000);
        assert_eq!(remaining_secs(&app, Timestamp(400)), 600);
        assert_eq!(remaining_secs(&app, Timestamp(2_000)), 0);
    }
}
