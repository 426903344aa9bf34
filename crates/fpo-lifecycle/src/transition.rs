//! Transition validator: the fixed lifecycle state table.

use fpo_core::models::organization::{LifecycleAction, OrgStatus};

use crate::error::LifecycleError;

/// Target state of `action` taken from `from`, or `InvalidTransition`.
pub fn next_status(from: OrgStatus, action: LifecycleAction) -> Result<OrgStatus, LifecycleError> {
    use LifecycleAction as A;
    use OrgStatus as S;

    let to = match (from, action) {
        (S::Draft, A::Submit) => S::PendingVerification,
        (S::PendingVerification, A::Approve) => S::Verified,
        (S::PendingVerification, A::Reject) => S::Rejected,
        (S::Rejected, A::Resubmit) => S::Draft,
        (S::Rejected, A::Archive) => S::Archived,
        (S::Verified, A::BeginSetup) => S::PendingSetup,
        (S::PendingSetup, A::SetupSucceeded) => S::Active,
        (S::PendingSetup, A::SetupFailed) => S::SetupFailed,
        (S::SetupFailed, A::RetrySetup) => S::PendingSetup,
        (S::SetupFailed, A::Archive) => S::Archived,
        (S::Active, A::Suspend) => S::Suspended,
        (S::Active, A::Deactivate) => S::Inactive,
        (S::Suspended, A::Reinstate) => S::Active,
        (S::Suspended, A::Archive) => S::Archived,
        (S::Inactive, A::Reactivate) => S::Active,
        (S::Inactive, A::Archive) => S::Archived,
        _ => return Err(LifecycleError::InvalidTransition { from, action }),
    };

    Ok(to)
}

/// Actions accepted in state `from`.
pub fn allowed_actions(from: OrgStatus) -> Vec<LifecycleAction> {
    LifecycleAction::ALL
        .into_iter()
        .filter(|action| next_status(from, *action).is_ok())
        .collect()
}

/// Whether entering `to` runs the provisioning sequence.
pub fn requires_provisioning(to: OrgStatus) -> bool {
    to == OrgStatus::PendingSetup
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleAction as A;
    use OrgStatus as S;

    const TABLE: [(OrgStatus, LifecycleAction, OrgStatus); 16] = [
        (S::Draft, A::Submit, S::PendingVerification),
        (S::PendingVerification, A::Approve, S::Verified),
        (S::PendingVerification, A::Reject, S::Rejected),
        (S::Rejected, A::Resubmit, S::Draft),
        (S::Rejected, A::Archive, S::Archived),
        (S::Verified, A::BeginSetup, S::PendingSetup),
        (S::PendingSetup, A::SetupSucceeded, S::Active),
        (S::PendingSetup, A::SetupFailed, S::SetupFailed),
        (S::SetupFailed, A::RetrySetup, S::PendingSetup),
        (S::SetupFailed, A::Archive, S::Archived),
        (S::Active, A::Suspend, S::Suspended),
        (S::Active, A::Deactivate, S::Inactive),
        (S::Suspended, A::Reinstate, S::Active),
        (S::Suspended, A::Archive, S::Archived),
        (S::Inactive, A::Reactivate, S::Active),
        (S::Inactive, A::Archive, S::Archived),
    ];

    #[test]
    fn every_listed_transition_is_accepted() {
        for (from, action, to) in TABLE {
            assert_eq!(next_status(from, action).unwrap(), to, "{from} --{action}-->");
        }
    }

    #[test]
    fn every_unlisted_pair_is_rejected() {
        for from in OrgStatus::ALL {
            for action in LifecycleAction::ALL {
                if TABLE.iter().any(|(f, a, _)| *f == from && *a == action) {
                    continue;
                }
                match next_status(from, action) {
                    Err(LifecycleError::InvalidTransition { from: f, action: a }) => {
                        assert_eq!((f, a), (from, action));
                    }
                    other => panic!("{from} --{action}--> should be invalid, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn archived_has_no_outgoing_transitions() {
        assert!(allowed_actions(OrgStatus::Archived).is_empty());
        for status in OrgStatus::ALL {
            if status != OrgStatus::Archived {
                assert!(!allowed_actions(status).is_empty(), "{status} is a dead end");
            }
        }
    }

    #[test]
    fn archive_is_reachable_only_from_four_states() {
        let sources: Vec<_> = OrgStatus::ALL
            .into_iter()
            .filter(|s| next_status(*s, A::Archive).is_ok())
            .collect();
        assert_eq!(
            sources,
            vec![S::Rejected, S::SetupFailed, S::Suspended, S::Inactive]
        );
    }

    #[test]
    fn only_pending_setup_requires_provisioning() {
        let provisioning: Vec<_> = OrgStatus::ALL
            .into_iter()
            .filter(|s| requires_provisioning(*s))
            .collect();
        assert_eq!(provisioning, vec![S::PendingSetup]);
    }
}
