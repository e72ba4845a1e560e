//! Module: protect
//! Responsibility: accept/reject decisions for incoming edits against the
//! head flags, in strict priority order.
//! Does not own: flag mutation (the CAS does) or retry policy (pipeline).

use crate::db::meta::HeadRow;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// EditDescriptor
///
/// The facts about an incoming edit the protection decision needs.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct EditDescriptor {
    pub is_mass_edit: bool,
    pub is_not_autoconfirmed_user: bool,
}

///
/// ProtectionReason
///
/// Rejection reasons in evaluation order; the first active flag wins.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionReason {
    Archived,
    Deleted,
    Locked,
    MassEditProtected,
    SemiProtected,
}

impl Display for ProtectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Archived => "archived",
            Self::Deleted => "deleted",
            Self::Locked => "locked",
            Self::MassEditProtected => "mass_edit_protected",
            Self::SemiProtected => "semi_protected",
        };
        f.write_str(label)
    }
}

///
/// Decision
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Accept,
    Reject(ProtectionReason),
}

impl Decision {
    #[must_use]
    pub const fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Evaluate one edit against the head observed at the start of the write
/// attempt. A losing CAS retry re-evaluates against the refreshed head.
///
/// Priority: archived > hard-deleted > locked > mass-edit > semi-protection.
#[must_use]
pub fn evaluate(head: Option<&HeadRow>, edit: EditDescriptor) -> Decision {
    let Some(head) = head else {
        // Entity creation: nothing to protect yet.
        return Decision::Accept;
    };

    if head.flags.is_archived {
        return Decision::Reject(ProtectionReason::Archived);
    }
    if head.is_deleted {
        return Decision::Reject(ProtectionReason::Deleted);
    }
    if head.flags.is_locked {
        return Decision::Reject(ProtectionReason::Locked);
    }
    if head.flags.is_mass_edit_protected && edit.is_mass_edit {
        return Decision::Reject(ProtectionReason::MassEditProtected);
    }
    if head.flags.is_semi_protected && edit.is_not_autoconfirmed_user {
        return Decision::Reject(ProtectionReason::SemiProtected);
    }

    Decision::Accept
}

///
/// TESTS
///
