//! Transition legality table
//!
//! Every settlement decision is a lookup in [`RULES`], keyed by the deal's
//! current status, the requested operation, the caller's role and whether
//! the deadline has been reached. Nothing outside this module decides who
//! may move a deal.

use std::fmt;

use escrowdesk_types::{Deal, DealStatus, PartyId};
use serde::{Deserialize, Serialize};

/// Settlement operations that move an existing deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Pay the locked amount to the seller
    Release,
    /// Pay the locked amount back to the buyer
    Refund,
    /// Record that the deadline passed
    Expire,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Release => "release",
            Self::Refund => "refund",
            Self::Expire => "expire",
        };
        f.write_str(name)
    }
}

/// Caller's relationship to a deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Buyer,
    Seller,
    /// Anyone who is neither buyer nor seller
    Outsider,
}

impl Role {
    /// Resolve the caller's role on `deal`
    pub fn of(caller: &PartyId, deal: &Deal) -> Self {
        if caller == &deal.buyer {
            Self::Buyer
        } else if caller == &deal.seller {
            Self::Seller
        } else {
            Self::Outsider
        }
    }
}

/// Time predicate a rule is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    Any,
    /// `now < deadline`
    BeforeDeadline,
    /// `now >= deadline`
    AtOrAfterDeadline,
}

impl TimeWindow {
    /// Whether this window admits a moment at which the deadline is (or is
    /// not yet) reached
    pub fn admits(&self, deadline_reached: bool) -> bool {
        match self {
            Self::Any => true,
            Self::BeforeDeadline => !deadline_reached,
            Self::AtOrAfterDeadline => deadline_reached,
        }
    }
}

/// Who receives the locked amount when a rule fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payee {
    Buyer,
    Seller,
}

impl Payee {
    /// Resolve the payee to an address on `deal`
    pub fn party(&self, deal: &Deal) -> PartyId {
        match self {
            Self::Buyer => deal.buyer,
            Self::Seller => deal.seller,
        }
    }
}

/// One row of the transition table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub from: DealStatus,
    pub operation: Operation,
    pub roles: &'static [Role],
    pub window: TimeWindow,
    pub to: DealStatus,
    pub payout: Option<Payee>,
}

impl Rule {
    fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// The complete settlement state machine
pub const RULES: &[Rule] = &[
    Rule {
        from: DealStatus::Funded,
        operation: Operation::Release,
        roles: &[Role::Buyer],
        window: TimeWindow::Any,
        to: DealStatus::Released,
        payout: Some(Payee::Seller),
    },
    // Either party may cancel before the deadline.
    Rule {
        from: DealStatus::Funded,
        operation: Operation::Refund,
        roles: &[Role::Buyer, Role::Seller],
        window: TimeWindow::BeforeDeadline,
        to: DealStatus::Refunded,
        payout: Some(Payee::Buyer),
    },
    // Past the deadline only the buyer may claim, expired or not.
    Rule {
        from: DealStatus::Funded,
        operation: Operation::Refund,
        roles: &[Role::Buyer],
        window: TimeWindow::AtOrAfterDeadline,
        to: DealStatus::Refunded,
        payout: Some(Payee::Buyer),
    },
    Rule {
        from: DealStatus::Expired,
        operation: Operation::Refund,
        roles: &[Role::Buyer],
        window: TimeWindow::Any,
        to: DealStatus::Refunded,
        payout: Some(Payee::Buyer),
    },
    Rule {
        from: DealStatus::Funded,
        operation: Operation::Expire,
        roles: &[Role::Buyer, Role::Seller],
        window: TimeWindow::AtOrAfterDeadline,
        to: DealStatus::Expired,
        payout: None,
    },
];

/// Outcome of evaluating a request against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Apply the transition
    Allowed {
        next: DealStatus,
        payout: Option<Payee>,
    },
    /// Caller may not perform this operation in this state and time
    Unauthorized { reason: &'static str },
    /// Operation is not available from this state (or not yet)
    InvalidState { reason: &'static str },
}

/// Evaluate `operation` requested by `role` on a deal in `status`
///
/// Resolution order:
/// 1. a role that no rule for the operation ever permits is unauthorized
/// 2. no rule from the current status means an invalid state
/// 3. no such rule admitting the current time means an invalid state
/// 4. the admitting rule not listing the role means unauthorized
pub fn evaluate(
    status: DealStatus,
    operation: Operation,
    role: Role,
    deadline_reached: bool,
) -> Verdict {
    let for_operation = || RULES.iter().filter(move |r| r.operation == operation);

    if !for_operation().any(|r| r.permits(role)) {
        return Verdict::Unauthorized {
            reason: not_permitted(operation),
        };
    }

    let mut from_status = for_operation().filter(|r| r.from == status).peekable();
    if from_status.peek().is_none() {
        return Verdict::InvalidState {
            reason: if status.is_terminal() {
                "deal is already settled"
            } else {
                "operation not available in this state"
            },
        };
    }

    let Some(rule) = from_status.find(|r| r.window.admits(deadline_reached)) else {
        return Verdict::InvalidState {
            reason: "deadline not reached",
        };
    };

    if !rule.permits(role) {
        return Verdict::Unauthorized {
            reason: "only buyer after deadline",
        };
    }

    Verdict::Allowed {
        next: rule.to,
        payout: rule.payout,
    }
}

fn not_permitted(operation: Operation) -> &'static str {
    match operation {
        Operation::Release => "only buyer",
        Operation::Refund | Operation::Expire => "only party",
    }
}
