//! Loan arithmetic and validation.
//!
//! Everything here is pure so the lifecycle rules can be exercised without
//! a database; the service layer loads rows, calls into this module and
//! persists the outcome.

use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::config::LendingPolicy;
use crate::error::Violation;
use crate::models::{Action, UserRole};

use super::model::LoanStatus;

/// Round a monetary amount to cents, half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Total repayable: `principal × (1 + term × weekly_rate)`
pub fn expected_total(principal: Decimal, term_weeks: i32, weekly_rate: Decimal) -> Decimal {
    round_money(principal * (Decimal::ONE + Decimal::from(term_weeks) * weekly_rate))
}

/// Expected collection for one week: `principal × weekly_rate`
pub fn ideal_weekly(principal: Decimal, weekly_rate: Decimal) -> Decimal {
    round_money(principal * weekly_rate)
}

/// What the borrower still owes on a loan; never negative
pub fn shortfall(expected_total: Decimal, paid_total: Decimal) -> Decimal {
    (expected_total - paid_total).max(Decimal::ZERO)
}

pub fn is_completed(
    paid_total: Decimal,
    expected_total: Decimal,
    serviced_weeks: i32,
    term_weeks: i32,
) -> bool {
    paid_total >= expected_total || serviced_weeks >= term_weeks
}

/// Whether an existing loan is renewed (closed and folded into the new one)
pub fn eligible_for_renewal(status: LoanStatus, serviced_weeks: i32, policy: &LendingPolicy) -> bool {
    status == LoanStatus::Active && serviced_weeks >= policy.renewal_min_weeks
}

/// Fields of a loan application that can be checked without I/O
#[derive(Debug, Clone, Copy)]
pub struct LoanApplication {
    pub borrower_id: Uuid,
    pub guarantor_id: Option<Uuid>,
    pub principal: Decimal,
}

pub fn validate_application(
    application: &LoanApplication,
    acting_role: UserRole,
    policy: &LendingPolicy,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    if application.principal <= Decimal::ZERO {
        violations.push(Violation::new("principal", "must be greater than 0"));
    } else if application.principal > policy.large_loan_threshold
        && !acting_role.can(Action::CreateLargeLoan)
    {
        violations.push(Violation::new(
            "principal",
            format!(
                "loans above {} require the large-loan override permission",
                policy.large_loan_threshold
            ),
        ));
    }

    if application.principal.normalize().scale() > 2 {
        violations.push(Violation::new("principal", "must have at most two decimals"));
    }

    if application.guarantor_id == Some(application.borrower_id) {
        violations.push(Violation::new("guarantor_id", "must differ from the borrower"));
    }

    violations
}

/// Cash handed over on a renewal: the previous loan's shortfall is
/// withheld from the new principal
pub fn renewal_disbursement(principal: Decimal, previous_shortfall: Decimal) -> Result<Decimal, Violation> {
    let disbursed = principal - previous_shortfall;
    if disbursed <= Decimal::ZERO {
        return Err(Violation::new(
            "principal",
            format!(
                "does not cover the {} still owed on the loan being renewed",
                previous_shortfall
            ),
        ));
    }
    Ok(disbursed)
}

/// Repayment state of a loan just before a payment is applied
#[derive(Debug, Clone, Copy)]
pub struct LoanProgress {
    pub principal: Decimal,
    pub weekly_rate: Decimal,
    pub term_weeks: i32,
    pub expected_total: Decimal,
    pub serviced_weeks: i32,
    pub paid_total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentOutcome {
    /// The payment alone reached the ideal weekly collection
    pub covers_week: bool,
    pub serviced_weeks: i32,
    pub paid_total: Decimal,
    pub completed: bool,
}

/// Apply one payment: a covering payment counts a serviced week, a short
/// one means the week is missed
pub fn apply_payment(progress: &LoanProgress, amount: Decimal) -> PaymentOutcome {
    let covers_week = amount >= ideal_weekly(progress.principal, progress.weekly_rate);
    let serviced_weeks = if covers_week {
        progress.serviced_weeks + 1
    } else {
        progress.serviced_weeks
    };
    let paid_total = progress.paid_total + amount;

    PaymentOutcome {
        covers_week,
        serviced_weeks,
        paid_total,
        completed: is_completed(
            paid_total,
            progress.expected_total,
            serviced_weeks,
            progress.term_weeks,
        ),
    }
}

/// Weekly sweep rule: the week is missed when its payments, taken together,
/// fall short of the ideal collection
pub fn week_missed(collected: Decimal, principal: Decimal, weekly_rate: Decimal) -> bool {
    collected < ideal_weekly(principal, weekly_rate)
}
