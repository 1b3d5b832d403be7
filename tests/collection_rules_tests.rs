//! Collection scenarios run through the pure rule modules
//!
//! These walk a loan, a group and a report through whole weeks without a
//! database, the same arithmetic the services persist.

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use cobranza_server::bonus::rules::select_bonus;
use cobranza_server::bonus::BonusRule;
use cobranza_server::config::LendingPolicy;
use cobranza_server::loan::rules::{self, LoanProgress};
use cobranza_server::loan::LoanStatus;
use cobranza_server::report::{
    GroupAggregates, GroupFigures, ReportGroup, ReportRow, ReportScope, ReportTotals,
};
use cobranza_server::models::UserRole;
use cobranza_server::week::Week;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn mexico_city() -> FixedOffset {
    FixedOffset::west_opt(6 * 3600).unwrap()
}

fn rule(amount: Decimal, min: Decimal, max: Decimal, max_misses: i32, age_secs: i64) -> BonusRule {
    BonusRule {
        id: Uuid::new_v4(),
        amount,
        collection_min: min,
        collection_max: max,
        max_misses,
        created_at: Utc.timestamp_opt(1_700_000_000 + age_secs, 0).unwrap(),
    }
}

// ============================================================================
// Loan lifecycle
// ============================================================================

#[test]
fn test_ten_week_loan_with_one_short_week() {
    let expected_total = rules::expected_total(dec!(3000), 10, dec!(0.1));
    let mut progress = LoanProgress {
        principal: dec!(3000),
        weekly_rate: dec!(0.1),
        term_weeks: 10,
        expected_total,
        serviced_weeks: 0,
        paid_total: Decimal::ZERO,
    };

    // Week 1 falls short: no serviced week, the sweep would agree
    let outcome = rules::apply_payment(&progress, dec!(250));
    assert!(!outcome.covers_week);
    assert_eq!(outcome.serviced_weeks, 0);
    assert!(rules::week_missed(dec!(250), dec!(3000), dec!(0.1)));
    progress.serviced_weeks = outcome.serviced_weeks;
    progress.paid_total = outcome.paid_total;

    // Nine full weeks afterwards
    for week in 1..=9 {
        let outcome = rules::apply_payment(&progress, dec!(300));
        assert!(outcome.covers_week);
        assert_eq!(outcome.serviced_weeks, week);
        progress.serviced_weeks = outcome.serviced_weeks;
        progress.paid_total = outcome.paid_total;
        assert!(!outcome.completed, "completed early at week {}", week);
    }

    assert_eq!(progress.paid_total, dec!(2950));
    assert_eq!(rules::shortfall(expected_total, progress.paid_total), dec!(3050));

    // The tenth serviced week closes the term
    let last = rules::apply_payment(&progress, dec!(300));
    assert_eq!(last.serviced_weeks, 10);
    assert!(last.completed);
}

#[test]
fn test_renewal_after_nine_weeks_withholds_shortfall() {
    let policy = LendingPolicy::default();
    let expected_total = rules::expected_total(dec!(3000), 10, dec!(0.1));
    let paid = dec!(2700);

    assert!(rules::eligible_for_renewal(LoanStatus::Active, 9, &policy));
    let owed = rules::shortfall(expected_total, paid);
    assert_eq!(owed, dec!(3300));

    assert_eq!(rules::renewal_disbursement(dec!(5000), owed), Ok(dec!(1700)));
    assert!(rules::renewal_disbursement(dec!(3300), owed).is_err());
}

#[test]
fn test_early_application_is_not_a_renewal() {
    let policy = LendingPolicy::default();
    assert!(!rules::eligible_for_renewal(LoanStatus::Active, 3, &policy));
    assert!(!rules::eligible_for_renewal(LoanStatus::Cancelled, 9, &policy));
}

// ============================================================================
// Weeks
// ============================================================================

#[test]
fn test_sunday_night_local_belongs_to_the_closing_week() {
    let tz = mexico_city();
    // Sunday 2024-06-09 23:30 local is Monday 05:30 UTC
    let instant = Utc.with_ymd_and_hms(2024, 6, 10, 5, 30, 0).unwrap();

    let week = Week::containing_instant(instant, &tz);
    assert_eq!(week.start(), date(2024, 6, 3));
    assert_eq!(week.end(), date(2024, 6, 9));

    let (from, to) = week.bounds(&tz);
    assert!(from <= instant && instant < to);
    assert_eq!(to, Utc.with_ymd_and_hms(2024, 6, 10, 6, 0, 0).unwrap());
}

// ============================================================================
// Bonuses
// ============================================================================

#[test]
fn test_group_collecting_4500_earns_200() {
    let rules = vec![
        rule(dec!(200), dec!(4000), dec!(5000), 1, 0),
        rule(dec!(50), dec!(0), dec!(4000), 3, 1),
    ];

    let earned = select_bonus(&rules, dec!(4500), 0).map(|r| r.amount);
    assert_eq!(earned, Some(dec!(200)));

    // Two misses disqualify the only band holding 4500
    assert!(select_bonus(&rules, dec!(4500), 2).is_none());
    assert_eq!(
        select_bonus(&rules, dec!(3500), 2).map(|r| r.amount),
        Some(dec!(50))
    );
}

#[test]
fn test_overlapping_rules_use_the_oldest() {
    let rules = vec![
        rule(dec!(150), dec!(1000), dec!(5000), 2, 0),
        rule(dec!(500), dec!(4000), dec!(5000), 2, 10),
    ];
    assert_eq!(
        select_bonus(&rules, dec!(4000), 0).map(|r| r.amount),
        Some(dec!(150))
    );
}

// ============================================================================
// Reports
// ============================================================================

fn report_group(lead: Uuid, manager: Uuid) -> ReportGroup {
    ReportGroup {
        group_id: Uuid::new_v4(),
        group_name: "Las Flores".to_string(),
        route_id: Uuid::new_v4(),
        route_name: "Ruta Centro".to_string(),
        lead_user_id: Some(lead),
        lead_name: Some("Rosa".to_string()),
        manager_id: Some(manager),
        manager_name: None,
        supervisor_id: None,
        supervisor_name: None,
    }
}

#[test]
fn test_group_lead_sees_only_led_groups() {
    let lead = Uuid::new_v4();
    let manager = Uuid::new_v4();
    let groups = vec![
        report_group(lead, manager),
        report_group(Uuid::new_v4(), manager),
    ];

    let scope = ReportScope::for_user(lead, UserRole::GroupLead);
    assert_eq!(scope.filter(groups.clone()).len(), 1);

    let scope = ReportScope::for_user(manager, UserRole::Manager);
    assert_eq!(scope.filter(groups.clone()).len(), 2);

    let scope = ReportScope::for_user(Uuid::new_v4(), UserRole::Collector);
    assert!(scope.filter(groups).is_empty());
}

#[test]
fn test_week_report_totals() {
    let group = report_group(Uuid::new_v4(), Uuid::new_v4());
    let aggregates = GroupAggregates {
        ideal_collection: dec!(4800),
        loan_real: dec!(30000),
        loan_paper: dec!(48000),
        active_loans: 16,
        disbursed_in_week: dec!(1500),
    };

    let rows = vec![
        ReportRow::computed(group.clone(), GroupFigures::new(aggregates, dec!(4500), dec!(200))),
        ReportRow::failed(group, "statement timeout"),
    ];
    let totals = ReportTotals::from_rows(&rows);

    assert_eq!(totals.groups, 2);
    assert_eq!(totals.failed_rows, 1);
    assert_eq!(totals.delinquency_amount, dec!(300));
    assert_eq!(totals.delinquency_pct, Some(dec!(6.25)));
    assert_eq!(totals.surplus, dec!(2800));
}
