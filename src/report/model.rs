use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::loan::rules::round_money;

/// A group with the people around it, as shown on a report row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReportGroup {
    pub group_id: Uuid,
    pub group_name: String,
    pub route_id: Uuid,
    pub route_name: String,
    pub lead_user_id: Option<Uuid>,
    pub lead_name: Option<String>,
    pub manager_id: Option<Uuid>,
    pub manager_name: Option<String>,
    pub supervisor_id: Option<Uuid>,
    pub supervisor_name: Option<String>,
}

/// Loan aggregates of one group for one week, as read from storage
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct GroupAggregates {
    pub ideal_collection: Decimal,
    pub loan_real: Decimal,
    pub loan_paper: Decimal,
    pub active_loans: i64,
    pub disbursed_in_week: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupFigures {
    pub ideal_collection: Decimal,
    pub real_collection: Decimal,
    pub loan_real: Decimal,
    pub loan_paper: Decimal,
    pub active_loans: i64,
    pub delinquency_amount: Decimal,
    /// Absent when nothing was expected
    pub delinquency_pct: Option<Decimal>,
    pub disbursed_in_week: Decimal,
    pub bonus: Decimal,
    pub surplus: Decimal,
}

impl GroupFigures {
    pub fn new(aggregates: GroupAggregates, real_collection: Decimal, bonus: Decimal) -> Self {
        let delinquency_amount = aggregates.ideal_collection - real_collection;
        Self {
            ideal_collection: aggregates.ideal_collection,
            real_collection,
            loan_real: aggregates.loan_real,
            loan_paper: aggregates.loan_paper,
            active_loans: aggregates.active_loans,
            delinquency_amount,
            delinquency_pct: delinquency_pct(delinquency_amount, aggregates.ideal_collection),
            disbursed_in_week: aggregates.disbursed_in_week,
            bonus,
            surplus: real_collection - aggregates.disbursed_in_week - bonus,
        }
    }
}

/// Delinquency as a percentage of the ideal collection, two decimals
pub fn delinquency_pct(delinquency_amount: Decimal, ideal_collection: Decimal) -> Option<Decimal> {
    if ideal_collection.is_zero() {
        return None;
    }
    Some(round_money(delinquency_amount / ideal_collection * Decimal::ONE_HUNDRED))
}

/// One group; `error` is set instead of the figures when they could not be
/// computed
#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    #[serde(flatten)]
    pub group: ReportGroup,
    #[serde(flatten)]
    pub figures: Option<GroupFigures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportRow {
    pub fn computed(group: ReportGroup, figures: GroupFigures) -> Self {
        Self {
            group,
            figures: Some(figures),
            error: None,
        }
    }

    pub fn failed(group: ReportGroup, error: impl Into<String>) -> Self {
        Self {
            group,
            figures: None,
            error: Some(error.into()),
        }
    }
}

/// Grand total over the rows that were computed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub groups: usize,
    pub failed_rows: usize,
    pub ideal_collection: Decimal,
    pub real_collection: Decimal,
    pub loan_real: Decimal,
    pub loan_paper: Decimal,
    pub active_loans: i64,
    pub delinquency_amount: Decimal,
    pub delinquency_pct: Option<Decimal>,
    pub disbursed_in_week: Decimal,
    pub bonus: Decimal,
    pub surplus: Decimal,
}

impl ReportTotals {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut totals = ReportTotals {
            groups: rows.len(),
            ..Default::default()
        };

        for row in rows {
            let Some(f) = &row.figures else {
                totals.failed_rows += 1;
                continue;
            };
            totals.ideal_collection += f.ideal_collection;
            totals.real_collection += f.real_collection;
            totals.loan_real += f.loan_real;
            totals.loan_paper += f.loan_paper;
            totals.active_loans += f.active_loans;
            totals.delinquency_amount += f.delinquency_amount;
            totals.disbursed_in_week += f.disbursed_in_week;
            totals.bonus += f.bonus;
            totals.surplus += f.surplus;
        }

        totals.delinquency_pct = delinquency_pct(totals.delinquency_amount, totals.ideal_collection);
        totals
    }
}

#[derive(Debug, Serialize)]
pub struct GeneralReport {
    pub week_start: NaiveDate,
    pub rows: Vec<ReportRow>,
    pub totals: ReportTotals,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Any date inside the week; defaults to today
    pub date: Option<NaiveDate>,
    pub route_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn group() -> ReportGroup {
        ReportGroup {
            group_id: Uuid::new_v4(),
            group_name: "Grupo 1".to_string(),
            route_id: Uuid::new_v4(),
            route_name: "Ruta Norte".to_string(),
            lead_user_id: None,
            lead_name: None,
            manager_id: None,
            manager_name: None,
            supervisor_id: None,
            supervisor_name: None,
        }
    }

    fn aggregates() -> GroupAggregates {
        GroupAggregates {
            ideal_collection: dec!(1000),
            loan_real: dec!(8000),
            loan_paper: dec!(12000),
            active_loans: 4,
            disbursed_in_week: dec!(500),
        }
    }

    #[test]
    fn test_figures() {
        let figures = GroupFigures::new(aggregates(), dec!(800), dec!(50));
        assert_eq!(figures.delinquency_amount, dec!(200));
        assert_eq!(figures.delinquency_pct, Some(dec!(20)));
        assert_eq!(figures.surplus, dec!(250));
    }

    #[test]
    fn test_pct_absent_without_ideal() {
        let figures = GroupFigures::new(GroupAggregates::default(), dec!(100), dec!(0));
        assert_eq!(figures.delinquency_amount, dec!(-100));
        assert_eq!(figures.delinquency_pct, None);
    }

    #[test]
    fn test_totals_skip_failed_rows() {
        let rows = vec![
            ReportRow::computed(group(), GroupFigures::new(aggregates(), dec!(800), dec!(50))),
            ReportRow::failed(group(), "timeout"),
            ReportRow::computed(group(), GroupFigures::new(aggregates(), dec!(1000), dec!(0))),
        ];

        let totals = ReportTotals::from_rows(&rows);
        assert_eq!(totals.groups, 3);
        assert_eq!(totals.failed_rows, 1);
        assert_eq!(totals.ideal_collection, dec!(2000));
        assert_eq!(totals.real_collection, dec!(1800));
        assert_eq!(totals.delinquency_pct, Some(dec!(10)));
        assert_eq!(totals.surplus, dec!(750));
    }

    #[test]
    fn test_failed_row_serializes_error_without_figures() {
        let json = serde_json::to_value(ReportRow::failed(group(), "boom")).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["group_name"], "Grupo 1");
        assert!(json.get("surplus").is_none());
    }
}
