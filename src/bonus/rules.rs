use rust_decimal::Decimal;

use crate::error::Violation;

use super::model::BonusRule;

/// First rule, in the order given, whose range holds `collected` (bounds
/// inclusive) and whose miss allowance covers `misses`
pub fn select_bonus(rules: &[BonusRule], collected: Decimal, misses: i64) -> Option<&BonusRule> {
    rules.iter().find(|rule| {
        collected >= rule.collection_min
            && collected <= rule.collection_max
            && misses <= i64::from(rule.max_misses)
    })
}

pub fn validate_rule(
    amount: Decimal,
    collection_min: Decimal,
    collection_max: Decimal,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    if amount < Decimal::ZERO {
        violations.push(Violation::new("amount", "must not be negative"));
    }
    if collection_min < Decimal::ZERO {
        violations.push(Violation::new("collection_min", "must not be negative"));
    }
    if collection_min > collection_max {
        violations.push(Violation::new(
            "collection_max",
            "must be greater than or equal to collection_min",
        ));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn rule(min: Decimal, max: Decimal, max_misses: i32, amount: Decimal) -> BonusRule {
        BonusRule {
            id: Uuid::new_v4(),
            amount,
            collection_min: min,
            collection_max: max,
            max_misses,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            rule(dec!(4000), dec!(5000), 1, dec!(200)),
            rule(dec!(0), dec!(4000), 3, dec!(50)),
        ];
        assert_eq!(select_bonus(&rules, dec!(4500), 0).map(|r| r.amount), Some(dec!(200)));

        // 4000 sits on both ranges; order decides
        assert_eq!(select_bonus(&rules, dec!(4000), 1).map(|r| r.amount), Some(dec!(200)));
        assert_eq!(select_bonus(&rules, dec!(4000), 2).map(|r| r.amount), Some(dec!(50)));
    }

    #[test]
    fn test_no_bonus() {
        let rules = vec![rule(dec!(4000), dec!(5000), 1, dec!(200))];
        assert!(select_bonus(&rules, dec!(5000.01), 0).is_none());
        assert!(select_bonus(&rules, dec!(4500), 2).is_none());
        assert!(select_bonus(&[], dec!(4500), 0).is_none());
    }

    #[test]
    fn test_rule_validation() {
        assert!(validate_rule(dec!(100), dec!(0), dec!(100)).is_empty());
        assert_eq!(validate_rule(dec!(-1), dec!(10), dec!(5)).len(), 2);
    }
}
