//! Date functions and short-date member literals
//!
//! Members of date-like dimensions are keyed by compact strings: `YYYY`,
//! `YYYYQ` (quarter), `YYYYMM` and `YYYYMMDD`. Comparisons against a date-like
//! dimension accept the usual short forms and are rewritten to those keys.

use super::{FunctionKind, ItemContext};
use crate::config::DateOrder;
use crate::node::{ExpressionNode, Literal};
use chrono::{Datelike, NaiveDate};
use lazy_regex::regex_captures;
use measure_formula_core::{ErrorCode, ValidationMessages};
use rust_decimal::Decimal;

/// DATEDIFF granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    pub fn parse(text: &str) -> Option<Granularity> {
        match text.to_ascii_lowercase().as_str() {
            "day" => Some(Granularity::Day),
            "month" => Some(Granularity::Month),
            "year" => Some(Granularity::Year),
            _ => None,
        }
    }

    fn primitive(self) -> FunctionKind {
        match self {
            Granularity::Day => FunctionKind::CalcDaysBetween,
            Granularity::Month => FunctionKind::CalcMonthsBetween,
            Granularity::Year => FunctionKind::CalcYearsBetween,
        }
    }
}

/// Member key for a short-date literal; `None` when the text is already a key
/// or isn't a date
pub fn member_key(text: &str, order: DateOrder) -> Option<String> {
    let text = text.trim();
    if let Some((_, year, month, day)) = regex_captures!(r"^(\d{4})-(\d{1,2})-(\d{1,2})$", text) {
        return day_key(year, month, day);
    }
    if let Some((_, first, second, year)) =
        regex_captures!(r"^(\d{1,2})[/.](\d{1,2})[/.](\d{4})$", text)
    {
        return match order {
            DateOrder::MonthFirst => day_key(year, first, second),
            DateOrder::DayFirst => day_key(year, second, first),
        };
    }
    if let Some((_, year, month)) = regex_captures!(r"^(\d{4})-(\d{1,2})$", text) {
        return month_key(year, month);
    }
    if let Some((_, month, year)) = regex_captures!(r"^(\d{1,2})/(\d{4})$", text) {
        return month_key(year, month);
    }
    if let Some((_, year, quarter)) = regex_captures!(r"^(\d{4})\s*[Qq]([1-4])$", text) {
        return Some(format!("{}{}", year, quarter));
    }
    None
}

fn day_key(year: &str, month: &str, day: &str) -> Option<String> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    Some(date.format("%Y%m%d").to_string())
}

fn month_key(year: &str, month: &str) -> Option<String> {
    let month: u32 = month.parse().ok()?;
    (1..=12)
        .contains(&month)
        .then(|| format!("{}{:02}", year, month))
}

/// Calendar date from a day key or any short form naming a day
pub fn parse_date(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let key = member_key(text, order).unwrap_or_else(|| text.trim().to_string());
    if key.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(&key, "%Y%m%d").ok()
}

/// Whole months from `to` to `from`, truncated toward zero
fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let months = i64::from(from.year() - to.year()) * 12 + i64::from(from.month())
        - i64::from(to.month());
    if months > 0 && from.day() < to.day() {
        months - 1
    } else if months < 0 && from.day() > to.day() {
        months + 1
    } else {
        months
    }
}

pub(super) fn fold(
    kind: FunctionKind,
    args: &[ExpressionNode],
    cx: &ItemContext<'_>,
) -> Option<ExpressionNode> {
    let [first, second] = args else {
        return None;
    };
    let order = cx.env.config.date_order;
    let from = parse_date(first.as_literal()?.as_str()?, order)?;
    let to = parse_date(second.as_literal()?.as_str()?, order)?;
    let value = match kind {
        FunctionKind::CalcDaysBetween => (from - to).num_days(),
        FunctionKind::CalcMonthsBetween => months_between(from, to),
        FunctionKind::CalcYearsBetween => months_between(from, to) / 12,
        _ => return None,
    };
    Some(ExpressionNode::number(Decimal::from(value)))
}

/// DATEDIFF lowers to the day/month/year primitive
pub(super) fn rewrite(kind: FunctionKind, args: &[ExpressionNode]) -> Option<ExpressionNode> {
    let granularity = match (kind, args) {
        (FunctionKind::DateDiffBw, [_, _]) | (FunctionKind::DateDiffHana, [_, _]) => {
            Granularity::Day
        }
        (FunctionKind::DateDiffHana, [_, _, unit]) => Granularity::parse(unit.as_literal()?.as_str()?)?,
        _ => return None,
    };
    Some(ExpressionNode::call(
        granularity.primitive(),
        args[..2].to_vec(),
    ))
}

pub(super) fn validate(kind: FunctionKind, args: &[ExpressionNode], out: &mut ValidationMessages) {
    if let (FunctionKind::DateDiffHana, [_, _, unit]) = (kind, args) {
        let valid = unit
            .as_literal()
            .and_then(Literal::as_str)
            .and_then(Granularity::parse)
            .is_some();
        if !valid {
            out.report(
                ErrorCode::InvalidGranularity,
                format!(
                    "Invalid granularity {}; expected \"Day\", \"Month\" or \"Year\"",
                    unit
                ),
            );
        }
    }
}

/// `[d/Date] = "2024-03-15"` → `[d/Date] = "20240315"` for date-like dimensions
pub(super) fn rewrite_member_comparison(
    kind: FunctionKind,
    args: &[ExpressionNode],
    cx: &ItemContext<'_>,
) -> Option<ExpressionNode> {
    let [ExpressionNode::Attribute(attribute), value] = args else {
        return None;
    };
    if !attribute.is_date_like() {
        return None;
    }
    let key = member_key(value.as_literal()?.as_str()?, cx.env.config.date_order)?;
    Some(ExpressionNode::call(
        kind,
        vec![args[0].clone(), ExpressionNode::string(key)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_member_keys() {
        let order = DateOrder::MonthFirst;
        assert_eq!(member_key("2024-03-15", order), Some("20240315".into()));
        assert_eq!(member_key("03/15/2024", order), Some("20240315".into()));
        assert_eq!(
            member_key("15/03/2024", DateOrder::DayFirst),
            Some("20240315".into())
        );
        assert_eq!(member_key("2024-3", order), Some("202403".into()));
        assert_eq!(member_key("03/2024", order), Some("202403".into()));
        assert_eq!(member_key("2024 Q2", order), Some("20242".into()));
    }

    #[test]
    fn test_keys_and_invalid_dates_are_left_alone() {
        let order = DateOrder::MonthFirst;
        assert_eq!(member_key("20240315", order), None);
        assert_eq!(member_key("2024", order), None);
        assert_eq!(member_key("2024-02-30", order), None);
        assert_eq!(member_key("2024-13", order), None);
        assert_eq!(member_key("March", order), None);
    }

    #[test]
    fn test_months_between() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(months_between(d(2024, 3, 15), d(2024, 1, 15)), 2);
        assert_eq!(months_between(d(2024, 3, 14), d(2024, 1, 15)), 1);
        assert_eq!(months_between(d(2024, 1, 15), d(2024, 3, 14)), -1);
        assert_eq!(months_between(d(2025, 1, 1), d(2023, 1, 2)) / 12, 1);
    }

    #[test]
    fn test_datediff_rewrites_by_granularity() {
        let a = ExpressionNode::string("2024-03-15");
        let b = ExpressionNode::string("2024-01-01");
        let days = rewrite(FunctionKind::DateDiffBw, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(days.to_string(), r#"CALCDAYSBETWEEN("2024-03-15", "2024-01-01")"#);

        let months = rewrite(
            FunctionKind::DateDiffHana,
            &[a.clone(), b.clone(), ExpressionNode::string("MONTH")],
        )
        .unwrap();
        assert_eq!(months.as_function().unwrap().kind, FunctionKind::CalcMonthsBetween);

        assert_eq!(
            rewrite(FunctionKind::DateDiffHana, &[a, b, ExpressionNode::string("Week")]),
            None
        );
    }

    #[test]
    fn test_invalid_granularity() {
        let mut out = ValidationMessages::new();
        validate(
            FunctionKind::DateDiffHana,
            &[
                ExpressionNode::string("2024-01-01"),
                ExpressionNode::string("2024-01-02"),
                ExpressionNode::string("Week"),
            ],
            &mut out,
        );
        assert_eq!(out.codes(), vec![ErrorCode::InvalidGranularity]);
    }
}
