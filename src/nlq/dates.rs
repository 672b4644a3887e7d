//! Date-component passes: period names, relative periods, date values
//!
//! These passes rewrite fragments into date-component terms carrying the
//! synthetic property `_k_date_<period>_<absolute|offset>`; the folding
//! step later assembles adjacent components into one date-time literal.

use crate::models::{Comparator, DatePrecision, Term, Value};
use crate::nlq::matcher::{Fragment, Pass};

/// Property name for one date component
pub fn date_property(period: DatePrecision, relative: bool) -> String {
    format!(
        "_k_date_{}_{}",
        period.name(),
        if relative { "offset" } else { "absolute" }
    )
}

/// Parse a `_k_date_<period>_<absolute|offset>` property name
pub fn parse_date_property(property: &str) -> Option<(DatePrecision, bool)> {
    let rest = property.strip_prefix("_k_date_")?;
    let (period_name, flag) = rest.rsplit_once('_')?;
    let period = DatePrecision::from_name(period_name)?;
    match flag {
        "absolute" => Some((period, false)),
        "offset" => Some((period, true)),
        _ => None,
    }
}

fn date_component(period: DatePrecision, relative: bool, value: i64) -> Term {
    Term::literal(
        date_property(period, relative),
        Value::Integer(value),
        Comparator::Equal,
    )
}

fn period_from_word(word: &str) -> Option<DatePrecision> {
    match word.to_lowercase().as_str() {
        "year" | "years" => Some(DatePrecision::Year),
        "month" | "months" => Some(DatePrecision::Month),
        "week" | "weeks" => Some(DatePrecision::Week),
        "day" | "days" => Some(DatePrecision::Day),
        "hour" | "hours" => Some(DatePrecision::Hour),
        "minute" | "minutes" => Some(DatePrecision::Minute),
        "second" | "seconds" => Some(DatePrecision::Second),
        _ => None,
    }
}

fn month_from_name(word: &str) -> Option<i64> {
    match word {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

fn day_of_week_from_name(word: &str) -> Option<i64> {
    match word {
        "monday" | "mon" => Some(1),
        "tuesday" | "tue" => Some(2),
        "wednesday" | "wed" => Some(3),
        "thursday" | "thu" => Some(4),
        "friday" | "fri" => Some(5),
        "saturday" | "sat" => Some(6),
        "sunday" | "sun" => Some(7),
        _ => None,
    }
}

/// Map month and weekday names to absolute date components
pub struct PeriodNamesPass;

impl Pass for PeriodNamesPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let word = captures.first()?.as_ref()?.as_word()?.to_lowercase();
        if let Some(month) = month_from_name(&word) {
            return Some(vec![date_component(DatePrecision::Month, false, month)]);
        }
        if let Some(day) = day_of_week_from_name(&word) {
            return Some(vec![date_component(DatePrecision::DayOfWeek, false, day)]);
        }
        None
    }
}

/// Rewrite period phrases (`in N days`, `last month`, `today`, ...) to
/// date components
pub struct DatePeriodsPass {
    period: Option<DatePrecision>,
    relative: bool,
    negate: bool,
    fixed_amount: Option<i64>,
}

impl DatePeriodsPass {
    /// `in %2 %1` — add an offset to a period
    pub fn offset() -> Self {
        Self {
            period: None,
            relative: true,
            negate: false,
            fixed_amount: None,
        }
    }

    /// `%2 %1 ago` — subtract an offset
    pub fn inverted_offset() -> Self {
        Self {
            period: None,
            relative: true,
            negate: true,
            fixed_amount: None,
        }
    }

    /// `%2 %1` — set the value of a period (`third week`)
    pub fn value() -> Self {
        Self {
            period: None,
            relative: false,
            negate: false,
            fixed_amount: None,
        }
    }

    /// `first %1` / `last %1 of` — fixed period value
    pub fn fixed_value(value: i64) -> Self {
        Self {
            period: None,
            relative: false,
            negate: false,
            fixed_amount: Some(value),
        }
    }

    /// `next %1` / `last %1` — fixed period offset
    pub fn fixed_offset(offset: i64) -> Self {
        Self {
            period: None,
            relative: true,
            negate: false,
            fixed_amount: Some(offset),
        }
    }

    /// `today` / `yesterday` / `tomorrow`
    pub fn fixed_day_offset(offset: i64) -> Self {
        Self {
            period: Some(DatePrecision::Day),
            relative: true,
            negate: false,
            fixed_amount: Some(offset),
        }
    }
}

impl Pass for DatePeriodsPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let period = match self.period {
            Some(period) => period,
            None => period_from_word(captures.first()?.as_ref()?.as_word()?)?,
        };
        let amount = match self.fixed_amount {
            Some(amount) => amount,
            None => captures.get(1)?.as_ref()?.as_integer()?,
        };
        let amount = if self.negate { -amount } else { amount };
        Some(vec![date_component(period, self.relative, amount)])
    }
}

/// Rewrite explicit date and time values (`2013-01-17`, `17 : 30`, AM/PM
/// variants) into absolute date components
///
/// Capture slots: %1 year, %2 month, %3 day, %4 day of week, %5 hour,
/// %6 minute, %7 second.
pub struct DateValuesPass {
    pm: Option<bool>,
}

impl DateValuesPass {
    pub fn pm() -> Self {
        Self { pm: Some(true) }
    }

    pub fn am() -> Self {
        Self { pm: Some(false) }
    }

    pub fn plain() -> Self {
        Self { pm: None }
    }
}

impl DateValuesPass {
    fn capture_int(captures: &[Option<Fragment>], slot: usize) -> Option<Option<i64>> {
        match captures.get(slot).and_then(Option::as_ref) {
            // Slot not captured by this rule
            None => Some(None),
            Some(fragment) => match fragment.as_integer() {
                Some(value) => Some(Some(value)),
                None => None,
            },
        }
    }

    fn capture_month(captures: &[Option<Fragment>]) -> Option<Option<i64>> {
        let Some(fragment) = captures.get(1).and_then(Option::as_ref) else {
            return Some(None);
        };
        if let Some(value) = fragment.as_integer() {
            return if (1..=12).contains(&value) {
                Some(Some(value))
            } else {
                None
            };
        }
        // A month name already rewritten by the period-names pass
        if let Term::Literal {
            property,
            value: Value::Integer(month),
            ..
        } = &fragment.term
        {
            if parse_date_property(property) == Some((DatePrecision::Month, false)) {
                return Some(Some(*month));
            }
        }
        None
    }
}

impl Pass for DateValuesPass {
    fn apply(&self, captures: &[Option<Fragment>]) -> Option<Vec<Term>> {
        let year = Self::capture_int(captures, 0)?;
        let month = Self::capture_month(captures)?;
        let day = Self::capture_int(captures, 2)?;
        let hour = Self::capture_int(captures, 4)?;
        let minute = Self::capture_int(captures, 5)?;
        let second = Self::capture_int(captures, 6)?;

        if let Some(year) = year {
            if !(1000..=2999).contains(&year) {
                return None;
            }
        }
        if let Some(day) = day {
            if !(1..=31).contains(&day) {
                return None;
            }
        }
        let hour = match (hour, self.pm) {
            (Some(h), Some(true)) => {
                if !(1..=12).contains(&h) {
                    return None;
                }
                Some(if h == 12 { 12 } else { h + 12 })
            }
            (Some(h), _) => {
                if !(0..=23).contains(&h) {
                    return None;
                }
                Some(h)
            }
            (None, _) => None,
        };
        if let Some(minute) = minute {
            if !(0..=59).contains(&minute) {
                return None;
            }
        }
        if let Some(second) = second {
            if !(0..=59).contains(&second) {
                return None;
            }
        }

        let components: Vec<Term> = [
            (DatePrecision::Year, year),
            (DatePrecision::Month, month),
            (DatePrecision::Day, day),
            (DatePrecision::Hour, hour),
            (DatePrecision::Minute, minute),
            (DatePrecision::Second, second),
        ]
        .into_iter()
        .filter_map(|(period, value)| value.map(|v| date_component(period, false, v)))
        .collect();

        if components.is_empty() {
            None
        } else {
            Some(components)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlq::matcher::run_pass;
    use crate::nlq::passes::NumbersPass;

    fn fragment(word: &str) -> Fragment {
        Fragment::new(
            Term::literal("", Value::String(word.to_string()), Comparator::Equal),
            0,
            word.len(),
        )
    }

    fn words(items: &[&str]) -> Vec<Fragment> {
        items.iter().map(|w| fragment(w)).collect()
    }

    #[test]
    fn test_date_property_roundtrip() {
        let prop = date_property(DatePrecision::Week, true);
        assert_eq!(prop, "_k_date_week_offset");
        assert_eq!(parse_date_property(&prop), Some((DatePrecision::Week, true)));
        assert_eq!(parse_date_property("_k_typehint"), None);
    }

    #[test]
    fn test_period_names() {
        let mut fragments = words(&["january", "monday", "pancake"]);
        run_pass(&mut fragments, &PeriodNamesPass, "%1");

        assert_eq!(fragments[0].term.property(), "_k_date_month_absolute");
        assert_eq!(fragments[1].term.property(), "_k_date_dayofweek_absolute");
        assert_eq!(fragments[2].as_word(), Some("pancake"));
    }

    #[test]
    fn test_in_n_days() {
        let mut fragments = words(&["in", "3", "days"]);
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &DatePeriodsPass::offset(), "in %2 %1");

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].term.property(), "_k_date_day_offset");
    }

    #[test]
    fn test_n_weeks_ago() {
        let mut fragments = words(&["2", "weeks", "ago"]);
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(
            &mut fragments,
            &DatePeriodsPass::inverted_offset(),
            "%2 %1 ago",
        );

        assert_eq!(fragments.len(), 1);
        match &fragments[0].term {
            Term::Literal { property, value, .. } => {
                assert_eq!(property, "_k_date_week_offset");
                assert_eq!(value, &Value::Integer(-2));
            }
            other => panic!("expected component, got {:?}", other),
        }
    }

    #[test]
    fn test_iso_date_components() {
        let mut fragments = words(&["2013", "-", "01", "-", "17"]);
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &DateValuesPass::plain(), "%1 - %2 - %3");

        let props: Vec<&str> = fragments.iter().map(|f| f.term.property()).collect();
        assert_eq!(
            props,
            vec![
                "_k_date_year_absolute",
                "_k_date_month_absolute",
                "_k_date_day_absolute"
            ]
        );
    }

    #[test]
    fn test_month_name_year() {
        let mut fragments = words(&["in", "january", "2013"]);
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &PeriodNamesPass, "%1");
        run_pass(&mut fragments, &DateValuesPass::plain(), "in %2 %1");

        let props: Vec<&str> = fragments.iter().map(|f| f.term.property()).collect();
        assert_eq!(props, vec!["_k_date_year_absolute", "_k_date_month_absolute"]);
    }

    #[test]
    fn test_pm_hours() {
        let mut fragments = words(&["at", "5", "pm"]);
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &DateValuesPass::pm(), "at %5 pm");

        assert_eq!(fragments.len(), 1);
        match &fragments[0].term {
            Term::Literal { property, value, .. } => {
                assert_eq!(property, "_k_date_hour_absolute");
                assert_eq!(value, &Value::Integer(17));
            }
            other => panic!("expected hour component, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut fragments = words(&["99", "-", "13", "-", "45"]);
        run_pass(&mut fragments, &NumbersPass, "%1");
        run_pass(&mut fragments, &DateValuesPass::plain(), "%1 - %2 - %3");
        assert_eq!(fragments.len(), 5);
    }
}
