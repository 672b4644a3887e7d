//! Folding adjacent date components into one date-time literal
//!
//! A run of `_k_date_*` fragments (with short filler words in between)
//! collapses into a single equality literal carrying the assembled
//! date-time and the finest period the user actually specified.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::models::{Comparator, DatePrecision, Term, Value};
use crate::nlq::dates::parse_date_property;
use crate::nlq::matcher::Fragment;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Flag {
    #[default]
    Unset,
    Absolute,
    Relative,
}

#[derive(Clone, Copy, Debug, Default)]
struct Field {
    value: i64,
    flag: Flag,
}

impl Field {
    fn set(&self) -> bool {
        self.flag != Flag::Unset
    }

    /// Resolve the field: absolute values win, relative fields start
    /// from "now", unset fields inherit "now" only inside the defined
    /// period and the null value outside it
    fn resolve(&self, in_defined_period: bool, now_value: i64, null_value: i64) -> i64 {
        match self.flag {
            Flag::Unset => {
                if in_defined_period {
                    now_value
                } else {
                    null_value
                }
            }
            Flag::Absolute => self.value,
            Flag::Relative => now_value,
        }
    }

    fn relative_or(&self, if_relative: i64) -> i64 {
        if self.flag == Flag::Relative {
            if_relative
        } else {
            0
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct DateTimeSpec {
    fields: [Field; 8],
}

impl DateTimeSpec {
    fn field(&self, period: DatePrecision) -> Field {
        self.fields[period as usize]
    }

    fn absorb(&mut self, term: &Term) -> bool {
        let Term::Literal {
            property,
            value: Value::Integer(value),
            ..
        } = term
        else {
            return false;
        };
        let Some((period, relative)) = parse_date_property(property) else {
            return false;
        };
        self.fields[period as usize] = Field {
            value: *value,
            flag: if relative { Flag::Relative } else { Flag::Absolute },
        };
        true
    }

    fn has_data(&self) -> bool {
        self.fields.iter().any(Field::set)
    }
}

/// Replace runs of date-component fragments with folded date-time
/// literals, absorbing 1- and 2-letter filler tokens inside a run
pub fn fold_date_times(fragments: &mut Vec<Fragment>, reference: NaiveDateTime) {
    let mut folded: Vec<Fragment> = Vec::with_capacity(fragments.len());
    let mut spec = DateTimeSpec::default();
    let mut run_start = usize::MAX;
    let mut run_end = 0usize;
    let mut in_run = false;

    for fragment in fragments.drain(..) {
        if spec.absorb(&fragment.term) {
            in_run = true;
            run_start = run_start.min(fragment.start);
            run_end = run_end.max(fragment.end);
            continue;
        }

        if in_run {
            // Short filler like "a" or "on" between date components
            if let Some(word) = fragment.as_word() {
                let len = word.chars().count();
                if len == 2 || (len == 1 && word.chars().all(char::is_alphanumeric)) {
                    continue;
                }
            }
            folded.push(Fragment::new(
                build_literal(&spec, reference),
                run_start,
                run_end,
            ));
            spec = DateTimeSpec::default();
            in_run = false;
            run_start = usize::MAX;
            run_end = 0;
        }
        folded.push(fragment);
    }

    if in_run && spec.has_data() {
        folded.push(Fragment::new(
            build_literal(&spec, reference),
            run_start,
            run_end,
        ));
    }

    *fragments = folded;
}

fn build_literal(spec: &DateTimeSpec, reference: NaiveDateTime) -> Term {
    let now_date = reference.date();
    let now_time = reference.time();

    let year = spec.field(DatePrecision::Year);
    let month = spec.field(DatePrecision::Month);
    let week = spec.field(DatePrecision::Week);
    let dayofweek = spec.field(DatePrecision::DayOfWeek);
    let day = spec.field(DatePrecision::Day);
    let hour = spec.field(DatePrecision::Hour);
    let minute = spec.field(DatePrecision::Minute);
    let second = spec.field(DatePrecision::Second);

    // Finest specified date and time periods
    let last_date = if day.set() {
        DatePrecision::Day
    } else if dayofweek.set() {
        DatePrecision::DayOfWeek
    } else if week.set() {
        DatePrecision::Week
    } else if month.set() {
        DatePrecision::Month
    } else if year.set() {
        DatePrecision::Year
    } else {
        // No date at all: the current day
        DatePrecision::Day
    };
    let last_time = if second.set() {
        Some(DatePrecision::Second)
    } else if minute.set() {
        Some(DatePrecision::Minute)
    } else if hour.set() {
        Some(DatePrecision::Hour)
    } else {
        None
    };

    // Absolute year, month, day of month
    let mut date = clamped_ymd(
        year.resolve(last_date >= DatePrecision::Year, now_date.year() as i64, 1),
        month.resolve(last_date >= DatePrecision::Month, now_date.month() as i64, 1),
        day.resolve(last_date >= DatePrecision::Day, now_date.day() as i64, 1),
    );

    // Weeks shift whole days from the anchor
    if week.flag == Flag::Absolute {
        date = add_days(date, (week.value - 1) * 7);
    } else if week.flag == Flag::Relative {
        date = add_days(date, week.value * 7);
    }

    // Day of week adjusts within the anchored week
    if week.set() || dayofweek.set() {
        let current = date.weekday().number_from_monday() as i64;
        let target = dayofweek.resolve(
            last_date >= DatePrecision::DayOfWeek,
            now_date.weekday().number_from_monday() as i64,
            1,
        );
        date = add_days(date, target - current);
    }

    // Relative year, month, day offsets
    if year.flag == Flag::Relative {
        date = add_months(date, year.value * 12);
    }
    if month.flag == Flag::Relative {
        date = add_months(date, month.value);
    }
    if day.flag == Flag::Relative {
        date = add_days(date, day.value);
    }

    // Absolute time
    let in_time = |period| last_time.map(|t| t >= period).unwrap_or(false);
    let time = NaiveTime::from_hms_opt(
        hour.resolve(in_time(DatePrecision::Hour), now_time.hour() as i64, 0) as u32,
        minute.resolve(in_time(DatePrecision::Minute), now_time.minute() as i64, 0) as u32,
        second.resolve(in_time(DatePrecision::Second), now_time.second() as i64, 0) as u32,
    )
    .unwrap_or(NaiveTime::MIN);

    // Relative time offsets
    let mut stamp = NaiveDateTime::new(date, time);
    stamp += chrono::Duration::seconds(
        hour.relative_or(hour.value * 3600)
            + minute.relative_or(minute.value * 60)
            + second.relative_or(second.value),
    );

    let precision = last_time.map_or(last_date, |t| t.max(last_date));

    Term::Literal {
        property: String::new(),
        value: Value::DateTime { stamp, precision },
        comparator: Comparator::Equal,
    }
}

fn clamped_ymd(year: i64, month: i64, day: i64) -> NaiveDate {
    let year = year.clamp(1, 9999) as i32;
    let month = month.clamp(1, 12) as u32;
    let mut day = day.clamp(1, 31) as u32;
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date;
        }
        day -= 1;
    }
}

fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64)).unwrap_or(date)
    } else {
        date.checked_sub_days(Days::new((-days) as u64)).unwrap_or(date)
    }
}

fn add_months(date: NaiveDate, months: i64) -> NaiveDate {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
            .unwrap_or(date)
    } else {
        date.checked_sub_months(Months::new((-months) as u32))
            .unwrap_or(date)
    }
}
