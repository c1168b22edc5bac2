//! Small calendar and templating helpers used across modules.
//!
//! All weekly logic in this backend anchors on the Monday of the ISO week;
//! every "week_start" in stores and wire formats is such a Monday.

use chrono::{Datelike, Duration, NaiveDate};

/// Monday of the ISO week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sunday closing the week that starts at `week_start`.
pub fn week_end_of(week_start: NaiveDate) -> NaiveDate {
  week_start + Duration::days(6)
}

/// Whole days left until the week ends, never negative.
pub fn days_remaining(week_start: NaiveDate, today: NaiveDate) -> i64 {
  (week_end_of(week_start) - today).num_days().max(0)
}

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Render a numeric target the way descriptions expect:
/// whole numbers for counts/minutes, one decimal for ratings.
pub fn fmt_target(target: f64) -> String {
  let rounded = target.round();
  if (target - rounded).abs() < 0.05 {
    format!("{}", rounded as i64)
  } else {
    format!("{:.1}", target)
  }
}
