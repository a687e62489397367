use chrono::{Datelike, NaiveDate};

pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Completed years between `birth` and `today`; `None` for a birth date in the future.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn birthday_counts_on_the_day_itself() {
        let birth = date(2007, 6, 15);
        assert_eq!(age_on(birth, date(2025, 6, 14)), Some(17));
        assert_eq!(age_on(birth, date(2025, 6, 15)), Some(18));
    }

    #[test]
    fn leap_day_birthdays_turn_over_on_the_first_of_march() {
        let birth = date(2004, 2, 29);
        assert_eq!(age_on(birth, date(2025, 2, 28)), Some(20));
        assert_eq!(age_on(birth, date(2025, 3, 1)), Some(21));
    }

    #[test]
    fn rejects_future_and_malformed_dates() {
        assert_eq!(age_on(date(2030, 1, 1), date(2025, 1, 1)), None);
        assert_eq!(parse_birth_date("15/06/2007"), None);
        assert_eq!(parse_birth_date("2007-06-15"), Some(date(2007, 6, 15)));
    }
}
