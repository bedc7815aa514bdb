use crate::grades::round2;
use crate::models::{AttendanceEntry, AttendanceSummary};

/// Presence rate over an attendance window.
///
/// A student with zero scheduled lessons is reported with `total_classes = 0`
/// and rate 0, never hidden: "no data" and "perfect attendance" are distinct
/// results.
pub fn rate(entries: &[AttendanceEntry]) -> AttendanceSummary {
    let total_classes = entries.len();
    let valid_presences = entries
        .iter()
        .filter(|e| e.status.is_valid_presence())
        .count();

    let rate = if total_classes == 0 {
        0.0
    } else {
        round2(valid_presences as f64 / total_classes as f64 * 100.0)
    };

    AttendanceSummary {
        total_classes,
        valid_presences,
        rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::NaiveDate;

    fn entry(day: u32, status: AttendanceStatus) -> AttendanceEntry {
        AttendanceEntry {
            occurred_on: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            status,
        }
    }

    #[test]
    fn justified_absence_and_atestado_count_as_presence() {
        let entries = vec![
            entry(2, AttendanceStatus::Presente),
            entry(3, AttendanceStatus::FaltaJustificada),
            entry(4, AttendanceStatus::Atestado),
            entry(5, AttendanceStatus::FaltaInjustificada),
        ];
        let summary = rate(&entries);
        assert_eq!(summary.total_classes, 4);
        assert_eq!(summary.valid_presences, 3);
        assert_eq!(summary.rate, 75.0);
    }

    #[test]
    fn empty_window_reports_zero_classes() {
        let summary = rate(&[]);
        assert_eq!(summary.total_classes, 0);
        assert_eq!(summary.valid_presences, 0);
        assert_eq!(summary.rate, 0.0);
    }

    #[test]
    fn rate_stays_within_percentage_bounds() {
        let all_absent = vec![
            entry(2, AttendanceStatus::FaltaInjustificada),
            entry(3, AttendanceStatus::FaltaInjustificada),
        ];
        assert_eq!(rate(&all_absent).rate, 0.0);

        let all_present = vec![
            entry(2, AttendanceStatus::Presente),
            entry(3, AttendanceStatus::Presente),
        ];
        assert_eq!(rate(&all_present).rate, 100.0);
    }

    #[test]
    fn rate_rounds_to_two_decimals() {
        let mut entries = vec![entry(2, AttendanceStatus::FaltaInjustificada)];
        for day in 3..=9 {
            entries.push(entry(day, AttendanceStatus::Presente));
        }
        // 7 of 8 -> 87.5
        assert_eq!(rate(&entries).rate, 87.5);

        entries.push(entry(10, AttendanceStatus::Presente));
        // 8 of 9 -> 88.888... -> 88.89
        assert_eq!(rate(&entries).rate, 88.89);
    }
}
