use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::models::{CalculationType, EvaluationRule, GradeEntry, SubjectAverage};

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Entries with a period index outside the academic year are dropped and
/// logged, never propagated as a failure.
fn graded_in_range(rule: &EvaluationRule, entries: &[GradeEntry]) -> Vec<(usize, f64)> {
    let mut graded = Vec::new();
    for entry in entries {
        if entry.period_index >= rule.periods_per_year {
            warn!(
                subject_id = %entry.subject_id,
                period_index = entry.period_index,
                periods_per_year = rule.periods_per_year,
                "dropping grade entry outside the academic year"
            );
            continue;
        }
        if let Some(value) = entry.value {
            graded.push((entry.period_index as usize, value));
        }
    }
    graded
}

/// Average for one subject's entries under the rule's calculation type.
///
/// Ungraded periods are skipped, never zero-filled; a subject with no graded
/// entries has no average at all. Results carry 2 decimals, round-half-up.
pub fn subject_average(rule: &EvaluationRule, entries: &[GradeEntry]) -> Option<f64> {
    let graded = graded_in_range(rule, entries);
    if graded.is_empty() {
        return None;
    }

    match rule.calculation_type {
        CalculationType::Descritiva => None,
        CalculationType::MediaSimples => {
            let sum: f64 = graded.iter().map(|(_, v)| v).sum();
            Some(round2(sum / graded.len() as f64))
        }
        CalculationType::SomaNotas => {
            let sum: f64 = graded.iter().map(|(_, v)| v).sum();
            Some(round2(sum))
        }
        CalculationType::MediaPonderada => weighted_average(rule, &graded),
    }
}

/// Σ value×weight over the graded periods. The configured divisor is
/// authoritative when positive; the sum of used weights is the fallback for
/// a zero or absent divisor. A weight vector that does not cover a graded
/// period contributes weight 0 for it.
fn weighted_average(rule: &EvaluationRule, graded: &[(usize, f64)]) -> Option<f64> {
    let config = rule.period_weights.as_ref();

    let mut weighted_sum = 0.0;
    let mut used_weight = 0.0;
    for &(index, value) in graded {
        let weight = config
            .and_then(|c| c.weights.get(index).copied())
            .unwrap_or(0.0);
        weighted_sum += value * weight;
        used_weight += weight;
    }

    let divisor = config.map(|c| c.divisor).unwrap_or(0.0);
    let denominator = if divisor > 0.0 { divisor } else { used_weight };
    if denominator <= 0.0 {
        return None;
    }
    Some(round2(weighted_sum / denominator))
}

/// Per-subject averages for a full entry set, ordered by subject id.
pub fn subject_averages(rule: &EvaluationRule, entries: &[GradeEntry]) -> Vec<SubjectAverage> {
    let mut by_subject: HashMap<Uuid, Vec<GradeEntry>> = HashMap::new();
    for entry in entries {
        by_subject
            .entry(entry.subject_id)
            .or_default()
            .push(entry.clone());
    }

    let mut averages: Vec<SubjectAverage> = by_subject
        .into_iter()
        .map(|(subject_id, subject_entries)| SubjectAverage {
            subject_id,
            average: subject_average(rule, &subject_entries),
            graded_count: subject_entries.iter().filter(|e| e.value.is_some()).count(),
        })
        .collect();

    averages.sort_by_key(|a| a.subject_id);
    averages
}

/// Mean of the per-subject averages, never a flat mean of every grade: a
/// subject with more evaluations must not dominate the result. Subjects with
/// no graded entries are excluded; an entry set with no graded subject at
/// all has no overall average.
pub fn overall_average(rule: &EvaluationRule, entries: &[GradeEntry]) -> Option<f64> {
    let subject_means: Vec<f64> = subject_averages(rule, entries)
        .iter()
        .filter_map(|s| s.average)
        .collect();

    if subject_means.is_empty() {
        return None;
    }
    let sum: f64 = subject_means.iter().sum();
    Some(round2(sum / subject_means.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AcademicPeriodType, PeriodWeights};

    fn simple_rule() -> EvaluationRule {
        EvaluationRule {
            id: Uuid::new_v4(),
            name: "Padrão Ensino Fundamental II".to_string(),
            course_id: None,
            education_grade_id: None,
            min_approval_grade: 7.0,
            min_attendance_percent: 75.0,
            recovery_min_grade: None,
            academic_period_type: AcademicPeriodType::Bimestre,
            periods_per_year: 4,
            calculation_type: CalculationType::MediaSimples,
            period_weights: None,
            allow_recovery: false,
            recovery_replaces_lowest: false,
            deleted_at: None,
        }
    }

    fn weighted_rule(weights: Vec<f64>, divisor: f64) -> EvaluationRule {
        let mut rule = simple_rule();
        rule.calculation_type = CalculationType::MediaPonderada;
        rule.period_weights = Some(PeriodWeights { weights, divisor });
        rule
    }

    fn entry(subject_id: Uuid, period_index: u32, value: Option<f64>) -> GradeEntry {
        GradeEntry {
            subject_id,
            period_index,
            value,
        }
    }

    #[test]
    fn simple_mean_ignores_ungraded_periods() {
        let rule = simple_rule();
        let subject = Uuid::new_v4();
        let entries = vec![
            entry(subject, 0, Some(8.0)),
            entry(subject, 1, None),
            entry(subject, 2, Some(6.0)),
        ];
        assert_eq!(subject_average(&rule, &entries), Some(7.0));
    }

    #[test]
    fn overall_is_mean_of_subject_means_not_flat_mean() {
        // Two subjects with {10,10} and {0}: a flat mean would say 6.67.
        let rule = simple_rule();
        let strong = Uuid::new_v4();
        let weak = Uuid::new_v4();
        let entries = vec![
            entry(strong, 0, Some(10.0)),
            entry(strong, 1, Some(10.0)),
            entry(weak, 0, Some(0.0)),
        ];
        assert_eq!(overall_average(&rule, &entries), Some(5.0));
    }

    #[test]
    fn ungraded_subject_is_null_and_excluded_from_overall() {
        let rule = simple_rule();
        let graded = Uuid::new_v4();
        let ungraded = Uuid::new_v4();
        let entries = vec![
            entry(graded, 0, Some(9.0)),
            entry(ungraded, 0, None),
            entry(ungraded, 1, None),
        ];

        let averages = subject_averages(&rule, &entries);
        let ungraded_avg = averages.iter().find(|a| a.subject_id == ungraded).unwrap();
        assert_eq!(ungraded_avg.average, None);
        assert_eq!(overall_average(&rule, &entries), Some(9.0));
    }

    #[test]
    fn all_null_entries_propagate_null_not_zero() {
        let rule = simple_rule();
        let subject = Uuid::new_v4();
        let entries = vec![entry(subject, 0, None), entry(subject, 1, None)];
        assert_eq!(subject_average(&rule, &entries), None);
        assert_eq!(overall_average(&rule, &entries), None);
    }

    #[test]
    fn empty_entry_set_is_null() {
        let rule = simple_rule();
        assert_eq!(subject_average(&rule, &[]), None);
        assert_eq!(overall_average(&rule, &[]), None);
    }

    #[test]
    fn weighted_average_with_authoritative_divisor() {
        // weights [2,3,2,3], divisor 10, grades [8, null, 7, 9]:
        // (8*2 + 7*2 + 9*3) / 10 = 57 / 10 = 5.70
        let rule = weighted_rule(vec![2.0, 3.0, 2.0, 3.0], 10.0);
        let subject = Uuid::new_v4();
        let entries = vec![
            entry(subject, 0, Some(8.0)),
            entry(subject, 1, None),
            entry(subject, 2, Some(7.0)),
            entry(subject, 3, Some(9.0)),
        ];
        assert_eq!(subject_average(&rule, &entries), Some(5.7));
    }

    #[test]
    fn weighted_average_falls_back_to_used_weights_on_zero_divisor() {
        let rule = weighted_rule(vec![2.0, 3.0, 2.0, 3.0], 0.0);
        let subject = Uuid::new_v4();
        let entries = vec![
            entry(subject, 0, Some(8.0)),
            entry(subject, 2, Some(7.0)),
            entry(subject, 3, Some(9.0)),
        ];
        // 57 / (2 + 2 + 3) = 8.142857... -> 8.14
        assert_eq!(subject_average(&rule, &entries), Some(8.14));
    }

    #[test]
    fn fully_graded_weighted_year_matches_weighted_sum() {
        let rule = weighted_rule(vec![2.0, 3.0, 2.0, 3.0], 10.0);
        let subject = Uuid::new_v4();
        let values = [6.5, 7.0, 8.0, 5.5];
        let entries: Vec<GradeEntry> = values
            .iter()
            .enumerate()
            .map(|(i, v)| entry(subject, i as u32, Some(*v)))
            .collect();

        let average = subject_average(&rule, &entries).unwrap();
        let weighted_sum: f64 = 6.5 * 2.0 + 7.0 * 3.0 + 8.0 * 2.0 + 5.5 * 3.0;
        assert!((average * 10.0 - weighted_sum).abs() < 0.01);
    }

    #[test]
    fn short_weight_vector_treats_uncovered_periods_as_zero() {
        // Only two weights configured for a four-period year: periods 2 and 3
        // contribute nothing, neither value nor weight.
        let rule = weighted_rule(vec![2.0, 3.0], 0.0);
        let subject = Uuid::new_v4();
        let entries = vec![
            entry(subject, 0, Some(8.0)),
            entry(subject, 1, Some(6.0)),
            entry(subject, 3, Some(10.0)),
        ];
        // (8*2 + 6*3) / (2 + 3) = 34 / 5 = 6.80
        assert_eq!(subject_average(&rule, &entries), Some(6.8));
    }

    #[test]
    fn missing_weight_config_with_zero_divisor_is_null() {
        let mut rule = simple_rule();
        rule.calculation_type = CalculationType::MediaPonderada;
        rule.period_weights = None;
        let subject = Uuid::new_v4();
        let entries = vec![entry(subject, 0, Some(8.0))];
        assert_eq!(subject_average(&rule, &entries), None);
    }

    #[test]
    fn soma_notas_sums_instead_of_averaging() {
        let mut rule = simple_rule();
        rule.calculation_type = CalculationType::SomaNotas;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let entries = vec![
            entry(first, 0, Some(2.5)),
            entry(first, 1, Some(3.0)),
            entry(second, 0, Some(8.0)),
        ];
        // Subject sums 5.5 and 8.0, overall mean of sums 6.75.
        assert_eq!(overall_average(&rule, &entries), Some(6.75));
    }

    #[test]
    fn descritiva_never_produces_a_number() {
        let mut rule = simple_rule();
        rule.calculation_type = CalculationType::Descritiva;
        let subject = Uuid::new_v4();
        let entries = vec![entry(subject, 0, Some(9.0))];
        assert_eq!(subject_average(&rule, &entries), None);
        assert_eq!(overall_average(&rule, &entries), None);
    }

    #[test]
    fn out_of_range_period_index_is_dropped() {
        let rule = simple_rule();
        let subject = Uuid::new_v4();
        let entries = vec![
            entry(subject, 0, Some(8.0)),
            entry(subject, 7, Some(0.0)),
        ];
        assert_eq!(subject_average(&rule, &entries), Some(8.0));
    }

    #[test]
    fn results_round_half_up_on_third_decimal() {
        let rule = simple_rule();
        let subject = Uuid::new_v4();
        // (7.25 + 7.0) / 2 = 7.125 -> 7.13
        let entries = vec![
            entry(subject, 0, Some(7.25)),
            entry(subject, 1, Some(7.0)),
        ];
        assert_eq!(subject_average(&rule, &entries), Some(7.13));
    }
}
