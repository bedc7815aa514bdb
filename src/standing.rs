use crate::attendance;
use crate::grades;
use crate::models::{
    AttendanceEntry, CalculationType, EvaluationRule, GradeEntry, Standing, StandingStatus,
};

/// Classify a computed average and attendance rate against a rule.
///
/// The recovery band is rule configuration (`recovery_min_grade`), never a
/// hardcoded threshold: a student under the approval grade but inside the
/// band, with approved attendance, lands in Recuperação when the rule allows
/// it. Descriptive evaluation and a missing average short-circuit to
/// non-numeric statuses.
pub fn classify(average: Option<f64>, attendance_rate: f64, rule: &EvaluationRule) -> Standing {
    if rule.calculation_type == CalculationType::Descritiva {
        return Standing {
            approved: false,
            grade_approved: false,
            attendance_approved: attendance_rate >= rule.min_attendance_percent,
            average: None,
            attendance_rate,
            status: StandingStatus::Descritiva,
            message: "Avaliação descritiva: sem classificação numérica".to_string(),
        };
    }

    let average = match average {
        Some(value) => value,
        None => {
            return Standing {
                approved: false,
                grade_approved: false,
                attendance_approved: attendance_rate >= rule.min_attendance_percent,
                average: None,
                attendance_rate,
                status: StandingStatus::Pendente,
                message: "Pendente: nenhuma nota lançada".to_string(),
            };
        }
    };

    let grade_approved = average >= rule.min_approval_grade;
    let attendance_approved = attendance_rate >= rule.min_attendance_percent;
    let approved = grade_approved && attendance_approved;

    let (status, message) = if approved {
        (StandingStatus::Aprovado, "Aprovado".to_string())
    } else if in_recovery_band(average, attendance_approved, rule) {
        (
            StandingStatus::Recuperacao,
            format!(
                "Recuperação por nota ({:.2} < {:.2})",
                average, rule.min_approval_grade
            ),
        )
    } else {
        (
            StandingStatus::Reprovado,
            failure_message(
                average,
                grade_approved,
                attendance_rate,
                attendance_approved,
                rule,
            ),
        )
    };

    Standing {
        approved,
        grade_approved,
        attendance_approved,
        average: Some(average),
        attendance_rate,
        status,
        message,
    }
}

fn in_recovery_band(average: f64, attendance_approved: bool, rule: &EvaluationRule) -> bool {
    if !rule.allow_recovery || !attendance_approved {
        return false;
    }
    match rule.recovery_min_grade {
        Some(floor) => average >= floor && average < rule.min_approval_grade,
        None => false,
    }
}

fn failure_message(
    average: f64,
    grade_approved: bool,
    attendance_rate: f64,
    attendance_approved: bool,
    rule: &EvaluationRule,
) -> String {
    match (grade_approved, attendance_approved) {
        (false, false) => format!(
            "Reprovado por nota ({:.2} < {:.2}) e frequência ({:.2}% < {:.2}%)",
            average, rule.min_approval_grade, attendance_rate, rule.min_attendance_percent
        ),
        (false, true) => format!(
            "Reprovado por nota ({:.2} < {:.2})",
            average, rule.min_approval_grade
        ),
        (true, false) => format!(
            "Reprovado por frequência ({:.2}% < {:.2}%)",
            attendance_rate, rule.min_attendance_percent
        ),
        (true, true) => "Aprovado".to_string(),
    }
}

/// Full end-of-period evaluation: aggregate grades and attendance, then
/// classify. Pure over its inputs; safe to fan out per student.
pub fn evaluate(
    rule: &EvaluationRule,
    grade_entries: &[GradeEntry],
    attendance_entries: &[AttendanceEntry],
) -> Standing {
    let average = grades::overall_average(rule, grade_entries);
    let summary = attendance::rate(attendance_entries);
    classify(average, summary.rate, rule)
}
