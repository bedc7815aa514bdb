use uuid::Uuid;

use crate::models::{Course, EducationLevel, EvaluationRule};

/// Canonical name of the level-wide default rule. Schools override these per
/// course or per grade without touching the level defaults.
pub fn default_rule_name(level: EducationLevel) -> &'static str {
    match level {
        EducationLevel::EducacaoInfantil => "Padrão Educação Infantil",
        EducationLevel::EnsinoFundamental1 => "Padrão Ensino Fundamental I",
        EducationLevel::EnsinoFundamental2 => "Padrão Ensino Fundamental II",
        EducationLevel::EnsinoMedio => "Padrão Ensino Médio",
        EducationLevel::Eja => "Padrão EJA",
    }
}

/// Resolve the single applicable rule for a course/grade pair.
///
/// Narrowest scope wins, first match ends the chain, no merging:
/// grade-scoped rule, then the course-wide default, then the level default
/// looked up by name. Soft-deleted rules never match. None means the caller
/// must handle "no applicable rule" explicitly.
pub fn resolve<'a>(
    rules: &'a [EvaluationRule],
    course: &Course,
    grade_id: Option<Uuid>,
) -> Option<&'a EvaluationRule> {
    if let Some(grade_id) = grade_id {
        let grade_rule = rules
            .iter()
            .find(|r| r.is_active() && r.education_grade_id == Some(grade_id));
        if grade_rule.is_some() {
            return grade_rule;
        }
    }

    let course_rule = rules.iter().find(|r| {
        r.is_active() && r.course_id == Some(course.id) && r.education_grade_id.is_none()
    });
    if course_rule.is_some() {
        return course_rule;
    }

    let fallback_name = default_rule_name(course.education_level);
    rules
        .iter()
        .find(|r| r.is_active() && r.name == fallback_name)
}
