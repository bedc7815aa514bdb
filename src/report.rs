use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{StandingStatus, StatusSummary, Student, StudentStanding};

pub fn summarize_by_status(standings: &[StudentStanding]) -> Vec<StatusSummary> {
    let mut map: HashMap<StandingStatus, usize> = HashMap::new();
    for entry in standings {
        *map.entry(entry.standing.status).or_insert(0) += 1;
    }

    let mut summaries: Vec<StatusSummary> = map
        .into_iter()
        .map(|(status, count)| StatusSummary { status, count })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

fn format_average(average: Option<f64>) -> String {
    match average {
        Some(value) => format!("{:.2}", value),
        None => "sem nota".to_string(),
    }
}

pub fn build_report(
    scope: Option<&str>,
    standings: &[StudentStanding],
    missing_rule: &[Student],
    formulas: &[(String, String)],
) -> String {
    let summaries = summarize_by_status(standings);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("todas as turmas");

    let _ = writeln!(output, "# Fechamento de Período");
    let _ = writeln!(output, "Gerado para {}", scope_label);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Resumo por Situação");

    if summaries.is_empty() {
        let _ = writeln!(output, "Nenhum aluno avaliado neste escopo.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "- {}: {}", summary.status.label(), summary.count);
        }
    }

    let mut ordered = standings.to_vec();
    ordered.sort_by(|a, b| {
        b.standing
            .average
            .partial_cmp(&a.standing.average)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.student.full_name.cmp(&b.student.full_name))
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alunos");

    if ordered.is_empty() {
        let _ = writeln!(output, "Nenhum aluno avaliado neste escopo.");
    } else {
        for entry in ordered.iter() {
            let _ = writeln!(
                output,
                "- {} ({}): média {}, frequência {:.2}%: {}",
                entry.student.full_name,
                entry.student.email,
                format_average(entry.standing.average),
                entry.standing.attendance_rate,
                entry.standing.message
            );
        }
    }

    if !missing_rule.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Sem Regra Aplicável");
        for student in missing_rule.iter() {
            let _ = writeln!(output, "- {} ({})", student.full_name, student.email);
        }
    }

    if !formulas.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Fórmulas Aplicadas");
        for (rule_name, formula) in formulas.iter() {
            let _ = writeln!(output, "- {}: {}", rule_name, formula);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Standing;
    use uuid::Uuid;

    fn sample_student(name: &str, email: &str) -> Student {
        Student {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: email.to_string(),
            course_id: Uuid::new_v4(),
            education_grade_id: None,
        }
    }

    fn sample_standing(status: StandingStatus, average: Option<f64>) -> Standing {
        Standing {
            approved: status == StandingStatus::Aprovado,
            grade_approved: status == StandingStatus::Aprovado,
            attendance_approved: true,
            average,
            attendance_rate: 90.0,
            status,
            message: match status {
                StandingStatus::Aprovado => "Aprovado".to_string(),
                _ => "Reprovado por nota (5.00 < 7.00)".to_string(),
            },
        }
    }

    fn entry(name: &str, email: &str, status: StandingStatus, average: Option<f64>) -> StudentStanding {
        StudentStanding {
            student: sample_student(name, email),
            rule_name: "Padrão Ensino Fundamental II".to_string(),
            standing: sample_standing(status, average),
        }
    }

    #[test]
    fn summarize_counts_by_status() {
        let standings = vec![
            entry("Ana", "ana@escola.example", StandingStatus::Aprovado, Some(8.0)),
            entry("Bia", "bia@escola.example", StandingStatus::Aprovado, Some(7.5)),
            entry("Caio", "caio@escola.example", StandingStatus::Reprovado, Some(5.0)),
        ];
        let summaries = summarize_by_status(&standings);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].status, StandingStatus::Aprovado);
        assert_eq!(summaries[0].count, 2);
    }

    #[test]
    fn report_orders_students_by_average_descending() {
        let standings = vec![
            entry("Caio", "caio@escola.example", StandingStatus::Reprovado, Some(5.0)),
            entry("Ana", "ana@escola.example", StandingStatus::Aprovado, Some(8.0)),
        ];
        let report = build_report(Some("8º Ano A"), &standings, &[], &[]);

        let ana = report.find("Ana (").unwrap();
        let caio = report.find("Caio (").unwrap();
        assert!(ana < caio);
        assert!(report.contains("Gerado para 8º Ano A"));
        assert!(report.contains("média 8.00"));
    }

    #[test]
    fn report_surfaces_students_without_a_rule() {
        let missing = vec![sample_student("Duda", "duda@escola.example")];
        let report = build_report(None, &[], &missing, &[]);
        assert!(report.contains("## Sem Regra Aplicável"));
        assert!(report.contains("Duda (duda@escola.example)"));
        assert!(report.contains("Nenhum aluno avaliado neste escopo."));
    }

    #[test]
    fn report_lists_applied_formulas() {
        let standings = vec![entry(
            "Ana",
            "ana@escola.example",
            StandingStatus::Aprovado,
            Some(8.0),
        )];
        let formulas = vec![(
            "Padrão Ensino Fundamental II".to_string(),
            "Média Simples: (1ª Av. + 2ª Av. + 3ª Av. + 4ª Av.) / 4".to_string(),
        )];
        let report = build_report(None, &standings, &[], &formulas);
        assert!(report.contains("## Fórmulas Aplicadas"));
        assert!(report.contains("Média Simples"));
    }

    #[test]
    fn students_without_average_render_a_placeholder() {
        let standings = vec![entry(
            "Ana",
            "ana@escola.example",
            StandingStatus::Pendente,
            None,
        )];
        let report = build_report(None, &standings, &[], &[]);
        assert!(report.contains("média sem nota"));
    }
}
