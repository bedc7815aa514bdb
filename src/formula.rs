use crate::models::{AcademicPeriodType, CalculationType, EvaluationRule};

/// Display names for each evaluation, keyed by cadence. Used when the caller
/// does not supply its own period names.
pub fn default_period_names(period_type: AcademicPeriodType) -> &'static [&'static str] {
    match period_type {
        AcademicPeriodType::Bimestre => &["1ª Av.", "2ª Av.", "3ª Av.", "4ª Av."],
        AcademicPeriodType::Trimestre => &["1ª Av.", "2ª Av.", "3ª Av."],
        AcademicPeriodType::Semestre => &["1ª Av.", "2ª Av."],
    }
}

fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Render a rule's aggregation configuration as a display formula, e.g.
/// `Média Ponderada: (1ª Av. × 2) + (2ª Av. × 3) / 5`. Display and audit
/// only; never feeds back into classification.
pub fn explain(rule: &EvaluationRule, period_names: Option<&[String]>) -> String {
    let defaults = default_period_names(rule.academic_period_type);
    let name_for = |index: usize| -> String {
        if let Some(names) = period_names {
            if let Some(name) = names.get(index) {
                return name.clone();
            }
        }
        defaults
            .get(index)
            .map(|n| n.to_string())
            .unwrap_or_else(|| format!("{}ª Av.", index + 1))
    };

    let periods = rule.periods_per_year as usize;

    match rule.calculation_type {
        CalculationType::MediaSimples => {
            let terms: Vec<String> = (0..periods).map(&name_for).collect();
            format!("Média Simples: ({}) / {}", terms.join(" + "), periods)
        }
        CalculationType::SomaNotas => {
            let terms: Vec<String> = (0..periods).map(&name_for).collect();
            format!("Soma das Notas: {}", terms.join(" + "))
        }
        CalculationType::Descritiva => {
            "Avaliação Descritiva: parecer do professor, sem fórmula numérica".to_string()
        }
        CalculationType::MediaPonderada => match &rule.period_weights {
            None => "Média Ponderada: configuração de pesos ausente".to_string(),
            Some(config) => {
                let terms: Vec<String> = (0..periods)
                    .map(|i| {
                        let weight = config.weights.get(i).copied().unwrap_or(0.0);
                        format!("({} × {})", name_for(i), fmt_number(weight))
                    })
                    .collect();
                let divisor = if config.divisor > 0.0 {
                    config.divisor
                } else {
                    config.weights.iter().sum()
                };
                format!(
                    "Média Ponderada: {} / {}",
                    terms.join(" + "),
                    fmt_number(divisor)
                )
            }
        },
    }
}
