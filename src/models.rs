use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    EducacaoInfantil,
    #[serde(rename = "ensino_fundamental_1")]
    EnsinoFundamental1,
    #[serde(rename = "ensino_fundamental_2")]
    EnsinoFundamental2,
    EnsinoMedio,
    Eja,
}

impl EducationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EducationLevel::EducacaoInfantil => "educacao_infantil",
            EducationLevel::EnsinoFundamental1 => "ensino_fundamental_1",
            EducationLevel::EnsinoFundamental2 => "ensino_fundamental_2",
            EducationLevel::EnsinoMedio => "ensino_medio",
            EducationLevel::Eja => "eja",
        }
    }
}

impl FromStr for EducationLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "educacao_infantil" => Ok(EducationLevel::EducacaoInfantil),
            "ensino_fundamental_1" => Ok(EducationLevel::EnsinoFundamental1),
            "ensino_fundamental_2" => Ok(EducationLevel::EnsinoFundamental2),
            "ensino_medio" => Ok(EducationLevel::EnsinoMedio),
            "eja" => Ok(EducationLevel::Eja),
            other => Err(EngineError::UnknownEducationLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicPeriodType {
    Bimestre,
    Trimestre,
    Semestre,
}

impl AcademicPeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicPeriodType::Bimestre => "bimestre",
            AcademicPeriodType::Trimestre => "trimestre",
            AcademicPeriodType::Semestre => "semestre",
        }
    }
}

impl FromStr for AcademicPeriodType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bimestre" => Ok(AcademicPeriodType::Bimestre),
            "trimestre" => Ok(AcademicPeriodType::Trimestre),
            "semestre" => Ok(AcademicPeriodType::Semestre),
            other => Err(EngineError::UnknownPeriodType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    MediaSimples,
    MediaPonderada,
    SomaNotas,
    Descritiva,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::MediaSimples => "media_simples",
            CalculationType::MediaPonderada => "media_ponderada",
            CalculationType::SomaNotas => "soma_notas",
            CalculationType::Descritiva => "descritiva",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CalculationType::MediaSimples => "Média Simples",
            CalculationType::MediaPonderada => "Média Ponderada",
            CalculationType::SomaNotas => "Soma das Notas",
            CalculationType::Descritiva => "Avaliação Descritiva",
        }
    }
}

impl FromStr for CalculationType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "media_simples" => Ok(CalculationType::MediaSimples),
            "media_ponderada" => Ok(CalculationType::MediaPonderada),
            "soma_notas" => Ok(CalculationType::SomaNotas),
            "descritiva" => Ok(CalculationType::Descritiva),
            other => Err(EngineError::UnknownCalculationType(other.to_string())),
        }
    }
}

/// Weight vector for Média Ponderada, ordered by period index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodWeights {
    pub weights: Vec<f64>,
    pub divisor: f64,
}

#[derive(Debug, Clone)]
pub struct EvaluationRule {
    pub id: Uuid,
    pub name: String,
    pub course_id: Option<Uuid>,
    pub education_grade_id: Option<Uuid>,
    pub min_approval_grade: f64,
    pub min_attendance_percent: f64,
    pub recovery_min_grade: Option<f64>,
    pub academic_period_type: AcademicPeriodType,
    pub periods_per_year: u32,
    pub calculation_type: CalculationType,
    pub period_weights: Option<PeriodWeights>,
    pub allow_recovery: bool,
    pub recovery_replaces_lowest: bool,
    pub deleted_at: Option<NaiveDate>,
}

impl EvaluationRule {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub education_level: EducationLevel,
}

#[derive(Debug, Clone)]
pub struct Student {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub course_id: Uuid,
    pub education_grade_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
}

/// One graded evaluation for one subject in one period. `value` is None for
/// a period that has not been graded yet.
#[derive(Debug, Clone)]
pub struct GradeEntry {
    pub subject_id: Uuid,
    pub period_index: u32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Presente,
    FaltaJustificada,
    FaltaInjustificada,
    Atestado,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Presente => "presente",
            AttendanceStatus::FaltaJustificada => "falta_justificada",
            AttendanceStatus::FaltaInjustificada => "falta_injustificada",
            AttendanceStatus::Atestado => "atestado",
        }
    }

    /// Atestado counts toward the presence rate, same as a justified absence.
    pub fn is_valid_presence(&self) -> bool {
        !matches!(self, AttendanceStatus::FaltaInjustificada)
    }
}

impl FromStr for AttendanceStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "presente" => Ok(AttendanceStatus::Presente),
            "falta_justificada" => Ok(AttendanceStatus::FaltaJustificada),
            "falta_injustificada" => Ok(AttendanceStatus::FaltaInjustificada),
            "atestado" => Ok(AttendanceStatus::Atestado),
            _ => Err(EngineError::UnknownAttendanceStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceEntry {
    pub occurred_on: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StandingStatus {
    Aprovado,
    #[serde(rename = "Recuperação")]
    Recuperacao,
    Reprovado,
    Pendente,
    Descritiva,
}

impl StandingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StandingStatus::Aprovado => "Aprovado",
            StandingStatus::Recuperacao => "Recuperação",
            StandingStatus::Reprovado => "Reprovado",
            StandingStatus::Pendente => "Pendente",
            StandingStatus::Descritiva => "Descritiva",
        }
    }
}

/// Computed classification for one student in one evaluation window.
/// Produced fresh on every evaluation and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Standing {
    pub approved: bool,
    pub grade_approved: bool,
    pub attendance_approved: bool,
    pub average: Option<f64>,
    pub attendance_rate: f64,
    pub status: StandingStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AttendanceSummary {
    pub total_classes: usize,
    pub valid_presences: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubjectAverage {
    pub subject_id: Uuid,
    pub average: Option<f64>,
    pub graded_count: usize,
}

#[derive(Debug, Clone)]
pub struct StudentStanding {
    pub student: Student,
    pub rule_name: String,
    pub standing: Standing,
}

#[derive(Debug, Clone)]
pub struct StatusSummary {
    pub status: StandingStatus,
    pub count: usize,
}
