use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use crate::error::EngineError;
use crate::models::StudentStanding;

mod attendance;
mod db;
mod error;
mod formula;
mod grades;
mod models;
mod report;
mod rules;
mod standing;

#[derive(Parser)]
#[command(name = "academic-standing")]
#[command(about = "End-of-period academic standing engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import grade entries from a CSV file
    ImportGrades {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import attendance entries from a CSV file
    ImportAttendance {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute one student's end-of-period standing
    Standing {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown closing report
    #[command(group(
        ArgGroup::new("scope")
            .args(["course", "email"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = "fechamento.md")]
        out: PathBuf,
    },
    /// Show the aggregation formula that applies to a student
    Formula {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("escola_academic_standing=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportGrades { csv } => {
            let inserted = db::import_grades_csv(&pool, &csv).await?;
            println!("Inserted {inserted} grade entries from {}.", csv.display());
        }
        Commands::ImportAttendance { csv } => {
            let inserted = db::import_attendance_csv(&pool, &csv).await?;
            println!(
                "Inserted {inserted} attendance entries from {}.",
                csv.display()
            );
        }
        Commands::Standing { email, json } => {
            let student = db::fetch_student_by_email(&pool, &email).await?;
            let course = db::fetch_course(&pool, student.course_id).await?;
            let all_rules = db::fetch_rules(&pool).await?;
            let rule = rules::resolve(&all_rules, &course, student.education_grade_id)
                .ok_or(EngineError::MissingRule {
                    course_id: course.id,
                })?;

            let grade_entries = db::fetch_grades(&pool, student.id).await?;
            let attendance_entries = db::fetch_attendance(&pool, student.id).await?;
            let result = standing::evaluate(rule, &grade_entries, &attendance_entries);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let subject_names: std::collections::HashMap<_, _> = db::fetch_subjects(&pool)
                    .await?
                    .into_iter()
                    .map(|s| (s.id, s.name))
                    .collect();

                println!("{} ({})", student.full_name, student.email);
                println!("Regra aplicada: {}", rule.name);
                for subject in grades::subject_averages(rule, &grade_entries) {
                    let name = subject_names
                        .get(&subject.subject_id)
                        .map(String::as_str)
                        .unwrap_or("disciplina desconhecida");
                    match subject.average {
                        Some(average) => println!("- {name}: {average:.2}"),
                        None => println!("- {name}: sem nota"),
                    }
                }
                match result.average {
                    Some(average) => println!("Média geral: {average:.2}"),
                    None => println!("Média geral: sem nota"),
                }
                println!("Frequência: {:.2}%", result.attendance_rate);
                println!("Situação: {}", result.message);
                println!("Fórmula: {}", formula::explain(rule, None));
            }
        }
        Commands::Report { course, email, out } => {
            let students =
                db::fetch_students(&pool, course.as_deref(), email.as_deref()).await?;
            let all_rules = db::fetch_rules(&pool).await?;

            let mut standings = Vec::new();
            let mut missing_rule = Vec::new();
            let mut formulas: Vec<(String, String)> = Vec::new();

            for student in students {
                let student_course = db::fetch_course(&pool, student.course_id).await?;
                match rules::resolve(&all_rules, &student_course, student.education_grade_id) {
                    None => missing_rule.push(student),
                    Some(rule) => {
                        let grade_entries = db::fetch_grades(&pool, student.id).await?;
                        let attendance_entries = db::fetch_attendance(&pool, student.id).await?;
                        let result = standing::evaluate(rule, &grade_entries, &attendance_entries);

                        if !formulas.iter().any(|(name, _)| name == &rule.name) {
                            formulas.push((rule.name.clone(), formula::explain(rule, None)));
                        }
                        standings.push(StudentStanding {
                            student,
                            rule_name: rule.name.clone(),
                            standing: result,
                        });
                    }
                }
            }

            let scope = course.as_deref().or(email.as_deref());
            let report = report::build_report(scope, &standings, &missing_rule, &formulas);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Formula { email } => {
            let student = db::fetch_student_by_email(&pool, &email).await?;
            let course = db::fetch_course(&pool, student.course_id).await?;
            let all_rules = db::fetch_rules(&pool).await?;
            let rule = rules::resolve(&all_rules, &course, student.education_grade_id)
                .ok_or(EngineError::MissingRule {
                    course_id: course.id,
                })?;

            println!("Regra aplicada: {}", rule.name);
            println!("{}", formula::explain(rule, None));
            println!(
                "Aprovação: média mínima {:.2}, frequência mínima {:.2}%",
                rule.min_approval_grade, rule.min_attendance_percent
            );
            if rule.allow_recovery {
                if let Some(floor) = rule.recovery_min_grade {
                    println!("Recuperação: média a partir de {floor:.2}");
                }
            }
        }
    }

    Ok(())
}
