use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AttendanceEntry, AttendanceStatus, Course, EvaluationRule, GradeEntry, Student, Subject,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let course_id = Uuid::parse_str("7f3a2c1e-5b7d-4f7e-9a34-2d8c1e6b5a90")?;
    sqlx::query(
        r#"
        INSERT INTO academic_standing.courses (id, name, education_level)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE
        SET education_level = EXCLUDED.education_level
        "#,
    )
    .bind(course_id)
    .bind("Ensino Fundamental II - Tarde")
    .bind("ensino_fundamental_2")
    .execute(pool)
    .await?;

    let grade_id = Uuid::parse_str("f0d9b7a4-1c2e-4b5f-8d67-3a9e0c4b2f11")?;
    sqlx::query(
        r#"
        INSERT INTO academic_standing.education_grades (id, course_id, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (course_id, name) DO NOTHING
        "#,
    )
    .bind(grade_id)
    .bind(course_id)
    .bind("8º Ano A")
    .execute(pool)
    .await?;

    let students = vec![
        (
            Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?,
            "Ana Beatriz Souza",
            "ana.souza@escola.example",
            Some(grade_id),
        ),
        (
            Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?,
            "Carlos Eduardo Lima",
            "carlos.lima@escola.example",
            Some(grade_id),
        ),
        (
            Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?,
            "Marina Alves",
            "marina.alves@escola.example",
            None,
        ),
    ];

    for (id, name, email, education_grade_id) in students {
        sqlx::query(
            r#"
            INSERT INTO academic_standing.students
            (id, full_name, email, course_id, education_grade_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                course_id = EXCLUDED.course_id,
                education_grade_id = EXCLUDED.education_grade_id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(course_id)
        .bind(education_grade_id)
        .execute(pool)
        .await?;
    }

    let subjects = vec![
        (
            Uuid::parse_str("11e3b7c9-6d2f-4a8b-9c01-5e7f3a2d4b61")?,
            "Matemática",
        ),
        (
            Uuid::parse_str("22f4c8da-7e30-4b9c-ad12-6f804b3e5c72")?,
            "Língua Portuguesa",
        ),
        (
            Uuid::parse_str("33a5d9eb-8f41-4cad-be23-70915c4f6d83")?,
            "Ciências",
        ),
    ];

    for (id, name) in subjects {
        sqlx::query(
            r#"
            INSERT INTO academic_standing.subjects (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let rules = vec![
        (
            Uuid::parse_str("44b6eafc-9052-4dbe-af34-81a26d507e94")?,
            "Padrão Ensino Fundamental II",
            None::<Uuid>,
            None::<Uuid>,
            "media_simples",
            None::<&str>,
        ),
        (
            Uuid::parse_str("55c7fb0d-a163-4ecf-b045-92b37e618fa5")?,
            "Média Ponderada 8º Ano A",
            None::<Uuid>,
            Some(grade_id),
            "media_ponderada",
            Some(r#"{"weights":[2.0,3.0,2.0,3.0],"divisor":10.0}"#),
        ),
    ];

    for (id, name, rule_course_id, rule_grade_id, calculation_type, period_weights) in rules {
        sqlx::query(
            r#"
            INSERT INTO academic_standing.evaluation_rules
            (id, name, course_id, education_grade_id, min_approval_grade,
             min_attendance_percent, recovery_min_grade, academic_period_type,
             periods_per_year, calculation_type, period_weights,
             allow_recovery, recovery_replaces_lowest)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(rule_course_id)
        .bind(rule_grade_id)
        .bind(7.0f64)
        .bind(75.0f64)
        .bind(Some(4.0f64))
        .bind("bimestre")
        .bind(4i32)
        .bind(calculation_type)
        .bind(period_weights)
        .bind(true)
        .bind(false)
        .execute(pool)
        .await?;
    }

    let grade_rows = vec![
        ("seed-g-001", "ana.souza@escola.example", "Matemática", 0, Some(8.0)),
        ("seed-g-002", "ana.souza@escola.example", "Matemática", 1, Some(7.5)),
        ("seed-g-003", "ana.souza@escola.example", "Língua Portuguesa", 0, Some(9.0)),
        ("seed-g-004", "ana.souza@escola.example", "Língua Portuguesa", 1, Some(8.5)),
        ("seed-g-005", "ana.souza@escola.example", "Ciências", 0, Some(7.0)),
        ("seed-g-006", "carlos.lima@escola.example", "Matemática", 0, Some(4.5)),
        ("seed-g-007", "carlos.lima@escola.example", "Matemática", 1, Some(5.5)),
        ("seed-g-008", "carlos.lima@escola.example", "Língua Portuguesa", 0, Some(6.0)),
        ("seed-g-009", "carlos.lima@escola.example", "Ciências", 0, None::<f64>),
        ("seed-g-010", "marina.alves@escola.example", "Matemática", 0, Some(7.0)),
        ("seed-g-011", "marina.alves@escola.example", "Língua Portuguesa", 0, Some(6.5)),
    ];

    for (source_key, email, subject_name, period_index, value) in grade_rows {
        let student_id = student_id_by_email(pool, email).await?;
        let subject_id: Uuid =
            sqlx::query("SELECT id FROM academic_standing.subjects WHERE name = $1")
                .bind(subject_name)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO academic_standing.grade_entries
            (id, student_id, subject_id, period_index, value, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(subject_id)
        .bind(period_index)
        .bind(value)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let attendance_rows = vec![
        ("seed-a-001", "ana.souza@escola.example", 2, "presente"),
        ("seed-a-002", "ana.souza@escola.example", 3, "presente"),
        ("seed-a-003", "ana.souza@escola.example", 4, "atestado"),
        ("seed-a-004", "ana.souza@escola.example", 5, "presente"),
        ("seed-a-005", "carlos.lima@escola.example", 2, "presente"),
        ("seed-a-006", "carlos.lima@escola.example", 3, "falta_injustificada"),
        ("seed-a-007", "carlos.lima@escola.example", 4, "falta_injustificada"),
        ("seed-a-008", "carlos.lima@escola.example", 5, "falta_justificada"),
        ("seed-a-009", "marina.alves@escola.example", 2, "presente"),
        ("seed-a-010", "marina.alves@escola.example", 3, "presente"),
        ("seed-a-011", "marina.alves@escola.example", 4, "presente"),
        ("seed-a-012", "marina.alves@escola.example", 5, "falta_injustificada"),
    ];

    for (source_key, email, day, status) in attendance_rows {
        let student_id = student_id_by_email(pool, email).await?;
        let occurred_on = NaiveDate::from_ymd_opt(2026, 3, day).context("invalid date")?;

        sqlx::query(
            r#"
            INSERT INTO academic_standing.attendance_entries
            (id, student_id, occurred_on, status, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(occurred_on)
        .bind(status)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn student_id_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM academic_standing.students WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no student with email {email}"))?;
    Ok(row.get("id"))
}

pub async fn fetch_students(
    pool: &PgPool,
    course: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<Vec<Student>> {
    let mut query = String::from(
        "SELECT st.id, st.full_name, st.email, st.course_id, st.education_grade_id \
         FROM academic_standing.students st \
         JOIN academic_standing.courses c ON c.id = st.course_id",
    );

    if course.is_some() {
        query.push_str(" WHERE c.name = $1");
    } else if email.is_some() {
        query.push_str(" WHERE st.email = $1");
    }
    query.push_str(" ORDER BY st.full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = course {
        rows = rows.bind(value);
    } else if let Some(value) = email {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut students = Vec::new();
    for row in records {
        students.push(Student {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            course_id: row.get("course_id"),
            education_grade_id: row.get("education_grade_id"),
        });
    }
    Ok(students)
}

pub async fn fetch_student_by_email(pool: &PgPool, email: &str) -> anyhow::Result<Student> {
    let students = fetch_students(pool, None, Some(email)).await?;
    students
        .into_iter()
        .next()
        .with_context(|| format!("no student with email {email}"))
}

pub async fn fetch_course(pool: &PgPool, course_id: Uuid) -> anyhow::Result<Course> {
    let row = sqlx::query(
        "SELECT id, name, education_level FROM academic_standing.courses WHERE id = $1",
    )
    .bind(course_id)
    .fetch_one(pool)
    .await?;

    let level: String = row.get("education_level");
    Ok(Course {
        id: row.get("id"),
        name: row.get("name"),
        education_level: level.parse()?,
    })
}

pub async fn fetch_rules(pool: &PgPool) -> anyhow::Result<Vec<EvaluationRule>> {
    let rows = sqlx::query(
        "SELECT id, name, course_id, education_grade_id, min_approval_grade, \
         min_attendance_percent, recovery_min_grade, academic_period_type, \
         periods_per_year, calculation_type, period_weights, allow_recovery, \
         recovery_replaces_lowest, deleted_at \
         FROM academic_standing.evaluation_rules \
         WHERE deleted_at IS NULL \
         ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::new();
    for row in rows {
        rules.push(rule_from_row(&row)?);
    }
    Ok(rules)
}

fn rule_from_row(row: &PgRow) -> anyhow::Result<EvaluationRule> {
    let period_type: String = row.get("academic_period_type");
    let calculation_type: String = row.get("calculation_type");
    let weights_json: Option<String> = row.get("period_weights");
    let period_weights = match weights_json {
        Some(json) => {
            Some(serde_json::from_str(&json).context("invalid period_weights config")?)
        }
        None => None,
    };
    let periods_per_year: i32 = row.get("periods_per_year");

    Ok(EvaluationRule {
        id: row.get("id"),
        name: row.get("name"),
        course_id: row.get("course_id"),
        education_grade_id: row.get("education_grade_id"),
        min_approval_grade: row.get("min_approval_grade"),
        min_attendance_percent: row.get("min_attendance_percent"),
        recovery_min_grade: row.get("recovery_min_grade"),
        academic_period_type: period_type.parse()?,
        periods_per_year: periods_per_year.max(1) as u32,
        calculation_type: calculation_type.parse()?,
        period_weights,
        allow_recovery: row.get("allow_recovery"),
        recovery_replaces_lowest: row.get("recovery_replaces_lowest"),
        deleted_at: row.get("deleted_at"),
    })
}

pub async fn fetch_subjects(pool: &PgPool) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query("SELECT id, name FROM academic_standing.subjects ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| Subject {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

pub async fn fetch_grades(pool: &PgPool, student_id: Uuid) -> anyhow::Result<Vec<GradeEntry>> {
    let rows = sqlx::query(
        "SELECT subject_id, period_index, value \
         FROM academic_standing.grade_entries \
         WHERE student_id = $1 \
         ORDER BY subject_id, period_index",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();
    for row in rows {
        let period_index: i32 = row.get("period_index");
        entries.push(GradeEntry {
            subject_id: row.get("subject_id"),
            // A negative index is as malformed as an oversized one: it goes
            // out of range and the aggregator drops and logs it.
            period_index: u32::try_from(period_index).unwrap_or(u32::MAX),
            value: row.get("value"),
        });
    }
    Ok(entries)
}

pub async fn fetch_attendance(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Vec<AttendanceEntry>> {
    let rows = sqlx::query(
        "SELECT occurred_on, status \
         FROM academic_standing.attendance_entries \
         WHERE student_id = $1 \
         ORDER BY occurred_on",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await?;

    let mut entries = Vec::new();
    for row in rows {
        let status: String = row.get("status");
        entries.push(AttendanceEntry {
            occurred_on: row.get("occurred_on"),
            status: status.parse::<AttendanceStatus>()?,
        });
    }
    Ok(entries)
}

pub async fn import_grades_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        subject: String,
        period_index: i32,
        value: Option<f64>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id = student_id_by_email(pool, &row.email).await?;

        let subject_id: Uuid = sqlx::query(
            r#"
            INSERT INTO academic_standing.subjects (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.subject)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO academic_standing.grade_entries
            (id, student_id, subject_id, period_index, value, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(subject_id)
        .bind(row.period_index)
        .bind(row.value)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_attendance_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        occurred_on: NaiveDate,
        status: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let student_id = student_id_by_email(pool, &row.email).await?;

        // Reject unknown statuses at the boundary instead of storing them.
        let status: AttendanceStatus = row.status.parse()?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO academic_standing.attendance_entries
            (id, student_id, occurred_on, status, source_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(row.occurred_on)
        .bind(status.as_str())
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
