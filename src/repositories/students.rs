use crate::db::models::Student;
use crate::services::hemis_profile::StudentProfile;

const COLUMNS: &str = "\
    id, student_id_number, hemis_user_id, full_name, phone_number, image_url, email, \
    passport_number, birth_date, student_status, payment_form, faculty, level, avg_gpa, \
    education_type, gender, semester, group_id, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Creates the student or refreshes every provider-sourced field, keyed on
/// the provider's student id number.
pub(crate) async fn upsert_from_profile(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    profile: &StudentProfile,
    group_id: Option<&str>,
    now: time::PrimitiveDateTime,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, student_id_number, hemis_user_id, full_name, phone_number, image_url,
            email, passport_number, birth_date, student_status, payment_form, faculty,
            level, avg_gpa, education_type, gender, semester, group_id, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$19)
        ON CONFLICT (student_id_number) DO UPDATE SET
            hemis_user_id = EXCLUDED.hemis_user_id,
            full_name = EXCLUDED.full_name,
            phone_number = EXCLUDED.phone_number,
            image_url = EXCLUDED.image_url,
            email = EXCLUDED.email,
            passport_number = EXCLUDED.passport_number,
            birth_date = EXCLUDED.birth_date,
            student_status = EXCLUDED.student_status,
            payment_form = EXCLUDED.payment_form,
            faculty = EXCLUDED.faculty,
            level = EXCLUDED.level,
            avg_gpa = EXCLUDED.avg_gpa,
            education_type = EXCLUDED.education_type,
            gender = EXCLUDED.gender,
            semester = EXCLUDED.semester,
            group_id = EXCLUDED.group_id,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(&profile.student_id_number)
    .bind(profile.hemis_user_id.as_deref())
    .bind(profile.full_name.as_deref())
    .bind(profile.phone_number.as_deref())
    .bind(profile.image_url.as_deref())
    .bind(&profile.email)
    .bind(&profile.passport_number)
    .bind(&profile.birth_date)
    .bind(&profile.student_status)
    .bind(&profile.payment_form)
    .bind(&profile.faculty)
    .bind(&profile.level)
    .bind(&profile.avg_gpa)
    .bind(&profile.education_type)
    .bind(&profile.gender)
    .bind(&profile.semester)
    .bind(group_id)
    .bind(now)
    .fetch_one(executor)
    .await
}
