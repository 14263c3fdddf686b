use crate::db::models::StudentGroup;

const COLUMNS: &str = "\
    id, group_code, group_name, faculty, level, education_year, education_form, \
    education_lang, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<StudentGroup>, sqlx::Error> {
    sqlx::query_as::<_, StudentGroup>(&format!("SELECT {COLUMNS} FROM student_groups WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) struct NewGroup<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_code: &'a str,
    pub(crate) group_name: &'a str,
    pub(crate) faculty: &'a str,
    pub(crate) level: &'a str,
    pub(crate) education_year: &'a str,
    pub(crate) education_form: &'a str,
    pub(crate) education_lang: &'a str,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Inserts the group the first time its code is seen. An existing row is
/// returned untouched.
pub(crate) async fn get_or_create(
    conn: &mut sqlx::PgConnection,
    params: NewGroup<'_>,
) -> Result<StudentGroup, sqlx::Error> {
    sqlx::query(
        "INSERT INTO student_groups (
            id, group_code, group_name, faculty, level, education_year,
            education_form, education_lang, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        ON CONFLICT (group_code) DO NOTHING",
    )
    .bind(params.id)
    .bind(params.group_code)
    .bind(params.group_name)
    .bind(params.faculty)
    .bind(params.level)
    .bind(params.education_year)
    .bind(params.education_form)
    .bind(params.education_lang)
    .bind(params.now)
    .execute(&mut *conn)
    .await?;

    sqlx::query_as::<_, StudentGroup>(&format!(
        "SELECT {COLUMNS} FROM student_groups WHERE group_code = $1"
    ))
    .bind(params.group_code)
    .fetch_one(&mut *conn)
    .await
}
