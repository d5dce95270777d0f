use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, params_from_iter, types::Type, types::Value, Connection, OptionalExtension};
use std::{path::Path, str::FromStr};

use super::traits::{
    Choice, ChoiceListRow, ChoiceQuery, Course, CourseQuery, Enrollment, Instructor, Learner, Lesson, NewCourse,
    NewLesson, NewUser, Question, QuestionListRow, QuestionQuery, Storage, StorageRead, StorageTx,
    StorageWrite, Submission, User,
};
use crate::types::EnrollmentMode;

const DB_SCHEMA_VERSION: i64 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const USER_COLUMNS: &str =
    "u.id, u.username, u.first_name, u.last_name, u.password_hash, u.is_staff, u.date_joined";
const COURSE_COLUMNS: &str = "id, name, image, description, pub_date, total_enrollment";

#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
}

pub struct SqliteTx {
    conn: Connection,
}

impl StorageTx for SqliteTx {
    fn commit(self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }
}

fn open_conn(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|err| conversion_error(idx, Type::Text, err))
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|err| conversion_error(idx, Type::Text, err))
}

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// Turns a search term into a LIKE pattern, escaping the wildcards.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends one `AND (a LIKE ? OR b LIKE ?)` clause per whitespace-separated
/// term, so every term has to match at least one of the columns.
fn push_search_clause(
    sql: &mut String,
    args: &mut Vec<Value>,
    search: Option<&str>,
    columns: &[&str],
) {
    let Some(search) = search else {
        return;
    };
    for term in search.split_whitespace() {
        let pattern = like_pattern(term);
        let ors = columns
            .iter()
            .map(|col| format!("{col} LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        sql.push_str(&format!(" AND ({ors})"));
        for _ in columns {
            args.push(Value::Text(pattern.clone()));
        }
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let is_staff: i64 = row.get(5)?;
    let date_joined: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        password_hash: row.get(4)?,
        is_staff: is_staff != 0,
        date_joined: parse_timestamp(6, &date_joined)?,
    })
}

fn map_course_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    let pub_date: Option<String> = row.get(4)?;
    let pub_date = match pub_date {
        Some(raw) => Some(parse_date(4, &raw)?),
        None => None,
    };
    Ok(Course {
        id: row.get(0)?,
        name: row.get(1)?,
        image: row.get(2)?,
        description: row.get(3)?,
        pub_date,
        total_enrollment: row.get(5)?,
    })
}

fn map_question_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Question> {
    let grade_int: i64 = row.get(3)?;
    let grade: u32 = grade_int
        .try_into()
        .map_err(|err| conversion_error(3, Type::Integer, err))?;
    Ok(Question {
        id: row.get(0)?,
        lesson_id: row.get(1)?,
        question_text: row.get(2)?,
        grade,
    })
}

fn map_choice_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Choice> {
    let is_correct: i64 = row.get(3)?;
    Ok(Choice {
        id: row.get(0)?,
        question_id: row.get(1)?,
        choice_text: row.get(2)?,
        is_correct: is_correct != 0,
    })
}

fn map_enrollment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Enrollment> {
    let date_enrolled: String = row.get(3)?;
    let mode: String = row.get(4)?;
    let mode = EnrollmentMode::from_str(&mode).map_err(|err| conversion_error(4, Type::Text, err))?;
    Ok(Enrollment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        course_id: row.get(2)?,
        date_enrolled: parse_date(3, &date_enrolled)?,
        mode,
        rating: row.get(5)?,
    })
}

fn db_load_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
        params![id],
        map_user_row,
    )
    .optional()
}

fn db_load_user_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
        params![username],
        map_user_row,
    )
    .optional()
}

fn db_load_session_user(conn: &Connection, token: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!(
            "SELECT {USER_COLUMNS} FROM sessions s JOIN users u ON u.id = s.user_id WHERE s.token = ?1"
        ),
        params![token],
        map_user_row,
    )
    .optional()
}

fn db_load_learner(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<Learner>> {
    conn.query_row(
        "SELECT id, user_id, level, occupation FROM learners WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(Learner {
                id: row.get(0)?,
                user_id: row.get(1)?,
                level: row.get(2)?,
                occupation: row.get(3)?,
            })
        },
    )
    .optional()
}

fn db_load_course(conn: &Connection, id: i64) -> rusqlite::Result<Option<Course>> {
    conn.query_row(
        &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
        params![id],
        map_course_row,
    )
    .optional()
}

fn db_list_courses_by_enrollment(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<Course>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COURSE_COLUMNS} FROM courses ORDER BY total_enrollment DESC, id LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![limit as i64], map_course_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_list_course_instructors(
    conn: &Connection,
    course_id: i64,
) -> rusqlite::Result<Vec<Instructor>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT i.id, i.user_id, u.username, i.full_time, i.total_learners
        FROM course_instructors ci
        JOIN instructors i ON i.id = ci.instructor_id
        JOIN users u ON u.id = i.user_id
        WHERE ci.course_id = ?1
        ORDER BY i.id
        "#,
    )?;
    let rows = stmt
        .query_map(params![course_id], |row| {
            let full_time: i64 = row.get(3)?;
            Ok(Instructor {
                id: row.get(0)?,
                user_id: row.get(1)?,
                username: row.get(2)?,
                full_time: full_time != 0,
                total_learners: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_list_lessons(conn: &Connection, course_id: i64) -> rusqlite::Result<Vec<Lesson>> {
    let mut stmt = conn.prepare(
        "SELECT id, course_id, title, lesson_order, content FROM lessons WHERE course_id = ?1 ORDER BY lesson_order, id",
    )?;
    let rows = stmt
        .query_map(params![course_id], |row| {
            Ok(Lesson {
                id: row.get(0)?,
                course_id: row.get(1)?,
                title: row.get(2)?,
                order: row.get(3)?,
                content: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_list_course_questions(conn: &Connection, course_id: i64) -> rusqlite::Result<Vec<Question>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT q.id, q.lesson_id, q.question_text, q.grade
        FROM questions q
        JOIN lessons l ON l.id = q.lesson_id
        WHERE l.course_id = ?1
        ORDER BY q.id
        "#,
    )?;
    let rows = stmt
        .query_map(params![course_id], map_question_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_list_course_choices(conn: &Connection, course_id: i64) -> rusqlite::Result<Vec<Choice>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT c.id, c.question_id, c.choice_text, c.is_correct
        FROM choices c
        JOIN questions q ON q.id = c.question_id
        JOIN lessons l ON l.id = q.lesson_id
        WHERE l.course_id = ?1
        ORDER BY c.id
        "#,
    )?;
    let rows = stmt
        .query_map(params![course_id], map_choice_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_count_enrollments(conn: &Connection, user_id: i64, course_id: i64) -> rusqlite::Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
        params![user_id, course_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

fn db_load_enrollment(
    conn: &Connection,
    user_id: i64,
    course_id: i64,
) -> rusqlite::Result<Option<Enrollment>> {
    conn.query_row(
        r#"
        SELECT id, user_id, course_id, date_enrolled, mode, rating
        FROM enrollments
        WHERE user_id = ?1 AND course_id = ?2
        ORDER BY id
        LIMIT 1
        "#,
        params![user_id, course_id],
        map_enrollment_row,
    )
    .optional()
}

fn db_load_submission(conn: &Connection, id: i64) -> rusqlite::Result<Option<Submission>> {
    conn.query_row(
        "SELECT id, enrollment_id FROM submissions WHERE id = ?1",
        params![id],
        |row| {
            Ok(Submission {
                id: row.get(0)?,
                enrollment_id: row.get(1)?,
            })
        },
    )
    .optional()
}

fn db_list_submission_choice_ids(
    conn: &Connection,
    submission_id: i64,
) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT choice_id FROM submission_choices WHERE submission_id = ?1 ORDER BY choice_id",
    )?;
    let rows = stmt
        .query_map(params![submission_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(rows)
}

fn db_search_courses(conn: &Connection, query: &CourseQuery) -> rusqlite::Result<Vec<Course>> {
    let mut sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE 1 = 1");
    let mut args = Vec::new();
    push_search_clause(
        &mut sql,
        &mut args,
        query.search.as_deref(),
        &["name", "description"],
    );
    if let Some(pub_date) = query.pub_date {
        sql.push_str(" AND pub_date = ?");
        args.push(Value::Text(pub_date.format(DATE_FORMAT).to_string()));
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), map_course_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_search_questions(
    conn: &Connection,
    query: &QuestionQuery,
) -> rusqlite::Result<Vec<QuestionListRow>> {
    let mut sql = String::from(
        r#"
        SELECT q.id, q.lesson_id, q.question_text, q.grade, l.title
        FROM questions q
        JOIN lessons l ON l.id = q.lesson_id
        WHERE 1 = 1"#,
    );
    let mut args = Vec::new();
    push_search_clause(
        &mut sql,
        &mut args,
        query.search.as_deref(),
        &["q.question_text", "l.title"],
    );
    if let Some(lesson_id) = query.lesson_id {
        sql.push_str(" AND q.lesson_id = ?");
        args.push(Value::Integer(lesson_id));
    }
    if let Some(grade) = query.grade {
        sql.push_str(" AND q.grade = ?");
        args.push(Value::Integer(grade as i64));
    }
    sql.push_str(" ORDER BY q.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok(QuestionListRow {
                question: map_question_row(row)?,
                lesson_title: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_search_choices(
    conn: &Connection,
    query: &ChoiceQuery,
) -> rusqlite::Result<Vec<ChoiceListRow>> {
    let mut sql = String::from(
        r#"
        SELECT c.id, c.question_id, c.choice_text, c.is_correct, q.question_text
        FROM choices c
        JOIN questions q ON q.id = c.question_id
        WHERE 1 = 1"#,
    );
    let mut args = Vec::new();
    push_search_clause(
        &mut sql,
        &mut args,
        query.search.as_deref(),
        &["c.choice_text"],
    );
    if let Some(is_correct) = query.is_correct {
        sql.push_str(" AND c.is_correct = ?");
        args.push(Value::Integer(is_correct as i64));
    }
    sql.push_str(" ORDER BY c.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), |row| {
            Ok(ChoiceListRow {
                choice: map_choice_row(row)?,
                question_text: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_insert_user(conn: &Connection, user: &NewUser<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        r#"
        INSERT INTO users (username, first_name, last_name, password_hash, is_staff, date_joined)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            user.username,
            user.first_name,
            user.last_name,
            user.password_hash,
            user.is_staff as i64,
            now_timestamp()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_insert_session(conn: &Connection, token: &str, user_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
        params![token, user_id, now_timestamp()],
    )?;
    Ok(())
}

fn db_delete_session(conn: &Connection, token: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

fn db_insert_instructor(
    conn: &Connection,
    user_id: i64,
    full_time: bool,
    total_learners: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO instructors (user_id, full_time, total_learners) VALUES (?1, ?2, ?3)",
        params![user_id, full_time as i64, total_learners],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_insert_learner(
    conn: &Connection,
    user_id: i64,
    level: i64,
    occupation: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO learners (user_id, level, occupation) VALUES (?1, ?2, ?3)",
        params![user_id, level, occupation],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_insert_course(conn: &Connection, course: &NewCourse<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO courses (name, image, description, pub_date) VALUES (?1, ?2, ?3, ?4)",
        params![
            course.name,
            course.image,
            course.description,
            course.pub_date.map(|d| d.format(DATE_FORMAT).to_string())
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_add_course_instructor(
    conn: &Connection,
    course_id: i64,
    instructor_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO course_instructors (course_id, instructor_id) VALUES (?1, ?2)",
        params![course_id, instructor_id],
    )?;
    Ok(())
}

fn db_insert_lesson(conn: &Connection, lesson: &NewLesson<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO lessons (course_id, title, lesson_order, content) VALUES (?1, ?2, ?3, ?4)",
        params![lesson.course_id, lesson.title, lesson.order, lesson.content],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_insert_question(
    conn: &Connection,
    lesson_id: i64,
    text: &str,
    grade: u32,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO questions (lesson_id, question_text, grade) VALUES (?1, ?2, ?3)",
        params![lesson_id, text, grade as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_insert_choice(
    conn: &Connection,
    question_id: i64,
    text: &str,
    is_correct: bool,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO choices (question_id, choice_text, is_correct) VALUES (?1, ?2, ?3)",
        params![question_id, text, is_correct as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_insert_enrollment(
    conn: &Connection,
    user_id: i64,
    course_id: i64,
    mode: EnrollmentMode,
) -> rusqlite::Result<i64> {
    let today = Utc::now().date_naive().format(DATE_FORMAT).to_string();
    conn.execute(
        "INSERT INTO enrollments (user_id, course_id, date_enrolled, mode) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, course_id, today, mode.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_increment_total_enrollment(conn: &Connection, course_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE courses SET total_enrollment = total_enrollment + 1 WHERE id = ?1",
        params![course_id],
    )?;
    Ok(())
}

fn db_insert_submission(conn: &Connection, enrollment_id: i64) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO submissions (enrollment_id) VALUES (?1)",
        params![enrollment_id],
    )?;
    Ok(conn.last_insert_rowid())
}

fn db_add_submission_choices(
    conn: &Connection,
    submission_id: i64,
    choice_ids: &[i64],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO submission_choices (submission_id, choice_id) VALUES (?1, ?2)",
    )?;
    for choice_id in choice_ids {
        stmt.execute(params![submission_id, choice_id])?;
    }
    Ok(())
}

impl StorageRead for SqliteTx {
    fn load_user(&self, id: i64) -> Result<Option<User>> {
        Ok(db_load_user(&self.conn, id)?)
    }

    fn load_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(db_load_user_by_username(&self.conn, username)?)
    }

    fn load_session_user(&self, token: &str) -> Result<Option<User>> {
        Ok(db_load_session_user(&self.conn, token)?)
    }

    fn load_learner(&self, user_id: i64) -> Result<Option<Learner>> {
        Ok(db_load_learner(&self.conn, user_id)?)
    }

    fn load_course(&self, id: i64) -> Result<Option<Course>> {
        Ok(db_load_course(&self.conn, id)?)
    }

    fn list_courses_by_enrollment(&self, limit: usize) -> Result<Vec<Course>> {
        Ok(db_list_courses_by_enrollment(&self.conn, limit)?)
    }

    fn list_course_instructors(&self, course_id: i64) -> Result<Vec<Instructor>> {
        Ok(db_list_course_instructors(&self.conn, course_id)?)
    }

    fn list_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        Ok(db_list_lessons(&self.conn, course_id)?)
    }

    fn list_course_questions(&self, course_id: i64) -> Result<Vec<Question>> {
        Ok(db_list_course_questions(&self.conn, course_id)?)
    }

    fn list_course_choices(&self, course_id: i64) -> Result<Vec<Choice>> {
        Ok(db_list_course_choices(&self.conn, course_id)?)
    }

    fn count_enrollments(&self, user_id: i64, course_id: i64) -> Result<u64> {
        Ok(db_count_enrollments(&self.conn, user_id, course_id)?)
    }

    fn load_enrollment(&self, user_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        Ok(db_load_enrollment(&self.conn, user_id, course_id)?)
    }

    fn load_submission(&self, id: i64) -> Result<Option<Submission>> {
        Ok(db_load_submission(&self.conn, id)?)
    }

    fn list_submission_choice_ids(&self, submission_id: i64) -> Result<Vec<i64>> {
        Ok(db_list_submission_choice_ids(&self.conn, submission_id)?)
    }

    fn search_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        Ok(db_search_courses(&self.conn, query)?)
    }

    fn search_questions(&self, query: &QuestionQuery) -> Result<Vec<QuestionListRow>> {
        Ok(db_search_questions(&self.conn, query)?)
    }

    fn search_choices(&self, query: &ChoiceQuery) -> Result<Vec<ChoiceListRow>> {
        Ok(db_search_choices(&self.conn, query)?)
    }
}

impl StorageWrite for SqliteTx {
    fn insert_user(&self, user: &NewUser<'_>) -> Result<i64> {
        Ok(db_insert_user(&self.conn, user)?)
    }

    fn insert_session(&self, token: &str, user_id: i64) -> Result<()> {
        Ok(db_insert_session(&self.conn, token, user_id)?)
    }

    fn delete_session(&self, token: &str) -> Result<()> {
        Ok(db_delete_session(&self.conn, token)?)
    }

    fn insert_instructor(&self, user_id: i64, full_time: bool, total_learners: i64) -> Result<i64> {
        Ok(db_insert_instructor(
            &self.conn,
            user_id,
            full_time,
            total_learners,
        )?)
    }

    fn insert_learner(&self, user_id: i64, level: i64, occupation: &str) -> Result<i64> {
        Ok(db_insert_learner(&self.conn, user_id, level, occupation)?)
    }

    fn insert_course(&self, course: &NewCourse<'_>) -> Result<i64> {
        Ok(db_insert_course(&self.conn, course)?)
    }

    fn add_course_instructor(&self, course_id: i64, instructor_id: i64) -> Result<()> {
        Ok(db_add_course_instructor(&self.conn, course_id, instructor_id)?)
    }

    fn insert_lesson(&self, lesson: &NewLesson<'_>) -> Result<i64> {
        Ok(db_insert_lesson(&self.conn, lesson)?)
    }

    fn insert_question(&self, lesson_id: i64, text: &str, grade: u32) -> Result<i64> {
        Ok(db_insert_question(&self.conn, lesson_id, text, grade)?)
    }

    fn insert_choice(&self, question_id: i64, text: &str, is_correct: bool) -> Result<i64> {
        Ok(db_insert_choice(&self.conn, question_id, text, is_correct)?)
    }

    fn insert_enrollment(&self, user_id: i64, course_id: i64, mode: EnrollmentMode) -> Result<i64> {
        Ok(db_insert_enrollment(&self.conn, user_id, course_id, mode)?)
    }

    fn increment_total_enrollment(&self, course_id: i64) -> Result<()> {
        Ok(db_increment_total_enrollment(&self.conn, course_id)?)
    }

    fn insert_submission(&self, enrollment_id: i64) -> Result<i64> {
        Ok(db_insert_submission(&self.conn, enrollment_id)?)
    }

    fn add_submission_choices(&self, submission_id: i64, choice_ids: &[i64]) -> Result<()> {
        Ok(db_add_submission_choices(
            &self.conn,
            submission_id,
            choice_ids,
        )?)
    }
}

impl Storage for SqliteStorage {
    type Tx = SqliteTx;

    fn begin_tx(&self) -> Result<Self::Tx> {
        let conn = open_conn(&self.path)?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        Ok(SqliteTx { conn })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    /// Delete the database file along with its WAL sidecars.
    pub fn reset_all(&self) -> Result<()> {
        for suffix in ["", "-wal", "-shm"] {
            let path = format!("{}{}", self.path, suffix);
            if Path::new(&path).exists() {
                std::fs::remove_file(&path).with_context(|| format!("removing {}", path))?;
            }
        }
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|_conn| Ok(()))?;
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = open_conn(&self.path)?;
        Self::migrate(&conn)?;
        f(&conn)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        log::info!(
            "SQLite schema migration: {} -> {}",
            version,
            DB_SCHEMA_VERSION
        );

        if version == 0 {
            conn.execute_batch(
                r#"
            CREATE TABLE users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE CHECK (length(username) <= 150),
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                is_staff INTEGER NOT NULL DEFAULT 0,
                date_joined TEXT NOT NULL
            );
            CREATE TABLE sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL
            );
            CREATE TABLE instructors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                full_time INTEGER NOT NULL DEFAULT 1,
                total_learners INTEGER NOT NULL
            );
            CREATE TABLE learners (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                level INTEGER NOT NULL,
                occupation TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE courses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL DEFAULT 'online course' CHECK (length(name) <= 30),
                image TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL CHECK (length(description) <= 1000),
                pub_date TEXT,
                total_enrollment INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE course_instructors (
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                instructor_id INTEGER NOT NULL REFERENCES instructors(id) ON DELETE CASCADE,
                PRIMARY KEY (course_id, instructor_id)
            );
            CREATE TABLE lessons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                title TEXT NOT NULL DEFAULT 'title' CHECK (length(title) <= 200),
                lesson_order INTEGER NOT NULL DEFAULT 0,
                content TEXT NOT NULL
            );
            CREATE TABLE questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lesson_id INTEGER NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
                question_text TEXT NOT NULL CHECK (length(question_text) <= 250),
                grade INTEGER NOT NULL CHECK (grade >= 0)
            );
            CREATE TABLE choices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
                choice_text TEXT NOT NULL CHECK (length(choice_text) <= 250),
                is_correct INTEGER NOT NULL
            );
            CREATE TABLE enrollments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
                date_enrolled TEXT NOT NULL,
                mode TEXT NOT NULL DEFAULT 'audit' CHECK (mode IN ('audit', 'honor', 'BETA')),
                rating REAL NOT NULL DEFAULT 5.0
            );
            CREATE TABLE submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                enrollment_id INTEGER NOT NULL REFERENCES enrollments(id) ON DELETE CASCADE
            );
            CREATE TABLE submission_choices (
                submission_id INTEGER NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
                choice_id INTEGER NOT NULL REFERENCES choices(id) ON DELETE CASCADE,
                PRIMARY KEY (submission_id, choice_id)
            );
            CREATE INDEX courses_total_enrollment_idx ON courses(total_enrollment);
            CREATE INDEX lessons_course_idx ON lessons(course_id);
            CREATE INDEX questions_lesson_idx ON questions(lesson_id);
            CREATE INDEX choices_question_idx ON choices(question_id);
            CREATE INDEX enrollments_user_course_idx ON enrollments(user_id, course_id);
            CREATE INDEX sessions_user_idx ON sessions(user_id);
        "#,
            )?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            return Ok(());
        }

        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
            Some("database schema version mismatch; please run with --reset option".to_string()),
        ))
    }
}

impl StorageRead for SqliteStorage {
    fn load_user(&self, id: i64) -> Result<Option<User>> {
        let row = self.with_conn(|conn| db_load_user(conn, id))?;
        Ok(row)
    }

    fn load_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = self.with_conn(|conn| db_load_user_by_username(conn, username))?;
        Ok(row)
    }

    fn load_session_user(&self, token: &str) -> Result<Option<User>> {
        let row = self.with_conn(|conn| db_load_session_user(conn, token))?;
        Ok(row)
    }

    fn load_learner(&self, user_id: i64) -> Result<Option<Learner>> {
        let row = self.with_conn(|conn| db_load_learner(conn, user_id))?;
        Ok(row)
    }

    fn load_course(&self, id: i64) -> Result<Option<Course>> {
        let row = self.with_conn(|conn| db_load_course(conn, id))?;
        Ok(row)
    }

    fn list_courses_by_enrollment(&self, limit: usize) -> Result<Vec<Course>> {
        let rows = self.with_conn(|conn| db_list_courses_by_enrollment(conn, limit))?;
        Ok(rows)
    }

    fn list_course_instructors(&self, course_id: i64) -> Result<Vec<Instructor>> {
        let rows = self.with_conn(|conn| db_list_course_instructors(conn, course_id))?;
        Ok(rows)
    }

    fn list_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        let rows = self.with_conn(|conn| db_list_lessons(conn, course_id))?;
        Ok(rows)
    }

    fn list_course_questions(&self, course_id: i64) -> Result<Vec<Question>> {
        let rows = self.with_conn(|conn| db_list_course_questions(conn, course_id))?;
        Ok(rows)
    }

    fn list_course_choices(&self, course_id: i64) -> Result<Vec<Choice>> {
        let rows = self.with_conn(|conn| db_list_course_choices(conn, course_id))?;
        Ok(rows)
    }

    fn count_enrollments(&self, user_id: i64, course_id: i64) -> Result<u64> {
        let count = self.with_conn(|conn| db_count_enrollments(conn, user_id, course_id))?;
        Ok(count)
    }

    fn load_enrollment(&self, user_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        let row = self.with_conn(|conn| db_load_enrollment(conn, user_id, course_id))?;
        Ok(row)
    }

    fn load_submission(&self, id: i64) -> Result<Option<Submission>> {
        let row = self.with_conn(|conn| db_load_submission(conn, id))?;
        Ok(row)
    }

    fn list_submission_choice_ids(&self, submission_id: i64) -> Result<Vec<i64>> {
        let rows = self.with_conn(|conn| db_list_submission_choice_ids(conn, submission_id))?;
        Ok(rows)
    }

    fn search_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        let rows = self.with_conn(|conn| db_search_courses(conn, query))?;
        Ok(rows)
    }

    fn search_questions(&self, query: &QuestionQuery) -> Result<Vec<QuestionListRow>> {
        let rows = self.with_conn(|conn| db_search_questions(conn, query))?;
        Ok(rows)
    }

    fn search_choices(&self, query: &ChoiceQuery) -> Result<Vec<ChoiceListRow>> {
        let rows = self.with_conn(|conn| db_search_choices(conn, query))?;
        Ok(rows)
    }
}
