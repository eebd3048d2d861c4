use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Encode, FromRow, Pool, QueryBuilder, Sqlite, Type};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{Goal, Note, StudySession, StudyStats, Subject, User};
use crate::schema::{
    GoalChanges, NewGoal, NewNote, NewStudySession, NewStudyStats, NewSubject, NewUser,
    NoteChanges, StudySessionChanges, SubjectChanges,
};

/// `UPDATE <table> SET ... WHERE id = ? RETURNING *` over the fields that
/// are present in a change set.
struct UpdateBuilder<'args> {
    query: QueryBuilder<'args, Sqlite>,
    fields: usize,
}

impl<'args> UpdateBuilder<'args> {
    fn new(table: &str) -> Self {
        Self {
            query: QueryBuilder::new(format!("UPDATE {} SET ", table)),
            fields: 0,
        }
    }

    fn set<T>(&mut self, column: &str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Sqlite> + Type<Sqlite> + Send,
    {
        if let Some(value) = value {
            if self.fields > 0 {
                self.query.push(", ");
            }
            self.query.push(column).push(" = ").push_bind(value);
            self.fields += 1;
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.fields == 0
    }

    async fn fetch_optional<R>(
        mut self,
        pool: &Pool<Sqlite>,
        id: i64,
    ) -> Result<Option<R>, AppError>
    where
        R: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        self.query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING *");

        let row = self.query.build_query_as::<R>().fetch_optional(pool).await?;
        Ok(row)
    }
}

async fn delete_by_id(pool: &Pool<Sqlite>, table: &str, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[instrument(skip(pool))]
pub async fn get_subjects(pool: &Pool<Sqlite>) -> Result<Vec<Subject>, AppError> {
    info!("Getting all subjects");
    let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(subjects)
}

#[instrument(skip(pool))]
pub async fn get_subject(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Subject>, AppError> {
    info!("Fetching subject by ID");
    let subject = sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(subject)
}

#[instrument(skip(pool, subject), fields(name = %subject.name))]
pub async fn create_subject(pool: &Pool<Sqlite>, subject: NewSubject) -> Result<Subject, AppError> {
    info!("Creating subject");
    let created = sqlx::query_as::<_, Subject>(
        "INSERT INTO subjects (name, color, icon, current_topic, progress, total_hours)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(subject.name)
    .bind(subject.color)
    .bind(subject.icon)
    .bind(subject.current_topic)
    .bind(subject.progress)
    .bind(subject.total_hours)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

#[instrument(skip(pool))]
pub async fn update_subject(
    pool: &Pool<Sqlite>,
    id: i64,
    changes: SubjectChanges,
) -> Result<Option<Subject>, AppError> {
    info!("Updating subject");
    let mut update = UpdateBuilder::new("subjects");
    update
        .set("name", changes.name)
        .set("color", changes.color)
        .set("icon", changes.icon)
        .set("current_topic", changes.current_topic)
        .set("progress", changes.progress)
        .set("total_hours", changes.total_hours);

    if update.is_empty() {
        return get_subject(pool, id).await;
    }

    update.fetch_optional(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_subject(pool: &Pool<Sqlite>, id: i64) -> Result<bool, AppError> {
    info!("Deleting subject");
    delete_by_id(pool, "subjects", id).await
}

#[instrument(skip(pool))]
pub async fn get_study_sessions(
    pool: &Pool<Sqlite>,
    date: Option<NaiveDate>,
) -> Result<Vec<StudySession>, AppError> {
    info!("Getting study sessions");
    let sessions = match date {
        Some(date) => {
            sqlx::query_as::<_, StudySession>(
                "SELECT * FROM study_sessions WHERE date = ? ORDER BY id",
            )
            .bind(date)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, StudySession>("SELECT * FROM study_sessions ORDER BY id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(sessions)
}

#[instrument(skip(pool))]
pub async fn get_study_session(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<Option<StudySession>, AppError> {
    info!("Fetching study session by ID");
    let session = sqlx::query_as::<_, StudySession>("SELECT * FROM study_sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(session)
}

#[instrument(
    skip(pool, session),
    fields(subject_id = session.subject_id, status = %session.status)
)]
pub async fn create_study_session(
    pool: &Pool<Sqlite>,
    session: NewStudySession,
) -> Result<StudySession, AppError> {
    info!("Creating study session");
    let created = sqlx::query_as::<_, StudySession>(
        "INSERT INTO study_sessions
         (subject_id, title, description, start_time, end_time, date, status, actual_duration)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(session.subject_id)
    .bind(session.title)
    .bind(session.description)
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.date)
    .bind(session.status)
    .bind(session.actual_duration)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

#[instrument(skip(pool))]
pub async fn update_study_session(
    pool: &Pool<Sqlite>,
    id: i64,
    changes: StudySessionChanges,
) -> Result<Option<StudySession>, AppError> {
    info!("Updating study session");
    let mut update = UpdateBuilder::new("study_sessions");
    update
        .set("subject_id", changes.subject_id)
        .set("title", changes.title)
        .set("description", changes.description)
        .set("start_time", changes.start_time)
        .set("end_time", changes.end_time)
        .set("date", changes.date)
        .set("status", changes.status)
        .set("actual_duration", changes.actual_duration);

    if update.is_empty() {
        return get_study_session(pool, id).await;
    }

    update.fetch_optional(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_study_session(pool: &Pool<Sqlite>, id: i64) -> Result<bool, AppError> {
    info!("Deleting study session");
    delete_by_id(pool, "study_sessions", id).await
}

#[instrument(skip(pool))]
pub async fn get_notes(
    pool: &Pool<Sqlite>,
    subject_id: Option<i64>,
) -> Result<Vec<Note>, AppError> {
    info!("Getting notes");
    let notes = match subject_id {
        Some(subject_id) => {
            sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE subject_id = ? ORDER BY id")
                .bind(subject_id)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as::<_, Note>("SELECT * FROM notes ORDER BY id")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(notes)
}

#[instrument(skip(pool))]
pub async fn get_note(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Note>, AppError> {
    info!("Fetching note by ID");
    let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(note)
}

#[instrument(skip(pool, note), fields(subject_id = note.subject_id))]
pub async fn create_note(pool: &Pool<Sqlite>, note: NewNote) -> Result<Note, AppError> {
    info!("Creating note");
    let created = sqlx::query_as::<_, Note>(
        "INSERT INTO notes (subject_id, title, content, created_at)
         VALUES (?, ?, ?, ?)
         RETURNING *",
    )
    .bind(note.subject_id)
    .bind(note.title)
    .bind(note.content)
    .bind(note.created_at)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

#[instrument(skip(pool))]
pub async fn update_note(
    pool: &Pool<Sqlite>,
    id: i64,
    changes: NoteChanges,
) -> Result<Option<Note>, AppError> {
    info!("Updating note");
    let mut update = UpdateBuilder::new("notes");
    update
        .set("subject_id", changes.subject_id)
        .set("title", changes.title)
        .set("content", changes.content);

    if update.is_empty() {
        return get_note(pool, id).await;
    }

    update.fetch_optional(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_note(pool: &Pool<Sqlite>, id: i64) -> Result<bool, AppError> {
    info!("Deleting note");
    delete_by_id(pool, "notes", id).await
}

#[instrument(skip(pool))]
pub async fn get_goals(pool: &Pool<Sqlite>) -> Result<Vec<Goal>, AppError> {
    info!("Getting all goals");
    let goals = sqlx::query_as::<_, Goal>("SELECT * FROM goals ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(goals)
}

#[instrument(skip(pool))]
pub async fn get_goal(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Goal>, AppError> {
    info!("Fetching goal by ID");
    let goal = sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(goal)
}

#[instrument(skip(pool, goal), fields(target_date = %goal.target_date))]
pub async fn create_goal(pool: &Pool<Sqlite>, goal: NewGoal) -> Result<Goal, AppError> {
    info!("Creating goal");
    let created = sqlx::query_as::<_, Goal>(
        "INSERT INTO goals (title, description, target_date, progress, completed)
         VALUES (?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(goal.title)
    .bind(goal.description)
    .bind(goal.target_date)
    .bind(goal.progress)
    .bind(goal.completed)
    .fetch_one(pool)
    .await?;

    Ok(created)
}

#[instrument(skip(pool))]
pub async fn update_goal(
    pool: &Pool<Sqlite>,
    id: i64,
    changes: GoalChanges,
) -> Result<Option<Goal>, AppError> {
    info!("Updating goal");
    let mut update = UpdateBuilder::new("goals");
    update
        .set("title", changes.title)
        .set("description", changes.description)
        .set("target_date", changes.target_date)
        .set("progress", changes.progress)
        .set("completed", changes.completed);

    if update.is_empty() {
        return get_goal(pool, id).await;
    }

    update.fetch_optional(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_goal(pool: &Pool<Sqlite>, id: i64) -> Result<bool, AppError> {
    info!("Deleting goal");
    delete_by_id(pool, "goals", id).await
}

#[instrument(skip(pool))]
pub async fn get_study_stats_for_date(
    pool: &Pool<Sqlite>,
    date: NaiveDate,
) -> Result<Option<StudyStats>, AppError> {
    info!("Fetching study stats for date");
    let stats = sqlx::query_as::<_, StudyStats>(
        "SELECT * FROM study_stats WHERE date = ? ORDER BY id LIMIT 1",
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(stats)
}

#[instrument(skip(pool))]
pub async fn get_all_study_stats(pool: &Pool<Sqlite>) -> Result<Vec<StudyStats>, AppError> {
    info!("Getting all study stats");
    let stats = sqlx::query_as::<_, StudyStats>("SELECT * FROM study_stats ORDER BY date, id")
        .fetch_all(pool)
        .await?;

    Ok(stats)
}

/// Looks the row up by date, then updates or inserts it. The two statements
/// do not share a transaction, so concurrent writers for the same date can
/// both insert. Counters missing from `stats` are left as stored on update.
#[instrument(skip(pool, stats), fields(date = %stats.date))]
pub async fn create_or_update_study_stats(
    pool: &Pool<Sqlite>,
    stats: NewStudyStats,
) -> Result<StudyStats, AppError> {
    match get_study_stats_for_date(pool, stats.date).await? {
        Some(existing) => {
            info!(id = existing.id, "Updating existing study stats");
            let mut update = UpdateBuilder::new("study_stats");
            update
                .set("total_minutes", stats.total_minutes)
                .set("sessions_completed", stats.sessions_completed)
                .set("streak", stats.streak);

            if update.is_empty() {
                return Ok(existing);
            }

            let updated = update.fetch_optional(pool, existing.id).await?;
            updated.ok_or_else(|| AppError::not_found("Study stats", existing.id))
        }
        None => {
            info!("Inserting study stats");
            let created = sqlx::query_as::<_, StudyStats>(
                "INSERT INTO study_stats (date, total_minutes, sessions_completed, streak)
                 VALUES (?, ?, ?, ?)
                 RETURNING *",
            )
            .bind(stats.date)
            .bind(stats.total_minutes.unwrap_or(0))
            .bind(stats.sessions_completed.unwrap_or(0))
            .bind(stats.streak.unwrap_or(0))
            .fetch_one(pool)
            .await?;

            Ok(created)
        }
    }
}

#[allow(dead_code)]
#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<Option<User>, AppError> {
    info!("Fetching user by ID");
    let user = sqlx::query_as::<_, User>("SELECT id, username, password FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

#[allow(dead_code)]
#[instrument(skip(pool))]
pub async fn get_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    info!("Getting user by username");
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, password FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

#[allow(dead_code)]
#[instrument(skip_all, fields(username = %user.username))]
pub async fn create_user(pool: &Pool<Sqlite>, user: NewUser) -> Result<User, AppError> {
    info!("Creating new user");
    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, password) VALUES (?, ?) RETURNING id, username, password",
    )
    .bind(&user.username)
    .bind(user.password)
    .fetch_one(pool)
    .await;

    match result {
        Ok(created) => Ok(created),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
            format!("Username '{}' already exists", user.username),
        )),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(pool))]
pub async fn ping(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
