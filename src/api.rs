use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Created;
use rocket::serde::json::{self, Json};
use sqlx::{Pool, Sqlite};

use crate::db::{
    create_goal, create_note, create_or_update_study_stats, create_study_session, create_subject,
    delete_goal, delete_note, delete_study_session, delete_subject, get_all_study_stats, get_goal,
    get_goals, get_note, get_notes, get_study_session, get_study_sessions,
    get_study_stats_for_date, get_subject, get_subjects, ping, update_goal, update_note,
    update_study_session, update_subject,
};
use crate::error::AppError;
use crate::models::{Goal, Note, StudySession, StudyStats, Subject};
use crate::schema::{
    GoalChanges, GoalPayload, NoteChanges, NotePayload, StudySessionChanges, StudySessionPayload,
    StudyStatsPayload, SubjectChanges, SubjectPayload,
};
use crate::validation::{JsonBodyExt, Normalize, parse_date_param, parse_id_param};

type Body<'r, T> = Result<Json<T>, json::Error<'r>>;

fn deleted(removed: bool, entity: &str, id: i64) -> Result<Status, AppError> {
    if removed {
        Ok(Status::NoContent)
    } else {
        Err(AppError::not_found(entity, id))
    }
}

#[get("/subjects")]
pub async fn api_get_subjects(db: &State<Pool<Sqlite>>) -> Result<Json<Vec<Subject>>, AppError> {
    Ok(Json(get_subjects(db).await?))
}

#[get("/subjects/<id>")]
pub async fn api_get_subject(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Subject>, AppError> {
    get_subject(db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Subject", id))
}

#[post("/subjects", data = "<subject>")]
pub async fn api_create_subject(
    subject: Body<'_, SubjectPayload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Created<Json<Subject>>, AppError> {
    let validated = subject.into_payload()?.validate_custom()?;
    let created = create_subject(db, validated).await?;

    Ok(Created::new(format!("/api/subjects/{}", created.id)).body(Json(created)))
}

#[patch("/subjects/<id>", data = "<changes>")]
pub async fn api_update_subject(
    id: i64,
    changes: Body<'_, SubjectChanges>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Subject>, AppError> {
    update_subject(db, id, changes.into_payload()?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Subject", id))
}

#[delete("/subjects/<id>")]
pub async fn api_delete_subject(id: i64, db: &State<Pool<Sqlite>>) -> Result<Status, AppError> {
    deleted(delete_subject(db, id).await?, "Subject", id)
}

#[get("/study-sessions?<date>")]
pub async fn api_get_study_sessions(
    date: Option<&str>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StudySession>>, AppError> {
    let date = date.map(|d| parse_date_param("date", d)).transpose()?;

    Ok(Json(get_study_sessions(db, date).await?))
}

#[get("/study-sessions/<id>")]
pub async fn api_get_study_session(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StudySession>, AppError> {
    get_study_session(db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Study session", id))
}

#[post("/study-sessions", data = "<session>")]
pub async fn api_create_study_session(
    session: Body<'_, StudySessionPayload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Created<Json<StudySession>>, AppError> {
    let validated = session.into_payload()?.validate_custom()?;
    let created = create_study_session(db, validated).await?;

    Ok(Created::new(format!("/api/study-sessions/{}", created.id)).body(Json(created)))
}

#[patch("/study-sessions/<id>", data = "<changes>")]
pub async fn api_update_study_session(
    id: i64,
    changes: Body<'_, StudySessionChanges>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StudySession>, AppError> {
    update_study_session(db, id, changes.into_payload()?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Study session", id))
}

#[delete("/study-sessions/<id>")]
pub async fn api_delete_study_session(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    deleted(delete_study_session(db, id).await?, "Study session", id)
}

#[derive(FromForm)]
pub struct NotesQueryParams {
    #[field(name = "subjectId")]
    subject_id: Option<String>,
}

#[get("/notes?<params..>")]
pub async fn api_get_notes(
    params: NotesQueryParams,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Note>>, AppError> {
    let subject_id = params
        .subject_id
        .as_deref()
        .map(|id| parse_id_param("subjectId", id))
        .transpose()?;

    Ok(Json(get_notes(db, subject_id).await?))
}

#[get("/notes/<id>")]
pub async fn api_get_note(id: i64, db: &State<Pool<Sqlite>>) -> Result<Json<Note>, AppError> {
    get_note(db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Note", id))
}

#[post("/notes", data = "<note>")]
pub async fn api_create_note(
    note: Body<'_, NotePayload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Created<Json<Note>>, AppError> {
    let validated = note.into_payload()?.validate_custom()?;
    let created = create_note(db, validated).await?;

    Ok(Created::new(format!("/api/notes/{}", created.id)).body(Json(created)))
}

#[patch("/notes/<id>", data = "<changes>")]
pub async fn api_update_note(
    id: i64,
    changes: Body<'_, NoteChanges>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Note>, AppError> {
    update_note(db, id, changes.into_payload()?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Note", id))
}

#[delete("/notes/<id>")]
pub async fn api_delete_note(id: i64, db: &State<Pool<Sqlite>>) -> Result<Status, AppError> {
    deleted(delete_note(db, id).await?, "Note", id)
}

#[get("/goals")]
pub async fn api_get_goals(db: &State<Pool<Sqlite>>) -> Result<Json<Vec<Goal>>, AppError> {
    Ok(Json(get_goals(db).await?))
}

#[get("/goals/<id>")]
pub async fn api_get_goal(id: i64, db: &State<Pool<Sqlite>>) -> Result<Json<Goal>, AppError> {
    get_goal(db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Goal", id))
}

#[post("/goals", data = "<goal>")]
pub async fn api_create_goal(
    goal: Body<'_, GoalPayload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Created<Json<Goal>>, AppError> {
    let validated = goal.into_payload()?.validate_custom()?;
    let created = create_goal(db, validated).await?;

    Ok(Created::new(format!("/api/goals/{}", created.id)).body(Json(created)))
}

#[patch("/goals/<id>", data = "<changes>")]
pub async fn api_update_goal(
    id: i64,
    changes: Body<'_, GoalChanges>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Goal>, AppError> {
    update_goal(db, id, changes.into_payload()?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Goal", id))
}

#[delete("/goals/<id>")]
pub async fn api_delete_goal(id: i64, db: &State<Pool<Sqlite>>) -> Result<Status, AppError> {
    deleted(delete_goal(db, id).await?, "Goal", id)
}

/// With a date, answers with that day's row or `null`.
#[get("/study-stats?<date>")]
pub async fn api_get_study_stats_for_date(
    date: &str,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Option<StudyStats>>, AppError> {
    let date = parse_date_param("date", date)?;

    Ok(Json(get_study_stats_for_date(db, date).await?))
}

#[get("/study-stats", rank = 2)]
pub async fn api_get_all_study_stats(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<StudyStats>>, AppError> {
    Ok(Json(get_all_study_stats(db).await?))
}

#[post("/study-stats", data = "<stats>")]
pub async fn api_upsert_study_stats(
    stats: Body<'_, StudyStatsPayload>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<StudyStats>, AppError> {
    let validated = stats.into_payload()?.validate_custom()?;

    Ok(Json(create_or_update_study_stats(db, validated).await?))
}

#[get("/health")]
pub async fn health(db: &State<Pool<Sqlite>>) -> Result<&'static str, AppError> {
    ping(db).await?;
    Ok("OK")
}
