#[macro_use]
extern crate rocket;

mod api;
mod db;
mod env;
mod error;
mod models;
mod schema;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_create_goal, api_create_note, api_create_study_session, api_create_subject,
    api_delete_goal, api_delete_note, api_delete_study_session, api_delete_subject,
    api_get_all_study_stats, api_get_goal, api_get_goals, api_get_note, api_get_notes,
    api_get_study_session, api_get_study_sessions, api_get_study_stats_for_date, api_get_subject,
    api_get_subjects, api_update_goal, api_update_note, api_update_study_session,
    api_update_subject, api_upsert_study_stats, health,
};
use env::{DatabaseConfig, load_environment};
use error::{AppError, default_catcher};
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::{TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    let env_files = load_environment()?;
    init_tracing();
    info!(files = ?env_files, "Loaded environment");

    let config = DatabaseConfig::from_env()?;
    let pool = config.connect().await?;

    info!("Running database migrations...");
    run_migrations(&pool).await?;
    info!("Migrations completed successfully");

    let _rocket = init_rocket(pool).await.launch().await?;

    Ok(())
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting study planner");

    rocket::build()
        .manage(pool)
        .mount(
            "/api",
            routes![
                api_get_subjects,
                api_get_subject,
                api_create_subject,
                api_update_subject,
                api_delete_subject,
                api_get_study_sessions,
                api_get_study_session,
                api_create_study_session,
                api_update_study_session,
                api_delete_study_session,
                api_get_notes,
                api_get_note,
                api_create_note,
                api_update_note,
                api_delete_note,
                api_get_goals,
                api_get_goal,
                api_create_goal,
                api_update_goal,
                api_delete_goal,
                api_get_study_stats_for_date,
                api_get_all_study_stats,
                api_upsert_study_stats,
                health,
            ],
        )
        .register("/", catchers![default_catcher])
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async { shutdown_telemetry() })
        }))
}
