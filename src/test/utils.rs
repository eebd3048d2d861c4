#[cfg(test)]
pub mod test_utils {
    use crate::db::{
        create_goal, create_note, create_or_update_study_stats, create_study_session,
        create_subject,
    };
    use crate::error::AppError;
    use crate::models::SessionStatus;
    use crate::schema::{NewGoal, NewNote, NewStudySession, NewStudyStats, NewSubject};
    use crate::{init_rocket, run_migrations};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use rocket::local::asynchronous::Client;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;
    use std::time::Duration;
    use tracing::log::LevelFilter;

    static INIT: Once = Once::new();

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("invalid test date")
    }

    pub fn at(day: &str, hour: u32) -> DateTime<Utc> {
        let day = date(day);
        Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).expect("invalid test hour"))
    }

    pub fn new_subject(name: &str) -> NewSubject {
        NewSubject {
            name: name.to_string(),
            color: "#3b82f6".to_string(),
            icon: "book".to_string(),
            current_topic: None,
            progress: 0,
            total_hours: 0.0,
        }
    }

    struct TestSession {
        subject_name: String,
        title: String,
        date: String,
        status: SessionStatus,
    }

    struct TestNote {
        subject_name: String,
        title: String,
        content: String,
    }

    struct TestGoal {
        title: String,
        target_date: String,
    }

    struct TestStats {
        date: String,
        total_minutes: i64,
    }

    #[derive(Default)]
    pub struct TestDbBuilder {
        subjects: Vec<String>,
        sessions: Vec<TestSession>,
        notes: Vec<TestNote>,
        goals: Vec<TestGoal>,
        stats: Vec<TestStats>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn subject(mut self, name: &str) -> Self {
            self.subjects.push(name.to_string());
            self
        }

        pub fn session(
            mut self,
            subject_name: &str,
            title: &str,
            date: &str,
            status: SessionStatus,
        ) -> Self {
            self.sessions.push(TestSession {
                subject_name: subject_name.to_string(),
                title: title.to_string(),
                date: date.to_string(),
                status,
            });
            self
        }

        pub fn note(mut self, subject_name: &str, title: &str, content: &str) -> Self {
            self.notes.push(TestNote {
                subject_name: subject_name.to_string(),
                title: title.to_string(),
                content: content.to_string(),
            });
            self
        }

        pub fn goal(mut self, title: &str, target_date: &str) -> Self {
            self.goals.push(TestGoal {
                title: title.to_string(),
                target_date: target_date.to_string(),
            });
            self
        }

        pub fn stats(mut self, date: &str, total_minutes: i64) -> Self {
            self.stats.push(TestStats {
                date: date.to_string(),
                total_minutes,
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .filter_level(LevelFilter::Debug)
                    .is_test(true)
                    .try_init();
            });

            // A single connection keeps every query on the same in-memory database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect("sqlite::memory:")
                .await?;

            run_migrations(&pool).await?;

            let mut subject_id_map: HashMap<String, i64> = HashMap::new();
            let mut session_id_map: HashMap<String, i64> = HashMap::new();
            let mut note_id_map: HashMap<String, i64> = HashMap::new();
            let mut goal_id_map: HashMap<String, i64> = HashMap::new();

            for name in &self.subjects {
                let subject = create_subject(&pool, new_subject(name)).await?;
                subject_id_map.insert(name.clone(), subject.id);
            }

            for session in self.sessions {
                let subject_id = subject_id_map
                    .get(&session.subject_name)
                    .copied()
                    .unwrap_or(0);

                let created = create_study_session(
                    &pool,
                    NewStudySession {
                        subject_id,
                        title: session.title.clone(),
                        description: None,
                        start_time: at(&session.date, 9),
                        end_time: at(&session.date, 10),
                        date: date(&session.date),
                        status: session.status,
                        actual_duration: 0,
                    },
                )
                .await?;

                session_id_map.insert(session.title, created.id);
            }

            for note in self.notes {
                let subject_id = subject_id_map
                    .get(&note.subject_name)
                    .copied()
                    .unwrap_or(0);

                let created = create_note(
                    &pool,
                    NewNote {
                        subject_id,
                        title: note.title.clone(),
                        content: note.content,
                        created_at: Utc::now(),
                    },
                )
                .await?;

                note_id_map.insert(note.title, created.id);
            }

            for goal in self.goals {
                let created = create_goal(
                    &pool,
                    NewGoal {
                        title: goal.title.clone(),
                        description: None,
                        target_date: date(&goal.target_date),
                        progress: 0,
                        completed: false,
                    },
                )
                .await?;

                goal_id_map.insert(goal.title, created.id);
            }

            for stats in self.stats {
                create_or_update_study_stats(
                    &pool,
                    NewStudyStats {
                        date: date(&stats.date),
                        total_minutes: Some(stats.total_minutes),
                        ..Default::default()
                    },
                )
                .await?;
            }

            Ok(TestDb {
                pool,
                subject_id_map,
                session_id_map,
                note_id_map,
                goal_id_map,
            })
        }
    }

    #[derive(Debug)]
    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub subject_id_map: HashMap<String, i64>,
        pub session_id_map: HashMap<String, i64>,
        pub note_id_map: HashMap<String, i64>,
        pub goal_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn subject_id(&self, name: &str) -> Option<i64> {
            self.subject_id_map.get(name).copied()
        }

        pub fn session_id(&self, title: &str) -> Option<i64> {
            self.session_id_map.get(title).copied()
        }

        pub fn note_id(&self, title: &str) -> Option<i64> {
            self.note_id_map.get(title).copied()
        }

        pub fn goal_id(&self, title: &str) -> Option<i64> {
            self.goal_id_map.get(title).copied()
        }

        pub async fn count_rows(&self, table: &str) -> i64 {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await
                .expect("Failed to count rows")
        }
    }

    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .subject("Math")
            .subject("History")
            .session("Math", "Derivatives", "2025-03-01", SessionStatus::Completed)
            .session("Math", "Integrals", "2025-03-02", SessionStatus::Upcoming)
            .session("History", "Rome", "2025-03-01", SessionStatus::InProgress)
            .note("Math", "Chain rule", "d/dx f(g(x)) = f'(g(x)) g'(x)")
            .note("History", "Punic wars", "Three wars between Rome and Carthage")
            .goal("Finish calculus", "2025-06-01")
            .stats("2025-03-01", 90)
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone()).await;
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to build rocket client");

        (client, test_db)
    }
}
