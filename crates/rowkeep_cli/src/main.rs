//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `rowkeep_core` linkage.
//! - Exercise one criteria chain against an in-memory database.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `rowkeep_cli [config.json]`

use log::info;
use rowkeep_core::{
    BasicCriteria, CoreConfig, Migration, Model, PageRequest, Relation, Repository,
    SqliteRepository,
};
use std::process::ExitCode;

struct Project;

impl Model for Project {
    fn table() -> &'static str {
        "projects"
    }

    fn relations() -> &'static [Relation] {
        const RELATIONS: &[Relation] = &[Relation::has_many("tasks", "tasks", "project_id")];
        RELATIONS
    }
}

const DEMO_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "
CREATE TABLE projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    status TEXT NOT NULL
);
CREATE TABLE tasks (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    project_id INTEGER REFERENCES projects(id) ON DELETE CASCADE
);
INSERT INTO projects (name, status) VALUES ('alpha', 'active'), ('beta', 'paused'), ('gamma', 'active');
INSERT INTO tasks (title, project_id) VALUES ('draft', 1), ('review', 1), ('ship', 3);
",
}];

fn main() -> ExitCode {
    println!("rowkeep_core ping={}", rowkeep_core::ping());
    println!("rowkeep_core version={}", rowkeep_core::core_version());

    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("rowkeep_cli error={message}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<String>) -> Result<(), String> {
    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => CoreConfig::default(),
    };
    let logging = rowkeep_core::init_logging_from(&config)?;
    println!("rowkeep_core logging={}", if logging { "file" } else { "off" });

    let conn = rowkeep_core::open_db_in_memory(&config.db, DEMO_MIGRATIONS)
        .map_err(|err| err.to_string())?;
    let mut projects = SqliteRepository::<Project>::with_config(&conn, &config.repository);

    let active = projects
        .with(["tasks"])
        .order_by_desc("name")
        .get_by("status", "active".into())
        .map_err(|err| err.to_string())?;
    let page = projects
        .paginate_all(&PageRequest::new(2))
        .map_err(|err| err.to_string())?;
    info!(
        "event=cli_probe module=cli status=ok active={} total={}",
        active.len(),
        page.total
    );

    println!(
        "active_projects={}",
        serde_json::to_string(&active).map_err(|err| err.to_string())?
    );
    println!(
        "page current={} last={} total={}",
        page.current_page, page.last_page, page.total
    );
    Ok(())
}

fn load_config(path: &str) -> Result<CoreConfig, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read config `{path}`: {err}"))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid config `{path}`: {err}"))
}
