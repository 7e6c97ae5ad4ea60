//! Terminal front end for the timetable engine.
//!
//! Prints the weekly grid for one group, room or teacher.
//!
//! # Usage
//!
//! ```bash
//! timetable group 5
//! timetable room 12 2081 --config timetable.json
//! TIMETABLE_TOKEN=... timetable teacher ram@example.edu
//! ```
//!
//! # Environment Variables
//!
//! - `TIMETABLE_API_URL`: base URL of the routine API
//! - `TIMETABLE_TOKEN`: bearer token; without it the client is anonymous
//! - `TIMETABLE_EMAIL`, `TIMETABLE_ROLE`: identity for the token (role defaults to admin)
//! - `RUST_LOG`: log filter (default: info)

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use timetable::routine::{
    default_year, AppConfig, AuthContext, AuthHandle, CellState, HttpTimetableApi, Role, Scope,
    TimeSlotGrid, TimetableApi, ViewAdapter, ViewContext, TOKEN_ENV,
};

const EMAIL_ENV: &str = "TIMETABLE_EMAIL";
const ROLE_ENV: &str = "TIMETABLE_ROLE";

struct Args {
    scope: Scope,
    year: Option<i32>,
    config: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(PathBuf::from(args.next().context("--config needs a path")?));
        } else {
            positional.push(arg);
        }
    }

    let (kind, id, year) = match positional.as_slice() {
        [kind, id] => (kind, id, None),
        [kind, id, year] => (kind, id, Some(year.parse::<i32>().context("year must be a number")?)),
        _ => bail!("usage: timetable <group|room|teacher> <id> [year] [--config <path>]"),
    };

    let scope = match kind.as_str() {
        "group" => Scope::Group(id.parse().context("group id must be a number")?),
        "room" => Scope::Room(id.parse().context("room id must be a number")?),
        "teacher" => Scope::Teacher(id.clone()),
        other => bail!("unknown scope {other:?}, expected group, room or teacher"),
    };

    Ok(Args {
        scope,
        year,
        config,
    })
}

fn auth_from_env() -> anyhow::Result<AuthHandle> {
    let Ok(token) = env::var(TOKEN_ENV) else {
        return Ok(AuthHandle::anonymous());
    };
    let email = env::var(EMAIL_ENV).unwrap_or_default();
    let role = match env::var(ROLE_ENV).as_deref() {
        Ok("admin") | Err(_) => Role::Admin,
        Ok("teacher") => Role::Teacher,
        Ok("student") => Role::Student,
        Ok(other) => bail!("unknown role {other:?} in {ROLE_ENV}"),
    };
    Ok(AuthHandle::signed_in(AuthContext::new(email, role, token)))
}

fn render(view: &ViewAdapter) -> String {
    let grid = view.grid();
    let mut out = format!("{}\n", view.context());

    let header: Vec<String> = grid.time_slots().iter().map(|t| t.to_string()).collect();
    out.push_str(&format!("{:<5}| {}\n", "", header.join(" | ")));

    for (day, row) in grid.rows() {
        let cells: Vec<String> = row
            .into_iter()
            .map(|slot| {
                let cell = view.cell_view(slot);
                let marker = match cell.state {
                    CellState::Conflicted { .. } => "! ",
                    _ => "",
                };
                if cell.is_empty() {
                    "-".to_string()
                } else {
                    format!("{marker}{}", cell.lines.join(" / "))
                }
            })
            .collect();
        out.push_str(&format!("{:<5}| {}\n", day.code(), cells.join(" | ")));
    }
    out
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .with_env_overrides();

    let auth = auth_from_env()?;
    let api = HttpTimetableApi::new(config.client.clone(), auth.clone())?;

    let year = match args.year {
        Some(year) => year,
        None => default_year(&api.available_years().await.unwrap_or_default()),
    };
    let context = ViewContext::new(args.scope, year);
    info!(context = %context, base_url = %config.client.base_url, "Loading timetable");

    let mut view = ViewAdapter::new(
        context,
        TimeSlotGrid::from_config(&config.grid),
        config.edit_policy.clone(),
        auth,
    );
    view.refresh(&api).await;

    print!("{}", render(&view));
    for notice in view.drain_notices() {
        eprintln!("[{}] {}", notice.level, notice.message);
    }
    Ok(())
}
