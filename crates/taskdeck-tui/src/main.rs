mod app;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use taskdeck_core::store::resolve_tasks_dir;

use crate::app::App;

/// Live terminal viewer for one session's task list.
#[derive(Parser)]
#[command(name = "taskdeck-tui", version)]
struct Args {
    /// Directory holding tasks.json and config.json.
    #[arg(long, env = "TASKS_DIR")]
    dir: Option<PathBuf>,
    /// Session to display.
    #[arg(long, env = "SESSION", default_value = "default")]
    session: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let dir = args.dir.unwrap_or_else(resolve_tasks_dir);

    let mut terminal = ratatui::init();
    let result = App::new(dir, args.session).run(&mut terminal);
    ratatui::restore();
    result
}
