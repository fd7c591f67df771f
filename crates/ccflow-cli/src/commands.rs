use super::args::{Cli, Commands};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Transcript {
            path,
            output,
            compact,
        } => transcript(&path, output.as_deref(), compact),
    }
}

fn transcript(path: &Path, output: Option<&Path>, compact: bool) -> Result<()> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }

    let session = ccflow_engine::parse_session(path)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let session_id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("session");

    let json = ccflow_engine::render_json(&session, session_id, compact)?;

    match output {
        Some(target) => {
            fs::write(target, &json)
                .with_context(|| format!("failed to write {}", target.display()))?;
            eprintln!("Written to {}", target.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
