use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

/// Frame a screenshot and export it.
#[derive(Debug, Parser)]
#[command(name = "shotframe", version, about)]
struct Cli {
    /// Screenshot to frame (PNG, JPEG, ...).
    input: PathBuf,
    /// Scene description in JSON; editor defaults from config.json apply when omitted.
    #[arg(long)]
    scene: Option<PathBuf>,
    /// Output directory for `screenshot.<ext>` (defaults to ~/Pictures).
    #[arg(long = "out", value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = shotframe::RunOptions {
        input: cli.input,
        scene: cli.scene,
        out_dir: cli.out_dir,
    };
    let path = shotframe::run(&options)
        .with_context(|| format!("failed to export {}", options.input.display()))?;
    println!("{}", path.display());
    Ok(())
}
