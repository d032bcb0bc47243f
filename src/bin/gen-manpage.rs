//! Man page generator for ecpflasher
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]
//!
//! Writes `ecpflasher.1` plus one `ecpflasher-<command>.1` per subcommand.

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
#[allow(dead_code)]
mod cli;

fn render(cmd: clap::Command, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut buffer)?;
    let path = dir.join(format!("{}.1", name));
    fs::write(&path, buffer)?;
    Ok(path)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let main_page = render(cmd.clone(), &output_dir, "ecpflasher")?;
    for sub in cmd.get_subcommands() {
        let name = format!("ecpflasher-{}", sub.get_name());
        render(sub.clone(), &output_dir, &name)?;
    }

    println!("Man pages generated in: {}", output_dir.display());
    println!("\nTo view the main page:");
    println!("  man -l {}", main_page.display());
    Ok(())
}
