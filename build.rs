// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("forma")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Format source trees with containerized formatters")
        .arg(
            Arg::new("dry_run")
                .short('n')
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Dry run: report unformatted files without rewriting them"),
        )
        .arg(
            Arg::new("engine_progress")
                .short('2')
                .long("engine-progress")
                .action(ArgAction::SetTrue)
                .help("Stream build engine progress to stderr"),
        )
        .arg(
            Arg::new("paths")
                .num_args(0..)
                .help("Files or directories to format (defaults to the current directory)"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    if let Err(e) = fs::write(man_dir.join("forma.1"), buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
