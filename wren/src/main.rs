use std::process::ExitCode;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::assemble::Assembler;

mod assemble;
mod assets;
mod config;
mod discover;
mod flags;
mod issue;
mod render;
mod route;

/// Configuration files, in order of preference.
pub const CONFIG_FILES: &[&str] = &["_config.yml", "_config.yaml", "_config.toml"];
pub const POSTS: &str = "posts";
pub const PAGES: &str = "pages";

folio::define_meta_key! {
    pub Url: "url" => Arc<str>,
    pub Slug: "slug" => Arc<str>,
    pub CollectionName: "collection" => Arc<str>,
    pub SourcePath: "path" => Arc<str>,
}

fn main() -> ExitCode {
    let flags = flags::Wren::from_env_or_exit();
    match flags.subcommand {
        flags::WrenCmd::Build(cmd) => build(cmd),
    }
}

fn build(cmd: flags::Build) -> ExitCode {
    let level = match cmd.verbose {
        true => LevelFilter::DEBUG,
        false => LevelFilter::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::builder().with_default_directive(level.into()).from_env_lossy())
        .with_writer(std::io::stderr)
        .init();

    let start = std::time::Instant::now();
    match Assembler::new(&cmd.input, &cmd.output).run() {
        Ok(report) => {
            print!("{report}");
            tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "build finished");
            match report.succeeded() {
                true => ExitCode::SUCCESS,
                false => ExitCode::FAILURE,
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
