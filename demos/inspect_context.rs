/// Print the context an AI prompt builder would receive for a repository
///
/// Usage:
///   cargo run --example inspect_context [PATH] [-- PATHSPEC...]
///
/// Settings come from ~/.config/gitctx/config.toml when present. Set
/// RUST_LOG=gitctx=debug to see each git invocation.
use gitctx::config::Config;
use gitctx::{ContextOptions, ErrorReport, get_git_context};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gitctx=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring config file: {}", e);
            Config::default_config()
        }
    };
    let mut options = ContextOptions::from_config(&config);

    let args: Vec<String> = env::args().skip(1).collect();
    let (dirs, paths) = match args.iter().position(|a| a == "--") {
        Some(sep) => (&args[..sep], &args[sep + 1..]),
        None => (&args[..], &[][..]),
    };
    if let Some(dir) = dirs.first() {
        options = options.with_working_dir(dir);
    }
    if !paths.is_empty() {
        options = options.with_paths(paths.iter().cloned());
    }

    match get_git_context(&options).await {
        Ok(context) => match context.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing context: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            let report = ErrorReport::from_error(&e);
            match report.to_json() {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("Error: {}", e),
            }
            std::process::exit(1);
        }
    }
}
