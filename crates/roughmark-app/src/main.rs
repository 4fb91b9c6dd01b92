//! Main application entry point.

use roughmark_app::{Host, SceneConfig, SceneResult};
use std::process::ExitCode;

const USAGE: &str = "usage: roughmark <scene.json> [--json]";

fn run(path: &str, json: bool) -> SceneResult<()> {
    let scene = SceneConfig::load(path)?;
    log::info!(
        "loaded scene with {} nodes and {} steps",
        scene.nodes.len(),
        scene.steps.len()
    );
    let host = Host::run(&scene)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&host.engine().calls())?);
    } else {
        for line in host.describe_calls() {
            println!("{}", line);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    match run(path, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
