//! Example: repair an existing solution folder with the configured providers.
//!
//! The folder must hold a `model.txt` or `descriptor.txt` manifest and a
//! prepared `venv/` environment.
//!
//! Run with: `cargo run --example repair_solution -- solutions/calc "fix the crash"`

use solution_craft::events::FnEventHandler;
use solution_craft::{manifest, CorrectionLoop, CraftConfig, Event};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let folder = PathBuf::from(args.next().ok_or("usage: repair_solution <folder> [guidance]")?);
    let guidance = args.next();

    solution_craft::logging::init(std::env::var_os("CRAFT_VERBOSE").is_some());
    let config = CraftConfig::from_env()?;
    if config.credentialed().is_empty() {
        return Err("set at least one of OPENAI_API_KEY, GEMINI_API_KEY, ANTHROPIC_API_KEY".into());
    }

    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution".to_string());
    let mut solution = manifest::load(&folder, &name)?;

    let mut repair = CorrectionLoop::from_config(&config).with_event_handler(Arc::new(
        FnEventHandler(|event| match event {
            Event::PassStart { iteration, .. } => println!("-- pass {}", iteration),
            Event::ComponentRevised { component, .. } => println!("   revised {}", component),
            Event::RunFinished { status, .. } => println!("   run: {}", status),
            _ => {}
        }),
    ));
    if let Some(text) = guidance {
        repair = repair.with_user_instructions(text);
    }

    let outcome = repair.run(&mut solution).await?;

    println!("\n{:?} after {} passes", outcome.status, outcome.iterations);
    println!("{}", solution);
    if !outcome.succeeded() {
        println!("\nLast transcript:\n{}", solution.result_description);
    }
    Ok(())
}
