use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use droidclaw::agent_engine::engine::AgentEngine;
use droidclaw::agent_engine::event_bus::ProgressEvent;
use droidclaw::agent_engine::state::Instruction;
use droidclaw::config;
use droidclaw::errors::{DroidClawError, DroidClawResult};
use droidclaw::llm::registry::ProviderRegistry;
use droidclaw::platform::adb::AdbDevice;
use droidclaw::platform::DeviceHandles;

const USAGE: &str = "usage: droidclaw \"<instruction>\" [max_steps]";

#[tokio::main]
async fn main() -> ExitCode {
    droidclaw::init_tracing();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "droidclaw failed");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> DroidClawResult<bool> {
    let mut args = std::env::args().skip(1);
    let goal = args.next().ok_or_else(|| DroidClawError::Config(USAGE.into()))?;

    let cfg = config::load_config()?;
    let step_budget = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| DroidClawError::Config(format!("invalid max_steps '{raw}'. {USAGE}")))?,
        None => cfg.agent.max_steps,
    };

    let registry = ProviderRegistry::from_config(&cfg)?;
    let (llm, endpoint) = registry.get_active()?;

    let adb = Arc::new(AdbDevice::from_config(&cfg.device));
    let handles = DeviceHandles {
        shell: Some(adb.clone()),
        apps: Some(adb.clone()),
        capturer: Some(adb),
        ..Default::default()
    };

    let mut engine = AgentEngine::from_handles(handles, &cfg, llm)?;

    let stop = engine.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current step");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let mut progress = engine.events().subscribe();
    tokio::spawn(async move {
        while let Ok(event) = progress.recv().await {
            match event {
                ProgressEvent::ToolFinished { step, tool, message, .. } => {
                    println!("[{}] {tool}: {message}", step + 1);
                }
                ProgressEvent::LoopDetected { step, tool, repeats } => {
                    println!("[{}] {tool} repeated {} times, intervening", step + 1, repeats + 1);
                }
                ProgressEvent::Thinking { step, thought } => {
                    tracing::debug!(step, thought = %thought, "model reasoning");
                }
                _ => {}
            }
        }
    });

    let instruction = Instruction { goal, step_budget, endpoint };
    let outcome = engine.run(&instruction).await?;
    println!(
        "{} after {} step(s): {}",
        if outcome.success { "Done" } else { "Stopped" },
        outcome.steps_taken,
        outcome.final_text
    );
    Ok(outcome.success)
}
