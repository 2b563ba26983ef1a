//! Command listing
//!
//! Usage: dashkit commands [--json]

use clap::Args;
use dashkit_model::commands::command_types;
use dashkit_runtime::handlers::is_handled;
use serde::Serialize;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandEntry {
    #[serde(rename = "type")]
    command_type: &'static str,
    handled: bool,
}

fn entries() -> Vec<CommandEntry> {
    command_types::ALL
        .iter()
        .map(|command_type| CommandEntry {
            command_type,
            handled: is_handled(command_type),
        })
        .collect()
}

/// Execute commands listing
///
/// # Errors
///
/// Fails only when the JSON listing cannot be encoded.
pub fn execute(args: ListArgs) -> anyhow::Result<()> {
    let entries = entries();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in &entries {
        let status = if entry.handled { "handled" } else { "rejected" };
        println!("{:<60} {}", entry.command_type, status);
    }
    Ok(())
}
