//! Interactive console
//!
//! A rustyline REPL on a blocking thread turns typed lines into
//! [`ReplCommand`]s for the main loop.

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{combo_label, EngineStatus, KeyPreset, SlotId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Learn(SlotId),
    Cancel,
    Keys(SlotId, KeyPreset),
    Status,
    Ports,
    Help,
    Quit,
}

impl ReplCommand {
    /// Parse one console line, `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (command.to_lowercase().as_str(), args.as_slice()) {
            ("learn" | "l", [slot]) => ReplCommand::Learn(slot.parse()?),
            ("learn" | "l", _) => return Err("usage: learn <primary|secondary>".to_string()),
            ("cancel" | "c", []) => ReplCommand::Cancel,
            ("keys" | "k", [slot, preset]) => ReplCommand::Keys(slot.parse()?, preset.parse()?),
            ("keys" | "k", _) => {
                return Err("usage: keys <primary|secondary> <horizontal|vertical|page|space>".to_string())
            }
            ("status" | "s", []) => ReplCommand::Status,
            ("ports" | "p", []) => ReplCommand::Ports,
            ("help" | "h" | "?", _) => ReplCommand::Help,
            ("quit" | "exit" | "q", _) => ReplCommand::Quit,
            (other, _) => return Err(format!("unknown command '{}' (try 'help')", other)),
        };
        Ok(Some(command))
    }
}

/// Run the REPL until `quit`, Ctrl+D or the receiver is dropped
///
/// Blocks the calling thread; run it on a dedicated thread so a pending
/// read never holds the runtime open on exit.
pub fn run_repl(tx: mpsc::UnboundedSender<ReplCommand>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    loop {
        match rl.readline("turner> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                match ReplCommand::parse(&line) {
                    Ok(Some(command)) => {
                        if tx.send(command).is_err() || command == ReplCommand::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = tx.send(ReplCommand::Quit);
                break;
            }
            Err(e) => {
                debug!("Console read failed: {}", e);
                let _ = tx.send(ReplCommand::Quit);
                break;
            }
        }
    }

    Ok(())
}

pub fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  learn <primary|secondary>   capture the next MIDI message as trigger");
    println!("  cancel                      abort a pending learn");
    println!("  keys <slot> <preset>        horizontal, vertical, page or space");
    println!("  status                      show both triggers");
    println!("  ports                       list MIDI input ports");
    println!("  quit                        exit");
}

pub fn print_status(status: &EngineStatus) {
    for slot in &status.slots {
        let label = if slot.bound {
            slot.label.green()
        } else if status.learning == Some(slot.slot) {
            slot.label.yellow()
        } else {
            slot.label.dimmed()
        };
        let state = if slot.active { "ON ".green().bold() } else { "off".dimmed() };
        println!(
            "  {:<9} {} {}  keys: {} ({})",
            slot.slot.as_str().bold(),
            state,
            label,
            slot.preset,
            combo_label(slot.combo)
        );
    }
    if !status.cooldown_remaining.is_zero() {
        println!("  cooldown: {}ms", status.cooldown_remaining.as_millis());
    }
    println!("  page turns: {}", status.fire_count);
}
