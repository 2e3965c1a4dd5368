//! User controls: Start, End and Capture.
//!
//! Input adapters run on their own threads and only ever send `Command`s; the
//! session drains the channel between cycles on its own thread.

use std::io::BufRead;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{anyhow, Context, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    End,
    Capture,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "start" | "s" => Ok(Command::Start),
            "end" | "stop" | "quit" | "q" => Ok(Command::End),
            "capture" | "c" => Ok(Command::Capture),
            other => Err(anyhow!(
                "unknown command '{}'; expected start, capture or end",
                other
            )),
        }
    }
}

pub fn channel() -> (Sender<Command>, Receiver<Command>) {
    mpsc::channel()
}

/// Forward commands typed on stdin, one per line, until EOF.
pub fn spawn_stdin_reader(tx: Sender<Command>) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &tx))
        .context("failed to spawn stdin reader")
}

/// Send End on Ctrl-C.
pub fn install_interrupt_handler(tx: Sender<Command>) -> Result<()> {
    ctrlc::set_handler(move || {
        let _ = tx.send(Command::End);
    })
    .context("failed to install Ctrl-C handler")
}

fn forward_lines<R: BufRead>(reader: R, tx: &Sender<Command>) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(command) => {
                if tx.send(command).is_err() {
                    break;
                }
            }
            Err(e) => log::warn!("{}", e),
        }
    }
}
