//! Host side of the engine: the cooperative scheduler loop and a simulated
//! chat server standing in for the real event bus.

pub mod prompt;
pub mod sim;

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::db::queries::saved_entries;
use crate::engine::bus::{BusEvent, ChatBus, NoticeLevel};
use crate::engine::commands::Command;
use crate::engine::knight_engine::KnightEngine;

/// A bus the host loop can pump: advance host-side state one tick and
/// collect the events it produced.
pub trait HostBus: ChatBus {
    fn step(&mut self);
    fn take_events(&mut self) -> Vec<BusEvent>;
}

/// Input to the host loop from the prompt.
#[derive(Debug)]
pub enum HostInput {
    Command(Command),
    Quit,
}

/// Write the saved set to storage if it changed.
pub async fn flush_saved<B: ChatBus>(engine: &mut KnightEngine<B>, pool: Option<&SqlitePool>) {
    let Some(entries) = engine.take_saved_changes() else {
        return;
    };
    let Some(pool) = pool else {
        return;
    };
    if let Err(e) = saved_entries::replace_all(pool, &entries).await {
        warn!(error = %e, "failed to persist saved players");
    }
}

/// Deliver everything the bus produced, then run one engine tick.
pub fn pump_once<B: HostBus>(engine: &mut KnightEngine<B>) {
    engine.bus_mut().step();
    let events = engine.bus_mut().take_events();
    for event in events {
        engine.on_bus_event(event);
    }
    engine.on_tick();
}

/// Run the engine until the input side closes or asks to quit.
///
/// Ticks, bus events and commands are handled strictly one at a time on
/// this task.
pub async fn run<B, F>(
    mut engine: KnightEngine<B>,
    pool: Option<SqlitePool>,
    tick_rate_hz: u32,
    mut input: mpsc::Receiver<HostInput>,
    mut output: F,
) -> KnightEngine<B>
where
    B: HostBus,
    F: FnMut(&str),
{
    let period = Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(tick_rate_hz, "host loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                pump_once(&mut engine);
            }
            msg = input.recv() => {
                match msg {
                    Some(HostInput::Command(command)) => {
                        match engine.execute(command) {
                            Ok(lines) => lines.iter().for_each(|l| output(l.as_str())),
                            Err(e) => output(&format!("error: {e}")),
                        }
                        flush_saved(&mut engine, pool.as_ref()).await;
                    }
                    Some(HostInput::Quit) | None => break,
                }
            }
        }

        for notice in engine.drain_notices() {
            match notice.level {
                NoticeLevel::Info => output(&notice.text),
                NoticeLevel::Warning => output(&format!("! {}", notice.text)),
            }
        }
    }

    flush_saved(&mut engine, pool.as_ref()).await;
    info!("host loop stopped");
    engine
}
