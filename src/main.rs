mod accounts;
mod actor;
mod blockchain;
mod config;
mod error;
mod message;
mod report;
mod wallet;

use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use accounts::Accounts;
use actor::Actor;
use blockchain::{Ledger, Miner};
use config::{Config, ReportFormat};
use wallet::Wallet;

fn main() {
    let _ = dotenv();
    env_logger::init();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };
    if let Err(e) = run(&cfg) {
        error!("simulation failed: {e}");
        std::process::exit(1);
    }
}

fn run(cfg: &Config) -> error::Result<()> {
    println!(
        "⛓️ Mining with {} miners up to {} blocks ({} ms)",
        cfg.miners,
        cfg.target_length,
        cfg.run_time.as_millis()
    );

    let accounts = Arc::new(Accounts::new());
    let ledger = Arc::new(Ledger::new(cfg, accounts.clone()));
    let stop = Arc::new(AtomicBool::new(false));

    let actor = |name: String| {
        Actor::new(
            Arc::new(Wallet::generate(name)),
            accounts.clone(),
            ledger.clone(),
            cfg.starting_balance,
        )
    };

    let sender = actor("sender".into());
    let receiver = actor("receiver".into());
    sender.send_coins(&receiver, 50)?;

    let mut miners = Vec::with_capacity(cfg.miners);
    let mut workers = Vec::with_capacity(cfg.miners);
    for i in 1..=cfg.miners {
        let m = actor(format!("miner{i}"));
        let worker = Miner::new(m.wallet(), ledger.clone(), cfg.target_length);
        let stop = stop.clone();
        workers.push(thread::spawn(move || worker.run(&stop)));
        miners.push(m);
    }

    let started = Instant::now();
    if miners.len() >= 9 {
        miners[1].send_coins(&miners[0], 20)?;
        receiver.send_coins(&sender, 50)?;
        miners[0].send_coins(&miners[1], 20)?;
        thread::sleep(Duration::from_millis(5));
        miners[5].send_coins(&miners[3], 10)?;
        miners[8].send_coins(&miners[6], 20)?;
        thread::sleep(Duration::from_millis(5));
        miners[6].send_coins(&miners[4], 15)?;
        miners[3].send_coins(&miners[2], 10)?;
    } else {
        receiver.send_coins(&sender, 50)?;
    }

    thread::sleep(cfg.run_time.saturating_sub(started.elapsed()));
    stop.store(true, Ordering::Relaxed);
    info!("stop flag raised after {} ms", started.elapsed().as_millis());

    let deadline = Instant::now() + cfg.grace_period;
    let (mut sealed, mut accepted, mut discarded) = (0, 0, 0);
    for worker in workers {
        while !worker.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if !worker.is_finished() {
            warn!("a miner did not stop within the grace period");
            continue;
        }
        match worker.join() {
            Ok(stats) => {
                sealed += stats.sealed;
                accepted += stats.accepted;
                discarded += stats.discarded;
            }
            Err(_) => warn!("a miner thread panicked"),
        }
    }
    info!(
        "mining finished: {} sealed, {} accepted, {} discarded, chain valid: {}",
        sealed,
        accepted,
        discarded,
        ledger.is_valid_chain()
    );
    if ledger.is_empty() {
        warn!("no block was accepted before the stop flag");
    } else {
        info!(
            "tip #{} ({}), {} ids seen, {} messages still pending",
            ledger.current_tip_id(),
            ledger.last_digest(),
            ledger.seen_ids_len(),
            ledger.snapshot_of_pending().len()
        );
    }

    let chain = ledger.blocks();
    match cfg.report_format {
        ReportFormat::Text => print!("{}", report::render_text(&chain, ledger.block_reward())),
        ReportFormat::Json => {
            let json =
                report::render_json(&chain, ledger.current_difficulty(), ledger.block_reward())?;
            println!("{json}");
        }
    }
    Ok(())
}
