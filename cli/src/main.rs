mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cli::{Cli, Command};
use common::bus::LogSink;
use common::logger::init_tracing;
use economy::db::Db;
use economy::genesis;
use economy::ledger;
use executor::sandbox::ProcessSandbox;
use market::auction;
use market::resources::{BundleRequest, MARKET_RESOURCES, default_supply};
use orchestrator::bootstrap::bootstrap_genesis;
use orchestrator::config::OrchestratorConfig;
use orchestrator::cycle::CycleDriver;
use orchestrator::operator::{NeutralOperator, Operator, StdinOperator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.json_logs);

    let cfg = OrchestratorConfig::from_env();
    let db = Db::connect(&cfg.database_url).await?;
    db.migrate().await?;

    match args.command {
        Command::Init => {
            db.seed_market(&MARKET_RESOURCES).await?;
            let root = genesis::create_root(&db, &cfg.workspace_root).await?;
            println!("genesis agent ready with {} credits", root.balance);

            if let Some(execution_id) = bootstrap_genesis(&db, &LogSink).await? {
                println!("bootstrapped first execution: {execution_id}");
            }
        }

        Command::Cycle { neutral } => {
            let driver = build_driver(&db, &cfg, neutral);
            driver.run_cycle().await?;
        }

        Command::Run {
            neutral,
            interval_ms,
        } => {
            let driver = build_driver(&db, &cfg, neutral);
            let interval = Duration::from_millis(interval_ms.unwrap_or(cfg.cycle_interval_ms));

            tokio::select! {
                _ = driver.run_loop(interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                }
            }
        }

        Command::Bid {
            agent,
            amount,
            cpu,
            memory,
            tokens,
            attention,
            duration,
        } => {
            let bundle = BundleRequest {
                cpu_percent: Some(cpu),
                memory_percent: Some(memory),
                tokens_percent: Some(tokens),
                attention_percent: Some(attention),
                duration_seconds: Some(duration),
                ..BundleRequest::default()
            }
            .normalize(&default_supply())?;

            let mut tx = db.begin().await?;
            economy::store::market::insert_bundle(&mut *tx, &bundle).await?;
            let bid = auction::place_bid(&mut *tx, &agent, &bundle.id, amount).await?;
            tx.commit().await?;

            println!("bid {} pending for agent {agent}", bid.id);
        }

        Command::Spawn { parent, credits } => {
            let child = genesis::spawn_child(
                &db,
                &LogSink,
                &cfg.workspace_root,
                &parent,
                credits,
                &[],
            )
            .await?;
            println!("spawned {} with {} credits", child.id, child.balance);
        }

        Command::Balance { agent } => {
            let mut conn = db.pool().acquire().await?;
            let balance = ledger::balance(&mut conn, &agent).await?;
            println!("{agent}: {balance} credits");

            for tx in ledger::history(&mut conn, &agent).await?.iter().take(10) {
                println!(
                    "  {} -> {}  {:>10.2}  {}",
                    tx.from_entity, tx.to_entity, tx.amount, tx.memo
                );
            }
        }
    }

    Ok(())
}

fn build_driver(db: &Db, cfg: &OrchestratorConfig, neutral: bool) -> CycleDriver {
    let sandbox = Arc::new(ProcessSandbox::new(
        cfg.sandbox_program.clone(),
        cfg.sandbox_args.clone(),
    ));
    let operator: Arc<dyn Operator> = if neutral {
        Arc::new(NeutralOperator)
    } else {
        Arc::new(StdinOperator)
    };

    CycleDriver::new(
        db.clone(),
        sandbox,
        operator,
        Arc::new(LogSink),
        cfg.exec_fan_out,
    )
}
