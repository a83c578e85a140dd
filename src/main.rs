//! Track simulator CLI
//!
//! Loads a JSON scenario and plays every entity in it to a TAK server.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use track_sim::sink::{ReportSink, SinkFactory, TcpCotSink};
use track_sim::utils::ConfigurationManager;
use track_sim::SimResult;

#[derive(Parser)]
#[command(name = "track_sim")]
#[command(about = "Simulate moving entities and report them to a TAK server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play every entity of a scenario
    Run {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Stop all entities after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Override the server host from the scenario
        #[arg(long)]
        host: Option<String>,

        /// Override the server port from the scenario
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a scenario and print the planned routes
    Check {
        /// Scenario JSON file
        scenario: PathBuf,
    },
}

const POLL_INTERVAL: Duration = Duration::from_millis(250);

fn run(scenario: PathBuf, duration_secs: Option<u64>, host: Option<String>, port: Option<u16>) -> SimResult<()> {
    let mut manager = ConfigurationManager::from_file(&scenario)?;
    if host.is_some() || port.is_some() {
        let mut server = manager.scenario().server.clone();
        if let Some(host) = host {
            server.host = host;
        }
        if let Some(port) = port {
            server.port = port;
        }
        manager.set_server(server)?;
    }

    let factory: SinkFactory = Arc::new(|| Box::new(TcpCotSink::new()) as Box<dyn ReportSink + Send>);
    let supervisor = manager.launch(&factory)?;

    let deadline = duration_secs.map(|secs| Instant::now() + Duration::from_secs(secs));
    let outcomes = loop {
        if supervisor.active() == 0 {
            break supervisor.wait();
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Run time limit reached");
            break supervisor.shutdown();
        }
        thread::sleep(POLL_INTERVAL);
    };

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        warn!("{} of {} worker(s) failed", failed, outcomes.len());
    } else {
        info!("All {} worker(s) finished", outcomes.len());
    }
    Ok(())
}

fn check(scenario: PathBuf) -> SimResult<()> {
    let manager = ConfigurationManager::from_file(&scenario)?;
    for launch in manager.build_players()? {
        let player = &launch.player;
        let (route, waits) = player.plan(&mut player.rng())?;
        let members = launch.group.map_or(1, |g| g.count);
        println!(
            "{:<20} {:>6} waypoints {:>9.1} s  x{}",
            player.callsign(),
            route.len(),
            waits.iter().sum::<f64>(),
            members
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            scenario,
            duration_secs,
            host,
            port,
        } => run(scenario, duration_secs, host, port),
        Commands::Check { scenario } => check(scenario),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
