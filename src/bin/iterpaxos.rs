#[macro_use]
extern crate log;

use clap::{Args, Parser, Subcommand};
use iterpaxos::config::PORT_BASE;
use iterpaxos::net::{bind, serve};
use iterpaxos::{
    Configuration, IterationDriver, NodeId, RandomValues, RunSummary, SharedAcceptor,
    TcpTransport,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::process::exit;
use std::time::Duration;

/// Iterated Paxos: run acceptors, or a proposer that decides a bounded
/// number of iterations and exits.
#[derive(Parser)]
#[command(name = "iterpaxos", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the acceptor role until killed
    Acceptor {
        /// Port to listen on (localhost)
        #[arg(short, long, default_value_t = PORT_BASE)]
        port: u16,
    },
    /// Run the proposer against already running acceptors
    Proposer {
        #[command(flatten)]
        membership: Membership,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Start 2F+1 acceptors in this process and run the proposer against them
    Local {
        /// Number of tolerated failures
        #[arg(short, long, default_value_t = 1)]
        f: u16,
        /// Port of the first acceptor
        #[arg(long, default_value_t = PORT_BASE)]
        port_base: u16,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct Membership {
    /// Acceptor addresses in contact order; ids are assigned by position
    #[arg(long, value_delimiter = ',')]
    acceptors: Vec<SocketAddr>,
    /// Number of tolerated failures, used with consecutive local ports when
    /// no addresses are given
    #[arg(short, long, default_value_t = 1)]
    f: u16,
    /// Port of the first acceptor
    #[arg(long, default_value_t = PORT_BASE)]
    port_base: u16,
}

#[derive(Args)]
struct RunArgs {
    /// Iterations to decide before exiting
    #[arg(short = 'n', long, default_value_t = 10_000)]
    iterations: u64,
    /// Iteration of the first proposal
    #[arg(long, default_value_t = 1)]
    first_iteration: u64,
    /// Give up on an acceptor's reply after this many milliseconds
    #[arg(long)]
    reply_timeout_ms: Option<u64>,
    /// Attempts per iteration before failing
    #[arg(long, default_value_t = 16)]
    max_attempts: u32,
    /// Index of this proposer among `proposers`
    #[arg(long, default_value_t = 0)]
    index: u64,
    /// Number of proposers sharing the acceptors
    #[arg(long, default_value_t = 1)]
    proposers: u64,
}

impl Membership {
    fn configuration(&self) -> iterpaxos::Result<Configuration> {
        if self.acceptors.is_empty() {
            Configuration::local(self.f, self.port_base)
        } else {
            Configuration::new(
                self.acceptors
                    .iter()
                    .enumerate()
                    .map(|(i, addr)| (i as NodeId, *addr)),
            )
        }
    }
}

impl RunArgs {
    fn apply(&self, config: Configuration) -> iterpaxos::Result<Configuration> {
        config
            .with_iterations(self.iterations)
            .with_first_iteration(self.first_iteration)
            .with_reply_timeout(self.reply_timeout_ms.map(Duration::from_millis))
            .with_max_attempts(self.max_attempts)?
            .with_identity(self.index, self.proposers)
    }
}

async fn run_acceptor(port: u16) -> iterpaxos::Result<()> {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port);
    let listener = bind(addr).await?;
    info!("Acceptor listening on {}", addr);
    serve(listener, SharedAcceptor::default()).await;
    Ok(())
}

async fn run_proposer(config: Configuration) -> iterpaxos::Result<RunSummary> {
    info!(
        "Proposing to {} acceptors with quorum {}",
        config.members().len(),
        config.quorum_size()
    );
    let transport = TcpTransport::connect(&config).await?;
    IterationDriver::new(&config, transport, RandomValues)
        .run()
        .await
}

async fn run_local(config: Configuration) -> iterpaxos::Result<RunSummary> {
    for &(node, addr) in config.members() {
        let listener = bind(addr).await?;
        debug!("Acceptor {} listening on {}", node, addr);
        tokio::spawn(serve(listener, SharedAcceptor::default()));
    }
    run_proposer(config).await
}

fn report(summary: &RunSummary) {
    let last = summary.decisions.last().map(|d| d.iteration);
    println!(
        "decided {} iterations ({} to {}) in {:?}, {:.0} decisions/s",
        summary.decisions.len(),
        summary.first_iteration,
        last.unwrap_or(summary.first_iteration),
        summary.elapsed,
        summary.throughput()
    );
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Acceptor { port } => run_acceptor(port).await.map(|_| None),
        Command::Proposer { membership, run } => {
            match membership.configuration().and_then(|c| run.apply(c)) {
                Ok(config) => run_proposer(config).await.map(Some),
                Err(e) => Err(e),
            }
        }
        Command::Local { f, port_base, run } => {
            match Configuration::local(f, port_base).and_then(|c| run.apply(c)) {
                Ok(config) => run_local(config).await.map(Some),
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(Some(summary)) => report(&summary),
        Ok(None) => {}
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    }
}
