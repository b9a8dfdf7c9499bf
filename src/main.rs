use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use env_logger::{Builder, Env, Target, WriteStyle};
use log::{error, info, warn};

use slide_nn::{train_loop, Network, NetworkWeights, RunConfig, RunContext, SlideResult};

/// Trains a hashed sparse network on SVM-format data.
#[derive(Parser, Debug)]
#[command(name = "slide-nn", about = "Sparse neural network training with LSH-selected neurons")]
struct Args {
    /// Run configuration (JSON).
    #[arg(long, default_value = "configs/sample.json")]
    config: PathBuf,

    /// Log table maintenance and other per-step detail.
    #[arg(long)]
    debug: bool,
}

fn init_logger(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    Builder::from_env(Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level))
        .format(|buf, record| writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args()))
        .write_style(WriteStyle::Never)
        .target(Target::Stderr)
        .init();
}

fn run(args: &Args) -> SlideResult<()> {
    let config = RunConfig::load_json(&args.config)?;

    if config.num_threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()
        {
            warn!("could not size the thread pool: {e}");
        }
    }
    info!("using {} worker threads", rayon::current_num_threads());

    let mut network = match &config.load_weights {
        Some(path) => {
            info!("loading weights from {}", path.display());
            Network::with_weights(&config.network, NetworkWeights::load_json(path)?)?
        }
        None => Network::new(&config.network)?,
    };

    let mut ctx = RunContext::new();
    let history = train_loop(&mut network, &config, &mut ctx)?;
    if let Some(last) = history.last() {
        info!("final accuracy {:.4}", last.eval.accuracy);
    }

    if let Some(path) = &config.save_weights {
        network.snapshot().save_json(path)?;
        info!("saved weights to {}", path.display());
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logger(args.debug);

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
