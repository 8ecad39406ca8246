use clap::Parser;
use memexec::simulator::config::load_and_merge_configs;
use memexec::simulator::frames::parse_frame_file;
use memexec::simulator::Simulator;
use memexec::utils::log::init_log;
use std::path::PathBuf;

/// Memexec - a memory command execution engine simulator
#[derive(Parser, Debug)]
#[command(name = "memexec")]
#[command(version = "0.1.0")]
#[command(about = "Executes binary command frames against a simulated memory bus", long_about = None)]
struct Args {
  /// Command frame file (one frame per line, hex words)
  #[arg(value_name = "FRAMES")]
  frames: PathBuf,

  /// Configuration file path (TOML)
  #[arg(short, long, value_name = "FILE")]
  config: Option<String>,

  /// Enable step mode (interactive stepping)
  #[arg(short, long)]
  step: bool,

  /// Quiet mode (suppress per-frame output and records)
  #[arg(short, long)]
  quiet: bool,

  /// Bus wait states per request
  #[arg(long, value_name = "N")]
  wait_states: Option<u32>,
}

fn main() -> std::io::Result<()> {
  init_log();

  let args = Args::parse();

  let config = load_and_merge_configs(args.config.as_deref(), args.quiet, args.step, args.wait_states)?;

  let frames = parse_frame_file(&args.frames)?;
  log::info!("loaded {} frame(s) from {:?}", frames.len(), args.frames);

  let mut simulator = Simulator::new(&config, frames);

  simulator.run()
}
