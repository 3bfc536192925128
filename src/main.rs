use champsim_report::config::Cli;
use clap::Parser;
use env_logger::Env;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Cli::parse().into_config();
    champsim_report::run(&cfg)
}
