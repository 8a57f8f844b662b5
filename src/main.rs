use clap::Parser;
use docwal_cli::cli::Cli;
use docwal_cli::utils::ErrorWithCauses;

fn init_logging(verbose: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    if verbose {
        builder.filter_module("docwal", log::LevelFilter::Debug);
        builder.filter_module("docwal_cli", log::LevelFilter::Debug);
    }
    builder.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = docwal_cli::run(cli).await {
        eprintln!("error: {}", ErrorWithCauses(e));
        std::process::exit(1);
    }
}
