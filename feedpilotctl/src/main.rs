use clap::Parser;

fn main() {
    let cli = feedpilotctl::Cli::parse();
    feedpilotctl::init_tracing();
    if let Err(err) = feedpilotctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
