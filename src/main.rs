use clap::Parser;
use log::error;

use cssfinder::cli::{self, Cli};

fn main() {
    logger_bro::init();

    let cli = Cli::parse();
    if let Err(e) = cli::dispatch(cli) {
        error!("{e}");
        std::process::exit(e.exit_code());
    }
}
