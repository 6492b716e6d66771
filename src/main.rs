use clap::Parser;

use gqlcheck::cli::Cli;

fn main() {
    let cli = Cli::parse();
    gqlcheck::logging::init(cli.verbose);
    let code = match gqlcheck::cli::run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            1
        }
    };
    std::process::exit(code);
}
