use clap::Parser;
use log::LevelFilter;

use tickets::cli::Args;
use tickets::run;
use tickets::schema::StationTable;

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .unwrap();

    let stations = StationTable::bundled();
    if let Err(err) = run(args, &stations) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
