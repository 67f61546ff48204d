use std::env::{self, args};
use std::path::Path;
use std::process::exit;

use log::info;

mod config;
mod error;
mod evaluate;
mod gc_roots;
mod report;
mod resolve;
mod utils;

use config::{GcRootsConfig, Invocation};
use error::GcRootsError;
use utils::error_print;

fn main() {
    let args = args().collect::<Vec<String>>();
    let program = args.first().map_or("flake-gcroots", String::as_str);

    let exit_code = match try_main(program, args.get(1..).unwrap_or_default()) {
        Ok(()) => 0,
        Err(err) => {
            error_print(&err.to_string());
            err.exit_code()
        }
    };

    exit(exit_code)
}

fn try_main(program: &str, args: &[String]) -> Result<(), GcRootsError> {
    let config = match GcRootsConfig::from_args(
        program,
        args,
        |key| env::var(key).ok(),
        Path::exists,
    )? {
        Invocation::Help(usage) => {
            println!("{usage}");
            return Ok(());
        }
        Invocation::Run(config) => config,
    };

    utils::init_logger(config.is_verbose(), config.log_file())?;
    info!("startup command line: {args:?}");
    info!("configurations: {config:?}");

    resolve::run(&config)
}
