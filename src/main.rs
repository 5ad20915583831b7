use std::process;

use log::info;
use record_flatten::conversion::{self, ConversionConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = ConversionConfig::default();

    match conversion::run(&config) {
        Ok(summary) => {
            info!("{}", summary);
            println!("CSV file saved as {}", config.get_output_path().display());
        }
        Err(err) => {
            println!("{}", err);
            process::exit(1);
        }
    }
}
