#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::Error;
use yansi::Paint;

use crate::application::cli;
use crate::configuration::Config;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! probank has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let args = env::args().collect::<Vec<String>>().join(" ");
    eprintln!("\nRunning the following can help explain further what the issue is:");
    eprintln!("\nRUST_BACKTRACE=1 {args}");
    eprintln!(
        "\nDebug logs are written to {} when RUST_LOG=probank is set.",
        Config::cache_dir().join("debug.log").to_string_lossy()
    );

    process::exit(1);
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("PROBANK_LOG_DIR").unwrap_or_else(|_| {
        return Config::cache_dir().to_string_lossy().to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("probank")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let code = match cli::parse().await {
        Ok(code) => code,
        Err(err) => {
            handle_error(err);
            return;
        }
    };

    drop(_guard);
    process::exit(code);
}
