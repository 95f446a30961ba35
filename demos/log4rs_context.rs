//! Attaches a frozen context map to `log` records rendered by log4rs.
//!
//! Run with `cargo run --example log4rs_context`.

use std::error::Error;

use context_data::SortedArrayMap;
use log::{Level, LevelFilter, Record};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

fn main() -> Result<(), Box<dyn Error>> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;

    let mut context: SortedArrayMap<String> = SortedArrayMap::new();
    context.put("user", "alice".to_string())?;
    context.put("request", "7f3a".to_string())?;
    context.put("zone", None::<String>)?;
    context.freeze();

    log::logger().log(
        &Record::builder()
            .level(Level::Info)
            .target("log4rs_context")
            .args(format_args!("handled request with context {}", context))
            .key_values(&context)
            .build(),
    );
    log::logger().flush();
    Ok(())
}
