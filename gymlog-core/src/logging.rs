use log::LevelFilter;
use std::io::Write;

pub fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .format(move |buf, record| {
            writeln!(
                buf,
                "{}: {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .filter_level(level);

    let _ = builder.try_init();

    log::set_max_level(level);
}

pub fn parse_level(level: &str) -> Option<LevelFilter> {
    let lvl = match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => return None,
    };
    Some(lvl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels() {
        assert_eq!(parse_level("WARNING"), Some(LevelFilter::Warn));
        assert_eq!(parse_level(" debug "), Some(LevelFilter::Debug));
        assert_eq!(parse_level("loud"), None);
    }
}
