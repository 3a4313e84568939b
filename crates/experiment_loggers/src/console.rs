use crate::error::InitError;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs the global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_tracing(level: &str) -> Result<(), InitError> {
    let level: Level = level
        .parse()
        .map_err(|_| InitError::InvalidLevel(level.to_string()))?;

    if INITIALISED.get().is_some() {
        return Err(InitError::AlreadyInitialised);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(level).into()));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    Registry::default().with(filter).with(fmt_layer).try_init()?;
    let _ = INITIALISED.set(());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected_before_install() {
        assert!(matches!(
            init_tracing("loud"),
            Err(InitError::InvalidLevel(level)) if level == "loud"
        ));
    }

    #[test]
    fn test_second_init_fails() -> Result<(), InitError> {
        init_tracing("debug")?;
        assert!(matches!(
            init_tracing("info"),
            Err(InitError::AlreadyInitialised)
        ));
        Ok(())
    }
}
