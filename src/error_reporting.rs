use sentry::types::Dsn;

/// Environment variable holding the Sentry DSN. Reporting is off without it.
pub const DSN_ENV: &str = "MEMFD_LOADER_SENTRY_DSN";

/// Set to `false` or `0` to disable reporting even when a DSN is configured.
pub const ENABLED_ENV: &str = "MEMFD_LOADER_ERROR_REPORTING";

fn parse_bool(s: &str) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" => true,
        "false" | "0" => false,
        _ => true,
    }
}

fn configured_dsn(enabled: Option<String>, dsn: Option<String>) -> Option<Dsn> {
    let enabled = enabled.map(|v| parse_bool(&v)).unwrap_or(true);
    if !enabled {
        return None;
    }
    dsn.and_then(|d| d.parse().ok())
}

/// Set up Sentry error reporting. Keep the guard alive until exit.
pub fn setup_sentry() -> sentry::ClientInitGuard {
    let dsn = configured_dsn(std::env::var(ENABLED_ENV).ok(), std::env::var(DSN_ENV).ok());

    sentry::init(sentry::ClientOptions {
        dsn,
        release: sentry::release_name!(),
        ..Default::default()
    })
}

/// Report a terminal failure. A no-op when reporting is disabled.
pub fn capture(err: &crate::Error) {
    sentry::capture_error(err);
}
