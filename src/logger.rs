use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directives(verbose: bool) -> &'static str {
  if verbose {
    "weekly_coach=debug,info"
  } else {
    "weekly_coach=info"
  }
}

/// Compact logging to stderr; stdout is left for command output.
/// `RUST_LOG` overrides the default filter.
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact(),
    )
    .init();
}
