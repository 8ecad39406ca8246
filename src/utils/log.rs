use env_logger::Env;

/// Initialize the global logger. Respects RUST_LOG, defaults to info.
/// Safe to call more than once; later calls are no-ops.
pub fn init_log() {
  let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
    .format_timestamp(None)
    .try_init();
}
