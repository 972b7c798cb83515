use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LOG_FILE: &str = "friendlychat.log";
const DEFAULT_FILTER: &str = "info";

static INIT: OnceLock<()> = OnceLock::new();

/// Installs the process-wide subscriber once; later calls are no-ops.
pub(crate) fn init_logging(data_dir: &str) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let path = Path::new(data_dir).join(LOG_FILE);
        let file_layer = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            ),
            Err(e) => {
                eprintln!("friendlychat: cannot open log file {}: {e}", path.display());
                None
            }
        };

        let registry = tracing_subscriber::registry().with(filter).with(file_layer);

        #[cfg(target_os = "android")]
        let registry = registry.with(paranoid_android::layer("friendlychat"));

        // Another subscriber may already be installed (tests, host app); keep it.
        let _ = registry.try_init();
    });
}
