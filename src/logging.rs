// Subscriber setup. Library code only emits `tracing` events; nothing is
// printed until a host installs one of these.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding `EnvFilter` directives for the CLI
pub const ENV_VAR: &str = "ZAKILO_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";
const VERBOSE_DIRECTIVES: &str = "warn,zakilo=debug";

/// Directives in effect: `-v` wins, then the environment, then the default
pub fn directives(verbose: bool, env: Option<&str>) -> String {
    match (verbose, env) {
        (true, _) => VERBOSE_DIRECTIVES.to_string(),
        (false, Some(env)) if !env.trim().is_empty() => env.to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

/// Log to stderr. Safe to call twice; the second call does nothing.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_cli(verbose: bool) {
    let env = std::env::var(ENV_VAR).ok();
    let filter = EnvFilter::try_new(directives(verbose, env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Log to the browser console. Returns false when a subscriber was already set.
#[cfg(target_arch = "wasm32")]
pub fn init_console(directives: &str) -> bool {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(VERBOSE_DIRECTIVES));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .without_time()
                .with_ansi(false)
                .with_target(false)
                .with_writer(console::Console),
        )
        .try_init()
        .is_ok()
}

#[cfg(target_arch = "wasm32")]
mod console {
    use std::io;
    use tracing_subscriber::fmt::MakeWriter;

    pub struct Console;

    /// Buffers one formatted event and hands it to `console.log` on drop
    pub struct ConsoleLine(Vec<u8>);

    impl io::Write for ConsoleLine {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleLine {
        fn drop(&mut self) {
            let text = String::from_utf8_lossy(&self.0);
            let line = text.trim_end();
            if !line.is_empty() {
                web_sys::console::log_1(&line.into());
            }
        }
    }

    impl<'a> MakeWriter<'a> for Console {
        type Writer = ConsoleLine;

        fn make_writer(&'a self) -> Self::Writer {
            ConsoleLine(Vec::new())
        }
    }
}
