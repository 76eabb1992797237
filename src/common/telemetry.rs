// src/common/telemetry.rs

use tracing_subscriber::EnvFilter;

/// Inicializa o logger. Respeita `RUST_LOG`; sem ele, usa `info`.
/// Chamar mais de uma vez é inofensivo (o segundo `try_init` é ignorado).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
