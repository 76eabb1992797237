//src/main.rs

use clinic_backend::{common::telemetry, config::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    app_state.run_migrations().await?;

    let pending = app_state.verification_service.pending_identifiers().await?;
    tracing::info!(pending_verifications = pending.len(), "🚀 Núcleo da clínica pronto");

    Ok(())
}
