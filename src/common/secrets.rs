// src/common/secrets.rs

use rand::{distributions::Alphanumeric, Rng};

use crate::common::error::AppError;

/// Hash bcrypt fora do runtime assíncrono (é CPU-bound).
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(&password_clone, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

    Ok(hashed)
}

/// Código numérico de 6 dígitos para verificação por e-mail.
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Senha aleatória para clientes cadastrados no balcão.
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

/// "Maria" -> "maria417"
pub fn candidate_username(first_name: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100..1000);
    let base: String = first_name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("{}{}", base, suffix)
}
