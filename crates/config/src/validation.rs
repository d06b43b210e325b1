//! Configuration validation

use crate::{AppConfig, ConfigError, ConfirmationConfig, EvmConfig, Result, SolanaConfig};

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration
///
/// Every problem is collected; the error lists all of them.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_log_level(&config.logging.level) {
        errors.push(e);
    }

    if config.evm.is_none() && config.solana.is_none() {
        errors.push(ValidationError::new(
            "evm, solana",
            "at least one ledger must be configured",
        ));
    }

    if let Some(evm) = &config.evm {
        validate_evm(evm, &mut errors);
    }

    if let Some(solana) = &config.solana {
        validate_solana(solana, &mut errors);
    }

    if config.registry.request_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "registry.request_timeout_ms",
            "must be greater than 0",
        ));
    }

    if !errors.is_empty() {
        let error_msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigError::ValidationError(error_msg));
    }

    Ok(())
}

fn validate_evm(evm: &EvmConfig, errors: &mut Vec<ValidationError>) {
    if evm.chain_id == 0 {
        errors.push(ValidationError::new("evm.chain_id", "must be greater than 0"));
    }

    if evm.chain_name.is_empty() {
        errors.push(ValidationError::new("evm.chain_name", "chain name is required"));
    }

    if let Err(e) = validate_url(&evm.rpc_url) {
        errors.push(ValidationError::new("evm.rpc_url", e));
    }

    if let Some(explorer) = &evm.explorer_url {
        if let Err(e) = validate_url(explorer) {
            errors.push(ValidationError::new("evm.explorer_url", e));
        }
    }

    if evm.currency.symbol.is_empty() {
        errors.push(ValidationError::new(
            "evm.currency.symbol",
            "currency symbol is required",
        ));
    }

    if evm.currency.decimals != 18 {
        errors.push(ValidationError::new(
            "evm.currency.decimals",
            "native currency must use 18 decimals",
        ));
    }

    if let Err(e) = validate_evm_address(&evm.sale_contract) {
        errors.push(ValidationError::new("evm.sale_contract", e));
    }

    if evm.confirmations == 0 {
        errors.push(ValidationError::new(
            "evm.confirmations",
            "must be greater than 0",
        ));
    }

    validate_confirmation(&evm.confirmation, "evm.confirmation", errors);
}

fn validate_solana(solana: &SolanaConfig, errors: &mut Vec<ValidationError>) {
    if solana.cluster.is_empty() {
        errors.push(ValidationError::new("solana.cluster", "cluster is required"));
    }

    if let Err(e) = validate_url(&solana.rpc_url) {
        errors.push(ValidationError::new("solana.rpc_url", e));
    }

    if let Some(explorer) = &solana.explorer_url {
        if let Err(e) = validate_url(explorer) {
            errors.push(ValidationError::new("solana.explorer_url", e));
        }
    }

    if let Err(e) = validate_program_id(&solana.program_id) {
        errors.push(ValidationError::new("solana.program_id", e));
    }

    if solana.token_decimals > 19 {
        errors.push(ValidationError::new(
            "solana.token_decimals",
            "must be <= 19 to fit u64 token amounts",
        ));
    }

    if !matches!(
        solana.commitment.as_str(),
        "processed" | "confirmed" | "finalized"
    ) {
        errors.push(ValidationError::new(
            "solana.commitment",
            format!(
                "invalid commitment '{}', must be one of: processed, confirmed, finalized",
                solana.commitment
            ),
        ));
    }

    validate_confirmation(&solana.confirmation, "solana.confirmation", errors);
}

fn validate_confirmation(
    confirmation: &ConfirmationConfig,
    prefix: &str,
    errors: &mut Vec<ValidationError>,
) {
    if confirmation.initial_poll_ms == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.initial_poll_ms"),
            "must be greater than 0",
        ));
    }

    if confirmation.max_poll_ms < confirmation.initial_poll_ms {
        errors.push(ValidationError::new(
            format!("{prefix}.max_poll_ms"),
            "must be >= initial_poll_ms",
        ));
    }

    if confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new(
            format!("{prefix}.timeout_secs"),
            "must be greater than 0",
        ));
    }
}

/// Validate a URL
pub fn validate_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("URL cannot be empty".to_string());
    }

    // Basic URL validation - check for scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err("URL must start with http:// or https://".to_string());
    }

    Ok(())
}

/// `0x` followed by 40 hex digits
pub fn validate_evm_address(address: &str) -> std::result::Result<(), String> {
    let body = address
        .strip_prefix("0x")
        .ok_or_else(|| format!("'{address}' must start with 0x"))?;
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("'{address}' is not a 20-byte hex address"));
    }
    Ok(())
}

/// Program ids are base58 encodings of 32-byte keys
pub fn validate_program_id(id: &str) -> std::result::Result<(), String> {
    match bs58::decode(id).into_vec() {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(format!("'{id}' is not a base58 program id")),
    }
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "logging.level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            evm: Some(EvmConfig::polygon_amoy(
                "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            )),
            solana: Some(SolanaConfig::devnet(
                "Fg6PaFpoGXkYsidMpWTK6W2BeZ7FEfcYkg476zPFsLnS",
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_requires_a_ledger() {
        let err = validate_config(&AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("at least one ledger"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.logging.level = "loud".to_string();
        if let Some(evm) = config.evm.as_mut() {
            evm.sale_contract = "0x1234".to_string();
        }
        if let Some(solana) = config.solana.as_mut() {
            solana.commitment = "max".to_string();
        }

        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("logging.level"));
        assert!(msg.contains("evm.sale_contract"));
        assert!(msg.contains("solana.commitment"));
    }

    #[test]
    fn test_confirmation_schedule() {
        let mut config = valid_config();
        if let Some(evm) = config.evm.as_mut() {
            evm.confirmation.initial_poll_ms = 1000;
            evm.confirmation.max_poll_ms = 10;
        }
        let msg = validate_config(&config).unwrap_err().to_string();
        assert!(msg.contains("evm.confirmation.max_poll_ms"));
    }

    #[test]
    fn test_address_checks() {
        assert!(validate_evm_address("0x5FbDB2315678afecb367f032d93F642f64180aa3").is_ok());
        assert!(validate_evm_address("5FbDB2315678afecb367f032d93F642f64180aa3").is_err());
        assert!(validate_program_id("11111111111111111111111111111111").is_ok());
        assert!(validate_program_id("0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl").is_err());
        // valid alphabet, wrong key length
        assert!(validate_program_id("StV1DL6CwTryKyV").is_err());
    }
}
