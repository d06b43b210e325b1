use async_trait::async_trait;
use cosmwasm_std::Uint256;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use launchpad_session::{EvmTransaction, SessionSigner, SignRequest};
use launchpad_types::{
    classify, Amount, AmountError, DraftField, ErrorKind, EvmAddress, LedgerKind, PoolRecord,
    TransactionAttempt, TxHandle, EVM_DECIMALS,
};

use crate::abi;
use crate::confirm::{wait_until, ConfirmationPolicy};
use crate::rpc::JsonRpcClient;
use crate::{ChainError, LedgerGateway, PoolOperation};

/// Inclusion status of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub block_number: u64,
    pub success: bool,
}

/// Read-only EVM node access
#[async_trait]
pub trait EvmRpc: Send + Sync {
    async fn call(&self, to: &EvmAddress, data: &[u8]) -> Result<Vec<u8>, ChainError>;

    async fn transaction_receipt(&self, hash: &TxHandle) -> Result<Option<TxReceipt>, ChainError>;

    async fn block_number(&self) -> Result<u64, ChainError>;

    async fn estimate_gas(
        &self,
        from: &EvmAddress,
        tx: &EvmTransaction,
    ) -> Result<u64, ChainError>;
}

/// [`EvmRpc`] over Ethereum JSON-RPC
pub struct HttpEvmRpc {
    client: JsonRpcClient,
}

impl HttpEvmRpc {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        Ok(Self {
            client: JsonRpcClient::new(url, timeout)?,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    block_number: Option<String>,
    status: Option<String>,
}

pub fn parse_quantity(value: &str) -> Result<u64, ChainError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("{value:?} is not a hex quantity")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("{value:?}: {e}")))
}

fn quantity(value: &Uint256) -> String {
    let digits = hex::encode(value.to_be_bytes());
    match digits.trim_start_matches('0') {
        "" => "0x0".to_string(),
        trimmed => format!("0x{trimmed}"),
    }
}

pub fn parse_data(value: &str) -> Result<Vec<u8>, ChainError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| ChainError::InvalidResponse(format!("{value:?}: {e}")))
}

#[async_trait]
impl EvmRpc for HttpEvmRpc {
    async fn call(&self, to: &EvmAddress, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let result: String = self
            .client
            .call(
                "eth_call",
                json!([{ "to": to.to_string(), "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        parse_data(&result)
    }

    async fn transaction_receipt(&self, hash: &TxHandle) -> Result<Option<TxReceipt>, ChainError> {
        let receipt: Option<RawReceipt> = self
            .client
            .call("eth_getTransactionReceipt", json!([hash.0]))
            .await?;

        let Some(receipt) = receipt else {
            return Ok(None);
        };
        // Pending receipts from some nodes carry no block yet
        let Some(block) = receipt.block_number else {
            return Ok(None);
        };

        Ok(Some(TxReceipt {
            block_number: parse_quantity(&block)?,
            success: receipt.status.as_deref() != Some("0x0"),
        }))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let result: String = self.client.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&result)
    }

    async fn estimate_gas(
        &self,
        from: &EvmAddress,
        tx: &EvmTransaction,
    ) -> Result<u64, ChainError> {
        let result: String = self
            .client
            .call(
                "eth_estimateGas",
                json!([{
                    "from": from.to_string(),
                    "to": tx.to.to_string(),
                    "data": format!("0x{}", hex::encode(&tx.data)),
                    "value": quantity(&tx.value),
                }]),
            )
            .await?;
        parse_quantity(&result)
    }
}

#[derive(Debug, Clone)]
pub struct EvmGatewayConfig {
    pub sale_contract: EvmAddress,
    /// Blocks on top of the inclusion block, counting it, before a
    /// transaction counts as confirmed
    pub confirmations: u64,
    pub confirmation: ConfirmationPolicy,
}

/// Sale contract on an EVM chain
pub struct EvmGateway {
    rpc: Arc<dyn EvmRpc>,
    config: EvmGatewayConfig,
}

impl EvmGateway {
    pub fn new(rpc: Arc<dyn EvmRpc>, config: EvmGatewayConfig) -> Self {
        Self { rpc, config }
    }

    pub fn sale_contract(&self) -> &EvmAddress {
        &self.config.sale_contract
    }

    async fn wait_for_receipt(&self, handle: &TxHandle) -> Result<(), ChainError> {
        let confirmations = self.config.confirmations.max(1);
        let rpc = &self.rpc;

        wait_until(&self.config.confirmation, &handle.0, move || async move {
            let Some(receipt) = rpc.transaction_receipt(handle).await? else {
                return Ok(false);
            };
            if !receipt.success {
                return Err(ChainError::Reverted(handle.0.clone()));
            }
            if confirmations == 1 {
                return Ok(true);
            }
            let head = rpc.block_number().await?;
            Ok(head + 1 >= receipt.block_number + confirmations)
        })
        .await
    }

    fn sender(signer: &SessionSigner) -> Result<&EvmAddress, ErrorKind> {
        signer.account().as_evm().ok_or_else(|| {
            ErrorKind::LedgerRejected(format!(
                "signer {} is not an EVM account",
                signer.account()
            ))
        })
    }
}

#[async_trait]
impl LedgerGateway for EvmGateway {
    fn ledger(&self) -> LedgerKind {
        LedgerKind::Evm
    }

    fn requires_allowance(&self) -> bool {
        true
    }

    fn check_amount(&self, _field: DraftField, amount: &Amount) -> Result<(), AmountError> {
        amount.to_uint256(EVM_DECIMALS).map(drop)
    }

    async fn read_pool_count(&self) -> Result<u64, ErrorKind> {
        let data = self
            .rpc
            .call(&self.config.sale_contract, &abi::encode_call(abi::POOL_COUNT, &[]))
            .await?;
        let words = abi::split_words(&data)?;
        let word = words
            .first()
            .ok_or_else(|| ChainError::InvalidResponse("empty poolCount result".to_string()))?;
        Ok(abi::word_to_u64(word)?)
    }

    async fn read_pool(&self, id: u64) -> Result<PoolRecord, ErrorKind> {
        let data = self
            .rpc
            .call(
                &self.config.sale_contract,
                &abi::encode_call(abi::POOLS, &[abi::u64_word(id)]),
            )
            .await?;
        Ok(abi::decode_pool(id, &data)?)
    }

    async fn submit(&self, operation: PoolOperation, signer: &SessionSigner) -> TransactionAttempt {
        let attempt = TransactionAttempt::pending(operation.kind());

        if let Err(err) = Self::sender(signer) {
            return attempt.fail(err);
        }
        let tx = match abi::encode_operation(&operation, &self.config.sale_contract) {
            Ok(tx) => tx,
            Err(e) => return attempt.fail(e.into()),
        };

        tracing::info!(
            kind = %attempt.kind,
            to = %tx.to,
            from = %signer.account(),
            "Submitting EVM transaction"
        );

        let handle = match signer.sign_and_send(SignRequest::Evm(tx)).await {
            Ok(handle) => handle,
            Err(failure) => {
                let err = classify(&failure);
                tracing::warn!(kind = %attempt.kind, error = %err, "Transaction not sent");
                return attempt.fail(err);
            }
        };
        let attempt = attempt.broadcast(handle.clone());

        match self.wait_for_receipt(&handle).await {
            Ok(()) => {
                tracing::info!(kind = %attempt.kind, tx_hash = %handle, "Transaction confirmed");
                attempt.confirm()
            }
            Err(e) => {
                tracing::warn!(kind = %attempt.kind, tx_hash = %handle, error = %e, "Transaction failed");
                attempt.fail(e.into())
            }
        }
    }

    async fn simulate(
        &self,
        operation: &PoolOperation,
        signer: &SessionSigner,
    ) -> Result<(), ErrorKind> {
        let from = Self::sender(signer)?;
        let tx = abi::encode_operation(operation, &self.config.sale_contract)?;
        let gas = self.rpc.estimate_gas(from, &tx).await?;
        tracing::debug!(kind = %operation.kind(), gas = gas, "Pre-flight estimate succeeded");
        Ok(())
    }
}
