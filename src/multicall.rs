//! Batched read-call execution.
//!
//! Everything this crate reads from a chain goes through the [`CallExecutor`]
//! capability: a list of (target, calldata, gas budget) tuples in, an
//! index-aligned list of per-call outcomes out. The bundled implementation
//! batches through Multicall3, but tests and operators can inject anything
//! that honors the contract.

use alloy_primitives::{address, Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use eyre::Result;
use std::future::Future;
use tracing::{debug, warn};

sol! {
    /// Multicall3 - deployed at the same address on all EVM chains
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external payable returns (Result[] memory returnData);
    }
}

/// Multicall3 address (same on all EVM chains)
pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

/// Maximum calls per batch (to avoid RPC payload limits)
const MAX_CALLS_PER_BATCH: usize = 100;

/// Default gas ceiling for one batched call.
pub const DEFAULT_BATCH_GAS_LIMIT: u64 = 100_000_000;

/// Default multiplier applied to a call's gas budget on retry.
pub const DEFAULT_RETRY_MULTIPLIER: u64 = 2;

/// One contract read to execute as part of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub target: Address,
    pub calldata: Bytes,
    /// Gas budget for this call, used to size batches and scaled on retry.
    pub gas_limit: u64,
}

/// Per-call result, index-aligned with the submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub success: bool,
    /// Raw return bytes; `None` when the call failed or returned nothing
    /// (e.g. a call against an address with no code).
    pub return_data: Option<Bytes>,
}

impl CallOutcome {
    pub fn failed() -> Self {
        Self {
            success: false,
            return_data: None,
        }
    }

    /// Return bytes of a successful, non-empty response.
    pub fn data(&self) -> Option<&Bytes> {
        if self.success {
            self.return_data.as_ref()
        } else {
            None
        }
    }
}

/// Batch-level execution parameters.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub chain_id: u64,
    /// Ceiling on the summed per-call gas budgets of one batched request.
    pub batch_gas_limit: u64,
    /// Gas multiplier for the failed-call retry pass. `<= 1` disables retry.
    pub retry_multiplier: u64,
}

impl BatchOptions {
    pub fn for_chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            batch_gas_limit: DEFAULT_BATCH_GAS_LIMIT,
            retry_multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

/// Capability that executes batched read calls against one chain.
///
/// Contract: the result vector is index-aligned with `calls`; a failed entry
/// is reported in place, never dropped; an `Err` is reserved for conditions
/// that invalidate the whole batch (e.g. an unusable endpoint).
pub trait CallExecutor {
    fn execute(
        &self,
        calls: &[BatchCall],
        opts: &BatchOptions,
    ) -> impl Future<Output = Result<Vec<CallOutcome>>> + Send;
}

/// Execute a batch, then re-issue only the failed subset once at a larger
/// gas budget and merge the second pass in, index-aligned.
pub async fn execute_with_retry<E: CallExecutor>(
    executor: &E,
    calls: &[BatchCall],
    opts: &BatchOptions,
) -> Result<Vec<CallOutcome>> {
    let mut outcomes = executor.execute(calls, opts).await?;

    let failed: Vec<usize> = outcomes
        .iter()
        .enumerate()
        .filter(|(_, o)| !o.success)
        .map(|(i, _)| i)
        .collect();

    if failed.is_empty() || opts.retry_multiplier <= 1 {
        return Ok(outcomes);
    }

    debug!(
        "Retrying {}/{} failed calls at {}x gas",
        failed.len(),
        calls.len(),
        opts.retry_multiplier
    );

    let retry_calls: Vec<BatchCall> = failed
        .iter()
        .map(|&i| BatchCall {
            gas_limit: calls[i].gas_limit.saturating_mul(opts.retry_multiplier),
            ..calls[i].clone()
        })
        .collect();

    let retried = executor.execute(&retry_calls, opts).await?;
    for (&slot, outcome) in failed.iter().zip(retried) {
        if outcome.success {
            outcomes[slot] = outcome;
        }
    }

    Ok(outcomes)
}

// ============================================
// MULTICALL3 EXECUTOR
// ============================================

/// [`CallExecutor`] backed by Multicall3 `aggregate3` over HTTP.
pub struct Multicall3Executor {
    rpc_url: String,
    multicall: Address,
}

impl Multicall3Executor {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            multicall: MULTICALL3,
        }
    }

    /// Point at a non-canonical multicall deployment.
    pub fn with_multicall(rpc_url: String, multicall: Address) -> Self {
        Self { rpc_url, multicall }
    }
}

impl CallExecutor for Multicall3Executor {
    async fn execute(&self, calls: &[BatchCall], opts: &BatchOptions) -> Result<Vec<CallOutcome>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);
        let mut outcomes = Vec::with_capacity(calls.len());

        for (start, end) in chunk_by_gas(calls, opts.batch_gas_limit) {
            let chunk = &calls[start..end];
            let aggregated: Vec<IMulticall3::Call3> = chunk
                .iter()
                .map(|c| IMulticall3::Call3 {
                    target: c.target,
                    allowFailure: true,
                    callData: c.calldata.clone(),
                })
                .collect();

            let calldata = IMulticall3::aggregate3Call { calls: aggregated }.abi_encode();
            let tx = TransactionRequest::default()
                .to(self.multicall)
                .input(calldata.into());

            let results = match provider.call(tx).await {
                Ok(raw) => match IMulticall3::aggregate3Call::abi_decode_returns(&raw) {
                    Ok(decoded) => decoded,
                    Err(e) => {
                        warn!(
                            "Multicall decode failed on chain {} ({} calls): {}",
                            opts.chain_id,
                            chunk.len(),
                            e
                        );
                        outcomes.extend(chunk.iter().map(|_| CallOutcome::failed()));
                        continue;
                    }
                },
                Err(e) => {
                    warn!(
                        "Multicall request failed on chain {} ({} calls): {}",
                        opts.chain_id,
                        chunk.len(),
                        e
                    );
                    outcomes.extend(chunk.iter().map(|_| CallOutcome::failed()));
                    continue;
                }
            };

            if results.len() != chunk.len() {
                warn!(
                    "Multicall returned {} results for {} calls, marking chunk failed",
                    results.len(),
                    chunk.len()
                );
                outcomes.extend(chunk.iter().map(|_| CallOutcome::failed()));
                continue;
            }

            outcomes.extend(results.into_iter().map(|r| CallOutcome {
                success: r.success,
                return_data: if r.returnData.is_empty() {
                    None
                } else {
                    Some(r.returnData)
                },
            }));
        }

        Ok(outcomes)
    }
}

/// Split calls into contiguous index ranges whose summed gas budgets stay
/// under `gas_limit`, also bounded by `MAX_CALLS_PER_BATCH`. A single call
/// over the limit still gets its own chunk.
fn chunk_by_gas(calls: &[BatchCall], gas_limit: u64) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    let mut gas = 0u64;

    for (i, call) in calls.iter().enumerate() {
        let over_gas = gas > 0 && gas.saturating_add(call.gas_limit) > gas_limit;
        let over_count = i - start >= MAX_CALLS_PER_BATCH;
        if over_gas || over_count {
            ranges.push((start, i));
            start = i;
            gas = 0;
        }
        gas = gas.saturating_add(call.gas_limit);
    }
    ranges.push((start, calls.len()));
    ranges
}

// ============================================
// TEST SUPPORT
// ============================================


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn call(gas: u64) -> BatchCall {
        BatchCall {
            target: Address::ZERO,
            calldata: Bytes::from(vec![0u8; 4]),
            gas_limit: gas,
        }
    }

    #[test]
    fn chunking_respects_gas_ceiling() {
        let calls = vec![call(40), call(40), call(40), call(40)];
        let ranges = chunk_by_gas(&calls, 100);
        assert_eq!(ranges, vec![(0, 2), (2, 4)]);
    }

    #[test]
    fn oversized_call_gets_own_chunk() {
        let calls = vec![call(10), call(500), call(10)];
        let ranges = chunk_by_gas(&calls, 100);
        assert_eq!(ranges, vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn empty_input_yields_single_empty_range() {
        assert_eq!(chunk_by_gas(&[], 100), vec![(0, 0)]);
    }

    #[tokio::test]
    async fn retry_reissues_only_failed_calls_at_scaled_gas() {
        // Fail every call the first time it is seen at base gas; succeed at
        // anything larger.
        let executor = MockExecutor::new(|c| {
            if c.gas_limit > 100 {
                ok(vec![1])
            } else {
                CallOutcome::failed()
            }
        });

        let calls = vec![call(100), call(100), call(100)];
        let opts = BatchOptions {
            chain_id: 1,
            batch_gas_limit: DEFAULT_BATCH_GAS_LIMIT,
            retry_multiplier: 2,
        };

        let outcomes = execute_with_retry(&executor, &calls, &opts).await.unwrap();
        assert!(outcomes.iter().all(|o| o.success));

        let batches = executor.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 3);
        assert!(batches[1].iter().all(|c| c.gas_limit == 200));
    }

    #[tokio::test]
    async fn retry_skipped_when_all_succeed() {
        let executor = MockExecutor::new(|_| ok(vec![1]));
        let calls = vec![call(100), call(100)];
        let opts = BatchOptions::for_chain(1);

        let outcomes = execute_with_retry(&executor, &calls, &opts).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(executor.batch_count(), 1);
    }

    #[tokio::test]
    async fn retry_preserves_index_alignment() {
        // Only the middle call fails, and keeps failing on retry.
        let executor = MockExecutor::new(|c| {
            if c.calldata[0] == 1 {
                CallOutcome::failed()
            } else {
                ok(vec![c.calldata[0]])
            }
        });

        let mut calls = vec![call(100), call(100), call(100)];
        calls[0].calldata = Bytes::from(vec![0u8, 0, 0, 0]);
        calls[1].calldata = Bytes::from(vec![1u8, 0, 0, 0]);
        calls[2].calldata = Bytes::from(vec![2u8, 0, 0, 0]);

        let opts = BatchOptions::for_chain(1);
        let outcomes = execute_with_retry(&executor, &calls, &opts).await.unwrap();

        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[2].success);
        assert_eq!(outcomes[2].return_data.as_ref().unwrap()[0], 2);
    }
}
