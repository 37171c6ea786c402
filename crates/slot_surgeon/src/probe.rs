use std::fmt;

use primitive_types::U256;

use crate::{
    encoding::{Address, derive_mapping_slot, storage_word},
    error::{Stage, SurgeonError},
    rpc::{DEFAULT_SET_STORAGE_METHOD, JsonRpc, balance_of, get_storage_at, set_storage_at},
};

pub const DEFAULT_MAX_SLOT: u64 = 20;

#[derive(Debug, Clone)]
pub struct ProbeParams {
    pub token: Address,
    pub account: Address,
    pub amount: U256,
    /// Inclusive.
    pub max_slot: u64,
    pub set_storage_method: String,
}

impl ProbeParams {
    pub fn new(token: Address, account: Address, amount: U256) -> Self {
        Self {
            token,
            account,
            amount,
            max_slot: DEFAULT_MAX_SLOT,
            set_storage_method: DEFAULT_SET_STORAGE_METHOD.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotFound {
    pub slot_index: u64,
    pub storage_key: String,
    pub balance_after: U256,
}

impl fmt::Display for SlotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "OK: found balances mapping slot index = {}", self.slot_index)?;
        writeln!(f, "storage key = {}", self.storage_key)?;
        write!(f, "balanceOf(after) = {}", self.balance_after)
    }
}

/// Reads the account's current balance. Any failure here means the token is
/// not callable as an ERC20 or the node is unreachable.
pub async fn check_balance<R: JsonRpc>(rpc: &R, params: &ProbeParams) -> Result<U256, SurgeonError> {
    balance_of(rpc, &params.token, &params.account)
        .await
        .map_err(|e| SurgeonError::BalanceCheck(Box::new(e)))
}

/// Tries every slot in `0..=max_slot`, writing the amount and checking it
/// through `balanceOf`. A slot that does not match is written back with the
/// word it held before. Restoring is best-effort: if the restore call fails
/// the search stops and the cell may keep the probe value.
pub async fn find_and_set<R: JsonRpc>(
    rpc: &R,
    params: &ProbeParams,
) -> Result<SlotFound, SurgeonError> {
    let desired_word = storage_word(params.amount);

    for slot in 0..=params.max_slot {
        let storage_key = derive_mapping_slot(&params.account, slot);

        let old_word = get_storage_at(rpc, &params.token, &storage_key)
            .await
            .map_err(SurgeonError::at(slot, Stage::Read))?;
        tracing::debug!(slot, key = %storage_key, old = %old_word, "probing slot");

        set_storage_at(
            rpc,
            &params.set_storage_method,
            &params.token,
            &storage_key,
            &desired_word,
        )
        .await
        .map_err(SurgeonError::at(slot, Stage::Write))?;

        let after = balance_of(rpc, &params.token, &params.account)
            .await
            .map_err(SurgeonError::at(slot, Stage::Verify))?;

        if after == params.amount {
            tracing::info!(slot, key = %storage_key, "balances mapping slot found");
            return Ok(SlotFound {
                slot_index: slot,
                storage_key,
                balance_after: after,
            });
        }

        tracing::debug!(slot, balance = %after, "no match, restoring");
        set_storage_at(
            rpc,
            &params.set_storage_method,
            &params.token,
            &storage_key,
            &old_word,
        )
        .await
        .map_err(SurgeonError::at(slot, Stage::Restore))?;
    }

    Err(SurgeonError::SlotNotFound {
        max_slot: params.max_slot,
    })
}
