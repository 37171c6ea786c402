use thiserror::Error;

/// Bad user input or an undecodable value. Raised before any RPC call when it
/// comes from the command line.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("invalid hex {0:?}: {1}")]
    InvalidHex(String, hex::FromHexError),
    #[error("address must be 20 bytes, got {0}")]
    InvalidAddressLength(usize),
    #[error("{0} must be non-negative")]
    Negative(&'static str),
    #[error("invalid {0}: {1:?}")]
    InvalidInteger(&'static str, String),
    #[error("word must be at most 32 bytes, got {0}")]
    WordTooLong(usize),
    #[error("empty result")]
    EmptyResult,
}

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error: {0}")]
    Protocol(serde_json::Value),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// The probe step that was running when an RPC call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Write,
    Verify,
    Restore,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Read | Stage::Write | Stage::Verify => f.write_str("rpc failed"),
            Stage::Restore => f.write_str("failed to restore storage"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SurgeonError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("failed to eth_call balanceOf: {0}")]
    BalanceCheck(#[source] Box<SurgeonError>),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("slot {slot}: {stage}: {source}")]
    Probe {
        slot: u64,
        stage: Stage,
        #[source]
        source: Box<SurgeonError>,
    },
    #[error("FAILED: could not find balances mapping slot in [0..{max_slot}].")]
    SlotNotFound { max_slot: u64 },
}

impl SurgeonError {
    /// Process exit status for this error: 1 when the search was exhausted,
    /// 2 for anything fatal.
    pub fn exit_code(&self) -> u8 {
        match self {
            SurgeonError::SlotNotFound { .. } => 1,
            _ => 2,
        }
    }

    pub(crate) fn at(slot: u64, stage: Stage) -> impl FnOnce(SurgeonError) -> SurgeonError {
        move |source| SurgeonError::Probe {
            slot,
            stage,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SurgeonError::SlotNotFound { max_slot: 20 }.exit_code(), 1);
        assert_eq!(
            SurgeonError::from(EncodingError::Negative("amount")).exit_code(),
            2
        );

        let restore = SurgeonError::at(4, Stage::Restore)(
            RpcError::InvalidResponse("no result".to_string()).into(),
        );
        assert_eq!(restore.exit_code(), 2);
        assert_eq!(
            restore.to_string(),
            "slot 4: failed to restore storage: invalid response: no result"
        );
    }

    #[test]
    fn test_protocol_error_keeps_payload() {
        let payload = serde_json::json!({"code": -32000, "message": "execution reverted"});
        let err = RpcError::Protocol(payload.clone());
        assert!(err.to_string().contains("execution reverted"));
        match err {
            RpcError::Protocol(p) => assert_eq!(p, payload),
            _ => unreachable!(),
        }
    }
}
