//! Error Types for the Regrow Protocol
//!
//! Typed errors give callers a specific, named failure reason for every
//! abort. Each category maps to the propagation policy in the design docs:
//! authorization and validation failures are fatal to the call, economic
//! failures may be resubmitted with adjusted parameters, and arithmetic
//! failures indicate a defect rather than an expected runtime condition.

/// Result type alias for Regrow operations
pub type RegrowResult<T> = Result<T, RegrowError>;

/// Main error enum for all Regrow protocol errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegrowError {
    // ============ Authorization Errors ============
    /// Caller is not authorized for this operation
    Unauthorized { expected: [u8; 32], actual: [u8; 32] },

    /// Stake/withdraw invoked by a caller other than the registered vault
    NotVault { caller: [u8; 32] },

    // ============ Validation Errors ============
    /// Accrual subject identifier is the zero reference
    InvalidSubject,

    /// Accrual account identifier is the zero reference
    InvalidAccount,

    /// Null address where a real address is required
    ZeroAddress { param: &'static str },

    /// Zero amount not allowed
    ZeroAmount,

    /// Invalid parameter value
    InvalidParam { param: &'static str, reason: &'static str },

    /// Token is not valid for this operation (e.g. sweeping a tracked
    /// reward asset)
    InvalidToken { token: [u8; 32] },

    /// Configuration value exceeds its maximum constant
    ExceedsMax { value: u64, maximum: u64 },

    /// Amount below minimum threshold
    BelowMinimum { amount: u64, minimum: u64 },

    /// Reward token is already registered
    RewardTokenExists { token: [u8; 32] },

    /// Reward token is not registered
    RewardTokenNotFound { token: [u8; 32] },

    // ============ Economic Errors ============
    /// Conversion output fell below the caller's minimum
    SlippageExceeded { received: u64, minimum: u64 },

    /// Insufficient balance for operation
    InsufficientBalance { available: u64, requested: u64 },

    /// Insufficient shares for redemption
    InsufficientShares { available: u64, requested: u64 },

    /// Reward token still holds undistributed value
    RewardsOutstanding { token: [u8; 32], remaining: u64 },

    /// Pool principal would exceed the accounting ceiling
    ExceedsCapacity { current: u64, added: u64, maximum: u64 },

    // ============ Arithmetic Errors ============
    /// Arithmetic overflow occurred
    Overflow,

    /// Division by zero
    DivisionByZero,
}

impl RegrowError {
    /// Returns a stable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "E001_UNAUTHORIZED",
            Self::NotVault { .. } => "E002_NOT_VAULT",
            Self::InvalidSubject => "E010_INVALID_SUBJECT",
            Self::InvalidAccount => "E011_INVALID_ACCOUNT",
            Self::ZeroAddress { .. } => "E012_ZERO_ADDRESS",
            Self::ZeroAmount => "E013_ZERO_AMOUNT",
            Self::InvalidParam { .. } => "E014_INVALID_PARAM",
            Self::InvalidToken { .. } => "E015_INVALID_TOKEN",
            Self::ExceedsMax { .. } => "E016_EXCEEDS_MAX",
            Self::BelowMinimum { .. } => "E017_BELOW_MINIMUM",
            Self::RewardTokenExists { .. } => "E018_REWARD_TOKEN_EXISTS",
            Self::RewardTokenNotFound { .. } => "E019_REWARD_TOKEN_NOT_FOUND",
            Self::SlippageExceeded { .. } => "E020_SLIPPAGE",
            Self::InsufficientBalance { .. } => "E021_INSUFFICIENT_BALANCE",
            Self::InsufficientShares { .. } => "E022_INSUFFICIENT_SHARES",
            Self::RewardsOutstanding { .. } => "E023_REWARDS_OUTSTANDING",
            Self::ExceedsCapacity { .. } => "E024_EXCEEDS_CAPACITY",
            Self::Overflow => "E030_OVERFLOW",
            Self::DivisionByZero => "E031_DIV_ZERO",
        }
    }

    /// Returns true if this error is recoverable (caller can adjust input
    /// and resubmit)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::SlippageExceeded { .. } => true,  // Retry with new minimum
            Self::InsufficientBalance { .. } => true, // Get more funds
            Self::InsufficientShares { .. } => true,
            Self::BelowMinimum { .. } => true,      // Increase amount
            _ => false,
        }
    }
}
