pub mod redemption;
pub mod retry;
pub mod rewards;
