pub mod cmd;
pub mod gating;
pub mod subscription;
pub mod tiers;
pub mod utils;
