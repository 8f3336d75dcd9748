pub mod block;
pub mod hasher;
pub mod ledger;
pub mod miner;

pub use block::Block;
pub use ledger::{Admission, Ledger};
pub use miner::Miner;
