pub mod model;

pub use model::SignedMessage;
