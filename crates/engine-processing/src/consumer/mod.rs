use crate::error::ConsumerError;
use async_trait::async_trait;

pub mod worker;
pub mod writer;

#[async_trait]
pub trait DataConsumer {
    /// Executes the consumer's main loop.
    async fn run(&mut self) -> Result<(), ConsumerError>;
}
