use async_trait::async_trait;

/// Process one item of a chunk-oriented batch step.
///
/// The step reads an item, passes it through the processor, and hands the output on to the next
/// stage. Object safe, so steps can hold a `Box<dyn ItemProcessor<..>>`.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    /// The item read by the step.
    type Input: Send;
    /// The item handed to the next stage.
    type Output: Send;
    /// The error returned when an item cannot be processed.
    type Error: Send;

    /// Process one item.
    async fn process_item(&self, item: Self::Input) -> Result<Self::Output, Self::Error>;
}
