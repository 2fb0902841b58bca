use anyhow::Result;

/// Computes the checkout total. The fee calculation lives outside this
/// service; implementations adapt whatever backs it.
pub trait Checkout: Send + Sync {
    fn total(&self) -> Result<i64>;
}

/// Stub collaborator that always reports the configured total.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCheckout {
    pub total: i64,
}

impl FixedCheckout {
    pub fn new(total: i64) -> Self {
        Self { total }
    }
}

impl Checkout for FixedCheckout {
    fn total(&self) -> Result<i64> {
        Ok(self.total)
    }
}
