use std::future::Future;

/// The external wallet that performs entry payments.
pub trait WalletProvider: Send + Sync {
    /// Pay `amount` to `receiver` and return the transaction identifier.
    fn pay(
        &self,
        amount: &str,
        receiver: &str,
    ) -> impl Future<Output = crate::Result<String>> + Send;
}

impl<W: WalletProvider> WalletProvider for &W {
    fn pay(
        &self,
        amount: &str,
        receiver: &str,
    ) -> impl Future<Output = crate::Result<String>> + Send {
        (**self).pay(amount, receiver)
    }
}
