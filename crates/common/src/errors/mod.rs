//! Rendering of error chains.

mod private {
    use eyre::Chain;
    use std::error::Error;

    pub trait ErrorChain {
        fn chain(&self) -> Chain<'_>;
    }

    impl ErrorChain for dyn Error + 'static {
        fn chain(&self) -> Chain<'_> {
            Chain::new(self)
        }
    }

    impl ErrorChain for eyre::Report {
        fn chain(&self) -> Chain<'_> {
            self.chain()
        }
    }
}

/// Displays a chain of errors in a single line.
pub fn display_chain<E: private::ErrorChain + ?Sized>(error: &E) -> String {
    dedup_chain(error).join("; ")
}

/// Messages of `error` and all of its sources, dropping a source when the message above it
/// already embeds it (`replay failed: nonce mismatch; nonce mismatch` → `replay failed: nonce
/// mismatch`).
pub fn dedup_chain<E: private::ErrorChain + ?Sized>(error: &E) -> Vec<String> {
    let mut messages: Vec<String> =
        error.chain().map(|cause| cause.to_string().trim().to_string()).collect();
    messages.dedup_by(|next, prev| prev.contains(next.as_str()));
    messages
}
