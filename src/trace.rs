use std::fmt::Debug;

/// Write-only sink for verbose progress messages.
///
/// Messages are free text meant for operators; nothing in this crate reads them back.
pub trait TraceSink: Send + Sync + Debug {
    fn verbose(&self, message: &str);
}

/// Default sink: forwards to `tracing::debug!` (feature=`tracing`), otherwise drops messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn verbose(&self, _message: &str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "taskbus", message = %_message, "verbose");
    }
}
