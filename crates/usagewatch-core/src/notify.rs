/// Receives user-facing messages returned by the collector
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
