/// Runs a closure when dropped.
///
/// The websocket handler wraps its disconnect hook in one of these so the hook
/// fires exactly once however the connection task ends (close frame, transport
/// error, overflow eviction, shutdown or panic).
pub struct ScopeGuard<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> ScopeGuard<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}
