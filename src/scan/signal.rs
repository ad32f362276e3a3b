use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// One-shot broadcast flag shared by every probe of a scan.
///
/// Clones observe the same flag. Raising it twice is harmless.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
