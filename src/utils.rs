use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    #[inline]
    pub fn load(&self, ord: Ordering) -> f32 {
        f32::from_bits(self.0.load(ord))
    }

    #[inline]
    pub fn store(&self, f: f32, ord: Ordering) {
        self.0.store(f.to_bits(), ord);
    }
}
