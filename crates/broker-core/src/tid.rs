//! Transaction-ID generation.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a transaction ID of the form `/<seq>_<hex8>`.
///
/// The sequence number is process-wide and monotone, so IDs are unique for
/// the lifetime of the daemon even if the random suffix ever collided.
pub fn generate() -> String {
    let seq = COUNTER.fetch_add(1, Ordering::SeqCst);
    let entropy = Uuid::new_v4().simple().to_string();
    format!("/{seq}_{}", &entropy[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_unique_ids() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert!(a.starts_with('/'));
        assert!(a.contains('_'));
    }
}
