use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use lazy_static::lazy_static;

use crate::utils::time::timestamp_millis;

lazy_static! {
    /// 24-bit identifier of this process, random per start
    static ref MACHINE_IDENTIFIER: u32 = {
        let mut hasher = DefaultHasher::new();
        nanoid::nanoid!().hash(&mut hasher);
        (hasher.finish() as u32) & 0x00ff_ffff
    };

    static ref COUNTER: AtomicU32 = AtomicU32::new(*MACHINE_IDENTIFIER ^ 0x005a_5a5a);
}

/// Generates a release key: `{epoch millis}-{hex}`.
///
/// The hex part packs a hash of the coordinate (8 digits), the process
/// identifier (6 digits) and a wrapping 24-bit counter (6 digits), so two
/// publishes of the same namespace within one millisecond still differ.
pub fn generate_release_key(
    app_id: &str,
    cluster: &str,
    namespace: &str,
) -> String {
    let mut hasher = DefaultHasher::new();
    (app_id, cluster, namespace).hash(&mut hasher);
    let coordinate_hash = hasher.finish() as u32;
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

    format!(
        "{}-{:08x}{:06x}{:06x}",
        timestamp_millis(),
        coordinate_hash,
        *MACHINE_IDENTIFIER,
        counter
    )
}
