use crate::utils::time::current_timestamp_millis;
use rand::Rng;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque tracking id: base36 millisecond timestamp followed by a random base36 suffix.
///
/// Collisions are unlikely but not ruled out.
pub fn generate_tracking_id() -> String {
    let suffix: u64 = rand::rng().random();
    let mut id = to_base36(current_timestamp_millis());
    id.push_str(&to_base36(suffix));
    id
}

pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();

    // Every byte comes from ALPHABET
    digits.into_iter().map(char::from).collect()
}
