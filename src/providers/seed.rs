use rand::Rng;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Keeps numeric seeds inside the positive 31-bit range.
pub const SEED_MODULUS: u64 = 2_147_483_647;

/// `"{unix_millis}-{6 random base36 chars}"`, unique per request.
pub fn derive_seed() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();

    format!("{}-{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Sum of UTF-16 code units reduced modulo [`SEED_MODULUS`]. Not a hash:
/// unrelated seeds may collide, equal seeds never differ.
pub fn numeric_seed(seed: &str) -> u32 {
    let sum: u64 = seed.encode_utf16().map(u64::from).sum();
    (sum % SEED_MODULUS) as u32
}
