use rand::Rng;

/// Fixed length of a drop code.
pub const CODE_LENGTH: usize = 6;

/// Creation gives up after this many unique-constraint conflicts rather than
/// spinning as the code space fills up.
pub const MAX_CODE_ATTEMPTS: usize = 16;

/// Draw a random drop code candidate: CODE_LENGTH digits, leading zeros
/// allowed. Uniqueness is enforced by the database at insert time, not here.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}
