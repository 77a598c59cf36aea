use chrono::Utc;
use rand::Rng;

/// Generate a unique session identifier: unix timestamp plus a random
/// lowercase alphanumeric suffix, e.g. `topyaz_1754500000_k3f9q2ah`.
pub fn session_id() -> String {
    let ts = Utc::now().timestamp();

    let mut rng = rand::rng();
    let suffix: String = (0..8)
        .map(|_| {
            let idx = rng.random_range(0..36);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect();

    format!("topyaz_{}_{}", ts, suffix)
}
