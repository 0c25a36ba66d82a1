use chrono::Utc;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use tracing::warn;

use crate::domain::token::{KeySource, TransmissionKey};

const TRANSMISSION_KEY_BYTES: usize = 16;

pub(crate) fn generate_transmission_key() -> TransmissionKey {
    generate_with(|buf| OsRng.try_fill_bytes(buf))
}

/// Random identifier embedded in every token as `jti`.
pub(crate) fn generate_token_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

fn generate_with<F>(fill: F) -> TransmissionKey
where
    F: FnOnce(&mut [u8]) -> Result<(), rand::Error>,
{
    let mut bytes = [0u8; TRANSMISSION_KEY_BYTES];
    let source = match fill(&mut bytes) {
        Ok(()) => KeySource::Os,
        Err(err) => {
            warn!(
                error = %err,
                "OS random source failed, transmission key comes from a seeded generator"
            );
            let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
            let seed = nanos ^ u64::from(std::process::id()).rotate_left(32);
            StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
            KeySource::Seeded
        }
    };

    TransmissionKey {
        value: hex::encode(bytes),
        source,
    }
}
