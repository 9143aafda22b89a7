//! Chou-Orlandi random OT (cf. <https://eprint.iacr.org/2015/267>) over the
//! Ristretto group.
//!
//! The index of each OT is hashed into its key, otherwise all random OTs of one
//! run would share the same keys.
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE,
    ristretto::{CompressedRistretto, RistrettoBasepointTable, RistrettoPoint},
    scalar::Scalar,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{Level, debug, instrument};

use crate::{
    agent::CommunicationAgent, block::Block, channel::Channel, ot::Error, utils::RngCompat,
};

const POINT_BYTES: usize = 32;

fn hash_pt(tweak: u128, pt: &RistrettoPoint) -> Block {
    let h = blake3::keyed_hash(pt.compress().as_bytes(), &tweak.to_le_bytes());
    let mut bytes = [0; 16];
    bytes.copy_from_slice(&h.as_bytes()[0..16]);
    Block::new(bytes)
}

fn decode_point(data: &[u8], phase: &str) -> Result<RistrettoPoint, Error> {
    CompressedRistretto::from_slice(data)
        .ok()
        .and_then(|pt| pt.decompress())
        .ok_or_else(|| Error::InvalidOtData(phase.to_string()))
}

fn rng() -> RngCompat<ChaCha20Rng> {
    RngCompat(ChaCha20Rng::from_rng(&mut rand::rng()))
}

/// Sends `n` random OTs and returns both keys of each.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub(super) async fn send_random<C: Channel>(
    agent: &mut CommunicationAgent<C>,
    n: usize,
) -> Result<Vec<(Block, Block)>, Error> {
    let mut rng = rng();
    let y = Scalar::random(&mut rng);
    let s = &y * RISTRETTO_BASEPOINT_TABLE;
    agent
        .send_bytes("base OT s", s.compress().as_bytes().to_vec())
        .await?;

    let r_bytes = agent.recv_bytes("base OT r", n * POINT_BYTES).await?;
    let ys = y * s;
    let mut keys = Vec::with_capacity(n);
    for (i, chunk) in r_bytes.chunks_exact(POINT_BYTES).enumerate() {
        let r = decode_point(chunk, "base OT r")?;
        let yr = y * r;
        keys.push((hash_pt(i as u128, &yr), hash_pt(i as u128, &(yr - ys))));
    }
    debug!(n, "sent base OTs");
    Ok(keys)
}

/// Receives one random OT per choice bit and returns the chosen keys.
#[instrument(level = Level::DEBUG, skip_all, err)]
pub(super) async fn receive_random<C: Channel>(
    agent: &mut CommunicationAgent<C>,
    choices: &[bool],
) -> Result<Vec<Block>, Error> {
    let mut rng = rng();
    let s_bytes = agent.recv_bytes("base OT s", POINT_BYTES).await?;
    let s = decode_point(&s_bytes, "base OT s")?;
    let s = RistrettoBasepointTable::create(&s);

    let mut r_bytes = Vec::with_capacity(choices.len() * POINT_BYTES);
    let mut keys = Vec::with_capacity(choices.len());
    for (i, c) in choices.iter().enumerate() {
        let x = Scalar::random(&mut rng);
        let c = if *c { Scalar::ONE } else { Scalar::ZERO };
        let r = &c * &s + &x * RISTRETTO_BASEPOINT_TABLE;
        r_bytes.extend_from_slice(r.compress().as_bytes());
        keys.push(hash_pt(i as u128, &(&x * &s)));
    }
    agent.send_bytes("base OT r", r_bytes).await?;
    debug!(n = choices.len(), "received base OTs");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::test_utils::agent_pair;

    #[tokio::test]
    async fn receiver_gets_chosen_key() {
        let (mut a, mut b) = agent_pair("base").await;
        let choices: Vec<bool> = (0..40).map(|i| i % 3 == 0).collect();
        let (keys, chosen) =
            tokio::try_join!(send_random(&mut a, 40), receive_random(&mut b, &choices)).unwrap();
        for ((k0, k1), (k, c)) in keys.iter().zip(chosen.iter().zip(&choices)) {
            assert_ne!(k0, k1);
            assert_eq!(if *c { k1 } else { k0 }, k);
        }
    }

    #[tokio::test]
    async fn invalid_point_is_rejected() {
        let (mut a, mut b) = agent_pair("base").await;
        a.send_bytes("base OT s", vec![0xff; POINT_BYTES])
            .await
            .unwrap();
        let err = receive_random(&mut b, &[true]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOtData(_)));
    }
}
