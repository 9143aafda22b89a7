//! IKNP style random correlated OT extension (cf.
//! <https://eprint.iacr.org/2016/602>, Protocol 4, without the final hashing).
//!
//! The first row of the extension matrix is fixed instead of derived from a
//! base OT: the sender's row is zero and the receiver's row is its choice
//! vector. Together with the LSB of `delta` being 1 this places the choice
//! bit of every RCOT into the LSB of the receiver's block, so only 127 base
//! OTs are needed.
use rand::{RngCore, SeedableRng};
use tracing::{Level, debug, instrument};

use crate::{
    agent::CommunicationAgent,
    block::Block,
    channel::Channel,
    crypto::{AesRng, Prg},
    ot::{Error, RandomCorrelatedOt, base},
    transpose::transpose_bitmatrix,
    utils::{pack_bits, unpack_bits, xor_inplace},
};

const ROWS: usize = 128;
const BASE_OTS: usize = ROWS - 1;

/// Columns of the extension matrix for `size` OTs.
fn columns(size: usize) -> usize {
    size.next_multiple_of(8).max(16)
}

/// Transposes the `ROWS x cols` matrix and returns its first `size` columns as blocks.
fn matrix_columns(matrix: &[u8], size: usize) -> Vec<Block> {
    let mut transposed = vec![0; matrix.len()];
    transpose_bitmatrix(matrix, &mut transposed, ROWS);
    transposed
        .chunks_exact(Block::BYTES)
        .take(size)
        .map(|c| {
            let mut bytes = [0; 16];
            bytes.copy_from_slice(c);
            Block::new(bytes)
        })
        .collect()
}

/// IKNP RCOT sender.
pub(crate) struct IknpSender {
    delta: Block,
    choices: Vec<bool>,
    rngs: Vec<AesRng>,
}

impl IknpSender {
    /// Picks `delta` and runs the base OTs as their receiver.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(crate) async fn setup<C: Channel>(agent: &mut CommunicationAgent<C>) -> Result<Self, Error> {
        let delta = Prg::from_entropy().random_block().with_lsb(true);
        let choices = unpack_bits(delta.as_bytes(), ROWS).split_off(1);
        let keys = base::receive_random(agent, &choices).await?;
        let rngs = keys.into_iter().map(AesRng::from_seed).collect();
        Ok(Self {
            delta,
            choices,
            rngs,
        })
    }

    pub(crate) fn delta(&self) -> Block {
        self.delta
    }
}

impl RandomCorrelatedOt for IknpSender {
    #[instrument(level = Level::DEBUG, skip_all, fields(size = size), err)]
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        if size == 0 {
            return Ok(vec![]);
        }
        let row_bytes = columns(size) / 8;
        let u = agent
            .recv_bytes("IKNP correction", BASE_OTS * row_bytes)
            .await?;
        let mut q = vec![0u8; ROWS * row_bytes];
        for (j, ((row, rng), u_j)) in q
            .chunks_exact_mut(row_bytes)
            .skip(1)
            .zip(&mut self.rngs)
            .zip(u.chunks_exact(row_bytes))
            .enumerate()
        {
            rng.fill_bytes(row);
            if self.choices[j] {
                xor_inplace(row, u_j);
            }
        }
        debug!(size, "IKNP sender extended");
        Ok(matrix_columns(&q, size))
    }
}

/// IKNP RCOT receiver.
pub(crate) struct IknpReceiver {
    rngs: Vec<(AesRng, AesRng)>,
    prg: Prg,
}

impl IknpReceiver {
    /// Runs the base OTs as their sender.
    #[instrument(level = Level::DEBUG, skip_all, err)]
    pub(crate) async fn setup<C: Channel>(agent: &mut CommunicationAgent<C>) -> Result<Self, Error> {
        let keys = base::send_random(agent, BASE_OTS).await?;
        let rngs = keys
            .into_iter()
            .map(|(k0, k1)| (AesRng::from_seed(k0), AesRng::from_seed(k1)))
            .collect();
        Ok(Self {
            rngs,
            prg: Prg::from_entropy(),
        })
    }
}

impl RandomCorrelatedOt for IknpReceiver {
    #[instrument(level = Level::DEBUG, skip_all, fields(size = size), err)]
    async fn rcot<C: Channel>(
        &mut self,
        agent: &mut CommunicationAgent<C>,
        size: usize,
    ) -> Result<Vec<Block>, Error> {
        if size == 0 {
            return Ok(vec![]);
        }
        let cols = columns(size);
        let row_bytes = cols / 8;
        let mut r = pack_bits(&self.prg.random_bits(size));
        r.resize(row_bytes, 0);

        let mut t = vec![0u8; ROWS * row_bytes];
        let mut u = vec![0u8; BASE_OTS * row_bytes];
        t[..row_bytes].copy_from_slice(&r);
        for ((row, (rng0, rng1)), u_j) in t
            .chunks_exact_mut(row_bytes)
            .skip(1)
            .zip(&mut self.rngs)
            .zip(u.chunks_exact_mut(row_bytes))
        {
            rng0.fill_bytes(row);
            rng1.fill_bytes(u_j);
            xor_inplace(u_j, row);
            xor_inplace(u_j, &r);
        }
        agent.send_bytes("IKNP correction", u).await?;
        debug!(size, "IKNP receiver extended");
        Ok(matrix_columns(&t, size))
    }
}
