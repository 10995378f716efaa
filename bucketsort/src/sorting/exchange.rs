//! Two phase redistribution of buckets, counts are negotiated first and then the keys themselves
//! are moved with a variable count all to all exchange.
use std::ops::Range;

use tracing::debug;

use crate::{
    helpers::displacements,
    sorting::partition::Buckets,
    traits::{
        transport::Transport,
        types::{Error, Key, Result},
    },
};

/// Layout of the flat send and receive buffers of one process for a variable count all to all
/// exchange. Displacements are the exclusive prefix sums of the counts, in increasing rank order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangePlan {
    send_counts: Vec<usize>,
    recv_counts: Vec<usize>,
    send_displacements: Vec<usize>,
    recv_displacements: Vec<usize>,
}

impl ExchangePlan {
    /// Constructor, derives the displacements from the counts.
    ///
    /// # Arguments
    /// * `send_counts` - Number of elements sent to each process.
    /// * `recv_counts` - Number of elements received from each process.
    pub fn new(send_counts: Vec<usize>, recv_counts: Vec<usize>) -> Result<Self> {
        if send_counts.len() != recv_counts.len() {
            return Err(Error::Transport(format!(
                "{} send counts but {} receive counts",
                send_counts.len(),
                recv_counts.len()
            )));
        }

        let send_displacements = displacements(&send_counts);
        let recv_displacements = displacements(&recv_counts);

        Ok(Self {
            send_counts,
            recv_counts,
            send_displacements,
            recv_displacements,
        })
    }

    /// Number of processes covered by the plan.
    pub fn n_processes(&self) -> usize {
        self.send_counts.len()
    }

    /// Number of elements sent to each process.
    pub fn send_counts(&self) -> &[usize] {
        &self.send_counts
    }

    /// Number of elements received from each process.
    pub fn recv_counts(&self) -> &[usize] {
        &self.recv_counts
    }

    /// Offset of each target's slice in the send buffer.
    pub fn send_displacements(&self) -> &[usize] {
        &self.send_displacements
    }

    /// Offset of each source's slice in the receive buffer.
    pub fn recv_displacements(&self) -> &[usize] {
        &self.recv_displacements
    }

    /// Size of the flat send buffer.
    pub fn total_send(&self) -> usize {
        self.send_counts.iter().sum()
    }

    /// Size of the flat receive buffer.
    pub fn total_recv(&self) -> usize {
        self.recv_counts.iter().sum()
    }

    /// Index range of the send buffer destined to `process`.
    pub fn send_range(&self, process: usize) -> Range<usize> {
        let start = self.send_displacements[process];
        start..start + self.send_counts[process]
    }

    /// Index range of the receive buffer filled by `process`.
    pub fn recv_range(&self, process: usize) -> Range<usize> {
        let start = self.recv_displacements[process];
        start..start + self.recv_counts[process]
    }

    /// Slice of a flat send buffer destined to `process`.
    pub fn send_slice_for<'a, T>(&self, send: &'a [T], process: usize) -> &'a [T] {
        &send[self.send_range(process)]
    }

    /// Slice of a flat receive buffer filled by `process`.
    pub fn recv_slice_for<'a, T>(&self, recv: &'a [T], process: usize) -> &'a [T] {
        &recv[self.recv_range(process)]
    }
}

/// Count negotiation, every process learns how many keys each source will send it.
///
/// # Arguments
/// * `buckets` - Keys of the calling process grouped by owning process.
/// * `comm` - Transport shared by all processes.
pub fn negotiate<T, C>(buckets: &Buckets<T>, comm: &C) -> Result<ExchangePlan>
where
    T: Key,
    C: Transport,
{
    if buckets.n_buckets() != comm.size() {
        return Err(Error::Transport(format!(
            "{} buckets for {} processes",
            buckets.n_buckets(),
            comm.size()
        )));
    }

    let send_counts = buckets.counts();
    let recv_counts = comm.exchange_counts(&send_counts)?;

    debug!(
        rank = comm.rank(),
        sending = send_counts.iter().sum::<usize>(),
        receiving = recv_counts.iter().sum::<usize>(),
        "negotiated exchange counts"
    );

    ExchangePlan::new(send_counts, recv_counts)
}

/// Move every key to its owning process. After this call the returned buffer holds exactly the keys
/// owned by the calling process, contributed by every source in increasing rank order.
///
/// # Arguments
/// * `buckets` - Keys of the calling process grouped by owning process.
/// * `plan` - Negotiated plan, see [`negotiate`].
/// * `comm` - Transport shared by all processes.
pub fn exchange<T, C>(buckets: Buckets<T>, plan: &ExchangePlan, comm: &C) -> Result<Vec<T>>
where
    T: Key,
    C: Transport,
{
    if buckets.counts() != plan.send_counts() {
        return Err(Error::Transport(
            "bucket sizes do not match the negotiated send counts".to_string(),
        ));
    }

    let send = buckets.into_flat();
    let received = comm.exchange_data(&send, plan)?;

    if received.len() != plan.total_recv() {
        return Err(Error::Transport(format!(
            "expected {} keys from the exchange, received {}",
            plan.total_recv(),
            received.len()
        )));
    }

    Ok(received)
}
