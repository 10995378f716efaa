//! Transport over an MPI communicator.
use itertools::Itertools;
use mpi::{
    collective::SystemOperation,
    datatype::{Partition, PartitionMut},
    topology::SimpleCommunicator,
    traits::{Communicator, CommunicatorCollectives, Root},
    Count,
};
use tracing::trace;

use crate::{
    sorting::ExchangePlan,
    traits::{
        transport::Transport,
        types::{Error, ExecutionContext, Payload, Result, COORDINATOR_RANK},
    },
};

/// Collectives issued on a private duplicate of an MPI communicator.
pub struct MpiTransport {
    communicator: SimpleCommunicator,
    context: ExecutionContext,
}

impl MpiTransport {
    /// Constructor, duplicates `world` so that sort traffic cannot interleave with that of the
    /// caller.
    pub fn new(world: &SimpleCommunicator) -> Self {
        let communicator = world.duplicate();
        let context =
            ExecutionContext::new(communicator.rank() as usize, communicator.size() as usize);
        Self {
            communicator,
            context,
        }
    }

    /// Underlying communicator
    pub fn communicator(&self) -> &SimpleCommunicator {
        &self.communicator
    }
}

fn to_counts(counts: &[usize]) -> Result<Vec<Count>> {
    counts
        .iter()
        .map(|&c| {
            Count::try_from(c)
                .map_err(|_| Error::Transport(format!("count {} exceeds the MPI count range", c)))
        })
        .collect()
}

fn from_counts(counts: &[Count]) -> Result<Vec<usize>> {
    counts
        .iter()
        .map(|&c| {
            usize::try_from(c).map_err(|_| Error::Transport(format!("negative count {}", c)))
        })
        .collect()
}

impl Transport for MpiTransport {
    fn context(&self) -> ExecutionContext {
        self.context
    }

    fn broadcast<T: Payload>(&self, value: T) -> Result<T> {
        let mut value = value;
        self.communicator
            .process_at_rank(COORDINATOR_RANK as i32)
            .broadcast_into(&mut value);
        Ok(value)
    }

    fn scatter_varcount<T: Payload>(
        &self,
        data: Option<&[T]>,
        counts: &[usize],
    ) -> Result<Vec<T>> {
        if counts.len() != self.context.size {
            return Err(Error::Transport(format!(
                "scatter counts has {} entries for {} processes",
                counts.len(),
                self.context.size
            )));
        }

        let root_process = self.communicator.process_at_rank(COORDINATOR_RANK as i32);
        let mut received = vec![T::default(); counts[self.context.rank]];

        if self.context.is_coordinator() {
            let data = data.ok_or_else(|| {
                Error::Transport("the coordinator must supply the data to scatter".to_string())
            })?;
            let counts_snd = to_counts(counts)?;
            let displs_snd = counts_snd
                .iter()
                .scan(0, |acc, &x| {
                    let tmp = *acc;
                    *acc += x;
                    Some(tmp)
                })
                .collect_vec();

            let partition = Partition::new(data, counts_snd, &displs_snd[..]);
            root_process.scatter_varcount_into_root(&partition, &mut received[..]);
        } else {
            root_process.scatter_varcount_into(&mut received[..]);
        }

        Ok(received)
    }

    fn gather<T: Payload>(&self, value: T) -> Result<Option<Vec<T>>> {
        let root_process = self.communicator.process_at_rank(COORDINATOR_RANK as i32);

        if self.context.is_coordinator() {
            let mut gathered = vec![T::default(); self.context.size];
            root_process.gather_into_root(&value, &mut gathered[..]);
            Ok(Some(gathered))
        } else {
            root_process.gather_into(&value);
            Ok(None)
        }
    }

    fn gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: Option<&[usize]>,
    ) -> Result<Option<Vec<T>>> {
        let root_process = self.communicator.process_at_rank(COORDINATOR_RANK as i32);

        if self.context.is_coordinator() {
            let counts = counts.ok_or_else(|| {
                Error::Transport("the coordinator must supply the gather counts".to_string())
            })?;
            let counts_recv = to_counts(counts)?;
            let displs_recv = counts_recv
                .iter()
                .scan(0, |acc, &x| {
                    let tmp = *acc;
                    *acc += x;
                    Some(tmp)
                })
                .collect_vec();

            let mut gathered = vec![T::default(); counts.iter().sum()];
            let mut partition: PartitionMut<[T], Vec<Count>, &[Count]> =
                PartitionMut::new(&mut gathered[..], counts_recv, &displs_recv[..]);
            root_process.gather_varcount_into_root(local, &mut partition);
            Ok(Some(gathered))
        } else {
            root_process.gather_varcount_into(local);
            Ok(None)
        }
    }

    fn exchange_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>> {
        let counts_snd = to_counts(send_counts)?;
        let mut counts_recv = vec![0 as Count; self.context.size];
        self.communicator
            .all_to_all_into(&counts_snd[..], &mut counts_recv[..]);
        from_counts(&counts_recv)
    }

    fn exchange_data<T: Payload>(&self, send: &[T], plan: &ExchangePlan) -> Result<Vec<T>> {
        if send.len() != plan.total_send() {
            return Err(Error::Transport(format!(
                "send buffer of {} elements for a plan sending {}",
                send.len(),
                plan.total_send()
            )));
        }

        let counts_snd = to_counts(plan.send_counts())?;
        let displs_snd = to_counts(plan.send_displacements())?;
        let counts_recv = to_counts(plan.recv_counts())?;
        let displs_recv = to_counts(plan.recv_displacements())?;

        trace!(
            rank = self.context.rank,
            total_send = plan.total_send(),
            total_recv = plan.total_recv(),
            "all to all varcount"
        );

        let mut received = vec![T::default(); plan.total_recv()];
        let mut partition_received: PartitionMut<[T], Vec<Count>, &[Count]> =
            PartitionMut::new(&mut received[..], counts_recv, &displs_recv[..]);
        let partition_snd = Partition::new(send, counts_snd, &displs_snd[..]);

        self.communicator
            .all_to_all_varcount_into(&partition_snd, &mut partition_received);

        Ok(received)
    }

    fn reduce_max(&self, value: f64) -> Result<Option<f64>> {
        let root_process = self.communicator.process_at_rank(COORDINATOR_RANK as i32);

        if self.context.is_coordinator() {
            let mut max = 0f64;
            root_process.reduce_into_root(&value, &mut max, SystemOperation::max());
            Ok(Some(max))
        } else {
            root_process.reduce_into(&value, SystemOperation::max());
            Ok(None)
        }
    }

    fn barrier(&self) -> Result<()> {
        self.communicator.barrier();
        Ok(())
    }
}
