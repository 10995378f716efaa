//! In-process transport, every logical process runs on its own scoped thread and collectives are
//! realised with per (source, destination) FIFO queues.
use std::fmt;

use bytemuck::Pod;
use crossbeam_channel::{unbounded, Receiver, Sender};
use itertools::Itertools;

use crate::{
    helpers::{deserialise_vec, displacements, serialise_vec},
    sorting::ExchangePlan,
    traits::{
        transport::Transport,
        types::{Error, ExecutionContext, Payload, Result, COORDINATOR_RANK},
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Collective {
    Broadcast,
    Scatter,
    Gather,
    GatherVarcount,
    ExchangeCounts,
    ExchangeData,
    ReduceMax,
    Barrier,
}

impl fmt::Display for Collective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collective::Broadcast => "broadcast",
            Collective::Scatter => "scatter",
            Collective::Gather => "gather",
            Collective::GatherVarcount => "gather_varcount",
            Collective::ExchangeCounts => "exchange_counts",
            Collective::ExchangeData => "exchange_data",
            Collective::ReduceMax => "reduce_max",
            Collective::Barrier => "barrier",
        };
        write!(f, "{}", name)
    }
}

struct Envelope {
    collective: Collective,
    payload: Vec<u8>,
}

/// Transport endpoint of one logical process of a [`LocalCluster`].
///
/// A peer that issues a different collective is reported as [`Error::Desynchronised`], and a peer
/// that stops participating as [`Error::Disconnected`], rather than blocking forever.
pub struct LocalTransport {
    context: ExecutionContext,

    // Indexed by destination rank
    outboxes: Vec<Sender<Envelope>>,

    // Indexed by source rank
    inboxes: Vec<Receiver<Envelope>>,
}

impl LocalTransport {
    fn send<T: Pod>(&self, collective: Collective, destination: usize, data: &[T]) -> Result<()> {
        let envelope = Envelope {
            collective,
            payload: serialise_vec(data),
        };

        self.outboxes[destination]
            .send(envelope)
            .map_err(|_| Error::Disconnected {
                rank: self.context.rank,
                peer: destination,
            })
    }

    fn receive<T: Pod>(&self, collective: Collective, source: usize) -> Result<Vec<T>> {
        let envelope = self.inboxes[source]
            .recv()
            .map_err(|_| Error::Disconnected {
                rank: self.context.rank,
                peer: source,
            })?;

        if envelope.collective != collective {
            return Err(Error::Desynchronised {
                rank: self.context.rank,
                expected: collective.to_string(),
                received: envelope.collective.to_string(),
            });
        }

        deserialise_vec(&envelope.payload)
    }

    fn receive_scalar<T: Pod>(&self, collective: Collective, source: usize) -> Result<T> {
        match self.receive::<T>(collective, source)?.as_slice() {
            [value] => Ok(*value),
            other => Err(Error::Transport(format!(
                "{} from rank {} carried {} values, expected one",
                collective,
                source,
                other.len()
            ))),
        }
    }

    fn check_len(&self, what: &str, len: usize) -> Result<()> {
        if len != self.context.size {
            return Err(Error::Transport(format!(
                "{} has {} entries for {} processes",
                what, len, self.context.size
            )));
        }
        Ok(())
    }
}

impl Transport for LocalTransport {
    fn context(&self) -> ExecutionContext {
        self.context
    }

    fn broadcast<T: Payload>(&self, value: T) -> Result<T> {
        if self.context.is_coordinator() {
            for destination in 0..self.context.size {
                self.send(Collective::Broadcast, destination, &[value])?;
            }
        }

        self.receive_scalar(Collective::Broadcast, COORDINATOR_RANK)
    }

    fn scatter_varcount<T: Payload>(
        &self,
        data: Option<&[T]>,
        counts: &[usize],
    ) -> Result<Vec<T>> {
        self.check_len("scatter counts", counts.len())?;

        if self.context.is_coordinator() {
            let data = data.ok_or_else(|| {
                Error::Transport("the coordinator must supply the data to scatter".to_string())
            })?;

            let total = counts.iter().sum::<usize>();
            if data.len() != total {
                return Err(Error::Transport(format!(
                    "scatter of {} elements with counts summing to {}",
                    data.len(),
                    total
                )));
            }

            for (destination, (&count, &displacement)) in
                counts.iter().zip(displacements(counts).iter()).enumerate()
            {
                let slice = &data[displacement..displacement + count];
                self.send(Collective::Scatter, destination, slice)?;
            }
        }

        let received = self.receive::<T>(Collective::Scatter, COORDINATOR_RANK)?;
        if received.len() != counts[self.context.rank] {
            return Err(Error::Transport(format!(
                "rank {} expected {} scattered elements, received {}",
                self.context.rank,
                counts[self.context.rank],
                received.len()
            )));
        }

        Ok(received)
    }

    fn gather<T: Payload>(&self, value: T) -> Result<Option<Vec<T>>> {
        self.send(Collective::Gather, COORDINATOR_RANK, &[value])?;

        if self.context.is_coordinator() {
            let gathered = (0..self.context.size)
                .map(|source| self.receive_scalar(Collective::Gather, source))
                .collect::<Result<Vec<T>>>()?;
            Ok(Some(gathered))
        } else {
            Ok(None)
        }
    }

    fn gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: Option<&[usize]>,
    ) -> Result<Option<Vec<T>>> {
        self.send(Collective::GatherVarcount, COORDINATOR_RANK, local)?;

        if !self.context.is_coordinator() {
            return Ok(None);
        }

        let counts = counts.ok_or_else(|| {
            Error::Transport("the coordinator must supply the gather counts".to_string())
        })?;
        self.check_len("gather counts", counts.len())?;

        let mut gathered = Vec::with_capacity(counts.iter().sum());
        for (source, &count) in counts.iter().enumerate() {
            let received = self.receive::<T>(Collective::GatherVarcount, source)?;
            if received.len() != count {
                return Err(Error::Transport(format!(
                    "expected {} gathered elements from rank {}, received {}",
                    count,
                    source,
                    received.len()
                )));
            }
            gathered.extend(received);
        }

        Ok(Some(gathered))
    }

    fn exchange_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>> {
        self.check_len("send counts", send_counts.len())?;

        for (destination, &count) in send_counts.iter().enumerate() {
            self.send(Collective::ExchangeCounts, destination, &[count])?;
        }

        (0..self.context.size)
            .map(|source| self.receive_scalar(Collective::ExchangeCounts, source))
            .collect()
    }

    fn exchange_data<T: Payload>(&self, send: &[T], plan: &ExchangePlan) -> Result<Vec<T>> {
        self.check_len("exchange plan", plan.n_processes())?;

        if send.len() != plan.total_send() {
            return Err(Error::Transport(format!(
                "send buffer of {} elements for a plan sending {}",
                send.len(),
                plan.total_send()
            )));
        }

        for destination in 0..self.context.size {
            self.send(
                Collective::ExchangeData,
                destination,
                plan.send_slice_for(send, destination),
            )?;
        }

        let mut received = vec![T::default(); plan.total_recv()];
        for source in 0..self.context.size {
            let slice = self.receive::<T>(Collective::ExchangeData, source)?;
            let range = plan.recv_range(source);
            if slice.len() != range.len() {
                return Err(Error::Transport(format!(
                    "expected {} elements from rank {}, received {}",
                    range.len(),
                    source,
                    slice.len()
                )));
            }
            received[range].copy_from_slice(&slice);
        }

        Ok(received)
    }

    fn reduce_max(&self, value: f64) -> Result<Option<f64>> {
        self.send(Collective::ReduceMax, COORDINATOR_RANK, &[value])?;

        if self.context.is_coordinator() {
            let values = (0..self.context.size)
                .map(|source| self.receive_scalar::<f64>(Collective::ReduceMax, source))
                .collect::<Result<Vec<_>>>()?;
            Ok(values.into_iter().reduce(f64::max))
        } else {
            Ok(None)
        }
    }

    fn barrier(&self) -> Result<()> {
        for destination in 0..self.context.size {
            self.send::<u8>(Collective::Barrier, destination, &[])?;
        }

        for source in 0..self.context.size {
            self.receive::<u8>(Collective::Barrier, source)?;
        }

        Ok(())
    }
}

/// A set of logical processes sharing an in-process transport, for running the protocol without a
/// parallel runtime.
///
/// ```
/// use bucketsort::{LocalCluster, Transport};
///
/// let ranks = LocalCluster::new(3).run(|comm| comm.rank());
/// assert_eq!(ranks, vec![0, 1, 2]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct LocalCluster {
    size: usize,
}

impl LocalCluster {
    /// Constructor
    ///
    /// # Arguments
    /// * `size` - Number of logical processes.
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Number of logical processes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Build connected transports, one per rank, in rank order.
    pub fn transports(&self) -> Vec<LocalTransport> {
        let mut outboxes = (0..self.size).map(|_| Vec::new()).collect_vec();
        let mut inboxes = (0..self.size).map(|_| Vec::new()).collect_vec();

        for source_outboxes in outboxes.iter_mut() {
            for destination_inboxes in inboxes.iter_mut() {
                let (sender, receiver) = unbounded();
                source_outboxes.push(sender);
                destination_inboxes.push(receiver);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| LocalTransport {
                context: ExecutionContext::new(rank, self.size),
                outboxes,
                inboxes,
            })
            .collect()
    }

    /// Run `f` concurrently on every rank and return the results in rank order. A panic on any rank
    /// is propagated once every rank has finished.
    pub fn run<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(LocalTransport) -> R + Sync,
        R: Send,
    {
        let transports = self.transports();

        std::thread::scope(|scope| {
            let f = &f;
            let handles = transports
                .into_iter()
                .map(|transport| scope.spawn(move || f(transport)))
                .collect_vec();

            let results = handles.into_iter().map(|handle| handle.join()).collect_vec();

            results
                .into_iter()
                .map(|result| match result {
                    Ok(value) => value,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        })
    }
}
