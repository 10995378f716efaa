//! Collective communication interface used by every protocol phase.
use crate::{
    sorting::ExchangePlan,
    traits::types::{ExecutionContext, Payload, Result},
};

/// Interface over the collective primitives of the bucket sort protocol.
///
/// Every method is collective: all processes must call the same method in the same program order,
/// otherwise the participating processes block indefinitely. Arguments documented as significant
/// only on the coordinator are ignored on other ranks, and results documented as coordinator only
/// are `None` elsewhere.
pub trait Transport {
    /// Rank and size of the calling process.
    fn context(&self) -> ExecutionContext;

    /// Rank of the calling process.
    fn rank(&self) -> usize {
        self.context().rank
    }

    /// Number of cooperating processes.
    fn size(&self) -> usize {
        self.context().size
    }

    /// Broadcast a scalar from the coordinator to every process.
    ///
    /// # Arguments
    /// * `value` - Value to broadcast, significant only on the coordinator.
    fn broadcast<T: Payload>(&self, value: T) -> Result<T>;

    /// Scatter variable length slices of a sequence held by the coordinator, process `i` receives
    /// the `counts[i]` elements starting at the prefix sum of the preceding counts.
    ///
    /// # Arguments
    /// * `data` - Sequence to distribute, significant only on the coordinator.
    /// * `counts` - Number of elements destined to each process, known to every process.
    fn scatter_varcount<T: Payload>(&self, data: Option<&[T]>, counts: &[usize])
        -> Result<Vec<T>>;

    /// Gather one scalar per process at the coordinator, in rank order.
    fn gather<T: Payload>(&self, value: T) -> Result<Option<Vec<T>>>;

    /// Gather variable length sequences at the coordinator, concatenated in rank order.
    ///
    /// # Arguments
    /// * `local` - Contribution of the calling process.
    /// * `counts` - Length of each process' contribution, significant only on the coordinator.
    fn gather_varcount<T: Payload>(
        &self,
        local: &[T],
        counts: Option<&[usize]>,
    ) -> Result<Option<Vec<T>>>;

    /// Personalised all to all exchange of one count per process pair, `send_counts[target]` is
    /// delivered to `target`, the result holds at index `source` the count sent by `source`.
    fn exchange_counts(&self, send_counts: &[usize]) -> Result<Vec<usize>>;

    /// Variable size personalised all to all exchange laid out by an [`ExchangePlan`].
    ///
    /// # Arguments
    /// * `send` - Flat send buffer, the slice destined to each target laid out by the plan.
    /// * `plan` - Send and receive counts and displacements of the calling process.
    fn exchange_data<T: Payload>(&self, send: &[T], plan: &ExchangePlan) -> Result<Vec<T>>;

    /// Maximum of a value across all processes, available at the coordinator.
    fn reduce_max(&self, value: f64) -> Result<Option<f64>>;

    /// Block until every process has reached the barrier.
    fn barrier(&self) -> Result<()>;
}
