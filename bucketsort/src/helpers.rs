//! Helper Functions
use std::fmt::Display;

use bytemuck::{cast_slice, pod_collect_to_vec, Pod};
use itertools::Itertools;

use crate::traits::types::{Error, Result};

/// Number of bytes in the length header of a serialised payload.
pub(crate) const LEN_BYTES: usize = 8;

/// Exclusive prefix sum of a set of counts, i.e. the offset at which each contribution starts in a
/// flat buffer.
///
/// # Arguments
/// * `counts` - Number of elements in each contribution.
pub fn displacements(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0, |acc, &x| {
            let tmp = *acc;
            *acc += x;
            Some(tmp)
        })
        .collect_vec()
}

/// Render a sequence with its values separated by dashes, intended for small inputs.
pub fn format_sequence<T: Display>(values: &[T]) -> String {
    values.iter().join("-")
}

pub(crate) fn serialise_vec<T: Pod>(input: &[T]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(LEN_BYTES + std::mem::size_of_val(input));
    buffer.extend_from_slice(&(input.len() as u64).to_le_bytes());

    if !input.is_empty() {
        buffer.extend_from_slice(cast_slice(input));
    }

    buffer
}

pub(crate) fn deserialise_vec<T: Pod>(input: &[u8]) -> Result<Vec<T>> {
    if input.len() < LEN_BYTES {
        return Err(Error::Transport(format!(
            "payload of {} bytes is shorter than its length header",
            input.len()
        )));
    }

    let (len_bytes, rest) = input.split_at(LEN_BYTES);
    let mut header = [0u8; LEN_BYTES];
    header.copy_from_slice(len_bytes);
    let len = u64::from_le_bytes(header) as usize;

    let expected_bytes = len * std::mem::size_of::<T>();
    if rest.len() != expected_bytes {
        return Err(Error::Transport(format!(
            "payload announces {} elements ({} bytes) but carries {} bytes",
            len,
            expected_bytes,
            rest.len()
        )));
    }

    if rest.is_empty() {
        return Ok(Vec::new());
    }

    Ok(pod_collect_to_vec(rest))
}
