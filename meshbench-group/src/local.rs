//! In-Process Mesh
//!
//! Builds a fully connected group inside one process: one
//! [`GroupContext`] per rank, wired with the same pipes a launched group
//! uses. Contexts are independent and can be moved to threads, which is
//! how the integration tests drive multi-rank scenarios without spawning
//! processes.

use std::fs::File;
use std::os::unix::io::FromRawFd;

use crate::error::GroupError;
use crate::group::GroupContext;
use crate::launch::{create_pipe, validate_size};
use crate::link::{LinkRead, LinkWrite};

/// Build `size` connected group contexts, one per rank, in rank order.
pub fn local_mesh(size: u32) -> Result<Vec<GroupContext>, GroupError> {
    validate_size(size)?;
    let n = size as usize;

    // reads[rank][peer] receives from peer; writes[rank][peer] sends to it.
    let mut reads: Vec<Vec<Option<File>>> = (0..n).map(|_| none_row(n)).collect();
    let mut writes: Vec<Vec<Option<File>>> = (0..n).map(|_| none_row(n)).collect();

    for src in 0..n {
        for dest in 0..n {
            if src == dest {
                continue;
            }
            let (read_fd, write_fd) = create_pipe()?;
            reads[dest][src] = Some(unsafe { File::from_raw_fd(read_fd) });
            writes[src][dest] = Some(unsafe { File::from_raw_fd(write_fd) });
        }
    }

    let mut groups = Vec::with_capacity(n);
    for rank in 0..n {
        let mut endpoints: Vec<Option<(LinkRead, LinkWrite)>> = Vec::with_capacity(n);
        for peer in 0..n {
            if peer == rank {
                endpoints.push(None);
                continue;
            }
            match (reads[rank][peer].take(), writes[rank][peer].take()) {
                (Some(read), Some(write)) => {
                    let link = (Box::new(read) as LinkRead, Box::new(write) as LinkWrite);
                    endpoints.push(Some(link));
                }
                _ => {
                    return Err(GroupError::Topology(
                        "in-process mesh construction failed".into(),
                    ));
                }
            }
        }
        groups.push(GroupContext::new(rank as u32, size, endpoints)?);
    }

    Ok(groups)
}

fn none_row(n: usize) -> Vec<Option<File>> {
    let mut row = Vec::with_capacity(n);
    row.resize_with(n, || None);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::MAX_GROUP_SIZE;

    #[test]
    fn test_local_mesh_shape() {
        let ctxs = local_mesh(3).unwrap();
        assert_eq!(ctxs.len(), 3);
        for (rank, ctx) in ctxs.iter().enumerate() {
            assert_eq!(ctx.rank(), rank as u32);
            assert_eq!(ctx.size(), 3);
        }
    }

    #[test]
    fn test_local_mesh_rejects_empty_group() {
        assert!(matches!(local_mesh(0), Err(GroupError::Topology(_))));
    }

    #[test]
    fn test_local_mesh_respects_size_cap() {
        assert!(matches!(
            local_mesh(MAX_GROUP_SIZE + 1),
            Err(GroupError::GroupTooLarge { .. })
        ));
    }
}
