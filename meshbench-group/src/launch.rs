//! Group Launch and Worker Attach
//!
//! The launcher side builds one POSIX pipe per ordered rank pair, spawns
//! `size` copies of the tool binary with the hidden worker flag, and
//! re-plumbs each child's endpoints to a deterministic descriptor layout
//! before exec. The worker side reads its identity from the environment
//! and wraps the inherited descriptors back into a [`GroupContext`].
//!
//! Descriptor layout seen by rank `r`: for the k-th peer in ascending
//! rank order (skipping `r` itself), the read end of peer→r sits at
//! `FD_BASE + 2k` and the write end of r→peer at `FD_BASE + 2k + 1`.

use std::env;
use std::fs::File;
use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::GroupError;
use crate::group::GroupContext;
use crate::link::{LinkRead, LinkWrite};

/// Environment variable carrying `<rank>,<size>` to a worker process.
pub const MESH_GROUP_ENV: &str = "MESH_GROUP";

/// Hidden CLI flag the launcher appends when re-executing itself.
pub const WORKER_FLAG: &str = "--mesh-worker";

/// First descriptor of the per-worker link window.
pub const FD_BASE: RawFd = 3;

/// Largest supported group. The launcher holds 2·size·(size−1) pipe ends
/// while spawning, so the cap keeps a full mesh inside default fd limits.
pub const MAX_GROUP_SIZE: u32 = 16;

const MAX_LINK_FDS: usize = 2 * (MAX_GROUP_SIZE as usize - 1);
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Create a pipe pair, returning (read_fd, write_fd).
pub(crate) fn create_pipe() -> Result<(RawFd, RawFd), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // Close-on-exec on both ends; the child re-plumbs the ends it keeps.
    for &fd in &fds {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
    Ok((fds[0], fds[1]))
}

fn close_all(fds: &[RawFd]) {
    for &fd in fds {
        unsafe {
            libc::close(fd);
        }
    }
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

pub(crate) fn validate_size(size: u32) -> Result<(), GroupError> {
    if size == 0 {
        return Err(GroupError::Topology("group size must be at least 1".into()));
    }
    if size > MAX_GROUP_SIZE {
        return Err(GroupError::GroupTooLarge {
            size,
            max: MAX_GROUP_SIZE,
        });
    }
    Ok(())
}

/// Descriptor layout for one rank: `(peer, read_fd, write_fd)` per peer
/// in ascending rank order.
fn link_fds(rank: u32, size: u32) -> Vec<(u32, RawFd, RawFd)> {
    let mut out = Vec::with_capacity(size.saturating_sub(1) as usize);
    let mut slot = FD_BASE;
    for peer in 0..size {
        if peer == rank {
            continue;
        }
        out.push((peer, slot, slot + 1));
        slot += 2;
    }
    out
}

fn parse_group_spec(spec: &str) -> Result<(u32, u32), GroupError> {
    let malformed = || GroupError::Env(format!("malformed {MESH_GROUP_ENV} value {spec:?}"));
    let (rank, size) = spec.split_once(',').ok_or_else(malformed)?;
    let rank = rank.trim().parse::<u32>().map_err(|_| malformed())?;
    let size = size.trim().parse::<u32>().map_err(|_| malformed())?;
    Ok((rank, size))
}

fn probe_fd(fd: RawFd) -> Result<(), GroupError> {
    let ret = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if ret == -1 {
        return Err(GroupError::Env(format!("link descriptor {fd} is not open")));
    }
    Ok(())
}

/// Build a [`GroupContext`] inside a worker process.
///
/// Reads rank and size from [`MESH_GROUP_ENV`] and adopts the link
/// descriptors the launcher placed at the fixed layout.
pub fn attach_worker() -> Result<GroupContext, GroupError> {
    let spec = env::var(MESH_GROUP_ENV)
        .map_err(|_| GroupError::Env(format!("{MESH_GROUP_ENV} is not set")))?;
    let (rank, size) = parse_group_spec(&spec)?;
    validate_size(size)?;
    if rank >= size {
        return Err(GroupError::Env(format!(
            "rank {rank} out of range for size {size}"
        )));
    }

    let mut endpoints: Vec<Option<(LinkRead, LinkWrite)>> = Vec::with_capacity(size as usize);
    endpoints.resize_with(size as usize, || None);
    for (peer, read_fd, write_fd) in link_fds(rank, size) {
        probe_fd(read_fd)?;
        probe_fd(write_fd)?;
        let reader = unsafe { File::from_raw_fd(read_fd) };
        let writer = unsafe { File::from_raw_fd(write_fd) };
        endpoints[peer as usize] = Some((Box::new(reader), Box::new(writer)));
    }

    tracing::debug!(rank, size, "attached to process group");
    GroupContext::new(rank, size, endpoints)
}

/// Spawn a group of `size` workers running the current executable.
///
/// `worker_args` is forwarded to every worker verbatim; the hidden
/// [`WORKER_FLAG`] is appended after it.
pub fn spawn_group(size: u32, worker_args: &[String]) -> Result<LaunchedGroup, GroupError> {
    let binary = env::current_exe()?;
    spawn_group_with_binary(&binary, size, worker_args)
}

/// Spawn a group of `size` workers running a specific binary.
pub fn spawn_group_with_binary(
    binary: &Path,
    size: u32,
    worker_args: &[String],
) -> Result<LaunchedGroup, GroupError> {
    validate_size(size)?;
    let n = size as usize;

    // channels[src][dest] = (read end, write end) of the pipe src → dest.
    // The diagonal stays unused.
    let mut channels: Vec<Vec<(RawFd, RawFd)>> = vec![vec![(-1, -1); n]; n];
    let mut mesh_fds: Vec<RawFd> = Vec::with_capacity(2 * n * n.saturating_sub(1));
    for src in 0..n {
        for dest in 0..n {
            if src == dest {
                continue;
            }
            match create_pipe() {
                Ok((read_fd, write_fd)) => {
                    channels[src][dest] = (read_fd, write_fd);
                    mesh_fds.push(read_fd);
                    mesh_fds.push(write_fd);
                }
                Err(e) => {
                    close_all(&mesh_fds);
                    return Err(GroupError::Io(e));
                }
            }
        }
    }

    let mut group = LaunchedGroup {
        children: Vec::with_capacity(n),
        exited: vec![None; n],
    };

    for rank in 0..size {
        // (source fd in this process, target fd after re-plumbing)
        let mut endpoints: Vec<(RawFd, RawFd)> = Vec::with_capacity(2 * (n - 1));
        let mut slot = FD_BASE;
        for peer in 0..n {
            if peer == rank as usize {
                continue;
            }
            let (read_from_peer, _) = channels[peer][rank as usize];
            endpoints.push((read_from_peer, slot));
            slot += 1;
            let (_, write_to_peer) = channels[rank as usize][peer];
            endpoints.push((write_to_peer, slot));
            slot += 1;
        }

        let mut command = Command::new(binary);
        command
            .args(worker_args)
            .arg(WORKER_FLAG)
            .env(MESH_GROUP_ENV, format!("{rank},{size}"))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        unsafe {
            command.pre_exec(move || {
                // A source can sit on another endpoint's target number, so
                // stage every source above the window before dup2-ing down.
                let mut staged = [0 as RawFd; MAX_LINK_FDS];
                let stage_base = FD_BASE + endpoints.len() as RawFd;
                for (i, &(source_fd, _)) in endpoints.iter().enumerate() {
                    let fd = libc::fcntl(source_fd, libc::F_DUPFD_CLOEXEC, stage_base);
                    if fd < 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                    staged[i] = fd;
                }
                for (i, &(_, target_fd)) in endpoints.iter().enumerate() {
                    // dup2 leaves close-on-exec clear on the target, so the
                    // link survives exec; the cloexec originals vanish.
                    if libc::dup2(staged[i], target_fd) < 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                    libc::close(staged[i]);
                }
                Ok(())
            });
        }

        match command.spawn() {
            Ok(child) => {
                tracing::debug!(rank, pid = child.id(), "spawned rank");
                group.children.push(child);
            }
            Err(e) => {
                close_all(&mesh_fds);
                return Err(GroupError::Io(e));
            }
        }
    }

    // The launcher keeps no connection into the mesh.
    close_all(&mesh_fds);
    tracing::info!(size, binary = %binary.display(), "launched process group");
    Ok(group)
}

/// Handle on a spawned group of worker ranks.
///
/// Dropping the handle terminates any rank still running.
pub struct LaunchedGroup {
    children: Vec<Child>,
    exited: Vec<Option<ExitStatus>>,
}

impl LaunchedGroup {
    /// Number of spawned ranks.
    pub fn size(&self) -> u32 {
        self.children.len() as u32
    }

    /// Wait for every rank to exit.
    ///
    /// Returns `Ok(())` when all ranks exit zero. The first abnormal exit
    /// terminates the remaining ranks and surfaces as
    /// [`GroupError::RankFailed`], so a dead rank cannot leave the rest
    /// blocked in a collective forever.
    pub fn wait(mut self) -> Result<(), GroupError> {
        loop {
            let mut pending = false;
            for rank in 0..self.children.len() {
                if self.exited[rank].is_some() {
                    continue;
                }
                match self.children[rank].try_wait() {
                    Ok(Some(status)) => {
                        self.exited[rank] = Some(status);
                        if !status.success() {
                            let code = status.code().unwrap_or(-1);
                            tracing::warn!(rank, code, "rank exited abnormally, terminating group");
                            self.terminate_remaining();
                            return Err(GroupError::RankFailed {
                                rank: rank as u32,
                                status: code,
                            });
                        }
                        tracing::debug!(rank, "rank exited cleanly");
                    }
                    Ok(None) => pending = true,
                    Err(e) => {
                        self.terminate_remaining();
                        return Err(GroupError::Io(e));
                    }
                }
            }
            if !pending {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// SIGTERM every live rank, allow a grace window, then SIGKILL.
    fn terminate_remaining(&mut self) {
        for (rank, child) in self.children.iter_mut().enumerate() {
            if self.exited[rank].is_none() {
                let _ = send_sigterm(child.id());
            }
        }

        let deadline = Instant::now() + TERM_GRACE;
        while Instant::now() < deadline {
            let mut live = false;
            for rank in 0..self.children.len() {
                if self.exited[rank].is_none() {
                    match self.children[rank].try_wait() {
                        Ok(Some(status)) => self.exited[rank] = Some(status),
                        _ => live = true,
                    }
                }
            }
            if !live {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }

        for rank in 0..self.children.len() {
            if self.exited[rank].is_none() {
                let _ = self.children[rank].kill();
                if let Ok(status) = self.children[rank].wait() {
                    self.exited[rank] = Some(status);
                }
            }
        }
    }
}

impl Drop for LaunchedGroup {
    fn drop(&mut self) {
        let any_live = (0..self.children.len()).any(|rank| self.exited[rank].is_none());
        if any_live {
            self.terminate_remaining();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_fd_layout() {
        assert_eq!(link_fds(1, 4), vec![(0, 3, 4), (2, 5, 6), (3, 7, 8)]);
        assert_eq!(link_fds(0, 2), vec![(1, 3, 4)]);
        assert_eq!(link_fds(0, 1), vec![]);
    }

    #[test]
    fn test_parse_group_spec() {
        assert_eq!(parse_group_spec("2,4").unwrap(), (2, 4));
        assert_eq!(parse_group_spec("0, 16").unwrap(), (0, 16));
        assert!(matches!(parse_group_spec("3"), Err(GroupError::Env(_))));
        assert!(matches!(parse_group_spec("a,b"), Err(GroupError::Env(_))));
        assert!(matches!(parse_group_spec("1,2,3"), Err(GroupError::Env(_))));
    }

    #[test]
    fn test_validate_size_bounds() {
        assert!(matches!(validate_size(0), Err(GroupError::Topology(_))));
        assert!(validate_size(1).is_ok());
        assert!(validate_size(MAX_GROUP_SIZE).is_ok());
        assert!(matches!(
            validate_size(MAX_GROUP_SIZE + 1),
            Err(GroupError::GroupTooLarge { .. })
        ));
    }

    #[test]
    fn test_spawn_and_wait_success() {
        let group = spawn_group_with_binary("/bin/true".as_ref(), 2, &[]).unwrap();
        assert_eq!(group.size(), 2);
        group.wait().unwrap();
    }

    #[test]
    fn test_failed_rank_fails_the_session() {
        let group = spawn_group_with_binary("/bin/false".as_ref(), 2, &[]).unwrap();
        match group.wait() {
            Err(GroupError::RankFailed { rank, status }) => {
                assert!(rank < 2);
                assert_eq!(status, 1);
            }
            other => panic!("expected RankFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_exit_status_propagates() {
        let args = vec!["-c".to_string(), "exit 3".to_string()];
        let group = spawn_group_with_binary("/bin/sh".as_ref(), 1, &args).unwrap();
        match group.wait() {
            Err(GroupError::RankFailed { rank: 0, status }) => assert_eq!(status, 3),
            other => panic!("expected RankFailed, got {other:?}"),
        }
    }
}
