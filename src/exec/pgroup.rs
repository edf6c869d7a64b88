// src/exec/pgroup.rs

//! Process-group capability.
//!
//! Every stage is started through [`ProcessGroup::setup`] and terminated
//! through [`ProcessGroup::terminate`]; the pipeline itself never checks the
//! platform. On POSIX systems each stage leads its own process group so the
//! whole subtree it spawns is signalled at once. Elsewhere only the direct
//! child can be reached, and the pipeline's hard kill of that child is all
//! that happens.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::process::Command;

pub trait ProcessGroup: Send + Sync + fmt::Debug {
    /// Prepare `cmd` before it is spawned.
    fn setup(&self, cmd: &mut Command);

    /// Ask the process tree rooted at `pid` to terminate.
    ///
    /// A process that already exited is not an error.
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// POSIX process groups: `setpgid(0, 0)` at spawn, `killpg(SIGTERM)` on kill.
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct PosixProcessGroup;

#[cfg(unix)]
impl ProcessGroup for PosixProcessGroup {
    fn setup(&self, cmd: &mut Command) {
        cmd.process_group(0);
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let raw = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        match killpg(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

/// Best effort for platforms without process groups: nothing to set up, and
/// termination is left to the hard kill of the direct child.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl ProcessGroup for SingleProcess {
    fn setup(&self, _cmd: &mut Command) {}

    fn terminate(&self, _pid: u32) -> io::Result<()> {
        Ok(())
    }
}

/// The implementation appropriate for the current platform.
pub fn platform_default() -> Arc<dyn ProcessGroup> {
    #[cfg(unix)]
    {
        Arc::new(PosixProcessGroup)
    }
    #[cfg(not(unix))]
    {
        Arc::new(SingleProcess)
    }
}
