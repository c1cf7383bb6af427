//! Process management API

use crate::syscall;

/// Exit the current process with the given exit code
pub fn exit(code: i32) -> ! {
    syscall::exit(code)
}

/// Fork the current process
///
/// Returns 1 in the parent (not a child pid — this kernel's fork
/// always reports the literal constant `1` to the caller that forked),
/// 0 in the child, and a negative value on failure.
pub fn fork() -> i32 {
    syscall::fork()
}

/// Replace the calling process's image with the ELF file at `path`.
/// Does not return on success.
pub fn execl(path: &str) -> i32 {
    syscall::execl(path)
}

/// Wait for the most-recently-forked child to exit, returning its
/// exit code. There is no pid argument — this kernel tracks only one
/// outstanding child relationship per process.
pub fn join() -> i32 {
    syscall::join()
}

/// Give up the remainder of this process's time slice.
pub fn yield_now() -> i32 {
    syscall::yield_now()
}

/// Mark the most-recently-forked child for termination.
pub fn kill(value: i32) -> i32 {
    syscall::kill(value)
}

/// Install `handler_eip` as the handler for signal 1 (segfault).
pub fn simple_signal(handler_eip: u32) -> i32 {
    syscall::simple_signal(handler_eip)
}

/// Return from a signal handler back to the interrupted context.
pub fn sigreturn() -> i32 {
    syscall::sigreturn()
}

/// Shut the machine down. Never returns.
pub fn shutdown() -> ! {
    syscall::shutdown()
}

/// Fork then exec in the child (fork + execl pattern).
///
/// Returns `Ok(1)` in the parent, does not return in the child on
/// success, and `Err(())` if the fork itself failed.
pub fn spawn(path: &str) -> Result<i32, ()> {
    let result = fork();
    if result == 0 {
        execl(path);
        exit(1);
    } else if result > 0 {
        Ok(result)
    } else {
        Err(())
    }
}
