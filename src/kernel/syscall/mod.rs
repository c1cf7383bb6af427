// src/kernel/syscall/mod.rs
//! The system-call dispatcher
//!
//! Every syscall ultimately resolves by calling a continuation with its
//! return value: synchronous calls (`exit`, `fork`, `write` to a
//! terminal, `sem`, `open`, ...) invoke it inline before `dispatch`
//! returns; suspending calls (`down`, `join`, pipe `read`/`write`,
//! `yield`) hand it to the primitive that will eventually fire it —
//! [`crate::kernel::sync::Semaphore::down`],
//! [`crate::kernel::process::lifecycle::join`],
//! [`crate::kernel::fs::pipe::PipeEnd`], [`crate::kernel::scheduler::go`]
//! — the same way every other suspension point in this kernel works.
//! There is no blocking syscall path: the trap-gate stub that calls
//! `dispatch` (an external collaborator, see `SPEC_FULL.md` §4.7) is
//! expected to `resume` the caller from inside that continuation.
//!
//! Extracting the syscall number and arguments off the user stack is
//! also that stub's job; `dispatch` takes them already split out so
//! this module can focus on validating and acting on them.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::constants::{FRAME_SIZE, USER_SPACE_END, USER_SPACE_START};
use crate::errors::unified::SyscallError;
use crate::kernel::fs::node::Node;
use crate::kernel::fs::path::find_path_node;
use crate::kernel::fs::{pipe, FdHandle, FsView};
use crate::kernel::mm::allocator::FRAMES;
use crate::kernel::mm::types::VirtAddr;
use crate::kernel::mm::vma::VmaBacking;
use crate::kernel::mm::vmm::{self, KernelTables, USER_RW};
use crate::kernel::process::lifecycle;
use crate::kernel::process::table::PROCESS_TABLE;
use crate::kernel::scheduler;

#[cfg(feature = "syscall_trace")]
use crate::debug_println;

pub type SyscallResult = i32;
/// A process that does not exist, or whose address is invalid.
pub const ERR: SyscallResult = -1;

/// Longest path this kernel will copy out of user memory in one call.
/// Bounds the walk in [`copy_user_path`] so a missing NUL terminator
/// can't loop indefinitely.
const MAX_PATH_LEN: usize = 256;

#[inline]
fn is_user_address(addr: u32) -> bool {
    (addr as usize) >= USER_SPACE_START && (addr as usize) < USER_SPACE_END
}

/// Whether `[addr, addr + len)` lies entirely within the user address
/// window, checking for overflow.
#[inline]
fn is_user_range(addr: u32, len: u32) -> bool {
    let end = match (addr as usize).checked_add(len as usize) {
        Some(e) => e,
        None => return false,
    };
    (addr as usize) >= USER_SPACE_START && end <= USER_SPACE_END
}

fn user_byte_ptr(pd: &vmm::PageDirectory, va: usize) -> Result<*mut u8, SyscallError> {
    let page = VirtAddr::new(va).align_down(FRAME_SIZE);
    let frame = pd.translate(page).ok_or(SyscallError::BadAddress)?;
    let offset = va - page.as_usize();
    Ok((frame.addr().as_usize() + offset) as *mut u8)
}

fn copy_from_user(pd: &vmm::PageDirectory, addr: u32, buf: &mut [u8]) -> Result<(), SyscallError> {
    if !is_user_range(addr, buf.len() as u32) {
        return Err(SyscallError::BadAddress);
    }
    for (i, b) in buf.iter_mut().enumerate() {
        let ptr = user_byte_ptr(pd, addr as usize + i)?;
        // Safety: `ptr` was just resolved through this directory's own
        // page tables and points at a byte within a present frame.
        *b = unsafe { ptr.read_volatile() };
    }
    Ok(())
}

fn copy_to_user(pd: &vmm::PageDirectory, addr: u32, buf: &[u8]) -> Result<(), SyscallError> {
    if !is_user_range(addr, buf.len() as u32) {
        return Err(SyscallError::BadAddress);
    }
    for (i, b) in buf.iter().enumerate() {
        let ptr = user_byte_ptr(pd, addr as usize + i)?;
        // Safety: see `copy_from_user`.
        unsafe { ptr.write_volatile(*b) };
    }
    Ok(())
}

/// Copies a NUL-terminated path string out of user memory.
///
/// Reproduces a historical bug rather than fixing it (see
/// [`crate::kernel::fs::path`]'s module doc): the string is walked byte
/// by byte to find its length *before* the resulting `[addr, addr+len]`
/// range is checked against the user address window, instead of
/// validating the range up front. A string starting just inside user
/// space but missing its terminator before `USER_SPACE_END` is walked
/// one unmapped-page-fault away from the truth before the length check
/// ever gets a chance to reject it.
pub fn copy_user_path(pd: &vmm::PageDirectory, addr: u32) -> Result<String, SyscallError> {
    if !is_user_address(addr) {
        return Err(SyscallError::BadAddress);
    }
    let mut bytes = Vec::new();
    let mut cursor = addr as usize;
    loop {
        let ptr = user_byte_ptr(pd, cursor)?;
        // Safety: see `copy_from_user`.
        let byte = unsafe { ptr.read_volatile() };
        if byte == 0 {
            break;
        }
        bytes.push(byte);
        cursor += 1;
        if bytes.len() >= MAX_PATH_LEN {
            return Err(SyscallError::BadAddress);
        }
    }
    if !is_user_range(addr, bytes.len() as u32 + 1) {
        return Err(SyscallError::BadAddress);
    }
    String::from_utf8(bytes).map_err(|_| SyscallError::BadAddress)
}

type Continuation = Box<dyn FnOnce(SyscallResult) + Send>;

/// Dispatches syscall `num` for the process at `index`, with `args`
/// already pulled off the user stack by the trap-gate stub, eventually
/// calling `k` with the return value.
pub fn dispatch(index: usize, num: u32, args: [u32; 4], template: &KernelTables, k: Continuation) {
    #[cfg(feature = "syscall_trace")]
    debug_println!("[syscall] process={} num={} args={:?}", index, num, args);

    match num {
        0 => sys_exit(index, args[0] as i32, k),
        1 | 1025 => sys_write(index, args[0], args[1], args[2], k),
        2 => sys_fork(index, template, k),
        7 => sys_shutdown(index, k),
        998 => sys_yield(k),
        999 => sys_join(index, k),
        1000 => sys_execl(index, args[0], template, k),
        1001 => sys_sem(index, args[0] as i64, k),
        1002 => sys_up(index, args[0] as usize, k),
        1003 => sys_down(index, args[0] as usize, k),
        1004 => sys_simple_signal(index, args[0], k),
        1005 => sys_simple_mmap(index, args[0], args[1] as usize, args[2] as i32, args[3] as usize, k),
        1006 => sys_sigreturn(index, k),
        1007 => sys_sem_close(index, args[0] as usize, k),
        1008 => sys_simple_munmap(index, args[0], k),
        1020 => sys_chdir(index, args[0], k),
        1021 => sys_open(index, args[0], k),
        1022 => sys_close(index, args[0] as usize, k),
        1023 => sys_len(index, args[0] as usize, k),
        1024 => sys_read(index, args[0] as usize, args[1], args[2], k),
        1026 => sys_pipe(index, args[0], args[1], k),
        1027 => sys_kill(index, args[0] as i32, k),
        1028 => sys_dup(index, args[0] as usize, k),
        _ => k(ERR),
    }
}

fn sys_exit(index: usize, code: i32, k: Continuation) {
    let _ = lifecycle::exit(index, code);
    k(code);
}

fn sys_shutdown(index: usize, k: Continuation) -> ! {
    let mut table = PROCESS_TABLE.lock();
    if let Some(pcb) = table.get_mut(index) {
        if let Some(pd) = pcb.page_directory.take() {
            pd.free(&FRAMES);
        }
    }
    drop(table);
    drop(k);
    crate::qemu::exit_qemu(crate::qemu::QemuExitCode::Success)
}

fn sys_yield(k: Continuation) {
    scheduler::go(Box::new(move || k(1)));
}

fn sys_fork(index: usize, template: &KernelTables, k: Continuation) {
    match lifecycle::fork(index, template) {
        Ok((_child, parent_rv)) => k(parent_rv),
        Err(_) => k(ERR),
    }
}

fn sys_join(index: usize, k: Continuation) {
    let _ = lifecycle::join(index, k);
}

fn sys_execl(index: usize, path_addr: u32, template: &KernelTables, k: Continuation) {
    let node = {
        let table = PROCESS_TABLE.lock();
        let Some(pcb) = table.get(index) else {
            return k(ERR);
        };
        let Some(pd) = pcb.page_directory.as_ref() else {
            return k(ERR);
        };
        let path = match copy_user_path(pd, path_addr) {
            Ok(p) => p,
            Err(_) => return k(ERR),
        };
        find_path_node(&pcb.root_node, &pcb.cwd_node, &path)
    };
    let node = match node {
        Ok(n) if n.is_file() => n,
        _ => return k(ERR),
    };
    match lifecycle::execl(index, &node, template) {
        Ok(()) => k(0),
        Err(_) => k(ERR),
    }
}

fn sys_write(index: usize, fd: u32, buf: u32, count: u32, k: Continuation) {
    let handle = {
        let table = PROCESS_TABLE.lock();
        let Some(pcb) = table.get(index) else { return k(ERR) };
        pcb.fds.get(fd as usize).and_then(Option::clone)
    };
    match handle {
        Some(FdHandle::Terminal) => {
            if count == 0 {
                return k(0);
            }
            let mut bytes = alloc::vec![0u8; count as usize];
            let table = PROCESS_TABLE.lock();
            let Some(pd) = table.get(index).and_then(|p| p.page_directory.as_ref()) else {
                return k(ERR);
            };
            if copy_from_user(pd, buf, &mut bytes).is_err() {
                return k(ERR);
            }
            drop(table);
            for &b in &bytes {
                crate::debug_print!("{}", b as char);
            }
            k(count as i32)
        }
        Some(FdHandle::Pipe(end)) if end.is_writer() => {
            if count == 0 {
                return k(0);
            }
            let mut byte = [0u8; 1];
            let table = PROCESS_TABLE.lock();
            let Some(pcb) = table.get(index) else { return k(ERR) };
            let Some(pd) = pcb.page_directory.as_ref() else { return k(ERR) };
            if copy_from_user(pd, buf, &mut byte).is_err() {
                return k(ERR);
            }
            drop(table);
            end.write_one(byte[0], k);
        }
        _ => k(ERR),
    }
}

fn sys_read(index: usize, fd: usize, buf: u32, count: u32, k: Continuation) {
    let handle = {
        let table = PROCESS_TABLE.lock();
        let Some(pcb) = table.get(index) else { return k(ERR) };
        pcb.fds.get(fd).and_then(Option::clone)
    };
    match handle {
        Some(FdHandle::File(view)) => {
            if count == 0 {
                return k(0);
            }
            let mut bytes = alloc::vec![0u8; count as usize];
            let n = match view.read(&mut bytes) {
                Ok(n) => n,
                Err(_) => return k(ERR),
            };
            let table = PROCESS_TABLE.lock();
            let Some(pd) = table.get(index).and_then(|p| p.page_directory.as_ref()) else {
                return k(ERR);
            };
            if copy_to_user(pd, buf, &bytes[..n]).is_err() {
                return k(ERR);
            }
            k(n as i32)
        }
        Some(FdHandle::Pipe(end)) if !end.is_writer() => {
            end.read_one(Box::new(move |byte, n| {
                let table = PROCESS_TABLE.lock();
                let Some(pd) = table.get(index).and_then(|p| p.page_directory.as_ref()) else {
                    drop(table);
                    return k(ERR);
                };
                let ok = copy_to_user(pd, buf, &[byte]).is_ok();
                drop(table);
                k(if ok { n as i32 } else { ERR });
            }));
        }
        _ => k(ERR),
    }
}

fn sys_open(index: usize, path_addr: u32, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    let Some(pd) = pcb.page_directory.as_ref() else { return k(ERR) };
    let path = match copy_user_path(pd, path_addr) {
        Ok(p) => p,
        Err(_) => return k(ERR),
    };
    let node = match find_path_node(&pcb.root_node, &pcb.cwd_node, &path) {
        Ok(n) if n.is_file() => n,
        _ => return k(ERR),
    };
    match pcb.alloc_fd(FdHandle::File(FsView::new(node))) {
        Ok(fd) => k(fd as i32),
        Err(_) => k(ERR),
    }
}

fn sys_close(index: usize, fd: usize, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    k(if pcb.close_fd(fd) { 0 } else { ERR });
}

fn sys_dup(index: usize, fd: usize, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    match pcb.dup_fd(fd) {
        Ok(new_fd) => k(new_fd as i32),
        Err(_) => k(ERR),
    }
}

fn sys_len(index: usize, fd: usize, k: Continuation) {
    let table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get(index) else { return k(ERR) };
    match pcb.fds.get(fd).and_then(Option::as_ref) {
        Some(handle) => match handle.len() {
            Ok(n) => k(n as i32),
            Err(_) => k(ERR),
        },
        None => k(ERR),
    }
}

fn sys_chdir(index: usize, path_addr: u32, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    let Some(pd) = pcb.page_directory.as_ref() else { return k(ERR) };
    let path = match copy_user_path(pd, path_addr) {
        Ok(p) => p,
        Err(_) => return k(ERR),
    };
    match find_path_node(&pcb.root_node, &pcb.cwd_node, &path) {
        Ok(n) if n.is_dir() => {
            pcb.cwd_node = n;
            k(0);
        }
        _ => k(ERR),
    }
}

fn sys_pipe(index: usize, write_fd_addr: u32, read_fd_addr: u32, k: Continuation) {
    let (reader, writer) = pipe::new_pipe();
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    let Some(pd) = pcb.page_directory.as_ref() else { return k(ERR) };
    let Ok(write_fd) = pcb.alloc_fd(FdHandle::Pipe(writer)) else { return k(ERR) };
    let Ok(read_fd) = pcb.alloc_fd(FdHandle::Pipe(reader)) else {
        pcb.close_fd(write_fd);
        return k(ERR);
    };
    if copy_to_user(pd, write_fd_addr, &(write_fd as u32).to_le_bytes()).is_err()
        || copy_to_user(pd, read_fd_addr, &(read_fd as u32).to_le_bytes()).is_err()
    {
        pcb.close_fd(write_fd);
        pcb.close_fd(read_fd);
        return k(ERR);
    }
    k(0);
}

fn sys_sem(index: usize, initial: i64, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    match pcb.alloc_sem(initial) {
        Some(slot) => k(slot as i32),
        None => k(ERR),
    }
}

fn sys_sem_close(index: usize, slot: usize, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    k(if pcb.close_sem(slot) { 0 } else { ERR });
}

fn sys_up(index: usize, slot: usize, k: Continuation) {
    let sem = {
        let table = PROCESS_TABLE.lock();
        table.get(index).and_then(|p| p.semaphores.get(slot)).and_then(Option::clone)
    };
    match sem {
        Some(sem) => {
            sem.up();
            k(0);
        }
        None => k(ERR),
    }
}

fn sys_down(index: usize, slot: usize, k: Continuation) {
    let sem = {
        let table = PROCESS_TABLE.lock();
        table.get(index).and_then(|p| p.semaphores.get(slot)).and_then(Option::clone)
    };
    match sem {
        Some(sem) => sem.down(Box::new(move || k(0))),
        None => k(ERR),
    }
}

fn sys_kill(index: usize, value: i32, k: Continuation) {
    let _ = value;
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    match pcb.last_child() {
        Some(child) => {
            if let Some(child_pcb) = table.get_mut(child) {
                child_pcb.kill_pending = true;
            }
            k(0);
        }
        None => k(ERR),
    }
}

fn sys_simple_signal(index: usize, handler_eip: u32, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    pcb.handler_eip = handler_eip;
    k(1);
}

fn sys_sigreturn(index: usize, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    if let Some(saved) = pcb.handler_user_context.take() {
        pcb.context = saved;
    }
    pcb.in_handler = false;
    k(pcb.context.eax as i32);
}

fn sys_simple_mmap(index: usize, addr: u32, size: usize, fd: i32, off: usize, k: Continuation) {
    if size == 0 || size % FRAME_SIZE != 0 || (addr as usize) % FRAME_SIZE != 0 || off % FRAME_SIZE != 0 {
        return k(0);
    }
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };

    let backing = if fd == -1 {
        VmaBacking::Anonymous
    } else {
        let Some(FdHandle::File(view)) = pcb.fds.get(fd as usize).and_then(Option::clone) else {
            return k(0);
        };
        VmaBacking::File { node: view.node.clone(), file_offset: off }
    };

    match pcb.vmas.add_vme(addr as usize, size, true, backing) {
        Ok(start) => k(start as i32),
        Err(_) => k(0),
    }
}

fn sys_simple_munmap(index: usize, addr: u32, k: Continuation) {
    let mut table = PROCESS_TABLE.lock();
    let Some(pcb) = table.get_mut(index) else { return k(ERR) };
    let Some(pd) = pcb.page_directory.as_ref() else { return k(ERR) };
    let Some(vma) = pcb.vmas.remove_at(VirtAddr::new(addr as usize)) else {
        return k(ERR);
    };
    let mut page = vma.start.as_usize();
    while page < vma.end.as_usize() {
        pd.unmap(&FRAMES, VirtAddr::new(page));
        page += FRAME_SIZE;
    }
    k(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::fs::ramdisk::dir;
    use crate::kernel::mm::frame::FrameAllocator;
    use crate::kernel::mm::types::PhysAddr;
    use crate::kernel::mm::vmm;
    use crate::kernel::process::pcb::Pcb;
    use alloc::sync::Arc as StdArc;
    use core::sync::atomic::{AtomicI32, Ordering};

    fn setup() -> (FrameAllocator, KernelTables, alloc::vec::Vec<u8>) {
        let region = alloc::vec![0u8; FRAME_SIZE * 64];
        let allocator = FrameAllocator::new();
        unsafe { allocator.init(PhysAddr::new(region.as_ptr() as usize), 64) };
        let template = vmm::global_init(&allocator, 1).unwrap();
        (allocator, template, region)
    }

    fn spawn(allocator: &FrameAllocator, template: &KernelTables) -> usize {
        let pd = vmm::per_core_init(allocator, template).unwrap();
        let root: Arc<dyn Node> = Arc::new(dir(alloc::vec![]));
        PROCESS_TABLE.lock().insert(Pcb::new(pd, root))
    }

    fn capture() -> (StdArc<AtomicI32>, Continuation) {
        let result = StdArc::new(AtomicI32::new(i32::MIN));
        let r = result.clone();
        let k: Continuation = Box::new(move |v| r.store(v, Ordering::SeqCst));
        (result, k)
    }

    #[test]
    fn unknown_syscall_number_errors() {
        let (allocator, template, _region) = setup();
        let index = spawn(&allocator, &template);
        let (result, k) = capture();
        dispatch(index, 0xDEAD, [0; 4], &template, k);
        assert_eq!(result.load(Ordering::SeqCst), ERR);
    }

    #[test]
    fn exit_sets_exit_value_and_frees_directory() {
        let (allocator, template, _region) = setup();
        let index = spawn(&allocator, &template);
        let (result, k) = capture();
        dispatch(index, 0, [7, 0, 0, 0], &template, k);
        assert_eq!(result.load(Ordering::SeqCst), 7);
        assert!(PROCESS_TABLE.lock().get(index).unwrap().page_directory.is_none());
    }

    #[test]
    fn fork_reports_one_to_parent() {
        let (allocator, template, _region) = setup();
        let index = spawn(&allocator, &template);
        let (result, k) = capture();
        dispatch(index, 2, [0; 4], &template, k);
        assert_eq!(result.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sem_up_down_round_trip() {
        let (allocator, template, _region) = setup();
        let index = spawn(&allocator, &template);

        let (result, k) = capture();
        dispatch(index, 1001, [0, 0, 0, 0], &template, k);
        let slot = result.load(Ordering::SeqCst);
        assert!(slot >= 0);

        let (result, k) = capture();
        dispatch(index, 1002, [slot as u32, 0, 0, 0], &template, k);
        assert_eq!(result.load(Ordering::SeqCst), 0);

        let (result, k) = capture();
        dispatch(index, 1003, [slot as u32, 0, 0, 0], &template, k);
        scheduler::run_ready();
        assert_eq!(result.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn write_with_unmapped_buffer_errors() {
        let (allocator, template, _region) = setup();
        let index = spawn(&allocator, &template);
        let (result, k) = capture();
        dispatch(index, 1, [1, USER_SPACE_START as u32, 4, 0], &template, k);
        assert_eq!(result.load(Ordering::SeqCst), ERR);
    }

    #[test]
    fn pipe_then_write_then_read_round_trips() {
        let (allocator, template, _region) = setup();
        let index = spawn(&allocator, &template);

        let pd_va = {
            let table = PROCESS_TABLE.lock();
            let pcb = table.get(index).unwrap();
            let pd = pcb.page_directory.as_ref().unwrap();
            let va = VirtAddr::new(USER_SPACE_START);
            let frame = allocator.allocate().unwrap();
            pd.map(&allocator, va, frame, USER_RW).unwrap();
            va
        };

        let (result, k) = capture();
        dispatch(
            index,
            1026,
            [pd_va.as_usize() as u32, pd_va.as_usize() as u32 + 4, 0, 0],
            &template,
            k,
        );
        assert_eq!(result.load(Ordering::SeqCst), 0);

        let write_fd = {
            let mut bytes = [0u8; 4];
            let table = PROCESS_TABLE.lock();
            let pd = table.get(index).unwrap().page_directory.as_ref().unwrap();
            copy_from_user(pd, pd_va.as_usize() as u32, &mut bytes).unwrap();
            u32::from_le_bytes(bytes)
        };
        let read_fd = {
            let mut bytes = [0u8; 4];
            let table = PROCESS_TABLE.lock();
            let pd = table.get(index).unwrap().page_directory.as_ref().unwrap();
            copy_from_user(pd, pd_va.as_usize() as u32 + 4, &mut bytes).unwrap();
            u32::from_le_bytes(bytes)
        };

        {
            let table = PROCESS_TABLE.lock();
            let pd = table.get(index).unwrap().page_directory.as_ref().unwrap();
            copy_to_user(pd, pd_va.as_usize() as u32 + 8, b"X").unwrap();
        }
        let (result, k) = capture();
        dispatch(index, 1025, [write_fd, pd_va.as_usize() as u32 + 8, 1, 0], &template, k);
        scheduler::run_ready();
        assert_eq!(result.load(Ordering::SeqCst), 1);

        let (result, k) = capture();
        dispatch(index, 1024, [read_fd, pd_va.as_usize() as u32 + 12, 1, 0], &template, k);
        scheduler::run_ready();
        assert_eq!(result.load(Ordering::SeqCst), 1);

        let table = PROCESS_TABLE.lock();
        let pd = table.get(index).unwrap().page_directory.as_ref().unwrap();
        let mut got = [0u8; 1];
        copy_from_user(pd, pd_va.as_usize() as u32 + 12, &mut got).unwrap();
        assert_eq!(got[0], b'X');
    }
}
