// src/kernel/mm/vmm.rs
//! Page directories and page tables
//!
//! Flat 32-bit two-level paging: a page directory of 1024 PDEs, each
//! naming a page table of 1024 PTEs, each naming a 4 KiB frame. The
//! kernel's own address space is identity-mapped, so a physical frame
//! address doubles as the virtual address the kernel uses to read or
//! write the table living in it — there is no separate physical/virtual
//! offset window to thread through, unlike a higher-half kernel.

use bitflags::bitflags;

use super::frame::{Frame, FrameAllocator, FrameError};
use super::types::{PhysAddr, VirtAddr};
use super::vma::{VmaBacking, VmaList};
use crate::constants::{FRAME_SIZE, IMPLICIT_SIGRETURN_ADDR, PAGE_TABLE_ENTRIES, SHARED_PAGE_BASE, USER_SPACE_END, USER_SPACE_START};

bitflags! {
    /// Page directory / page table entry flags.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u32 {
        /// Entry maps a present frame.
        const PRESENT = 1 << 0;
        /// Writable.
        const WRITABLE = 1 << 1;
        /// Accessible from CPL 3.
        const USER = 1 << 2;
        /// Write-through caching.
        const WRITE_THROUGH = 1 << 3;
        /// Caching disabled (MMIO).
        const CACHE_DISABLE = 1 << 4;
    }
}

/// Kernel/identity-mapped flags: present, writable, supervisor-only.
pub const KERNEL_RW: EntryFlags = EntryFlags::PRESENT.union(EntryFlags::WRITABLE);

/// User-accessible, writable, present flags.
pub const USER_RW: EntryFlags = EntryFlags::PRESENT.union(EntryFlags::WRITABLE).union(EntryFlags::USER);

const PDE_SHIFT: u32 = 22;
const PTE_SHIFT: u32 = 12;
const ENTRY_MASK: usize = PAGE_TABLE_ENTRIES - 1;

fn pdi(addr: usize) -> usize {
    (addr >> PDE_SHIFT) & ENTRY_MASK
}

fn pti(addr: usize) -> usize {
    (addr >> PTE_SHIFT) & ENTRY_MASK
}

/// A raw, page-aligned table of 1024 32-bit entries — a page directory
/// or a page table, depending on context.
#[repr(align(4096))]
pub struct RawTable(pub [u32; PAGE_TABLE_ENTRIES]);

impl RawTable {
    fn entry(&self, i: usize) -> u32 {
        self.0[i]
    }

    fn set_entry(&mut self, i: usize, frame: Frame, flags: EntryFlags) {
        self.0[i] = (frame.addr().as_usize() as u32) | flags.bits();
    }

    fn is_present(&self, i: usize) -> bool {
        self.0[i] & EntryFlags::PRESENT.bits() != 0
    }

    fn frame_of(&self, i: usize) -> Frame {
        Frame::from_addr(PhysAddr::new((self.0[i] & !(FRAME_SIZE as u32 - 1)) as usize))
    }

    fn clear(&mut self, i: usize) {
        self.0[i] = 0;
    }
}

/// # Safety
/// `frame` must be zeroed and exclusively owned by the caller for the
/// returned reference's lifetime — the kernel's identity mapping makes
/// this a plain reinterpretation of the frame's own bytes.
unsafe fn table_at(frame: Frame) -> &'static mut RawTable {
    // Safety: forwarded from the caller's contract; the kernel region is
    // identity-mapped so the physical address is directly dereferenceable.
    unsafe { &mut *(frame.addr().as_usize() as *mut RawTable) }
}

fn alloc_zeroed_table(allocator: &FrameAllocator) -> Result<Frame, FrameError> {
    let frame = allocator.allocate()?;
    // Safety: freshly allocated, not yet visible to anyone else.
    let table = unsafe { table_at(frame) };
    table.0.fill(0);
    Ok(frame)
}

/// A process's (or the kernel's) page directory.
pub struct PageDirectory {
    frame: Frame,
}

impl PageDirectory {
    /// Physical address CR3 should be loaded with to activate this
    /// directory.
    #[must_use]
    pub fn cr3(&self) -> PhysAddr {
        self.frame.addr()
    }

    fn table(&self) -> &'static mut RawTable {
        // Safety: the directory frame is owned exclusively by this
        // `PageDirectory` for as long as it exists.
        unsafe { table_at(self.frame) }
    }

    /// Installs the kernel's identity-mapped low memory, the shared user
    /// page, and any MMIO regions registered at [`global_init`] time by
    /// copying those top-level PDEs from the template directory.
    pub fn install_shared_mappings(&self, template: &KernelTables) {
        let pd = self.table();
        for i in 0..pdi(USER_SPACE_START) {
            pd.0[i] = template.directory_template.0[i];
        }
        pd.0[pdi(SHARED_PAGE_BASE)] = template.directory_template.0[pdi(SHARED_PAGE_BASE)];
    }

    /// Maps a single 4 KiB page, allocating the page table itself if
    /// this is the first mapping in its 4 MiB region.
    ///
    /// # Errors
    /// Propagates [`FrameError::OutOfMemory`] from the underlying
    /// allocator.
    pub fn map(&self, allocator: &FrameAllocator, va: VirtAddr, frame: Frame, flags: EntryFlags) -> Result<(), FrameError> {
        let pd = self.table();
        let pdi = pdi(va.as_usize());
        if !pd.is_present(pdi) {
            let pt_frame = alloc_zeroed_table(allocator)?;
            pd.set_entry(pdi, pt_frame, EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER);
        }
        let pt_frame = pd.frame_of(pdi);
        // Safety: `pt_frame` was just established as this PDE's page
        // table and is owned by this directory alone.
        let pt = unsafe { table_at(pt_frame) };
        pt.set_entry(pti(va.as_usize()), frame, flags);
        Ok(())
    }

    /// Looks up the physical frame backing `va`, if the page is present.
    #[must_use]
    pub fn translate(&self, va: VirtAddr) -> Option<Frame> {
        let pd = self.table();
        let pdi = pdi(va.as_usize());
        if !pd.is_present(pdi) {
            return None;
        }
        let pt_frame = pd.frame_of(pdi);
        // Safety: present PDE, owned by this directory.
        let pt = unsafe { table_at(pt_frame) };
        let pti = pti(va.as_usize());
        if !pt.is_present(pti) {
            return None;
        }
        Some(pt.frame_of(pti))
    }

    /// Clears the mapping at `va` and frees the frame that backed it, if
    /// the page was present. Used by `simple_munmap`; leaves the page
    /// table itself in place even if now fully empty, same tradeoff
    /// `simple_mmap`'s demand paging makes when a region grows back.
    pub fn unmap(&self, allocator: &FrameAllocator, va: VirtAddr) -> Option<Frame> {
        let pd = self.table();
        let pdi = pdi(va.as_usize());
        if !pd.is_present(pdi) {
            return None;
        }
        let pt_frame = pd.frame_of(pdi);
        // Safety: present PDE, owned by this directory.
        let pt = unsafe { table_at(pt_frame) };
        let pti = pti(va.as_usize());
        if !pt.is_present(pti) {
            return None;
        }
        let frame = pt.frame_of(pti);
        pt.clear(pti);
        let _ = allocator.free(frame);
        Some(frame)
    }

    /// Unmaps every user page, frees the data frames and page tables
    /// backing them, then frees the directory frame itself.
    pub fn free(self, allocator: &FrameAllocator) {
        let pd = self.table();
        for pdi in pdi(USER_SPACE_START)..pdi(USER_SPACE_END) {
            if !pd.is_present(pdi) {
                continue;
            }
            let pt_frame = pd.frame_of(pdi);
            // Safety: present PDE owned exclusively by this directory,
            // about to be torn down.
            let pt = unsafe { table_at(pt_frame) };
            for pti in 0..PAGE_TABLE_ENTRIES {
                if pt.is_present(pti) {
                    let _ = allocator.free(pt.frame_of(pti));
                    pt.clear(pti);
                }
            }
            let _ = allocator.free(pt_frame);
            pd.clear(pdi);
        }
        let _ = allocator.free(self.frame);
    }

    /// Produces a fresh page directory that shares this one's kernel/
    /// shared-page mappings (via `template`, same as [`per_core_init`])
    /// and carries an eager, frame-for-frame copy of every present user
    /// page — the address-space half of `fork`.
    ///
    /// # Errors
    /// Propagates allocator exhaustion. A failure partway through the
    /// copy leaves the partially built child directory for the caller
    /// to discard; already-copied frames are not rolled back.
    pub fn fork_into(&self, allocator: &FrameAllocator, template: &KernelTables) -> Result<Self, FrameError> {
        let child = per_core_init(allocator, template)?;
        let parent_pd = self.table();
        for pdi in pdi(USER_SPACE_START)..pdi(USER_SPACE_END) {
            if !parent_pd.is_present(pdi) {
                continue;
            }
            let pt_frame = parent_pd.frame_of(pdi);
            // Safety: present PDE owned by this directory.
            let pt = unsafe { table_at(pt_frame) };
            for pti in 0..PAGE_TABLE_ENTRIES {
                if !pt.is_present(pti) {
                    continue;
                }
                let src_frame = pt.frame_of(pti);
                let dst_frame = allocator.allocate()?;
                // Safety: `src_frame` is present and owned by `self`;
                // `dst_frame` was just allocated and is not yet visible
                // to anyone else. Identity mapping makes both directly
                // addressable.
                unsafe {
                    let src = core::slice::from_raw_parts(src_frame.addr().as_usize() as *const u8, FRAME_SIZE);
                    let dst = core::slice::from_raw_parts_mut(dst_frame.addr().as_usize() as *mut u8, FRAME_SIZE);
                    dst.copy_from_slice(src);
                }
                let flags = EntryFlags::from_bits_truncate(pt.entry(pti) & (FRAME_SIZE as u32 - 1));
                let va = VirtAddr::new(pdi * (PAGE_TABLE_ENTRIES * FRAME_SIZE) + pti * FRAME_SIZE);
                child.map(allocator, va, dst_frame, flags)?;
            }
        }
        Ok(child)
    }
}

/// The template page directory built once at boot: every per-process
/// directory copies its kernel/shared PDEs out of this one.
pub struct KernelTables {
    directory_template: &'static mut RawTable,
}

/// Builds the kernel's identity-mapped low-memory tables and the shared
/// user-page table, returning a template to stamp into every per-process
/// directory.
///
/// `kernel_pages` is the number of 4 MiB regions (i.e. page tables) to
/// identity-map for kernel use, starting at physical/virtual 0. Entry
/// `(0, 0)` — virtual address 0 — is deliberately left unmapped so a
/// null dereference still faults.
///
/// # Errors
/// Propagates allocator exhaustion.
pub fn global_init(allocator: &FrameAllocator, kernel_pages: usize) -> Result<KernelTables, FrameError> {
    let directory_frame = alloc_zeroed_table(allocator)?;
    // Safety: freshly allocated, not yet shared.
    let directory: &'static mut RawTable = unsafe { table_at(directory_frame) };

    for region in 0..kernel_pages {
        let pt_frame = alloc_zeroed_table(allocator)?;
        // Safety: freshly allocated, exclusively owned here.
        let pt = unsafe { table_at(pt_frame) };
        for i in 0..PAGE_TABLE_ENTRIES {
            let phys = region * (PAGE_TABLE_ENTRIES * FRAME_SIZE) + i * FRAME_SIZE;
            if phys == 0 {
                continue; // trap null dereferences
            }
            pt.set_entry(i, Frame::from_addr(PhysAddr::new(phys)), KERNEL_RW);
        }
        directory.set_entry(region, pt_frame, KERNEL_RW);
    }

    let shared_pt_frame = alloc_zeroed_table(allocator)?;
    // Safety: freshly allocated, exclusively owned here.
    let shared_pt = unsafe { table_at(shared_pt_frame) };
    let shared_frame = allocator.allocate()?;
    shared_pt.set_entry(0, shared_frame, USER_RW);
    directory.set_entry(pdi(SHARED_PAGE_BASE), shared_pt_frame, USER_RW);

    Ok(KernelTables { directory_template: directory })
}

/// Allocates a fresh page directory for a new process, installing the
/// shared kernel/shared-page mappings from `template`.
///
/// # Errors
/// Propagates allocator exhaustion.
pub fn per_core_init(allocator: &FrameAllocator, template: &KernelTables) -> Result<PageDirectory, FrameError> {
    let frame = alloc_zeroed_table(allocator)?;
    let pd = PageDirectory { frame };
    pd.install_shared_mappings(template);
    Ok(pd)
}

/// What the caller (the trap-vector-14 handler, the userland boundary of
/// this crate) should do about a page fault.
///
/// The real interrupt stub and signal-context push live outside this
/// crate's scope; this function only decides *which* of the three cases
/// applies and, in the [`PageFaultOutcome::Resolved`] case, performs the
/// lazy allocation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFaultOutcome {
    /// A page was lazily allocated (and, for file-backed areas, filled)
    /// and mapped in; the faulting instruction can simply be retried.
    Resolved,
    /// The fault address is the sentinel a signal handler "returns" to
    /// when it never calls `sigreturn` itself; the caller should treat
    /// this exactly like an explicit `sigreturn` syscall.
    ImplicitSigreturn,
    /// The fault address is not covered by any VMA and the process has
    /// a signal handler installed: deliver the signal instead of
    /// killing the process.
    DeliverSignal,
    /// The fault address is not covered by any VMA and there is no
    /// handler to run (or the fault happened while already running
    /// one): the process should be terminated with exit code 139.
    Segfault,
}

fn zero_frame(frame: Frame) {
    // Safety: the frame was just allocated and is not yet mapped
    // anywhere else; the kernel's identity mapping makes its physical
    // address directly writable.
    let bytes = unsafe { core::slice::from_raw_parts_mut(frame.addr().as_usize() as *mut u8, FRAME_SIZE) };
    bytes.fill(0);
}

/// Resolves a page fault at `fault_va` against `pd`/`vmas`.
///
/// `in_handler` and `handler_installed` mirror the faulting process's
/// signal state (see `kernel::process::pcb::Pcb`): together they decide
/// between the sentinel-sigreturn, deliver-signal and segfault cases
/// when the address isn't backed by a VMA at all.
///
/// # Errors
/// Propagates [`FrameError::OutOfMemory`] when a lazy allocation is
/// needed but no frame is available.
pub fn handle_page_fault(
    pd: &PageDirectory,
    vmas: &VmaList,
    allocator: &FrameAllocator,
    fault_va: VirtAddr,
    in_handler: bool,
    handler_installed: bool,
) -> Result<PageFaultOutcome, FrameError> {
    if in_handler && fault_va.as_usize() == IMPLICIT_SIGRETURN_ADDR {
        return Ok(PageFaultOutcome::ImplicitSigreturn);
    }

    let vma = match vmas.find(fault_va) {
        Some(vma) => vma,
        None => {
            return Ok(if handler_installed && !in_handler {
                PageFaultOutcome::DeliverSignal
            } else {
                PageFaultOutcome::Segfault
            });
        }
    };

    let page_start = fault_va.align_down(FRAME_SIZE);
    let frame = allocator.allocate()?;
    zero_frame(frame);
    if let VmaBacking::File { node, file_offset } = &vma.backing {
        let page_offset = page_start.as_usize() - vma.start.as_usize();
        // Safety: `frame` was just zeroed above and is not yet mapped;
        // identity mapping makes it directly writable.
        let bytes = unsafe { core::slice::from_raw_parts_mut(frame.addr().as_usize() as *mut u8, FRAME_SIZE) };
        let _ = node.read_all(file_offset + page_offset, bytes);
    }

    let flags = if vma.writable { USER_RW } else { EntryFlags::PRESENT | EntryFlags::USER };
    pd.map(allocator, page_start, frame, flags)?;
    Ok(PageFaultOutcome::Resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_allocator(frames: usize) -> (FrameAllocator, alloc::vec::Vec<u8>) {
        let region = alloc::vec![0u8; frames * FRAME_SIZE];
        let alloc = FrameAllocator::new();
        unsafe { alloc.init(PhysAddr::new(region.as_ptr() as usize), frames) };
        (alloc, region)
    }

    #[test]
    fn map_then_translate_round_trips() {
        let (allocator, _region) = test_allocator(16);
        let template = global_init(&allocator, 1).unwrap();
        let pd = per_core_init(&allocator, &template).unwrap();

        let data_frame = allocator.allocate().unwrap();
        let va = VirtAddr::new(USER_SPACE_START);
        pd.map(&allocator, va, data_frame, USER_RW).unwrap();

        assert_eq!(pd.translate(va), Some(data_frame));
        assert_eq!(pd.translate(VirtAddr::new(USER_SPACE_START + FRAME_SIZE)), None);
    }

    #[test]
    fn page_fault_lazily_maps_anonymous_vma() {
        use super::super::vma::{Vma, VmaBacking, VmaList};

        let (allocator, _region) = test_allocator(16);
        let template = global_init(&allocator, 1).unwrap();
        let pd = per_core_init(&allocator, &template).unwrap();

        let mut vmas = VmaList::new();
        let start = VirtAddr::new(USER_SPACE_START);
        let end = VirtAddr::new(USER_SPACE_START + FRAME_SIZE);
        vmas.add_vma(Vma { start, end, writable: true, backing: VmaBacking::Anonymous }).unwrap();

        let outcome = handle_page_fault(&pd, &vmas, &allocator, start, false, false).unwrap();
        assert_eq!(outcome, PageFaultOutcome::Resolved);
        assert!(pd.translate(start).is_some());
    }

    #[test]
    fn page_fault_outside_any_vma_segfaults_without_handler() {
        use super::super::vma::VmaList;

        let (allocator, _region) = test_allocator(16);
        let template = global_init(&allocator, 1).unwrap();
        let pd = per_core_init(&allocator, &template).unwrap();
        let vmas = VmaList::new();

        let outcome =
            handle_page_fault(&pd, &vmas, &allocator, VirtAddr::new(USER_SPACE_START), false, false).unwrap();
        assert_eq!(outcome, PageFaultOutcome::Segfault);
    }

    #[test]
    fn page_fault_outside_any_vma_with_handler_delivers_signal() {
        use super::super::vma::VmaList;

        let (allocator, _region) = test_allocator(16);
        let template = global_init(&allocator, 1).unwrap();
        let pd = per_core_init(&allocator, &template).unwrap();
        let vmas = VmaList::new();

        let outcome =
            handle_page_fault(&pd, &vmas, &allocator, VirtAddr::new(USER_SPACE_START), false, true).unwrap();
        assert_eq!(outcome, PageFaultOutcome::DeliverSignal);
    }

    #[test]
    fn sentinel_fault_while_in_handler_is_implicit_sigreturn() {
        use super::super::vma::VmaList;

        let (allocator, _region) = test_allocator(16);
        let template = global_init(&allocator, 1).unwrap();
        let pd = per_core_init(&allocator, &template).unwrap();
        let vmas = VmaList::new();

        let outcome = handle_page_fault(
            &pd,
            &vmas,
            &allocator,
            VirtAddr::new(IMPLICIT_SIGRETURN_ADDR),
            true,
            true,
        )
        .unwrap();
        assert_eq!(outcome, PageFaultOutcome::ImplicitSigreturn);
    }

    #[test]
    fn free_returns_user_frames() {
        let (allocator, _region) = test_allocator(16);
        let template = global_init(&allocator, 1).unwrap();
        let pd = per_core_init(&allocator, &template).unwrap();
        let before = allocator.free_count();

        let data_frame = allocator.allocate().unwrap();
        pd.map(&allocator, VirtAddr::new(USER_SPACE_START), data_frame, USER_RW).unwrap();
        pd.free(&allocator);

        assert_eq!(allocator.free_count(), before);
    }
}
