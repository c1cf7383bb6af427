// src/kernel/loader.rs
//! ELF32 program loader
//!
//! Validates a minimal ELF32/EM_386 header and turns its `PT_LOAD`
//! segments into file-backed [`Vma`]s; the pages themselves are never
//! read here — the page-fault handler
//! ([`crate::kernel::mm::vmm::handle_page_fault`]) lazily pulls the
//! bytes in from the node on first touch, exactly like an anonymous
//! mapping except with a file behind it instead of zeros.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::constants::{ELF_LOAD_UPPER_BOUND, FRAME_SIZE, USER_SPACE_END, USER_SPACE_START};
use crate::errors::unified::LoadError;
use crate::kernel::fs::node::Node;
use crate::kernel::mm::frame::FrameAllocator;
use crate::kernel::mm::types::VirtAddr;
use crate::kernel::mm::vma::{Vma, VmaBacking, VmaList};
use crate::kernel::mm::vmm::{EntryFlags, PageDirectory};

const EI_MAG: &[u8; 4] = b"\x7fELF";
const ELFCLASS32: u8 = 1;
const ELFDATA2LSB: u8 = 1;
const EM_386: u16 = 3;
const EV_CURRENT: u32 = 1;
const PT_LOAD: u32 = 1;
const PHDR_SIZE: usize = 32;

/// The fields of an ELF32 header this loader actually needs.
#[derive(Debug, Clone, Copy)]
pub struct Elf32Header {
    pub entry: u32,
    pub phoff: u32,
    pub phentsize: u16,
    pub phnum: u16,
}

fn read_exact(node: &dyn Node, offset: usize, buf: &mut [u8]) -> Result<(), LoadError> {
    let n = node.read_all(offset, buf).map_err(|_| LoadError::ReadFailed)?;
    if n != buf.len() {
        return Err(LoadError::ReadFailed);
    }
    Ok(())
}

/// Validates the ELF32 magic, class, endianness, machine and version
/// fields, returning the header fields needed to load the program.
///
/// # Errors
/// [`LoadError::BadMagic`] if the first four bytes aren't the ELF
/// magic; [`LoadError::UnsupportedClass`] for anything other than a
/// 32-bit, little-endian, version-1, `EM_386` executable.
pub fn valid_load(node: &dyn Node) -> Result<Elf32Header, LoadError> {
    let mut ident = [0u8; 16];
    read_exact(node, 0, &mut ident)?;
    if &ident[0..4] != EI_MAG {
        return Err(LoadError::BadMagic);
    }
    if ident[4] != ELFCLASS32 || ident[5] != ELFDATA2LSB || ident[6] != EV_CURRENT as u8 {
        return Err(LoadError::UnsupportedClass);
    }

    let mut rest = [0u8; 32];
    read_exact(node, 16, &mut rest)?;
    let e_machine = u16::from_le_bytes([rest[2], rest[3]]);
    let e_version = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
    if e_machine != EM_386 || e_version != EV_CURRENT {
        return Err(LoadError::UnsupportedClass);
    }
    let entry = u32::from_le_bytes([rest[8], rest[9], rest[10], rest[11]]);
    let phoff = u32::from_le_bytes([rest[12], rest[13], rest[14], rest[15]]);
    let phentsize = u16::from_le_bytes([rest[26 - 16], rest[27 - 16]]);
    let phnum = u16::from_le_bytes([rest[28 - 16], rest[29 - 16]]);

    if entry as usize >= ELF_LOAD_UPPER_BOUND || (entry as usize) < USER_SPACE_START {
        return Err(LoadError::SegmentOutOfRange);
    }
    Ok(Elf32Header { entry, phoff, phentsize, phnum })
}

/// A fully resolved program image, ready to become a process's address
/// space.
pub struct LoadedImage {
    pub vmas: VmaList,
    pub entry: u32,
    /// Top of the (empty, not-yet-populated) user stack.
    pub stack_top: u32,
}

/// Validates `node` as an ELF32/EM_386 executable and builds the VMA
/// list its `PT_LOAD` segments describe, plus a private stack area.
///
/// # Errors
/// See [`valid_load`]; additionally [`LoadError::SegmentOutOfRange`] if
/// any segment would map outside `[USER_SPACE_START, ELF_LOAD_UPPER_BOUND)`.
pub fn load(node: &Arc<dyn Node>) -> Result<LoadedImage, LoadError> {
    let header = valid_load(node.as_ref())?;
    let mut vmas = VmaList::new();

    for i in 0..header.phnum as usize {
        let mut phdr = [0u8; PHDR_SIZE];
        read_exact(node.as_ref(), header.phoff as usize + i * header.phentsize as usize, &mut phdr)?;
        let p_type = u32::from_le_bytes([phdr[0], phdr[1], phdr[2], phdr[3]]);
        if p_type != PT_LOAD {
            continue;
        }
        let p_offset = u32::from_le_bytes([phdr[4], phdr[5], phdr[6], phdr[7]]) as usize;
        let p_vaddr = u32::from_le_bytes([phdr[8], phdr[9], phdr[10], phdr[11]]) as usize;
        let p_filesz = u32::from_le_bytes([phdr[16], phdr[17], phdr[18], phdr[19]]) as usize;
        let p_memsz = u32::from_le_bytes([phdr[20], phdr[21], phdr[22], phdr[23]]) as usize;
        let p_flags = u32::from_le_bytes([phdr[24], phdr[25], phdr[26], phdr[27]]);
        const PF_W: u32 = 1 << 1;

        let seg_end = p_vaddr.checked_add(p_memsz).ok_or(LoadError::SegmentOutOfRange)?;
        if p_vaddr < USER_SPACE_START || seg_end > ELF_LOAD_UPPER_BOUND || seg_end < p_vaddr {
            return Err(LoadError::SegmentOutOfRange);
        }
        if p_filesz > p_memsz {
            return Err(LoadError::SegmentOutOfRange);
        }

        let start = VirtAddr::new(p_vaddr).align_down(FRAME_SIZE);
        let end = VirtAddr::new(seg_end)
            .align_up(FRAME_SIZE)
            .ok_or(LoadError::SegmentOutOfRange)?;
        vmas
            .add_vma(Vma {
                start,
                end,
                writable: p_flags & PF_W != 0,
                backing: VmaBacking::File { node: node.clone(), file_offset: p_offset.saturating_sub(p_vaddr - start.as_usize()) },
            })
            .map_err(|_| LoadError::SegmentOutOfRange)?;
    }

    let stack_start = VirtAddr::new(USER_SPACE_END - FRAME_SIZE);
    let stack_end = VirtAddr::new(USER_SPACE_END);
    vmas.add_vma(Vma { start: stack_start, end: stack_end, writable: true, backing: VmaBacking::Anonymous })
        .map_err(|_| LoadError::SegmentOutOfRange)?;

    Ok(LoadedImage { vmas, entry: header.entry, stack_top: USER_SPACE_END as u32 })
}

/// Eagerly maps the top stack page and writes `argv` onto it in the
/// usual `int main(int argc, char **argv)` layout, returning the
/// initial `esp`.
///
/// Unlike ordinary stack growth (lazily faulted in page by page), this
/// one page is mapped up front so the kernel can write the startup
/// arguments into it directly through the identity-mapped physical
/// address, the same trick [`crate::kernel::mm::vmm::handle_page_fault`]
/// uses for newly faulted-in pages.
///
/// # Errors
/// [`LoadError::SegmentOutOfRange`] if `argv`'s encoded size would not
/// fit in a single 4 KiB page.
pub fn push_argv(pd: &PageDirectory, allocator: &FrameAllocator, argv: &[&str]) -> Result<u32, LoadError> {
    let stack_top = USER_SPACE_END;
    let page_va = VirtAddr::new(stack_top - FRAME_SIZE);
    let frame = allocator.allocate().map_err(|_| LoadError::SegmentOutOfRange)?;
    pd.map(allocator, page_va, frame, EntryFlags::PRESENT | EntryFlags::WRITABLE | EntryFlags::USER)
        .map_err(|_| LoadError::SegmentOutOfRange)?;

    // Safety: `frame` was just mapped exclusively into this page
    // directory; the kernel's identity mapping makes it directly
    // addressable for this one-time setup write.
    let mem = unsafe { core::slice::from_raw_parts_mut(frame.addr().as_usize() as *mut u8, FRAME_SIZE) };

    let mut cursor = FRAME_SIZE;
    let mut arg_vas = Vec::with_capacity(argv.len());
    for arg in argv.iter().rev() {
        let bytes = arg.as_bytes();
        cursor = cursor.checked_sub(bytes.len() + 1).ok_or(LoadError::SegmentOutOfRange)?;
        mem[cursor..cursor + bytes.len()].copy_from_slice(bytes);
        mem[cursor + bytes.len()] = 0;
        arg_vas.push(page_va.as_usize() as u32 + cursor as u32);
    }
    arg_vas.reverse();

    cursor = cursor.checked_sub(4).ok_or(LoadError::SegmentOutOfRange)?;
    mem[cursor..cursor + 4].copy_from_slice(&0u32.to_le_bytes());
    for &va in arg_vas.iter().rev() {
        cursor = cursor.checked_sub(4).ok_or(LoadError::SegmentOutOfRange)?;
        mem[cursor..cursor + 4].copy_from_slice(&va.to_le_bytes());
    }
    let argv_ptr = page_va.as_usize() as u32 + cursor as u32;

    cursor = cursor.checked_sub(4).ok_or(LoadError::SegmentOutOfRange)?;
    mem[cursor..cursor + 4].copy_from_slice(&argv_ptr.to_le_bytes());
    cursor = cursor.checked_sub(4).ok_or(LoadError::SegmentOutOfRange)?;
    mem[cursor..cursor + 4].copy_from_slice(&(argv.len() as u32).to_le_bytes());

    Ok(page_va.as_usize() as u32 + cursor as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::fs::ramdisk::file;
    use crate::kernel::mm::types::PhysAddr;

    fn elf32_header(entry: u32, phoff: u32, phnum: u16) -> Vec<u8> {
        let mut bytes = alloc::vec![0u8; phoff as usize];
        bytes[0..4].copy_from_slice(EI_MAG);
        bytes[4] = ELFCLASS32;
        bytes[5] = ELFDATA2LSB;
        bytes[6] = EV_CURRENT as u8;
        bytes[18..20].copy_from_slice(&EM_386.to_le_bytes());
        bytes[20..24].copy_from_slice(&EV_CURRENT.to_le_bytes());
        bytes[24..28].copy_from_slice(&entry.to_le_bytes());
        bytes[28..32].copy_from_slice(&phoff.to_le_bytes());
        bytes[42..44].copy_from_slice(&(PHDR_SIZE as u16).to_le_bytes());
        bytes[44..46].copy_from_slice(&phnum.to_le_bytes());
        bytes
    }

    fn push_phdr(bytes: &mut Vec<u8>, vaddr: u32, filesz: u32, memsz: u32, writable: bool) {
        let mut phdr = [0u8; PHDR_SIZE];
        phdr[0..4].copy_from_slice(&PT_LOAD.to_le_bytes());
        phdr[4..8].copy_from_slice(&(bytes.len() as u32 + PHDR_SIZE as u32).to_le_bytes());
        phdr[8..12].copy_from_slice(&vaddr.to_le_bytes());
        phdr[16..20].copy_from_slice(&filesz.to_le_bytes());
        phdr[20..24].copy_from_slice(&memsz.to_le_bytes());
        if writable {
            phdr[24..28].copy_from_slice(&(1u32 << 1).to_le_bytes());
        }
        bytes.extend_from_slice(&phdr);
    }

    #[test]
    fn rejects_bad_magic() {
        let node = file(&[0u8; 64]);
        assert_eq!(valid_load(&node), Err(LoadError::BadMagic));
    }

    #[test]
    fn accepts_well_formed_header_and_segment() {
        let entry = (USER_SPACE_START + 0x54) as u32;
        let mut bytes = elf32_header(entry, 52, 1);
        push_phdr(&mut bytes, USER_SPACE_START as u32, 0x100, 0x100, false);
        bytes.resize(bytes.len() + 0x100, 0xAB);
        let node: Arc<dyn Node> = Arc::new(file(&bytes));

        let image = load(&node).unwrap();
        assert_eq!(image.entry, entry);
        assert_eq!(image.stack_top, USER_SPACE_END as u32);
        assert!(image.vmas.find(VirtAddr::new(USER_SPACE_START)).is_some());
        assert!(image.vmas.find(VirtAddr::new(USER_SPACE_END - 1)).is_some());
    }

    #[test]
    fn rejects_segment_escaping_user_window() {
        let entry = (USER_SPACE_START + 0x10) as u32;
        let mut bytes = elf32_header(entry, 52, 1);
        push_phdr(&mut bytes, (ELF_LOAD_UPPER_BOUND - 0x10) as u32, 0x100, 0x100, false);
        bytes.resize(bytes.len() + 0x100, 0);
        let node: Arc<dyn Node> = Arc::new(file(&bytes));

        assert_eq!(load(&node), Err(LoadError::SegmentOutOfRange));
    }

    #[test]
    fn push_argv_lays_out_argc_and_pointers() {
        let region = alloc::vec![0u8; FRAME_SIZE * 8];
        let allocator = FrameAllocator::new();
        unsafe { allocator.init(PhysAddr::new(region.as_ptr() as usize), 8) };
        let template = crate::kernel::mm::vmm::global_init(&allocator, 1).unwrap();
        let pd = crate::kernel::mm::vmm::per_core_init(&allocator, &template).unwrap();

        let esp = push_argv(&pd, &allocator, &["shell", "-c", "echo hi"]).unwrap();
        let frame = pd.translate(VirtAddr::new(USER_SPACE_END - FRAME_SIZE)).unwrap();
        let mem = unsafe { core::slice::from_raw_parts(frame.addr().as_usize() as *const u8, FRAME_SIZE) };
        let offset = esp as usize - (USER_SPACE_END - FRAME_SIZE);
        let argc = u32::from_le_bytes(mem[offset..offset + 4].try_into().unwrap());
        assert_eq!(argc, 3);
    }
}
