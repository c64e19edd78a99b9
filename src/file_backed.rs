//! # Backing de Arquivo e Serviço de Mapeamento
//!
//! Páginas que espelham uma janela de arquivo. A população lê `read_len`
//! bytes do offset gravado e zera o resto da página (cauda do mapeamento
//! além do fim do arquivo); evicção e destruição escrevem de volta somente
//! os bytes vindos do arquivo, e somente se a página estiver suja.
//!
//! `map_file` constrói uma corrida de páginas pendentes, uma por chunk, cada
//! uma sabendo sua posição e o total do mapeamento ([`MapSpan`]) para o
//! teardown remover exatamente as páginas daquela chamada. A construção é
//! atômica: falhou um chunk, os anteriores saem antes do erro subir.

use alloc::vec::Vec;

use crate::addr::VirtAddr;
use crate::config::{is_aligned, page_count, PAGE_SIZE, USER_VIRTUAL_END};
use crate::error::{VmError, VmResult};
use crate::hal::{AspaceRef, FileRef};
use crate::page::{BackingKind, Page, PageBuf};
use crate::process::ProcessVm;
use crate::vm::Vm;

/// Posição de uma página dentro de um mapeamento de `map_file`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSpan {
    /// Ordinal da página dentro do mapeamento (0 = cabeça)
    pub index: usize,
    /// Total de páginas do mapeamento
    pub count: usize,
}

/// Janela de arquivo atribuída a uma página
#[derive(Clone)]
pub struct FileSegment {
    pub file: FileRef,
    pub offset: u64,
    pub read_len: usize,
    pub zero_len: usize,
    pub span: Option<MapSpan>,
}

/// Estado file-backed de uma página
pub struct FilePage {
    seg: FileSegment,
}

impl FilePage {
    pub(crate) fn new(seg: FileSegment) -> Self {
        debug_assert!(seg.read_len + seg.zero_len == PAGE_SIZE);
        Self { seg }
    }

    pub(crate) fn seg(&self) -> &FileSegment {
        &self.seg
    }

    /// População: conteúdo do arquivo + cauda zerada.
    pub(crate) fn swap_in(&mut self, buf: &mut PageBuf) -> VmResult<()> {
        if load_segment(&self.seg, buf) {
            Ok(())
        } else {
            Err(VmError::IoError)
        }
    }

    /// Evicção: writeback se suja. Quem chama solta tradução e frame.
    pub(crate) fn swap_out(&mut self, buf: &PageBuf, va: VirtAddr, aspace: &AspaceRef) {
        self.writeback_if_dirty(buf, va, aspace);
    }

    /// Escreve de volta os bytes file-backed se a página estiver suja.
    ///
    /// Só os `read_len` primeiros bytes têm arquivo por trás; a cauda
    /// zerada nunca é escrita. O bit de dirty é limpo após a tentativa,
    /// com ou sem sucesso: não há retry neste subsistema.
    pub(crate) fn writeback_if_dirty(&self, buf: &PageBuf, va: VirtAddr, aspace: &AspaceRef) {
        if self.seg.read_len == 0 || !aspace.is_dirty(va) {
            return;
        }
        match self.seg.file.write_at(&buf[..self.seg.read_len], self.seg.offset) {
            Ok(n) if n == self.seg.read_len => {
                crate::ktrace!("(MMAP) writeback de {} bytes em {:?}", n, va);
            }
            Ok(n) => {
                crate::kwarn!(
                    "(MMAP) writeback parcial em {:?}: {}/{} bytes",
                    va,
                    n,
                    self.seg.read_len
                );
            }
            Err(e) => {
                crate::kwarn!("(MMAP) writeback falhou em {:?}: {}", va, e);
            }
        }
        aspace.clear_dirty(va);
    }
}

/// Carrega uma janela de arquivo: `read_len` bytes em `buf`, resto zerado.
pub fn load_segment(seg: &FileSegment, buf: &mut PageBuf) -> bool {
    if seg.read_len > 0 {
        match seg.file.read_at(&mut buf[..seg.read_len], seg.offset) {
            Ok(n) if n == seg.read_len => {}
            _ => return false,
        }
    }
    buf[seg.read_len..].fill(0);
    true
}

/// [`load_segment`] na forma de inicializador pendente, para carga preguiçosa
/// de segmentos de executável.
pub fn load_segment_init(seg: Option<&FileSegment>, buf: &mut PageBuf) -> bool {
    match seg {
        Some(seg) => load_segment(seg, buf),
        None => false,
    }
}

/// Janela do chunk `i`: quantos bytes vêm do arquivo e quantos são zero.
fn segment_window(file_len: u64, offset: u64, length: usize, i: usize) -> (usize, usize) {
    let chunk_off = offset + (i * PAGE_SIZE) as u64;
    let mapped_rem = length - i * PAGE_SIZE;
    let file_rem = file_len.saturating_sub(chunk_off);
    let read_len = PAGE_SIZE
        .min(mapped_rem)
        .min(usize::try_from(file_rem).unwrap_or(usize::MAX));
    (read_len, PAGE_SIZE - read_len)
}

/// Cria um mapeamento de arquivo em `addr`, uma página pendente por chunk.
pub(crate) fn map_file(
    vm: &Vm,
    proc: &mut ProcessVm,
    addr: VirtAddr,
    length: usize,
    writable: bool,
    file: &FileRef,
    offset: u64,
) -> VmResult<VirtAddr> {
    if addr.is_null() {
        return Err(VmError::InvalidAddress);
    }
    if !addr.is_page_aligned() || !is_aligned(offset as usize, PAGE_SIZE) {
        return Err(VmError::NotAligned);
    }
    if length == 0 {
        return Err(VmError::InvalidSize);
    }
    let end = addr
        .checked_add(length as u64)
        .ok_or(VmError::InvalidSize)?;
    if end.as_u64() > USER_VIRTUAL_END {
        return Err(VmError::InvalidAddress);
    }
    if !file.is_regular() {
        return Err(VmError::InvalidParameter);
    }
    let file_len = file.len();
    if file_len == 0 {
        return Err(VmError::InvalidParameter);
    }

    // Handle independente: fechar o descritor original não desfaz o mapa.
    let mapped = file.reopen().map_err(|_| VmError::IoError)?;

    let count = page_count(length);
    let mut inserted: Vec<VirtAddr> = Vec::with_capacity(count);
    for i in 0..count {
        let va = addr.add((i * PAGE_SIZE) as u64);
        let (read_len, zero_len) = segment_window(file_len, offset, length, i);
        let seg = FileSegment {
            file: mapped.clone(),
            offset: offset + (i * PAGE_SIZE) as u64,
            read_len,
            zero_len,
            span: Some(MapSpan { index: i, count }),
        };
        let page = Page::new_uninit(
            va,
            writable,
            BackingKind::File,
            None,
            Some(seg),
            proc.aspace().clone(),
        );
        if let Err(e) = proc.spt_mut().insert(page) {
            crate::kwarn!("(MMAP) chunk {} em {:?} recusado: {}", i, va, e);
            for va in inserted {
                proc.spt_mut().remove(va, vm.frames(), vm.swap());
            }
            return Err(e);
        }
        inserted.push(va);
    }
    crate::kdebug!("(MMAP) {} páginas mapeadas em {:?}", count, addr);
    Ok(addr)
}

/// Desfaz o mapeamento cuja cabeça está em `addr`. Best-effort: endereço
/// sem página, ou página que não é cabeça de mapeamento, é no-op.
pub(crate) fn unmap_file(vm: &Vm, proc: &mut ProcessVm, addr: VirtAddr) {
    let base = addr.page_round_down();
    let Some(page) = proc.spt().find(base) else {
        crate::ktrace!("(MMAP) unmap de {:?}: nada mapeado", base);
        return;
    };
    let span = page.lock().map_span();
    let Some(span) = span else {
        crate::ktrace!("(MMAP) unmap de {:?}: página fora de mapeamento", base);
        return;
    };
    if span.index != 0 {
        crate::ktrace!("(MMAP) unmap de {:?}: não é cabeça", base);
        return;
    }
    for i in 0..span.count {
        let va = base.add((i * PAGE_SIZE) as u64);
        if !proc.spt_mut().remove(va, vm.frames(), vm.swap()) {
            crate::kwarn!("(MMAP) buraco no mapeamento em {:?}", va);
        }
    }
    crate::kdebug!("(MMAP) {} páginas desmapeadas de {:?}", span.count, base);
}
