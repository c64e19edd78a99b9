//! # Dublês de teste
//!
//! Implementações em memória dos contratos de `hal`, fiéis o bastante para
//! exercitar evicção, swap e writeback sem hardware: tabela de páginas com
//! bits de accessed/dirty simulados, disco de blocos num `Vec`, arquivos
//! regulares com inode compartilhado entre reopens.
//!
//! Os helpers `user_write`/`user_read` fazem o papel do programa de usuário:
//! faltam a página pelo resolvedor, tocam os bytes pelo frame e marcam os
//! bits que o hardware marcaria.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use crate::addr::{PhysAddr, VirtAddr};
use crate::config::{PAGE_SIZE, SECTORS_PER_PAGE, SECTOR_SIZE};
use crate::fault::FaultInfo;
use crate::hal::{
    AddressSpace, AspaceRef, BlockDevice, BlockError, FileError, FileHandle, FileRef, MapFlags,
};
use crate::process::ProcessVm;
use crate::vm::Vm;

// =============================================================================
// CAPTURA DE LOG
// =============================================================================

static CAPTURE: Mutex<String> = Mutex::new(String::new());

fn capture_sink(line: &str) {
    let mut buf = CAPTURE.lock();
    buf.push_str(line);
    buf.push('\n');
}

/// Aponta o klog para o buffer de captura. O sink é global e único, então
/// todo teste que inspeciona log chama isto primeiro; repetir é inócuo.
pub(crate) fn install_test_sink() {
    crate::klog::set_sink(capture_sink);
}

pub(crate) fn clear_captured() {
    CAPTURE.lock().clear();
}

pub(crate) fn captured() -> String {
    CAPTURE.lock().clone()
}

// =============================================================================
// ESPAÇO DE ENDEREÇAMENTO
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct TestMapping {
    pa: PhysAddr,
    flags: MapFlags,
    accessed: bool,
    dirty: bool,
}

/// Tabela de páginas simulada, com os bits que o clock e o writeback leem.
pub(crate) struct TestAspace {
    entries: Mutex<BTreeMap<u64, TestMapping>>,
    deny_maps: AtomicUsize,
}

impl TestAspace {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(BTreeMap::new()),
            deny_maps: AtomicUsize::new(0),
        })
    }

    pub(crate) fn new_ref() -> AspaceRef {
        Self::new()
    }

    /// Recusa os próximos `n` `map`: simula falta de memória para tabelas
    /// intermediárias.
    pub(crate) fn deny_next_maps(&self, n: usize) {
        self.deny_maps.store(n, Ordering::SeqCst);
    }

    /// O que o hardware faria num acesso de leitura.
    pub(crate) fn mark_accessed(&self, va: VirtAddr) {
        if let Some(m) = self.entries.lock().get_mut(&va.page_round_down().as_u64()) {
            m.accessed = true;
        }
    }

    /// O que o hardware faria numa escrita: accessed e dirty juntos.
    pub(crate) fn mark_dirty(&self, va: VirtAddr) {
        if let Some(m) = self.entries.lock().get_mut(&va.page_round_down().as_u64()) {
            m.accessed = true;
            m.dirty = true;
        }
    }

    pub(crate) fn flags_of(&self, va: VirtAddr) -> Option<MapFlags> {
        self.entries
            .lock()
            .get(&va.page_round_down().as_u64())
            .map(|m| m.flags)
    }

    pub(crate) fn mapping_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl AddressSpace for TestAspace {
    fn map(&self, va: VirtAddr, pa: PhysAddr, flags: MapFlags) -> bool {
        let denied = self
            .deny_maps
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if denied.is_ok() {
            return false;
        }
        self.entries.lock().insert(
            va.page_round_down().as_u64(),
            TestMapping {
                pa,
                flags,
                accessed: false,
                dirty: false,
            },
        );
        true
    }

    fn unmap(&self, va: VirtAddr) {
        self.entries.lock().remove(&va.page_round_down().as_u64());
    }

    fn translate(&self, va: VirtAddr) -> Option<PhysAddr> {
        self.entries
            .lock()
            .get(&va.page_round_down().as_u64())
            .map(|m| m.pa)
    }

    fn is_accessed(&self, va: VirtAddr) -> bool {
        self.entries
            .lock()
            .get(&va.page_round_down().as_u64())
            .is_some_and(|m| m.accessed)
    }

    fn clear_accessed(&self, va: VirtAddr) {
        if let Some(m) = self.entries.lock().get_mut(&va.page_round_down().as_u64()) {
            m.accessed = false;
        }
    }

    fn is_dirty(&self, va: VirtAddr) -> bool {
        self.entries
            .lock()
            .get(&va.page_round_down().as_u64())
            .is_some_and(|m| m.dirty)
    }

    fn clear_dirty(&self, va: VirtAddr) {
        if let Some(m) = self.entries.lock().get_mut(&va.page_round_down().as_u64()) {
            m.dirty = false;
        }
    }
}

// =============================================================================
// DISCO DE SWAP
// =============================================================================

/// Dispositivo de bloco num `Vec`.
pub(crate) struct TestDisk {
    data: Mutex<Vec<u8>>,
    block_size: usize,
    blocks: u64,
}

impl TestDisk {
    /// Disco de swap com capacidade para exatamente `n` páginas.
    pub(crate) fn with_slots(n: usize) -> Arc<dyn BlockDevice> {
        Self::with_block_size(SECTOR_SIZE, (n * SECTORS_PER_PAGE) as u64)
    }

    pub(crate) fn with_block_size(block_size: usize, blocks: u64) -> Arc<dyn BlockDevice> {
        Arc::new(Self {
            data: Mutex::new(vec![0u8; block_size * blocks as usize]),
            block_size,
            blocks,
        })
    }
}

impl BlockDevice for TestDisk {
    fn read_block(&self, lba: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        if lba >= self.blocks {
            return Err(BlockError::InvalidBlock);
        }
        if buf.len() < self.block_size {
            return Err(BlockError::InvalidBuffer);
        }
        let off = lba as usize * self.block_size;
        let data = self.data.lock();
        buf[..self.block_size].copy_from_slice(&data[off..off + self.block_size]);
        Ok(())
    }

    fn write_block(&self, lba: u64, buf: &[u8]) -> Result<(), BlockError> {
        if lba >= self.blocks {
            return Err(BlockError::InvalidBlock);
        }
        if buf.len() < self.block_size {
            return Err(BlockError::InvalidBuffer);
        }
        let off = lba as usize * self.block_size;
        let mut data = self.data.lock();
        data[off..off + self.block_size].copy_from_slice(&buf[..self.block_size]);
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn total_blocks(&self) -> u64 {
        self.blocks
    }
}

// =============================================================================
// ARQUIVOS
// =============================================================================

/// Arquivo regular em memória. `reopen` devolve outro handle sobre o mesmo
/// buffer, como dois descritores do mesmo inode.
pub(crate) struct TestFile {
    data: Arc<Mutex<Vec<u8>>>,
}

impl TestFile {
    pub(crate) fn new(content: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            data: Arc::new(Mutex::new(content.to_vec())),
        })
    }

    /// Arquivo de `len` bytes com padrão determinístico (byte i = i mod 251).
    pub(crate) fn patterned(len: usize) -> Arc<Self> {
        let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        Self::new(&bytes)
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub(crate) fn as_file(self: &Arc<Self>) -> FileRef {
        self.clone()
    }
}

impl FileHandle for TestFile {
    fn len(&self) -> u64 {
        self.data.lock().len() as u64
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FileError> {
        let data = self.data.lock();
        let off = offset.min(data.len() as u64) as usize;
        let n = buf.len().min(data.len() - off);
        buf[..n].copy_from_slice(&data[off..off + n]);
        Ok(n)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, FileError> {
        let mut data = self.data.lock();
        let end = offset as usize + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[offset as usize..end].copy_from_slice(buf);
        Ok(buf.len())
    }

    fn reopen(&self) -> Result<FileRef, FileError> {
        Ok(Arc::new(Self {
            data: self.data.clone(),
        }))
    }
}

/// Descritor que não é arquivo regular (console, pipe).
pub(crate) struct StreamFile;

impl StreamFile {
    pub(crate) fn new() -> FileRef {
        Arc::new(Self)
    }
}

impl FileHandle for StreamFile {
    fn len(&self) -> u64 {
        1
    }

    fn read_at(&self, _buf: &mut [u8], _offset: u64) -> Result<usize, FileError> {
        Err(FileError::NotSupported)
    }

    fn write_at(&self, _buf: &[u8], _offset: u64) -> Result<usize, FileError> {
        Err(FileError::NotSupported)
    }

    fn reopen(&self) -> Result<FileRef, FileError> {
        Ok(Arc::new(Self))
    }

    fn is_regular(&self) -> bool {
        false
    }
}

// =============================================================================
// ACESSOS DE USUÁRIO
// =============================================================================

/// Falta a página como o handler de interrupção faria. O rsp altíssimo
/// garante que nenhum helper dispara crescimento de stack por acidente.
fn ensure_resident(vm: &Vm, proc: &mut ProcessVm, aspace: &TestAspace, va: VirtAddr, write: bool) {
    if aspace.translate(va).is_some() {
        return;
    }
    let res = vm.handle_fault(
        proc,
        FaultInfo {
            addr: va,
            user: true,
            write,
            not_present: true,
            rsp: u64::MAX,
        },
    );
    assert!(res.is_success(), "fault em {:?} resolveu {:?}", va, res);
}

/// Escreve como um programa de usuário escreveria, página a página.
pub(crate) fn user_write(
    vm: &Vm,
    proc: &mut ProcessVm,
    aspace: &TestAspace,
    va: VirtAddr,
    data: &[u8],
) {
    let mut off = 0usize;
    while off < data.len() {
        let cur = va.add(off as u64);
        let base = cur.page_round_down();
        let page_off = (cur.as_u64() - base.as_u64()) as usize;
        let chunk = (PAGE_SIZE - page_off).min(data.len() - off);

        ensure_resident(vm, proc, aspace, cur, true);
        let page = proc.spt().find(base).expect("página registrada");
        let id = page.lock().frame().expect("página residente");
        vm.frames().mem(id).lock()[page_off..page_off + chunk]
            .copy_from_slice(&data[off..off + chunk]);
        aspace.mark_dirty(base);

        off += chunk;
    }
}

/// Lê como um programa de usuário leria, página a página.
pub(crate) fn user_read(
    vm: &Vm,
    proc: &mut ProcessVm,
    aspace: &TestAspace,
    va: VirtAddr,
    len: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut off = 0usize;
    while off < len {
        let cur = va.add(off as u64);
        let base = cur.page_round_down();
        let page_off = (cur.as_u64() - base.as_u64()) as usize;
        let chunk = (PAGE_SIZE - page_off).min(len - off);

        ensure_resident(vm, proc, aspace, cur, false);
        let page = proc.spt().find(base).expect("página registrada");
        let id = page.lock().frame().expect("página residente");
        out.extend_from_slice(&vm.frames().mem(id).lock()[page_off..page_off + chunk]);
        aspace.mark_accessed(base);

        off += chunk;
    }
    out
}
