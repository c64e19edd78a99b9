//! # Orquestrador de Memória Virtual
//!
//! [`Vm`] reúne os recursos globais (pool de frames e tabela de swap) e
//! expõe as operações que o resto do kernel consome: alocação preguiçosa,
//! claim, resolução de faults, mmap/munmap, cópia de fork e teardown.
//!
//! Ordem global de locks, respeitada por todos os caminhos:
//!
//! ```text
//! pool ──(solta antes de)──► página ──► bytes do frame ──► swap
//! ```
//!
//! O claim publica o ocupante no pool só DEPOIS da população: um frame
//! meio-populado nunca entra no alcance do clock. Nenhum caminho segura
//! duas páginas ao mesmo tempo; a cópia de fork passa por um buffer
//! intermediário justamente para não precisar das duas residentes juntas.

use alloc::boxed::Box;
use alloc::sync::Arc;

use crate::addr::{PhysAddr, VirtAddr};
use crate::config::{PAGE_SIZE, USER_VIRTUAL_END};
use crate::error::{VmError, VmResult};
use crate::fault::{self, FaultInfo, FaultResult};
use crate::file_backed::{self, FileSegment};
use crate::frame::{FrameStats, FrameTable, Occupant};
use crate::hal::{BlockDevice, FileRef, MapFlags};
use crate::page::{BackingKind, Page, PageBacking, PageBuf, PageInit, PageRef};
use crate::process::ProcessVm;
use crate::swap::{SwapStats, SwapTable};

/// Fotografia dos recursos globais do subsistema
#[derive(Debug, Clone, Copy)]
pub struct VmStats {
    pub frames: FrameStats,
    pub swap: SwapStats,
}

/// Subsistema de memória virtual: uma instância por kernel
pub struct Vm {
    frames: FrameTable,
    swap: SwapTable,
}

/// Plano de cópia de uma página do pai, decidido sob o lock dela
enum CopyPlan {
    /// Nunca populada: o filho recebe o mesmo estado pendente
    Pending {
        target: BackingKind,
        init: Option<PageInit>,
        seg: Option<FileSegment>,
    },
    /// File-backed: o filho repopula do arquivo quando faltar
    Lazy(FileSegment),
    /// Anônima: bytes copiados frame a frame
    AnonBytes,
}

impl Vm {
    /// Inicializa o subsistema com `frames` frames físicos a partir de
    /// `frame_base` e swap no dispositivo `swap_dev`.
    pub fn new(
        frames: usize,
        frame_base: PhysAddr,
        swap_dev: Arc<dyn BlockDevice>,
    ) -> VmResult<Self> {
        if frames == 0 {
            return Err(VmError::InvalidParameter);
        }
        let swap = SwapTable::new(swap_dev)?;
        let vm = Self {
            frames: FrameTable::new(frames, frame_base),
            swap,
        };
        crate::kinfo!(
            "(VM) subsistema ativo: {} frames, {} slots de swap",
            vm.frames.capacity(),
            vm.swap.stats().total_slots
        );
        Ok(vm)
    }

    #[inline]
    pub(crate) fn frames(&self) -> &FrameTable {
        &self.frames
    }

    #[inline]
    pub(crate) fn swap(&self) -> &SwapTable {
        &self.swap
    }

    /// Registra uma página pendente em `addr`, sem consumir frame.
    ///
    /// Páginas file-backed exigem `seg`; `init` roda uma única vez na
    /// primeira população.
    pub fn allocate_page(
        &self,
        proc: &mut ProcessVm,
        target: BackingKind,
        addr: VirtAddr,
        writable: bool,
        init: Option<PageInit>,
        seg: Option<FileSegment>,
    ) -> VmResult<()> {
        if addr.is_null() || addr.as_u64() >= USER_VIRTUAL_END {
            return Err(VmError::InvalidAddress);
        }
        if !addr.is_page_aligned() {
            return Err(VmError::NotAligned);
        }
        if target == BackingKind::File && seg.is_none() {
            return Err(VmError::InvalidParameter);
        }
        let aspace = proc.aspace().clone();
        proc.spt_mut()
            .insert(Page::new_uninit(addr, writable, target, init, seg, aspace))?;
        crate::ktrace!("(VM) página pendente em {:?}", addr);
        Ok(())
    }

    /// Torna residente a página registrada em `addr`.
    pub fn claim_page(&self, proc: &mut ProcessVm, addr: VirtAddr) -> VmResult<()> {
        let page = proc.spt().find(addr).ok_or(VmError::NotMapped)?;
        self.claim(&page)
    }

    /// Claim: frame do pool, tradução na tabela de páginas, população e,
    /// por último, publicação do ocupante.
    ///
    /// Qualquer falha desfaz tudo: o frame volta ao pool via
    /// `abort_claim` e a página permanece não residente.
    pub(crate) fn claim(&self, page_ref: &PageRef) -> VmResult<()> {
        if page_ref.lock().is_resident() {
            return Err(VmError::DoubleClaim);
        }

        let id = self.frames.get_frame(&self.swap);
        let mem = self.frames.mem(id);

        let mut page = page_ref.lock();
        let va = page.va();
        let mut flags = MapFlags::PRESENT | MapFlags::USER;
        if page.writable() {
            flags |= MapFlags::WRITABLE;
        }
        if !page.aspace().map(va, self.frames.phys(id), flags) {
            drop(page);
            self.frames.abort_claim(id);
            crate::kerror!("(VM) mapeamento de {:?} recusado", va);
            return Err(VmError::MappingFailed);
        }
        page.set_frame(Some(id));

        {
            let mut buf = mem.lock();
            if let Err(e) = page.populate(&mut buf, &self.swap) {
                page.aspace().unmap(va);
                page.set_frame(None);
                drop(buf);
                drop(page);
                self.frames.abort_claim(id);
                crate::kerror!("(VM) população de {:?} falhou: {}", va, e);
                return Err(e);
            }
        }

        let occupant = Occupant {
            page: page_ref.clone(),
            va,
            aspace: page.aspace().clone(),
        };
        drop(page);
        self.frames.install(id, occupant);
        crate::ktrace!("(VM) {:?} residente no frame {}", va, id.index());
        Ok(())
    }

    /// Resolve um page fault do processo `proc`.
    pub fn handle_fault(&self, proc: &mut ProcessVm, info: FaultInfo) -> FaultResult {
        fault::handle_fault(self, proc, info)
    }

    /// Mapeia `length` bytes de `file` a partir de `offset` em `addr`.
    ///
    /// Validação completa antes de qualquer efeito; em colisão no meio do
    /// intervalo, os chunks já inseridos são removidos (tudo ou nada).
    pub fn map_file(
        &self,
        proc: &mut ProcessVm,
        addr: VirtAddr,
        length: usize,
        writable: bool,
        file: &FileRef,
        offset: u64,
    ) -> VmResult<VirtAddr> {
        file_backed::map_file(self, proc, addr, length, writable, file, offset)
    }

    /// Desfaz o mapeamento iniciado em `addr`. Endereço que não é cabeça
    /// de mapeamento é ignorado.
    pub fn unmap_file(&self, proc: &mut ProcessVm, addr: VirtAddr) {
        file_backed::unmap_file(self, proc, addr)
    }

    /// Duplica o espaço de endereçamento de `parent` em `child` (fork).
    ///
    /// Pendentes são recriadas pendentes, file-backed repopulam do arquivo,
    /// anônimas são copiadas byte a byte (a do pai volta do swap se
    /// preciso). Em erro o chamador descarta o filho com [`teardown`].
    ///
    /// [`teardown`]: Vm::teardown
    pub fn copy_process(&self, child: &mut ProcessVm, parent: &ProcessVm) -> VmResult<()> {
        let child_aspace = child.aspace().clone();
        for (&va, page_ref) in parent.spt().iter() {
            let (writable, plan) = {
                let page = page_ref.lock();
                let plan = match page.backing() {
                    PageBacking::Uninit { target, init, seg } => CopyPlan::Pending {
                        target: *target,
                        init: *init,
                        seg: seg.clone(),
                    },
                    PageBacking::File(fp) => CopyPlan::Lazy(fp.seg().clone()),
                    PageBacking::Anon(_) => CopyPlan::AnonBytes,
                };
                (page.writable(), plan)
            };

            match plan {
                CopyPlan::Pending { target, init, seg } => {
                    child.spt_mut().insert(Page::new_uninit(
                        va,
                        writable,
                        target,
                        init,
                        seg,
                        child_aspace.clone(),
                    ))?;
                }
                CopyPlan::Lazy(seg) => {
                    child.spt_mut().insert(Page::new_uninit(
                        va,
                        writable,
                        BackingKind::File,
                        None,
                        Some(seg),
                        child_aspace.clone(),
                    ))?;
                }
                CopyPlan::AnonBytes => {
                    if !page_ref.lock().is_resident() {
                        self.claim(page_ref)?;
                    }
                    let snapshot = self.snapshot_frame(page_ref)?;
                    let child_ref = child.spt_mut().insert(Page::new_uninit(
                        va,
                        writable,
                        BackingKind::Anon,
                        None,
                        None,
                        child_aspace.clone(),
                    ))?;
                    self.claim(&child_ref)?;
                    self.restore_frame(&child_ref, &snapshot)?;
                }
            }
        }
        crate::kdebug!("(VM) fork copiou {} páginas", child.spt().len());
        Ok(())
    }

    /// Bytes do frame de uma página residente, copiados para o heap.
    ///
    /// O buffer intermediário desacopla pai e filho: o claim do filho pode
    /// evictar o próprio pai num pool apertado e a cópia ainda acontece.
    /// Se uma evicção venceu a janela entre o claim e este lock, a
    /// residência se perdeu e o fork falha em vez de tentar de novo.
    fn snapshot_frame(&self, page_ref: &PageRef) -> VmResult<Box<PageBuf>> {
        let page = page_ref.lock();
        let Some(id) = page.frame() else {
            crate::kerror!("(VM) residência perdida na cópia de {:?}", page.va());
            return Err(VmError::MappingFailed);
        };
        let mem = self.frames.mem(id);
        let buf = mem.lock();
        let mut copy = Box::new([0u8; PAGE_SIZE]);
        copy.copy_from_slice(&buf[..]);
        Ok(copy)
    }

    /// Escreve `bytes` no frame de uma página recém-reivindicada.
    fn restore_frame(&self, page_ref: &PageRef, bytes: &PageBuf) -> VmResult<()> {
        let page = page_ref.lock();
        let Some(id) = page.frame() else {
            crate::kerror!("(VM) residência perdida na cópia de {:?}", page.va());
            return Err(VmError::MappingFailed);
        };
        let mem = self.frames.mem(id);
        mem.lock().copy_from_slice(bytes);
        Ok(())
    }

    /// Libera todo o estado de memória de um processo que terminou.
    pub fn teardown(&self, proc: &mut ProcessVm) {
        let pages = proc.spt().len();
        proc.spt_mut().destroy(&self.frames, &self.swap);
        let s = self.stats();
        crate::kinfo!(
            "(VM) processo finalizado: {} páginas; pool {}/{}, swap {}/{}",
            pages,
            s.frames.used,
            s.frames.capacity,
            s.swap.used_slots,
            s.swap.total_slots
        );
    }

    pub fn stats(&self) -> VmStats {
        VmStats {
            frames: self.frames.stats(),
            swap: self.swap.stats(),
        }
    }
}
