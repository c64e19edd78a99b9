//! # Página Virtual
//!
//! Uma [`Page`] registra o que DEVE existir em um endereço virtual de um
//! processo, mesmo quando nenhum frame a sustenta no momento. O backing é um
//! conjunto fechado ([`PageBacking`]): o compilador não deixa esquecer um
//! tipo novo em nenhum despacho de população, evicção ou destruição.
//!
//! Ciclo de vida:
//!
//! ```text
//! alloc ──► Uninit ──primeira população──► Anon ◄──swap in/out──► slot
//!                  └────────────────────► File ◄──writeback────► arquivo
//! ```
//!
//! A página guarda o `AddressSpace` do processo dono. A evicção roda no
//! contexto de QUALQUER processo, e é esse handle que garante que o unmap e
//! os bits de accessed/dirty atinjam a tabela certa.

use alloc::sync::Arc;
use spin::Mutex;

use crate::addr::VirtAddr;
use crate::anon::AnonPage;
use crate::config::PAGE_SIZE;
use crate::error::{VmError, VmResult};
use crate::file_backed::{FilePage, FileSegment, MapSpan};
use crate::frame::{FrameId, FrameTable};
use crate::hal::AspaceRef;
use crate::swap::SwapTable;

/// Conteúdo de um frame: uma página inteira de bytes
pub type PageBuf = [u8; PAGE_SIZE];

/// Handle compartilhado de página. A SPT do processo e o registro de
/// ocupante do pool apontam para a mesma célula.
pub type PageRef = Arc<Mutex<Page>>;

/// Tipo final de backing de uma página
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingKind {
    /// Conteúdo volátil, persistido em slot de swap quando evictado
    Anon,
    /// Janela de um arquivo, escrita de volta quando suja
    File,
}

/// Inicializador pendente de uma página `Uninit`: roda uma única vez, na
/// primeira população, já com o frame zerado em `buf`. Retornar `false`
/// falha o claim.
pub type PageInit = fn(seg: Option<&FileSegment>, buf: &mut PageBuf) -> bool;

/// Backing de uma página (conjunto fechado)
pub enum PageBacking {
    /// Criada e nunca populada; `target` define o tipo após a transição
    Uninit {
        target: BackingKind,
        init: Option<PageInit>,
        seg: Option<FileSegment>,
    },
    /// Anônima
    Anon(AnonPage),
    /// File-backed
    File(FilePage),
}

/// Metadados de uma página virtual de processo
pub struct Page {
    va: VirtAddr,
    writable: bool,
    backing: PageBacking,
    frame: Option<FrameId>,
    aspace: AspaceRef,
}

impl Page {
    /// Cria uma página pendente (sem frame). `va` deve vir alinhado.
    pub(crate) fn new_uninit(
        va: VirtAddr,
        writable: bool,
        target: BackingKind,
        init: Option<PageInit>,
        seg: Option<FileSegment>,
        aspace: AspaceRef,
    ) -> Self {
        Self {
            va,
            writable,
            backing: PageBacking::Uninit { target, init, seg },
            frame: None,
            aspace,
        }
    }

    #[inline]
    pub fn va(&self) -> VirtAddr {
        self.va
    }

    #[inline]
    pub fn writable(&self) -> bool {
        self.writable
    }

    #[inline]
    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    #[inline]
    pub(crate) fn frame(&self) -> Option<FrameId> {
        self.frame
    }

    #[inline]
    pub(crate) fn set_frame(&mut self, frame: Option<FrameId>) {
        self.frame = frame;
    }

    #[inline]
    pub(crate) fn aspace(&self) -> &AspaceRef {
        &self.aspace
    }

    #[inline]
    pub(crate) fn backing(&self) -> &PageBacking {
        &self.backing
    }

    /// Tipo efetivo da página (o alvo, se ainda pendente)
    pub fn kind(&self) -> BackingKind {
        match &self.backing {
            PageBacking::Uninit { target, .. } => *target,
            PageBacking::Anon(_) => BackingKind::Anon,
            PageBacking::File(_) => BackingKind::File,
        }
    }

    /// Posição desta página dentro de um mapeamento de `map_file`, se houver
    pub fn map_span(&self) -> Option<MapSpan> {
        match &self.backing {
            PageBacking::Uninit { seg, .. } => seg.as_ref().and_then(|s| s.span),
            PageBacking::File(fp) => fp.seg().span,
            PageBacking::Anon(_) => None,
        }
    }

    /// Primeira população ou swap-in, com o frame de destino em `buf`.
    ///
    /// Páginas `Uninit` transicionam aqui para o tipo alvo; o inicializador
    /// pendente (se houver) roda exatamente uma vez. `buf` chega zerado do
    /// pool, então páginas anônimas frescas não têm trabalho.
    pub(crate) fn populate(&mut self, buf: &mut PageBuf, swap: &SwapTable) -> VmResult<()> {
        match &mut self.backing {
            PageBacking::Uninit { target, init, seg } => {
                let target = *target;
                let init = init.take();
                let seg = seg.take();

                self.backing = match target {
                    BackingKind::Anon => PageBacking::Anon(AnonPage::new()),
                    BackingKind::File => {
                        let seg = seg.clone().ok_or(VmError::InvalidParameter)?;
                        PageBacking::File(FilePage::new(seg))
                    }
                };

                match init {
                    Some(f) => {
                        if f(seg.as_ref(), buf) {
                            Ok(())
                        } else {
                            Err(VmError::IoError)
                        }
                    }
                    None => match &mut self.backing {
                        PageBacking::File(fp) => fp.swap_in(buf),
                        _ => Ok(()),
                    },
                }
            }
            PageBacking::Anon(ap) => {
                ap.swap_in(buf, swap);
                Ok(())
            }
            PageBacking::File(fp) => fp.swap_in(buf),
        }
    }

    /// Persiste o conteúdo e solta frame e tradução (vítima de evicção).
    ///
    /// Chamada pelo pool com o lock da página em mãos e os bytes da vítima
    /// em `buf`. Não pode falhar: writeback com erro é registrado e o frame
    /// é liberado mesmo assim.
    pub(crate) fn evict(&mut self, buf: &PageBuf, swap: &SwapTable) {
        match &mut self.backing {
            PageBacking::Anon(ap) => ap.swap_out(buf, swap),
            PageBacking::File(fp) => fp.swap_out(buf, self.va, &self.aspace),
            PageBacking::Uninit { .. } => {
                panic!("(PAGE) evicção de página nunca populada: {:?}", self.va)
            }
        }
        self.aspace.unmap(self.va);
        self.frame = None;
    }

    /// Destruição completa: writeback final, liberação de slot e de frame.
    pub(crate) fn destroy(&mut self, frames: &FrameTable, swap: &SwapTable) {
        match &mut self.backing {
            PageBacking::Uninit { .. } => {}
            PageBacking::Anon(ap) => ap.destroy(swap),
            PageBacking::File(fp) => {
                if let Some(id) = self.frame {
                    let mem = frames.mem(id);
                    let buf = mem.lock();
                    fp.writeback_if_dirty(&buf, self.va, &self.aspace);
                }
            }
        }
        if let Some(id) = self.frame.take() {
            self.aspace.unmap(self.va);
            frames.release(id);
        }
    }
}
