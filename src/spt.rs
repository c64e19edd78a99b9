//! # Supplemental Page Table (SPT)
//!
//! Registro por processo do que DEVE existir em cada endereço virtual,
//! residente ou não. Chaves sempre alinhadas a página; buscas arredondam
//! para baixo antes do lookup exato.
//!
//! A SPT não tem lock próprio: cada espaço de endereçamento tem no máximo
//! uma thread faltando por vez, e as mutações chegam todas por `&mut` do
//! dono. O pool de frames alcança as páginas pelos `PageRef` compartilhados,
//! nunca pela tabela.

use alloc::collections::btree_map::Entry;
use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use spin::Mutex;

use crate::addr::VirtAddr;
use crate::error::{VmError, VmResult};
use crate::frame::FrameTable;
use crate::page::{Page, PageRef};
use crate::swap::SwapTable;

/// Tabela suplementar de páginas de um processo
pub struct SupplementalPageTable {
    pages: BTreeMap<VirtAddr, PageRef>,
}

impl SupplementalPageTable {
    pub fn new() -> Self {
        Self {
            pages: BTreeMap::new(),
        }
    }

    /// Busca a página que contém `va`. Sem efeitos colaterais.
    pub fn find(&self, va: VirtAddr) -> Option<PageRef> {
        self.pages.get(&va.page_round_down()).cloned()
    }

    /// Registra uma página nova. Chave duplicada é recusada.
    pub(crate) fn insert(&mut self, page: Page) -> VmResult<PageRef> {
        let va = page.va();
        debug_assert!(va.is_page_aligned());
        match self.pages.entry(va) {
            Entry::Occupied(_) => Err(VmError::AlreadyMapped),
            Entry::Vacant(slot) => {
                let page = Arc::new(Mutex::new(page));
                slot.insert(page.clone());
                Ok(page)
            }
        }
    }

    /// Remove e destrói a página em `va`. `false` se não houver.
    pub(crate) fn remove(&mut self, va: VirtAddr, frames: &FrameTable, swap: &SwapTable) -> bool {
        match self.pages.remove(&va.page_round_down()) {
            Some(page) => {
                page.lock().destroy(frames, swap);
                true
            }
            None => false,
        }
    }

    /// Drena a tabela inteira, destruindo cada página (exit/exec).
    pub(crate) fn destroy(&mut self, frames: &FrameTable, swap: &SwapTable) {
        while let Some((_, page)) = self.pages.pop_first() {
            page.lock().destroy(frames, swap);
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&VirtAddr, &PageRef)> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Default for SupplementalPageTable {
    fn default() -> Self {
        Self::new()
    }
}
