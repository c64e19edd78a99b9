//! # Backing Anônimo
//!
//! Páginas sem arquivo por trás: stack, heap, segmentos zerados. O conteúdo
//! vive no frame enquanto residente e em um slot de swap quando evictado.
//! `slot` presente iff a página está no swap.

use crate::page::PageBuf;
use crate::swap::{SwapSlot, SwapTable};

/// Estado anônimo de uma página
pub struct AnonPage {
    slot: Option<SwapSlot>,
}

impl AnonPage {
    /// Página anônima recém-transicionada, sem slot.
    pub(crate) fn new() -> Self {
        Self { slot: None }
    }

    /// Traz o conteúdo de volta do swap para `buf`.
    ///
    /// Sem slot não há nada a ler: é a primeira população de uma página
    /// recém-transicionada e o frame já chegou zerado do pool. Com slot, a
    /// leitura também o libera (a cópia no disco deixa de existir).
    pub(crate) fn swap_in(&mut self, buf: &mut PageBuf, swap: &SwapTable) {
        if let Some(slot) = self.slot.take() {
            swap.swap_in(slot, buf);
        }
    }

    /// Persiste `buf` em um slot recém-reivindicado e o registra.
    pub(crate) fn swap_out(&mut self, buf: &PageBuf, swap: &SwapTable) {
        debug_assert!(self.slot.is_none());
        self.slot = Some(swap.swap_out(buf));
    }

    /// Solta o slot, se houver (página destruída enquanto evictada).
    pub(crate) fn destroy(&mut self, swap: &SwapTable) {
        if let Some(slot) = self.slot.take() {
            swap.free_slot(slot);
        }
    }
}
