//! Serviço de tradução de endereços de um processo.

use alloc::sync::Arc;

use bitflags::bitflags;

use crate::addr::{PhysAddr, VirtAddr};

bitflags! {
    /// Flags de mapeamento de página (Paging Flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u64 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        const NO_EXECUTE = 1 << 63;
    }
}

/// Tabela de tradução de um processo (PML4 por trás, aqui um serviço opaco).
///
/// A evicção consulta e limpa bits de accessed/dirty de páginas de OUTROS
/// processos, então toda operação é `&self` e as implementações precisam de
/// sincronização interna própria. Nenhum método pode chamar de volta o pool
/// de frames.
pub trait AddressSpace: Send + Sync {
    /// Instala a tradução `va -> pa`. `false` se a tabela recusar
    /// (sem memória para tabelas intermediárias, entrada conflitante).
    fn map(&self, va: VirtAddr, pa: PhysAddr, flags: MapFlags) -> bool;

    /// Remove a tradução de `va`. Ignorado se não houver.
    fn unmap(&self, va: VirtAddr);

    /// Tradução atual de `va`, se presente.
    fn translate(&self, va: VirtAddr) -> Option<PhysAddr>;

    /// Bit de accessed da página em `va` (setado pelo hardware a cada acesso).
    fn is_accessed(&self, va: VirtAddr) -> bool;

    /// Limpa o bit de accessed (segunda chance do clock).
    fn clear_accessed(&self, va: VirtAddr);

    /// Bit de dirty da página em `va` (setado pelo hardware em escrita).
    fn is_dirty(&self, va: VirtAddr) -> bool;

    /// Limpa o bit de dirty (após writeback).
    fn clear_dirty(&self, va: VirtAddr);
}

/// Handle compartilhado de um espaço de endereçamento
pub type AspaceRef = Arc<dyn AddressSpace>;
