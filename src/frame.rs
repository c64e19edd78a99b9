//! # Page Frame Manager (PFM)
//!
//! Pool global de frames físicos, compartilhado por todos os processos.
//! Arena de capacidade fixa: cada frame é um slot com handle inteiro
//! ([`FrameId`]), bytes próprios atrás de lock próprio e um registro de
//! ocupante apontando para a página instalada. Página e frame se referenciam
//! por handle, nunca por ponteiro: destacar é lookup-and-clear.
//!
//! A evicção é clock/segunda chance sobre os slots ocupados, em ordem de
//! índice, com um cursor persistente. Regras de lock:
//!
//! - o lock do pool cobre slots, ocupantes e cursor, e NUNCA é mantido
//!   enquanto se espera lock de página, I/O de dispositivo ou lock de swap;
//! - a vítima é destacada sob o lock do pool, persistida depois dele;
//! - um frame em claim (alocado, sem ocupante publicado) é invisível ao
//!   clock.

use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use crate::addr::{PhysAddr, VirtAddr};
use crate::config::PAGE_SIZE;
use crate::hal::AspaceRef;
use crate::page::{PageBuf, PageRef};
use crate::swap::SwapTable;

/// Handle de frame: índice no arena do pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId(usize);

impl FrameId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Bytes de um frame, compartilháveis sem o lock do pool
pub(crate) type FrameMem = Arc<Mutex<PageBuf>>;

/// Página atualmente instalada em um frame
pub(crate) struct Occupant {
    pub(crate) page: PageRef,
    pub(crate) va: VirtAddr,
    pub(crate) aspace: AspaceRef,
}

struct FrameSlot {
    mem: FrameMem,
    occupant: Option<Occupant>,
    allocated: bool,
}

/// Estatísticas do pool de frames
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub capacity: usize,
    pub used: usize,
    pub evictions: u64,
}

struct PoolInner {
    slots: Vec<FrameSlot>,
    hand: usize,
    used: usize,
    evictions: u64,
}

/// Pool de frames físicos
pub struct FrameTable {
    base: PhysAddr,
    capacity: usize,
    inner: Mutex<PoolInner>,
}

impl FrameTable {
    /// Cria o pool com `capacity` frames a partir do endereço físico `base`.
    pub fn new(capacity: usize, base: PhysAddr) -> Self {
        let slots = (0..capacity)
            .map(|_| FrameSlot {
                mem: Arc::new(Mutex::new([0u8; PAGE_SIZE])),
                occupant: None,
                allocated: false,
            })
            .collect();
        crate::kinfo!(
            "(PFM) pool com {} frames ({} KiB) a partir de {:?}",
            capacity,
            capacity * PAGE_SIZE / 1024,
            base
        );
        Self {
            base,
            capacity,
            inner: Mutex::new(PoolInner {
                slots,
                hand: 0,
                used: 0,
                evictions: 0,
            }),
        }
    }

    /// Entrega um frame zerado, evictando uma vítima se o pool estiver cheio.
    ///
    /// O frame volta alocado e SEM ocupante: ele só entra no alcance do
    /// clock quando o claim publicar o ocupante via [`install`].
    ///
    /// # Panics
    /// Pool cheio sem nenhum ocupante evictável (exaustão irrecuperável).
    ///
    /// [`install`]: FrameTable::install
    pub(crate) fn get_frame(&self, swap: &SwapTable) -> FrameId {
        let (id, victim) = {
            let mut inner = self.inner.lock();
            if let Some(idx) = inner.slots.iter().position(|s| !s.allocated) {
                inner.slots[idx].allocated = true;
                inner.used += 1;
                drop(inner);
                let id = FrameId(idx);
                self.mem(id).lock().fill(0);
                crate::ktrace!("(PFM) frame {} alocado", idx);
                return id;
            }
            match Self::pick_victim(&mut inner) {
                Some((id, occ)) => {
                    inner.evictions += 1;
                    (id, occ)
                }
                None => panic!("(PFM) pool esgotado sem vítima evictável"),
            }
        };

        // Persistência fora do lock do pool: só a página e o swap esperam.
        let mem = self.mem(id);
        {
            let mut page = victim.page.lock();
            if page.frame() == Some(id) {
                let buf = mem.lock();
                page.evict(&buf, swap);
            } else {
                // Dona destruiu a página entre a seleção e aqui; o frame
                // já está destacado e pode ser reusado direto.
                crate::ktrace!("(PFM) vítima em {:?} já destacada", victim.va);
            }
        }
        mem.lock().fill(0);
        crate::kdebug!("(PFM) frame {} evictado de {:?}", id.index(), victim.va);
        id
    }

    /// Clock/segunda chance. Bit de accessed setado: limpa e avança. O
    /// primeiro slot ocupado com bit limpo é a vítima, destacada na hora.
    /// Duas voltas bastam: a primeira limpa todos os bits, a segunda decide.
    fn pick_victim(inner: &mut PoolInner) -> Option<(FrameId, Occupant)> {
        let n = inner.slots.len();
        if n == 0 {
            return None;
        }
        let start = inner.hand;
        for step in 0..(2 * n) {
            let idx = (start + step) % n;
            match &inner.slots[idx].occupant {
                Some(occ) => {
                    if occ.aspace.is_accessed(occ.va) {
                        occ.aspace.clear_accessed(occ.va);
                        continue;
                    }
                }
                None => continue,
            }
            if let Some(occ) = inner.slots[idx].occupant.take() {
                inner.hand = (idx + 1) % n;
                return Some((FrameId(idx), occ));
            }
        }
        None
    }

    /// Publica o ocupante de um frame recém-populado.
    pub(crate) fn install(&self, id: FrameId, occupant: Occupant) {
        let mut inner = self.inner.lock();
        let slot = &mut inner.slots[id.0];
        debug_assert!(slot.allocated && slot.occupant.is_none());
        slot.occupant = Some(occupant);
    }

    /// Libera um frame ocupado (destruição de página residente).
    ///
    /// Se uma evicção em andamento já destacou o ocupante, o slot fica com
    /// o evictor: liberar aqui causaria alocação dupla.
    pub(crate) fn release(&self, id: FrameId) {
        let mut inner = self.inner.lock();
        let slot = &mut inner.slots[id.0];
        if slot.occupant.take().is_some() {
            slot.allocated = false;
            inner.used -= 1;
            crate::ktrace!("(PFM) frame {} liberado", id.index());
        } else {
            crate::ktrace!("(PFM) frame {} em evicção, mantido", id.index());
        }
    }

    /// Devolve um frame que nunca recebeu ocupante (rollback de claim).
    pub(crate) fn abort_claim(&self, id: FrameId) {
        let mut inner = self.inner.lock();
        let slot = &mut inner.slots[id.0];
        debug_assert!(slot.occupant.is_none());
        slot.allocated = false;
        inner.used -= 1;
    }

    /// Bytes do frame, utilizáveis sem o lock do pool.
    pub(crate) fn mem(&self, id: FrameId) -> FrameMem {
        self.inner.lock().slots[id.0].mem.clone()
    }

    /// Endereço físico do frame.
    pub(crate) fn phys(&self, id: FrameId) -> PhysAddr {
        self.base.add((id.0 * PAGE_SIZE) as u64)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> FrameStats {
        let inner = self.inner.lock();
        FrameStats {
            capacity: self.capacity,
            used: inner.used,
            evictions: inner.evictions,
        }
    }
}
