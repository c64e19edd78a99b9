//! # Swap Subsystem
//!
//! Backing store de páginas anônimas evictadas: um dispositivo de bloco
//! dividido em slots de uma página ([`SECTORS_PER_PAGE`] setores cada),
//! controlados por um bitmap.
//!
//! Um único lock serializa bitmap E transferência de setores, mantendo a
//! alocação do slot atômica com o I/O correspondente. É um lock separado do
//! pool de frames: quem evicta solta o lock do pool antes de chegar aqui.
//!
//! Esgotar o swap ou fazer swap-in de um slot livre são condições fatais,
//! não erros recuperáveis.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::config::{SECTORS_PER_PAGE, SECTOR_SIZE};
use crate::error::{VmError, VmResult};
use crate::hal::BlockDevice;
use crate::page::PageBuf;

/// Slot de swap (índice no backing store)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSlot(pub usize);

/// Estatísticas do swap
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapStats {
    pub total_slots: usize,
    pub used_slots: usize,
    pub swapped_out: u64,
    pub swapped_in: u64,
}

/// Bitmap de slots (1 = ocupado)
struct SlotBitmap {
    data: Vec<u64>,
    len: usize,
}

impl SlotBitmap {
    fn new(bits: usize) -> Self {
        Self {
            data: vec![0; bits.div_ceil(64)],
            len: bits,
        }
    }

    fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.data[index / 64] |= 1 << (index % 64);
    }

    fn clear(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.data[index / 64] &= !(1 << (index % 64));
    }

    fn test(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        (self.data[index / 64] & (1 << (index % 64))) != 0
    }

    /// Encontra primeiro bit livre (0)
    fn find_first_zero(&self) -> Option<usize> {
        for (i, &word) in self.data.iter().enumerate() {
            if word != u64::MAX {
                let index = i * 64 + word.trailing_ones() as usize;
                if index < self.len {
                    return Some(index);
                }
            }
        }
        None
    }

    fn used(&self) -> usize {
        self.data.iter().map(|w| w.count_ones() as usize).sum()
    }
}

struct SwapInner {
    map: SlotBitmap,
    swapped_out: u64,
    swapped_in: u64,
}

/// Área de swap sobre um dispositivo de bloco
pub struct SwapTable {
    dev: Arc<dyn BlockDevice>,
    slots: usize,
    inner: Mutex<SwapInner>,
}

impl SwapTable {
    /// Constrói a área de swap sobre `dev`. O dispositivo precisa expor
    /// blocos de [`SECTOR_SIZE`] bytes.
    pub fn new(dev: Arc<dyn BlockDevice>) -> VmResult<Self> {
        if dev.block_size() != SECTOR_SIZE {
            crate::kerror!(
                "(SWAP) Dispositivo com bloco de {} bytes, esperado {}",
                dev.block_size(),
                SECTOR_SIZE
            );
            return Err(VmError::InvalidParameter);
        }
        let slots = dev.total_blocks() as usize / SECTORS_PER_PAGE;
        if slots == 0 {
            crate::kwarn!("(SWAP) Dispositivo sem espaço para um slot sequer");
        }
        crate::kinfo!(
            "(SWAP) {} slots ({} KiB de swap)",
            slots,
            slots * SECTORS_PER_PAGE * SECTOR_SIZE / 1024
        );
        Ok(Self {
            dev,
            slots,
            inner: Mutex::new(SwapInner {
                map: SlotBitmap::new(slots),
                swapped_out: 0,
                swapped_in: 0,
            }),
        })
    }

    /// Reivindica um slot livre e escreve nele o conteúdo de `buf`.
    ///
    /// # Panics
    /// Swap esgotado ou erro de I/O no dispositivo: condições fatais.
    pub fn swap_out(&self, buf: &PageBuf) -> SwapSlot {
        let mut inner = self.inner.lock();
        let Some(index) = inner.map.find_first_zero() else {
            panic!("(SWAP) Sem slot livre: swap esgotado");
        };
        inner.map.set(index);
        for i in 0..SECTORS_PER_PAGE {
            let lba = (index * SECTORS_PER_PAGE + i) as u64;
            let off = i * SECTOR_SIZE;
            if let Err(e) = self.dev.write_block(lba, &buf[off..off + SECTOR_SIZE]) {
                panic!("(SWAP) Falha de escrita no slot {}: {}", index, e);
            }
        }
        inner.swapped_out += 1;
        crate::ktrace!("(SWAP) out -> slot {}", index);
        SwapSlot(index)
    }

    /// Lê o conteúdo de `slot` para `buf` e libera o slot.
    ///
    /// # Panics
    /// Slot não estava ocupado: bookkeeping corrompido, condição fatal.
    pub fn swap_in(&self, slot: SwapSlot, buf: &mut PageBuf) {
        let mut inner = self.inner.lock();
        if !inner.map.test(slot.0) {
            panic!("(SWAP) swap-in de slot livre: {}", slot.0);
        }
        for i in 0..SECTORS_PER_PAGE {
            let lba = (slot.0 * SECTORS_PER_PAGE + i) as u64;
            let off = i * SECTOR_SIZE;
            if let Err(e) = self.dev.read_block(lba, &mut buf[off..off + SECTOR_SIZE]) {
                panic!("(SWAP) Falha de leitura no slot {}: {}", slot.0, e);
            }
        }
        inner.map.clear(slot.0);
        inner.swapped_in += 1;
        crate::ktrace!("(SWAP) in <- slot {}", slot.0);
    }

    /// Devolve um slot sem ler (destruição de página evictada).
    pub fn free_slot(&self, slot: SwapSlot) {
        let mut inner = self.inner.lock();
        if !inner.map.test(slot.0) {
            crate::kwarn!("(SWAP) Liberação de slot já livre: {}", slot.0);
            return;
        }
        inner.map.clear(slot.0);
        crate::ktrace!("(SWAP) slot {} liberado", slot.0);
    }

    pub fn stats(&self) -> SwapStats {
        let inner = self.inner.lock();
        SwapStats {
            total_slots: self.slots,
            used_slots: inner.map.used(),
            swapped_out: inner.swapped_out,
            swapped_in: inner.swapped_in,
        }
    }
}
