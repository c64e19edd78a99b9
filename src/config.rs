//! # Configuração do Subsistema de Memória Virtual
//!
//! Define a geometria de páginas/setores, o layout do espaço de usuário e os
//! limites de crescimento de stack usados por todo o subsistema.

use static_assertions::const_assert;

// =============================================================================
// GEOMETRIA DE PÁGINA E SETOR
// =============================================================================

/// Tamanho de uma página (4 KiB)
pub const PAGE_SIZE: usize = 4096;

/// Máscara para alinhar endereços a página
pub const PAGE_MASK: usize = !(PAGE_SIZE - 1);

/// Bits de offset dentro de uma página
pub const PAGE_OFFSET_BITS: usize = 12;

/// Tamanho de um setor do dispositivo de swap
pub const SECTOR_SIZE: usize = 512;

/// Setores consumidos por um slot de swap (uma página inteira)
pub const SECTORS_PER_PAGE: usize = PAGE_SIZE / SECTOR_SIZE;

/// Tamanho de uma palavra de máquina (x86_64)
pub const WORD_SIZE: u64 = 8;

const_assert!(PAGE_SIZE % SECTOR_SIZE == 0);
const_assert!(PAGE_SIZE.is_power_of_two());
const_assert!(SECTOR_SIZE.is_power_of_two());

// =============================================================================
// LAYOUT DO ESPAÇO DE USUÁRIO
// =============================================================================

/// Primeiro endereço fora do espaço de usuário (canonical lower half)
pub const USER_VIRTUAL_END: u64 = 0x0000_8000_0000_0000;

/// Topo fixo da stack de usuário
pub const USER_STACK_TOP: u64 = 0x4748_0000;

/// Crescimento máximo da stack abaixo do topo (1 MiB)
pub const MAX_STACK_SIZE: u64 = 1 << 20;

const_assert!(USER_STACK_TOP < USER_VIRTUAL_END);
const_assert!(MAX_STACK_SIZE < USER_STACK_TOP);

// =============================================================================
// FUNÇÕES UTILITÁRIAS
// =============================================================================

/// Alinha valor para cima ao múltiplo de align
#[inline(always)]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Alinha valor para baixo ao múltiplo de align
#[inline(always)]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Verifica se valor está alinhado
#[inline(always)]
pub const fn is_aligned(val: usize, align: usize) -> bool {
    val & (align - 1) == 0
}

/// Páginas necessárias para cobrir `len` bytes
#[inline(always)]
pub const fn page_count(len: usize) -> usize {
    align_up(len, PAGE_SIZE) / PAGE_SIZE
}
