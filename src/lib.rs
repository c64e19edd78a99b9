//! Forge VM.
//!
//! Subsistema de memória virtual do kernel: espaços de endereçamento
//! paginados por demanda, pool global de frames com evicção clock/segunda
//! chance, swap de páginas anônimas, mapeamento de arquivos e crescimento
//! automático de stack.
//!
//! O ponto de entrada é [`Vm`] (um por kernel), operando sobre o estado
//! por processo em [`ProcessVm`]. A tabela de páginas, o disco de swap e
//! o filesystem entram como serviços opacos pelos contratos de [`hal`].

#![cfg_attr(not(test), no_std)]

// Alocação dinâmica (Vec/Box/Arc)
extern crate alloc;

// --- Fundamentos ---
pub mod addr; // Endereços tipados (VirtAddr, PhysAddr)
pub mod config; // Geometria de página e layout do espaço de usuário
pub mod error; // Taxonomia de erros do subsistema
pub mod klog; // Logging com filtragem em compile-time

// --- Contratos com o resto do kernel ---
pub mod hal; // AddressSpace, BlockDevice, FileHandle

// --- Núcleo ---
pub mod anon; // Backing anônimo (swap)
pub mod fault; // Resolvedor de page faults
pub mod file_backed; // Backing de arquivo e serviço de mmap
pub mod frame; // Pool de frames físicos e evicção
pub mod page; // Página virtual e ciclo de vida
pub mod process; // Estado de VM por processo
pub mod spt; // Supplemental Page Table
pub mod swap; // Área de swap em dispositivo de bloco
pub mod vm; // Orquestrador do subsistema

#[cfg(feature = "self_test")]
pub mod selftest; // Testes de integridade no boot

#[cfg(test)]
mod testbed;

pub use addr::{PhysAddr, VirtAddr};
pub use error::{VmError, VmResult};
pub use fault::{FaultInfo, FaultResult};
pub use file_backed::{load_segment_init, FileSegment, MapSpan};
pub use frame::FrameStats;
pub use hal::{
    AddressSpace, AspaceRef, BlockDevice, BlockError, FileError, FileHandle, FileRef, MapFlags,
};
pub use page::{BackingKind, PageBuf, PageInit};
pub use process::ProcessVm;
pub use swap::SwapStats;
pub use vm::{Vm, VmStats};
