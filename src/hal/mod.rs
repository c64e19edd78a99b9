//! # Camada de Abstração dos Colaboradores Externos
//!
//! O subsistema de VM não possui tabela de páginas, driver de disco nem
//! filesystem próprios: consome os três como serviços opacos.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          forge-vm (SPT, frames, swap, mmap)         │
//! └─────────────────────────────────────────────────────┘
//!           ↓                  ↓                ↓
//! ┌────────────────┐ ┌─────────────────┐ ┌──────────────┐
//! │  AddressSpace  │ │   BlockDevice   │ │  FileHandle  │
//! │ (PML4 do proc) │ │ (área de swap)  │ │ (mmap/exec)  │
//! └────────────────┘ └─────────────────┘ └──────────────┘
//! ```
//!
//! No kernel, as implementações reais são o gerenciador de tabelas de
//! páginas, o driver de bloco da partição de swap e o VFS. Nos testes,
//! `testbed` fornece fakes fiéis.

mod aspace;
mod block;
mod file;

pub use aspace::{AddressSpace, AspaceRef, MapFlags};
pub use block::{BlockDevice, BlockError};
pub use file::{FileError, FileHandle, FileRef};
