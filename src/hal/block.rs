//! Contrato com o driver de bloco da área de swap.
//!
//! Mesma interface dos drivers de bloco do kernel (VirtIO, AHCI, NVMe);
//! aqui só entram as operações que o swap usa.

use core::fmt;

/// Tipos de erro para dispositivos de bloco
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// Endereço de bloco inválido (fora do intervalo)
    InvalidBlock,
    /// Erro de I/O durante leitura/escrita
    IoError,
    /// Dispositivo somente leitura
    ReadOnly,
    /// Tamanho do buffer incorreto
    InvalidBuffer,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::InvalidBlock => write!(f, "Endereço de bloco inválido"),
            BlockError::IoError => write!(f, "Erro de I/O"),
            BlockError::ReadOnly => write!(f, "Dispositivo somente leitura"),
            BlockError::InvalidBuffer => write!(f, "Tamanho do buffer inválido"),
        }
    }
}

/// Trait para dispositivos de bloco
pub trait BlockDevice: Send + Sync {
    /// Lê um único bloco do dispositivo
    ///
    /// # Argumentos
    /// * `lba` - Endereço Lógico de Bloco (Logical Block Address)
    /// * `buf` - Buffer para armazenar os dados (mínimo block_size bytes)
    fn read_block(&self, lba: u64, buf: &mut [u8]) -> Result<(), BlockError>;

    /// Escreve um único bloco no dispositivo
    ///
    /// # Argumentos
    /// * `lba` - Endereço Lógico de Bloco
    /// * `buf` - Buffer com os dados a escrever (mínimo block_size bytes)
    fn write_block(&self, lba: u64, buf: &[u8]) -> Result<(), BlockError>;

    /// Retorna o tamanho do bloco em bytes (normalmente 512)
    fn block_size(&self) -> usize;

    /// Retorna o número total de blocos no dispositivo
    fn total_blocks(&self) -> u64;
}
