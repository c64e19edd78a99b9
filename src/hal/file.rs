//! Contrato com a camada de arquivos (VFS) para páginas file-backed.

use alloc::sync::Arc;
use core::fmt;

/// Erros da camada de arquivos vistos pelo subsistema de VM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileError {
    /// Erro de I/O durante leitura/escrita
    IoError,
    /// Operação não suportada pelo arquivo
    NotSupported,
    /// Escrita negada (arquivo somente leitura)
    PermissionDenied,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::IoError => write!(f, "Erro de I/O"),
            FileError::NotSupported => write!(f, "Operação não suportada"),
            FileError::PermissionDenied => write!(f, "Permissão negada"),
        }
    }
}

/// Handle de arquivo aberto, posicional (sem cursor).
///
/// Um mapeamento guarda seu próprio handle (obtido via [`reopen`]) para
/// sobreviver ao fechamento do descritor original pelo processo.
///
/// [`reopen`]: FileHandle::reopen
pub trait FileHandle: Send + Sync {
    /// Tamanho atual do arquivo em bytes.
    fn len(&self) -> u64;

    /// Lê até `buf.len()` bytes a partir de `offset`. Retorna quantos leu;
    /// menos que o pedido significa fim de arquivo.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, FileError>;

    /// Escreve `buf` a partir de `offset`. Retorna quantos bytes escreveu.
    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize, FileError>;

    /// Abre um handle independente para o mesmo arquivo (mesmo inode).
    fn reopen(&self) -> Result<FileRef, FileError>;

    /// `false` para descritores que não são arquivos regulares
    /// (console, pipes, streams padrão) e portanto não podem ser mapeados.
    fn is_regular(&self) -> bool {
        true
    }
}

/// Handle compartilhado de arquivo
pub type FileRef = Arc<dyn FileHandle>;
