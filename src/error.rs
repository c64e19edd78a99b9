//! Tipos de Erro do Subsistema de Memória Virtual
//!
//! Define erros estruturados para diagnóstico preciso de falhas em VM.
//! Exaustão de recursos (frames sem vítima, swap cheio) não aparece aqui:
//! é condição fatal e vira panic, nunca `Err`.

/// Erros do subsistema de memória virtual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// Endereço inválido (nulo, não canônico ou fora do espaço de usuário)
    InvalidAddress,
    /// Endereço ou offset não alinhado a página
    NotAligned,
    /// Tamanho inválido (zero ou estoura o espaço de usuário)
    InvalidSize,
    /// Parâmetro inválido
    InvalidParameter,
    /// Página já existe nesse endereço
    AlreadyMapped,
    /// Nenhuma página registrada nesse endereço
    NotMapped,
    /// Página já possui frame (claim duplicado)
    DoubleClaim,
    /// Serviço de tradução recusou o mapeamento
    MappingFailed,
    /// Falha de I/O no arquivo durante população ou writeback
    IoError,
}

impl VmError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAddress => "Endereço inválido",
            Self::NotAligned => "Endereço não alinhado a página",
            Self::InvalidSize => "Tamanho inválido",
            Self::InvalidParameter => "Parâmetro inválido",
            Self::AlreadyMapped => "Página já mapeada",
            Self::NotMapped => "Página não mapeada",
            Self::DoubleClaim => "Claim duplicado: página já possui frame",
            Self::MappingFailed => "Mapeamento falhou",
            Self::IoError => "Falha de I/O no arquivo",
        }
    }
}

impl core::fmt::Display for VmError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tipo Result específico para operações de memória virtual
pub type VmResult<T> = Result<T, VmError>;
