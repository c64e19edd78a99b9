//! # Estado de VM de um Processo
//!
//! Agrupa o que o subsistema guarda por processo: a SPT, o handle do espaço
//! de endereçamento e a contabilidade de stack. Criado no spawn, replicado
//! no fork via [`Vm::copy_process`], drenado no exit/exec via
//! [`Vm::teardown`].
//!
//! O ponteiro de stack salvo existe porque um fault em modo kernel (syscall
//! tocando buffer de usuário) não carrega o rsp de usuário no quadro de
//! interrupção: a entrada de syscall grava o valor aqui antes de qualquer
//! acesso, e o resolvedor de faults o consome no lugar do rsp do quadro.
//!
//! [`Vm::copy_process`]: crate::vm::Vm::copy_process
//! [`Vm::teardown`]: crate::vm::Vm::teardown

use crate::addr::VirtAddr;
use crate::config::USER_STACK_TOP;
use crate::hal::AspaceRef;
use crate::spt::SupplementalPageTable;

/// Estado de memória virtual de um processo
pub struct ProcessVm {
    spt: SupplementalPageTable,
    aspace: AspaceRef,
    stack_floor: VirtAddr,
    saved_rsp: u64,
}

impl ProcessVm {
    /// Cria o estado de VM de um processo novo, com SPT vazia e stack ainda
    /// sem crescimento registrado.
    pub fn new(aspace: AspaceRef) -> Self {
        Self {
            spt: SupplementalPageTable::new(),
            aspace,
            stack_floor: VirtAddr::new(USER_STACK_TOP),
            saved_rsp: 0,
        }
    }

    #[inline]
    pub fn aspace(&self) -> &AspaceRef {
        &self.aspace
    }

    #[inline]
    pub fn spt(&self) -> &SupplementalPageTable {
        &self.spt
    }

    #[inline]
    pub(crate) fn spt_mut(&mut self) -> &mut SupplementalPageTable {
        &mut self.spt
    }

    /// Grava o rsp de usuário na entrada de syscall/interrupção. Faults em
    /// modo kernel sobre buffers de usuário leem daqui.
    pub fn record_stack_pointer(&mut self, rsp: u64) {
        self.saved_rsp = rsp;
    }

    #[inline]
    pub(crate) fn saved_stack_pointer(&self) -> u64 {
        self.saved_rsp
    }

    /// Menor endereço de stack já concedido por crescimento automático.
    /// Começa em [`USER_STACK_TOP`] (nada crescido ainda).
    pub fn stack_floor(&self) -> VirtAddr {
        self.stack_floor
    }

    /// Registra uma página de stack recém-concedida. O piso só desce;
    /// crescimentos fora de ordem não o fazem subir.
    pub(crate) fn note_stack_growth(&mut self, base: VirtAddr) {
        if base < self.stack_floor {
            self.stack_floor = base;
        }
    }
}
