//! # Resolvedor de Page Faults
//!
//! Porta de entrada do subsistema: decide, para cada fault, entre swap-in,
//! população preguiçosa, crescimento de stack ou morte do processo.
//!
//! Máquina de estados (na ordem):
//!
//! 1. endereço nulo ou fora do espaço de usuário → [`InvalidAddress`];
//! 2. página presente com acesso negado → [`ProtectionViolation`];
//! 3. página registrada na SPT → escrita em página read-only é
//!    [`ProtectionViolation`], senão claim ([`Success`] ou [`FatalError`]);
//! 4. página desconhecida → crescimento de stack se o endereço cai na
//!    janela, senão [`NotMapped`].
//!
//! A busca na SPT vem ANTES do teste de crescimento: uma página de stack
//! evictada falta perto do rsp e precisa voltar do swap, não colidir com uma
//! alocação nova.
//!
//! Todo desfecho diferente de `Success` é fatal para o processo; quem chama
//! decide matar, este módulo só classifica.
//!
//! [`InvalidAddress`]: FaultResult::InvalidAddress
//! [`ProtectionViolation`]: FaultResult::ProtectionViolation
//! [`Success`]: FaultResult::Success
//! [`FatalError`]: FaultResult::FatalError
//! [`NotMapped`]: FaultResult::NotMapped

use crate::addr::VirtAddr;
use crate::config::{MAX_STACK_SIZE, USER_STACK_TOP, USER_VIRTUAL_END, WORD_SIZE};
use crate::page::BackingKind;
use crate::process::ProcessVm;
use crate::vm::Vm;

/// Contexto de um page fault, como entregue pelo handler de interrupção
#[derive(Debug, Clone, Copy)]
pub struct FaultInfo {
    /// Endereço que faltou (CR2)
    pub addr: VirtAddr,
    /// Fault originado em modo usuário
    pub user: bool,
    /// O acesso era uma escrita
    pub write: bool,
    /// Página ausente (`true`) ou presente com permissão negada (`false`)
    pub not_present: bool,
    /// rsp no momento do fault; significativo apenas quando `user`
    pub rsp: u64,
}

/// Desfecho de um page fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultResult {
    /// Página residente, acesso pode ser reexecutado
    Success,
    /// Endereço nulo ou em espaço de kernel
    InvalidAddress,
    /// Página presente mas o acesso é proibido (ex.: escrita em read-only)
    ProtectionViolation,
    /// Endereço sem página e fora da janela de crescimento de stack
    NotMapped,
    /// Claim falhou (população, mapeamento)
    FatalError,
}

impl FaultResult {
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, FaultResult::Success)
    }
}

/// Resolve um page fault para o processo `proc`.
pub(crate) fn handle_fault(vm: &Vm, proc: &mut ProcessVm, info: FaultInfo) -> FaultResult {
    crate::ktrace!(
        "(FAULT) addr={:?} user={} write={} np={}",
        info.addr,
        info.user,
        info.write,
        info.not_present
    );

    if info.addr.is_null() || info.addr.as_u64() >= USER_VIRTUAL_END {
        crate::kerror!("(FAULT) Acesso fora do espaço de usuário: {:?}", info.addr);
        return FaultResult::InvalidAddress;
    }

    if !info.not_present {
        crate::kerror!("(FAULT) Violação de proteção em {:?}", info.addr);
        return FaultResult::ProtectionViolation;
    }

    if let Some(page) = proc.spt().find(info.addr) {
        if info.write && !page.lock().writable() {
            crate::kerror!("(FAULT) Escrita em página read-only: {:?}", info.addr);
            return FaultResult::ProtectionViolation;
        }
        return match vm.claim(&page) {
            Ok(()) => FaultResult::Success,
            Err(e) => {
                crate::kerror!("(FAULT) Claim de {:?} falhou: {}", info.addr, e);
                FaultResult::FatalError
            }
        };
    }

    // Faults de kernel usam o rsp salvo na entrada de syscall; um fault de
    // kernel sem rsp gravado não tem como justificar crescimento.
    let rsp = if info.user {
        info.rsp
    } else {
        proc.saved_stack_pointer()
    };
    if rsp != 0 && in_growth_window(info.addr, rsp) {
        return grow_stack(vm, proc, info.addr);
    }

    crate::kerror!("(FAULT) Falha de segmentação em {:?}", info.addr);
    FaultResult::NotMapped
}

/// Janela de crescimento: o endereço está na faixa de [`MAX_STACK_SIZE`]
/// abaixo do topo fixo E se comporta como um push: exatamente uma palavra
/// abaixo do rsp (instrução `push`) ou acima dele (acesso a local já
/// reservado por `sub rsp`).
fn in_growth_window(addr: VirtAddr, rsp: u64) -> bool {
    let a = addr.as_u64();
    let floor = USER_STACK_TOP - MAX_STACK_SIZE;
    if a < floor || a >= USER_STACK_TOP {
        return false;
    }
    a == rsp.wrapping_sub(WORD_SIZE) || a >= rsp
}

/// Concede uma página anônima de stack e a torna residente na hora.
fn grow_stack(vm: &Vm, proc: &mut ProcessVm, addr: VirtAddr) -> FaultResult {
    let base = addr.page_round_down();
    if let Err(e) = vm.allocate_page(proc, BackingKind::Anon, base, true, None, None) {
        crate::kerror!("(FAULT) Crescimento de stack em {:?} falhou: {}", base, e);
        return FaultResult::FatalError;
    }
    if let Err(e) = vm.claim_page(proc, base) {
        crate::kerror!("(FAULT) Claim da stack nova em {:?} falhou: {}", base, e);
        return FaultResult::FatalError;
    }
    proc.note_stack_growth(base);
    crate::kdebug!("(FAULT) Stack cresceu para {:?}", base);
    FaultResult::Success
}
