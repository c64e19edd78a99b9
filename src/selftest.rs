//! Testes do Subsistema de VM
//!
//! Executa testes de integridade do caminho fault/claim/evicção no boot.
//! Todos os resultados são enviados para a serial.
//!
//! # Uso
//! Chamar `run_vm_tests()` logo após criar o [`Vm`] e o primeiro processo.

use crate::addr::VirtAddr;
use crate::config::{PAGE_SIZE, USER_STACK_TOP, WORD_SIZE};
use crate::error::VmError;
use crate::fault::FaultInfo;
use crate::page::BackingKind;
use crate::process::ProcessVm;
use crate::vm::Vm;

/// Base dos endereços de teste, longe do layout real de processos
const TEST_BASE: u64 = 0x4100_0000;

/// Executa todos os testes de VM no boot
pub fn run_vm_tests(vm: &Vm, proc: &mut ProcessVm) {
    crate::kinfo!("╔════════════════════════════════════════╗");
    crate::kinfo!("║     🧪 TESTES DE MEMÓRIA VIRTUAL       ║");
    crate::kinfo!("╚════════════════════════════════════════╝");

    test_spt_roundtrip(vm, proc);
    test_claim_and_readback(vm, proc);
    test_stack_growth(vm, proc);

    let s = vm.stats();
    crate::kinfo!(
        "(VM) pool {}/{} frames, swap {}/{} slots, {} evicções",
        s.frames.used,
        s.frames.capacity,
        s.swap.used_slots,
        s.swap.total_slots,
        s.frames.evictions
    );

    crate::kinfo!("╔════════════════════════════════════════╗");
    crate::kinfo!("║  ✅ TODOS OS TESTES PASSARAM!          ║");
    crate::kinfo!("╚════════════════════════════════════════╝");
}

/// Teste básico da SPT: registrar, achar, rejeitar duplicata, remover
fn test_spt_roundtrip(vm: &Vm, proc: &mut ProcessVm) {
    crate::kinfo!("┌─ Teste SPT ─────────────────────────────┐");
    let va = VirtAddr::new(TEST_BASE);

    crate::kdebug!("(SPT) Teste: registrando página em {:?}...", va);
    if let Err(e) = vm.allocate_page(proc, BackingKind::Anon, va, true, None, None) {
        crate::kerror!("(SPT) FALHA: alocação recusada: {}", e);
        panic!("Teste SPT falhou: alocação");
    }

    if proc.spt().find(va).is_none() {
        crate::kerror!("(SPT) FALHA: página registrada não encontrada!");
        panic!("Teste SPT falhou: find");
    }
    if proc.spt().find(va.add(PAGE_SIZE as u64 / 2)).is_none() {
        crate::kerror!("(SPT) FALHA: busca no meio da página não resolveu!");
        panic!("Teste SPT falhou: arredondamento");
    }

    crate::kdebug!("(SPT) Teste: registrando duplicata...");
    match vm.allocate_page(proc, BackingKind::Anon, va, true, None, None) {
        Err(VmError::AlreadyMapped) => {}
        other => {
            crate::kerror!("(SPT) FALHA: duplicata respondeu {:?}", other);
            panic!("Teste SPT falhou: duplicata");
        }
    }

    if !proc.spt_mut().remove(va, vm.frames(), vm.swap()) {
        crate::kerror!("(SPT) FALHA: remoção não achou a página!");
        panic!("Teste SPT falhou: remove");
    }
    if proc.spt().find(va).is_some() {
        crate::kerror!("(SPT) FALHA: página sobreviveu à remoção!");
        panic!("Teste SPT falhou: remoção incompleta");
    }

    crate::kinfo!("│  ✓ SPT insert/find/remove OK            │");
    crate::kinfo!("└──────────────────────────────────────────┘");
}

/// Teste do claim: frame, tradução e bytes que persistem
fn test_claim_and_readback(vm: &Vm, proc: &mut ProcessVm) {
    crate::kinfo!("┌─ Teste Claim ───────────────────────────┐");
    let va = VirtAddr::new(TEST_BASE + 0x1000);

    if let Err(e) = vm.allocate_page(proc, BackingKind::Anon, va, true, None, None) {
        crate::kerror!("(VM) FALHA: alocação recusada: {}", e);
        panic!("Teste Claim falhou: alocação");
    }
    crate::kdebug!("(VM) Teste: claim de {:?}...", va);
    if let Err(e) = vm.claim_page(proc, va) {
        crate::kerror!("(VM) FALHA: claim recusado: {}", e);
        panic!("Teste Claim falhou: claim");
    }

    let page = proc.spt().find(va).unwrap();
    let Some(id) = page.lock().frame() else {
        crate::kerror!("(VM) FALHA: página sem frame após claim!");
        panic!("Teste Claim falhou: residência");
    };
    if proc.aspace().translate(va).is_none() {
        crate::kerror!("(VM) FALHA: claim não instalou tradução!");
        panic!("Teste Claim falhou: tradução");
    }

    crate::kdebug!("(VM) Teste: escrevendo padrão no frame {}...", id.index());
    {
        let mem = vm.frames().mem(id);
        let mut buf = mem.lock();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
    }
    {
        let mem = vm.frames().mem(id);
        let buf = mem.lock();
        for (i, &b) in buf.iter().enumerate() {
            if b != (i % 251) as u8 {
                crate::kerror!("(VM) FALHA: byte {} = {} (esperado {})", i, b, i % 251);
                panic!("Teste Claim falhou: corrupção");
            }
        }
    }
    crate::kdebug!("(VM) Teste: integridade OK");

    proc.spt_mut().remove(va, vm.frames(), vm.swap());
    crate::kinfo!("│  ✓ claim/translate/readback OK          │");
    crate::kinfo!("└──────────────────────────────────────────┘");
}

/// Teste do crescimento de stack: push cresce, acesso distante não
fn test_stack_growth(vm: &Vm, proc: &mut ProcessVm) {
    crate::kinfo!("┌─ Teste Stack ───────────────────────────┐");
    let rsp = USER_STACK_TOP - 256;
    let push = VirtAddr::new(rsp - WORD_SIZE);

    crate::kdebug!("(FAULT) Teste: push em {:?} com rsp={:#x}...", push, rsp);
    let r = vm.handle_fault(
        proc,
        FaultInfo {
            addr: push,
            user: true,
            write: true,
            not_present: true,
            rsp,
        },
    );
    if !r.is_success() {
        crate::kerror!("(FAULT) FALHA: push não cresceu a stack: {:?}", r);
        panic!("Teste Stack falhou: crescimento");
    }
    let base = push.page_round_down();
    match proc.spt().find(base) {
        Some(page) if page.lock().is_resident() => {}
        _ => {
            crate::kerror!("(FAULT) FALHA: página de stack não residente!");
            panic!("Teste Stack falhou: residência");
        }
    }

    let far = VirtAddr::new(rsp - 4 * PAGE_SIZE as u64);
    crate::kdebug!("(FAULT) Teste: acesso distante em {:?}...", far);
    let r = vm.handle_fault(
        proc,
        FaultInfo {
            addr: far,
            user: true,
            write: true,
            not_present: true,
            rsp,
        },
    );
    if r.is_success() {
        crate::kerror!("(FAULT) FALHA: acesso distante cresceu a stack!");
        panic!("Teste Stack falhou: janela");
    }

    proc.spt_mut().remove(base, vm.frames(), vm.swap());
    crate::kinfo!("│  ✓ stack growth (janela de push) OK     │");
    crate::kinfo!("└──────────────────────────────────────────┘");
}
