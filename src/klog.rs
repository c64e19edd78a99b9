// =============================================================================
// VM LOGGING - ZERO OVERHEAD
// =============================================================================
//
// Logging do subsistema de VM com custo ZERO em release.
//
// ARQUITETURA:
// - Features do Cargo fazem compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - A saída passa por um sink instalado uma única vez (no kernel, a serial;
//   nos testes, um buffer de captura)
// - Sem sink instalado, emitir é um no-op
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Erros fatais ou críticos
// - WARN:  Situações suspeitas mas recuperáveis
// - INFO:  Fluxo normal de execução
// - DEBUG: Informações de debugging
// - TRACE: Detalhes extremos (cada fault, evicção, slot)
//
// COMO USAR:
//   kinfo!("(SWAP) {} slots", total);
//   ktrace!("(FAULT) addr={:?} write={}", addr, write);
//
// Convenção: prefixo "(SUBSISTEMA)" no início de cada mensagem.
//
// =============================================================================

use core::fmt::{self, Write};

use alloc::string::String;
use spin::Once;

// =============================================================================
// PREFIXOS COM CORES ANSI
// =============================================================================

pub const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
pub const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
pub const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
pub const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
pub const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";

/// Destino final de uma linha de log já formatada
pub type LogSink = fn(&str);

static SINK: Once<LogSink> = Once::new();

/// Instala o sink de log. Chamadas subsequentes são ignoradas.
pub fn set_sink(sink: LogSink) {
    SINK.call_once(|| sink);
}

/// Formata e entrega uma linha ao sink, se houver um instalado.
#[doc(hidden)]
pub fn emit(prefix: &str, args: fmt::Arguments<'_>) {
    if let Some(sink) = SINK.get() {
        let mut line = String::new();
        let _ = write!(line, "{}{}", prefix, args);
        sink(&line);
    }
}

// =============================================================================
// MACROS DE LOG
// =============================================================================
//
// kerror!/kwarn!/kinfo! - Ativos exceto com no_logs
// kdebug!              - Ativo com log_debug ou log_trace
// ktrace!              - Ativo apenas com log_trace
//

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {{
        $crate::klog::emit($crate::klog::P_ERROR, ::core::format_args!($($arg)*));
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {{
        $crate::klog::emit($crate::klog::P_WARN, ::core::format_args!($($arg)*));
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {{
        $crate::klog::emit($crate::klog::P_INFO, ::core::format_args!($($arg)*));
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

#[cfg(any(feature = "log_debug", feature = "log_trace"))]
#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {{
        $crate::klog::emit($crate::klog::P_DEBUG, ::core::format_args!($($arg)*));
    }};
}

#[cfg(not(any(feature = "log_debug", feature = "log_trace")))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "log_trace")]
#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {{
        $crate::klog::emit($crate::klog::P_TRACE, ::core::format_args!($($arg)*));
    }};
}

#[cfg(not(feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}
