// =============================================================================
// SERIAL SINK - ZERO OVERHEAD
// =============================================================================
//
// Saída de bytes usada pelo sistema de logging do pager.
//
// ARQUITETURA:
// O pager não conhece a porta física. Quem embarca o motor registra um
// "sink" (função que recebe bytes) via `set_sink`. Sem sink, tudo é
// descartado.
// - SEM core::fmt - Evita geração de código SSE/AVX
// - SEM alocação - Apenas strings literais e valores imediatos
//
// FUNÇÕES DISPONÍVEIS:
// - emit(byte)       : Envia um byte
// - emit_str(s)      : Envia string literal
// - emit_hex(v)      : Envia u64 em hexadecimal
// - emit_dec(v)      : Envia usize em decimal
// - emit_nl()        : Envia newline (\r\n)
//
// NOTA IMPORTANTE:
// O sink é chamado com o lock do registro tomado. Ele NÃO pode logar.
// Em ambiente SMP os logs podem se intercalar entre CPUs.
//
// =============================================================================

use spin::Mutex;

/// Função que recebe os bytes de log (UART, buffer de teste, etc).
pub type SerialSink = fn(&[u8]);

static SINK: Mutex<Option<SerialSink>> = Mutex::new(None);

// =============================================================================
// REGISTRO DO SINK
// =============================================================================

/// Registra o destino dos logs. Substitui o anterior.
pub fn set_sink(sink: SerialSink) {
    *SINK.lock() = Some(sink);
}

/// Remove o sink; logs passam a ser descartados.
pub fn clear_sink() {
    *SINK.lock() = None;
}

#[inline]
fn write_bytes(bytes: &[u8]) {
    let sink = SINK.lock();
    if let Some(sink) = *sink {
        sink(bytes);
    }
}

// =============================================================================
// FUNÇÕES DE ESCRITA - CORE
// =============================================================================

/// Envia um único byte.
#[inline]
pub fn emit(byte: u8) {
    write_bytes(&[byte]);
}

/// Envia uma string.
#[inline]
pub fn emit_str(s: &str) {
    write_bytes(s.as_bytes());
}

/// Envia newline (CR + LF).
#[inline]
pub fn emit_nl() {
    write_bytes(b"\r\n");
}

// =============================================================================
// FUNÇÕES DE ESCRITA - NÚMEROS
// =============================================================================

/// Envia um u64 em hexadecimal com prefixo "0x" (16 dígitos).
pub fn emit_hex(value: u64) {
    let mut buf = [0u8; 18];
    buf[0] = b'0';
    buf[1] = b'x';
    for i in 0..16 {
        let nibble = ((value >> (60 - i * 4)) & 0xF) as u8;
        buf[2 + i] = nibble_to_ascii(nibble);
    }
    write_bytes(&buf);
}

/// Envia um usize em decimal.
pub fn emit_dec(value: usize) {
    if value == 0 {
        emit(b'0');
        return;
    }

    // usize::MAX tem no máximo 20 dígitos
    let mut buf = [0u8; 20];
    let mut pos = buf.len();
    let mut v = value;
    while v > 0 {
        pos -= 1;
        buf[pos] = b'0' + (v % 10) as u8;
        v /= 10;
    }
    write_bytes(&buf[pos..]);
}

#[inline(always)]
const fn nibble_to_ascii(n: u8) -> u8 {
    if n < 10 {
        b'0' + n
    } else {
        b'A' + (n - 10)
    }
}
