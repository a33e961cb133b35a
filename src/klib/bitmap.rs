//! Bitmap genérico
//!
//! Usado pelos backing stores para controlar quais slots estão ocupados.
//! A busca é next-fit: recomeça de onde a última alocação parou.

use alloc::vec;
use alloc::vec::Vec;

/// Bitmap para gerenciamento de bits
pub struct Bitmap {
    data: Vec<u64>,
    len: usize,
    used: usize,
    next_free: usize,
}

impl Bitmap {
    /// Cria bitmap com `bits` bits, todos livres
    pub fn new(bits: usize) -> Self {
        Self {
            data: vec![0u64; bits.div_ceil(64)],
            len: bits,
            used: 0,
            next_free: 0,
        }
    }

    /// Número total de bits
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bits em uso
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bits livres
    pub fn free(&self) -> usize {
        self.len - self.used
    }

    /// Define um bit. Retorna o valor anterior.
    pub fn set(&mut self, index: usize) -> bool {
        debug_assert!(index < self.len);
        let (word, bit) = (index / 64, index % 64);
        let was = (self.data[word] & (1 << bit)) != 0;
        if !was {
            self.data[word] |= 1 << bit;
            self.used += 1;
        }
        was
    }

    /// Limpa um bit. Retorna o valor anterior.
    pub fn clear(&mut self, index: usize) -> bool {
        debug_assert!(index < self.len);
        let (word, bit) = (index / 64, index % 64);
        let was = (self.data[word] & (1 << bit)) != 0;
        if was {
            self.data[word] &= !(1 << bit);
            self.used -= 1;
        }
        was
    }

    /// Testa um bit
    pub fn test(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        (self.data[index / 64] & (1 << (index % 64))) != 0
    }

    /// Encontra primeiro bit livre (0) a partir de `start`
    fn find_zero_from(&self, start: usize) -> Option<usize> {
        let first_word = start / 64;
        for i in first_word..self.data.len() {
            // Na primeira palavra, ignora bits antes de `start`
            let mask = if i == first_word {
                (1u64 << (start % 64)) - 1
            } else {
                0
            };
            let word = self.data[i] | mask;
            if word != u64::MAX {
                let index = i * 64 + word.trailing_ones() as usize;
                if index < self.len {
                    return Some(index);
                }
                return None;
            }
        }
        None
    }

    /// Encontra primeiro bit livre (0)
    pub fn find_first_zero(&self) -> Option<usize> {
        self.find_zero_from(0)
    }

    /// Aloca um bit livre (next-fit). None se cheio.
    pub fn alloc(&mut self) -> Option<usize> {
        if self.used == self.len {
            return None;
        }
        let index = self
            .find_zero_from(self.next_free)
            .or_else(|| self.find_zero_from(0))?;
        self.set(index);
        self.next_free = if index + 1 >= self.len { 0 } else { index + 1 };
        Some(index)
    }
}
