//! Diagnostic ring buffer
//!
//! Fixed-capacity log of the rectifier-side measurements, one entry per tick,
//! for inspection from a debugger or an out-of-band reader.

use crate::config::DIAGNOSTIC_CAPACITY;
use crate::sampler::SampleSet;

/// One logged tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticEntry {
    pub va: f32,
    pub vb: f32,
    pub vc: f32,
    pub vdc: f32,
    pub ia: f32,
    pub ib: f32,
    pub ic: f32,
}

impl DiagnosticEntry {
    pub const ZERO: Self = Self {
        va: 0.0,
        vb: 0.0,
        vc: 0.0,
        vdc: 0.0,
        ia: 0.0,
        ib: 0.0,
        ic: 0.0,
    };
}

impl From<&SampleSet> for DiagnosticEntry {
    fn from(s: &SampleSet) -> Self {
        Self {
            va: s.va,
            vb: s.vb,
            vc: s.vc,
            vdc: s.vdc,
            ia: s.ia,
            ib: s.ib,
            ic: s.ic,
        }
    }
}

/// Circular log with a single writer
#[derive(Debug, Clone)]
pub struct DiagnosticLog<const N: usize = DIAGNOSTIC_CAPACITY> {
    entries: [DiagnosticEntry; N],
    write_index: usize,
    /// Entries written, saturating at N
    filled: usize,
}

impl<const N: usize> DiagnosticLog<N> {
    pub const fn new() -> Self {
        Self {
            entries: [DiagnosticEntry::ZERO; N],
            write_index: 0,
            filled: 0,
        }
    }

    /// Store at the write index, then advance it modulo N
    pub fn push(&mut self, entry: DiagnosticEntry) {
        if N == 0 {
            return;
        }
        self.entries[self.write_index] = entry;
        self.write_index += 1;
        if self.write_index >= N {
            self.write_index = 0;
        }
        if self.filled < N {
            self.filled += 1;
        }
    }

    /// Slot the next write goes to
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Number of valid entries
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Raw slot access
    pub fn get(&self, slot: usize) -> Option<&DiagnosticEntry> {
        if slot < self.filled {
            self.entries.get(slot)
        } else {
            None
        }
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&DiagnosticEntry> {
        if self.filled == 0 {
            return None;
        }
        let slot = if self.write_index == 0 {
            N - 1
        } else {
            self.write_index - 1
        };
        self.entries.get(slot)
    }

    /// Valid entries from oldest to newest
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &DiagnosticEntry> + '_ {
        let start = if self.filled < N { 0 } else { self.write_index };
        (0..self.filled).map(move |i| &self.entries[(start + i) % N])
    }
}

impl<const N: usize> Default for DiagnosticLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> DiagnosticEntry {
        DiagnosticEntry {
            vdc: n as f32,
            ..DiagnosticEntry::ZERO
        }
    }

    #[test]
    fn test_wraps_after_capacity_plus_one() {
        let mut log = DiagnosticLog::<168>::new();
        for n in 1..=169 {
            log.push(entry(n));
        }
        assert_eq!(log.write_index(), 1);
        assert_eq!(log.get(0).map(|e| e.vdc), Some(169.0));
        assert_eq!(log.get(1).map(|e| e.vdc), Some(2.0));
        assert_eq!(log.len(), 168);
        assert_eq!(log.latest().map(|e| e.vdc), Some(169.0));
    }

    #[test]
    fn test_partial_fill() {
        let mut log = DiagnosticLog::<4>::new();
        assert!(log.is_empty());
        assert!(log.latest().is_none());
        log.push(entry(7));
        log.push(entry(8));
        assert_eq!(log.len(), 2);
        assert!(log.get(2).is_none());
        let values: [f32; 2] = {
            let mut it = log.iter_oldest_first().map(|e| e.vdc);
            [it.next().unwrap_or(0.0), it.next().unwrap_or(0.0)]
        };
        assert_eq!(values, [7.0, 8.0]);
    }

    #[test]
    fn test_iter_oldest_first_after_wrap() {
        let mut log = DiagnosticLog::<3>::new();
        for n in 1..=5 {
            log.push(entry(n));
        }
        let mut it = log.iter_oldest_first().map(|e| e.vdc);
        assert_eq!(it.next(), Some(3.0));
        assert_eq!(it.next(), Some(4.0));
        assert_eq!(it.next(), Some(5.0));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn test_entry_from_samples() {
        let samples = SampleSet {
            va: 1.0,
            vdc: 360.0,
            ic: -2.0,
            ..SampleSet::default()
        };
        let e = DiagnosticEntry::from(&samples);
        assert_eq!(e.va, 1.0);
        assert_eq!(e.vdc, 360.0);
        assert_eq!(e.ic, -2.0);
    }
}
