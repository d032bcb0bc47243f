//! JTAG TAP state graph
//!
//! Two static tables describe the standard 16-state TAP controller:
//! the one-step successor for each TMS value, and for every current
//! state a bitmask giving the TMS value that leads one step closer to
//! each possible destination along the shortest path.

use core::fmt;

/// One of the 16 IEEE 1149.1 TAP controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TapState {
    /// Test-Logic-Reset
    TestLogicReset = 0,
    /// Run-Test/Idle
    RunTestIdle = 1,
    /// Select-DR-Scan
    SelectDrScan = 2,
    /// Capture-DR
    CaptureDr = 3,
    /// Shift-DR
    ShiftDr = 4,
    /// Exit1-DR
    Exit1Dr = 5,
    /// Pause-DR
    PauseDr = 6,
    /// Exit2-DR
    Exit2Dr = 7,
    /// Update-DR
    UpdateDr = 8,
    /// Select-IR-Scan
    SelectIrScan = 9,
    /// Capture-IR
    CaptureIr = 10,
    /// Shift-IR
    ShiftIr = 11,
    /// Exit1-IR
    Exit1Ir = 12,
    /// Pause-IR
    PauseIr = 13,
    /// Exit2-IR
    Exit2Ir = 14,
    /// Update-IR
    UpdateIr = 15,
}

/// Successor states packed as nibbles: low nibble for TMS=0, high for TMS=1
const TRANSITIONS: [u8; 16] = [
    0x01, // TestLogicReset
    0x21, // RunTestIdle
    0x93, // SelectDrScan
    0x54, // CaptureDr
    0x54, // ShiftDr
    0x86, // Exit1Dr
    0x76, // PauseDr
    0x84, // Exit2Dr
    0x21, // UpdateDr
    0x0A, // SelectIrScan
    0xCB, // CaptureIr
    0xCB, // ShiftIr
    0xFD, // Exit1Ir
    0xED, // PauseIr
    0xFB, // Exit2Ir
    0x21, // UpdateIr
];

/// Bit `n` of entry `s` is the TMS value that moves state `s` toward state `n`
const TMS_PATH: [u16; 16] = [
    0x0001, 0xFFFD, 0xFE03, 0xFFE7, 0xFFEF, 0xFF0F, 0xFFBF, 0xFF0F, //
    0xFEFD, 0x01FF, 0xF3FF, 0xF7FF, 0x87FF, 0xDFFF, 0x87FF, 0x7FFD,
];

/// Upper bound on the length of any shortest path in the TAP graph
pub const MAX_PATH_LEN: usize = 8;

/// Number of TMS=1 clocks that reach Test-Logic-Reset from any state
pub const RESET_CLOCKS: usize = 5;

impl TapState {
    /// All states in index order
    pub const ALL: [TapState; 16] = [
        Self::TestLogicReset,
        Self::RunTestIdle,
        Self::SelectDrScan,
        Self::CaptureDr,
        Self::ShiftDr,
        Self::Exit1Dr,
        Self::PauseDr,
        Self::Exit2Dr,
        Self::UpdateDr,
        Self::SelectIrScan,
        Self::CaptureIr,
        Self::ShiftIr,
        Self::Exit1Ir,
        Self::PauseIr,
        Self::Exit2Ir,
        Self::UpdateIr,
    ];

    /// Convert a raw state index (0..=15)
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Raw state index
    pub fn index(self) -> u8 {
        self as u8
    }

    /// State reached after one TCK pulse with the given TMS level
    pub fn next(self, tms: bool) -> Self {
        let packed = TRANSITIONS[self as usize];
        let next = if tms { packed >> 4 } else { packed & 0x0F };
        Self::ALL[next as usize]
    }

    /// TMS level for the first step of the shortest path to `target`
    pub fn tms_toward(self, target: Self) -> bool {
        TMS_PATH[self as usize] & (1 << target as u16) != 0
    }

    /// Shortest TMS sequence from `self` to `target`
    pub fn path_to(self, target: Self) -> TmsPath {
        let mut path = TmsPath::default();
        let mut state = self;
        while state != target {
            assert!(
                (path.len as usize) < MAX_PATH_LEN,
                "TAP path table has no route from {:?} to {:?}",
                self,
                target
            );
            let tms = state.tms_toward(target);
            path.push(tms);
            state = state.next(tms);
        }
        path
    }

    /// Whether this is one of the two Shift states
    pub fn is_shift(self) -> bool {
        matches!(self, Self::ShiftDr | Self::ShiftIr)
    }

    /// Whether clocking with TMS=0 keeps the controller in this state
    pub fn is_stable(self) -> bool {
        self.next(false) == self
    }
}

impl fmt::Display for TapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TestLogicReset => "Test-Logic-Reset",
            Self::RunTestIdle => "Run-Test/Idle",
            Self::SelectDrScan => "Select-DR-Scan",
            Self::CaptureDr => "Capture-DR",
            Self::ShiftDr => "Shift-DR",
            Self::Exit1Dr => "Exit1-DR",
            Self::PauseDr => "Pause-DR",
            Self::Exit2Dr => "Exit2-DR",
            Self::UpdateDr => "Update-DR",
            Self::SelectIrScan => "Select-IR-Scan",
            Self::CaptureIr => "Capture-IR",
            Self::ShiftIr => "Shift-IR",
            Self::Exit1Ir => "Exit1-IR",
            Self::PauseIr => "Pause-IR",
            Self::Exit2Ir => "Exit2-IR",
            Self::UpdateIr => "Update-IR",
        };
        f.write_str(name)
    }
}

/// A short TMS sequence, first step in bit 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TmsPath {
    bits: u16,
    len: u8,
}

impl TmsPath {
    fn push(&mut self, tms: bool) {
        if tms {
            self.bits |= 1 << self.len;
        }
        self.len += 1;
    }

    /// Number of TCK pulses
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True when source and target are the same state
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// TMS levels in clock order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bits & (1 << i) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Breadth-first distance over the successor table alone
    fn bfs_distance(from: TapState, to: TapState) -> usize {
        let mut dist = [usize::MAX; 16];
        let mut queue = [TapState::TestLogicReset; 16];
        let (mut head, mut tail) = (0, 0);
        dist[from as usize] = 0;
        queue[tail] = from;
        tail += 1;
        while head < tail {
            let s = queue[head];
            head += 1;
            for tms in [false, true] {
                let n = s.next(tms);
                if dist[n as usize] == usize::MAX {
                    dist[n as usize] = dist[s as usize] + 1;
                    queue[tail] = n;
                    tail += 1;
                }
            }
        }
        dist[to as usize]
    }

    #[test]
    fn test_successor_table() {
        use TapState::*;
        assert_eq!(TestLogicReset.next(true), TestLogicReset);
        assert_eq!(TestLogicReset.next(false), RunTestIdle);
        assert_eq!(RunTestIdle.next(true), SelectDrScan);
        assert_eq!(SelectDrScan.next(true), SelectIrScan);
        assert_eq!(SelectIrScan.next(true), TestLogicReset);
        assert_eq!(ShiftDr.next(false), ShiftDr);
        assert_eq!(ShiftDr.next(true), Exit1Dr);
        assert_eq!(Exit1Ir.next(true), UpdateIr);
        assert_eq!(UpdateIr.next(false), RunTestIdle);
        assert_eq!(Exit2Dr.next(false), ShiftDr);
        assert_eq!(PauseIr.next(true), Exit2Ir);
    }

    #[test]
    fn test_paths_are_shortest() {
        for from in TapState::ALL {
            for to in TapState::ALL {
                let path = from.path_to(to);
                assert_eq!(path.len(), bfs_distance(from, to), "{from} -> {to}");

                let mut s = from;
                for tms in path.iter() {
                    s = s.next(tms);
                }
                assert_eq!(s, to);
            }
        }
    }

    #[test]
    fn test_reset_reachable_in_five() {
        for from in TapState::ALL {
            let mut s = from;
            for _ in 0..RESET_CLOCKS {
                s = s.next(true);
            }
            assert_eq!(s, TapState::TestLogicReset, "from {from}");
        }
    }

    #[test]
    fn test_path_to_self_is_empty() {
        for s in TapState::ALL {
            assert!(s.path_to(s).is_empty());
        }
    }

    #[test]
    fn test_reset_to_shift_ir() {
        let path = TapState::TestLogicReset.path_to(TapState::ShiftIr);
        let bits: alloc::vec::Vec<bool> = path.iter().collect();
        assert_eq!(bits, [false, true, true, false, false]);
    }

    #[test]
    fn test_from_index() {
        for i in 0..16u8 {
            assert_eq!(TapState::from_index(i).map(TapState::index), Some(i));
        }
        assert_eq!(TapState::from_index(16), None);
    }

    #[test]
    fn test_stable_states() {
        let stable: alloc::vec::Vec<TapState> =
            TapState::ALL.into_iter().filter(|s| s.is_stable()).collect();
        assert_eq!(
            stable,
            [
                TapState::RunTestIdle,
                TapState::ShiftDr,
                TapState::PauseDr,
                TapState::ShiftIr,
                TapState::PauseIr
            ]
        );
    }
}
