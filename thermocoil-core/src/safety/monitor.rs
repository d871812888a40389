//! Safety monitor implementation
//!
//! Watches the fault latched by the output stage and the presence of a
//! resistance reading.

/// Types of hardware faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Coil shorted
    Short,
    /// No coil attached
    Open,
    /// Battery too weak to fire
    WeakBattery,
    /// Board over temperature
    OverTemp,
}

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    #[default]
    Ok,
    /// Output stage reports a fault
    Fault(FaultKind),
}

impl SafetyStatus {
    /// Check if a fault is active
    pub const fn is_fault(&self) -> bool {
        matches!(self, SafetyStatus::Fault(_))
    }

    /// Active fault, if any
    pub const fn fault(&self) -> Option<FaultKind> {
        match self {
            SafetyStatus::Ok => None,
            SafetyStatus::Fault(kind) => Some(*kind),
        }
    }
}

/// Safety monitor for fault detection
#[derive(Debug, Clone, Default)]
pub struct SafetyMonitor {
    status: SafetyStatus,
    /// Most recent fault seen, kept after it clears
    last_fault: Option<FaultKind>,
    /// Number of distinct fault onsets
    fault_count: u16,
}

impl SafetyMonitor {
    /// Create a new safety monitor
    pub const fn new() -> Self {
        Self {
            status: SafetyStatus::Ok,
            last_fault: None,
            fault_count: 0,
        }
    }

    /// Feed the fault read this tick, `None` when the stage reports none
    pub fn update(&mut self, fault: Option<FaultKind>) -> SafetyStatus {
        let status = match fault {
            Some(kind) => SafetyStatus::Fault(kind),
            None => SafetyStatus::Ok,
        };

        if let SafetyStatus::Fault(kind) = status {
            if self.status != status {
                warn!("fault: {}", kind);
                self.fault_count = self.fault_count.saturating_add(1);
            }
            self.last_fault = Some(kind);
        } else if self.status.is_fault() {
            info!("fault cleared");
        }

        self.status = status;
        status
    }

    /// Current status
    pub const fn check(&self) -> SafetyStatus {
        self.status
    }

    /// Check if the coil may be energized with this resistance reading
    pub const fn energize_permitted(&self, resistance_mohm: u16) -> bool {
        resistance_mohm != 0 && !self.status.is_fault()
    }

    /// Most recent fault, including one that has since cleared
    pub const fn last_fault(&self) -> Option<FaultKind> {
        self.last_fault
    }

    /// Number of fault onsets since power-up
    pub const fn fault_count(&self) -> u16 {
        self.fault_count
    }
}
