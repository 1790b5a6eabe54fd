use std::{cell::Cell, rc::Rc};

/// Admits at most one operation at a time.
///
/// Holding a [`FlightPermit`] is what "in flight" means; the flag clears when
/// the permit is dropped, whether the operation finished, failed or its
/// future was dropped half way.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    in_flight: Rc<Cell<bool>>,
}

#[must_use = "the flight ends as soon as the permit is dropped"]
#[derive(Debug)]
pub struct FlightPermit {
    in_flight: Rc<Cell<bool>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another permit is alive.
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        if self.in_flight.replace(true) {
            return None;
        }
        Some(FlightPermit {
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.in_flight.set(false);
    }
}
