//! Per-direction single-flight guard.

use crate::state::LoadType;
use std::sync::atomic::{AtomicBool, Ordering};

/// Allows at most one in-flight load per [`LoadType`].
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: [AtomicBool; 3],
}

impl SingleFlight {
    /// Creates a guard set with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `load_type`.
    ///
    /// Returns `None` if a load in that direction is already running. The
    /// slot is released when the returned guard is dropped.
    pub fn try_begin(&self, load_type: LoadType) -> Option<FlightGuard<'_>> {
        let flag = &self.in_flight[load_type.index()];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flag })
    }

    /// Returns true if a load in that direction is running.
    pub fn is_in_flight(&self, load_type: LoadType) -> bool {
        self.in_flight[load_type.index()].load(Ordering::Acquire)
    }
}

/// Releases its direction's slot on drop.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn second_claim_is_rejected() {
        let flights = SingleFlight::new();
        let guard = flights.try_begin(LoadType::Append);
        assert!(guard.is_some());
        assert!(flights.try_begin(LoadType::Append).is_none());
        assert!(flights.is_in_flight(LoadType::Append));

        drop(guard);
        assert!(!flights.is_in_flight(LoadType::Append));
        assert!(flights.try_begin(LoadType::Append).is_some());
    }

    #[test]
    fn directions_are_independent() {
        let flights = SingleFlight::new();
        let _append = flights.try_begin(LoadType::Append).unwrap();
        assert!(flights.try_begin(LoadType::Prepend).is_some());
        assert!(flights.try_begin(LoadType::Refresh).is_some());
    }

    #[test]
    fn only_one_thread_wins() {
        let flights = Arc::new(SingleFlight::new());
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flights = Arc::clone(&flights);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let guard = flights.try_begin(LoadType::Append);
                    let won = guard.is_some();
                    barrier.wait();
                    won
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
