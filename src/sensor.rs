//! Tracks which sentinel is observed and decides when it counts as visible.

/// Intersection ratio at which the whole sentinel is on screen.
pub const FULLY_VISIBLE: f64 = 1.0;

/// What an intersection entry reported about its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visibility {
    /// Fraction of the target's area inside the viewport, `0.0..=1.0`
    pub ratio: f64,
    pub is_intersecting: bool,
}

impl Visibility {
    pub fn new(ratio: f64, is_intersecting: bool) -> Self {
        Self {
            ratio,
            is_intersecting,
        }
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.is_intersecting && self.ratio >= threshold
    }
}

/// A live observation of some target, released when dropped.
pub trait ObservationHandle {
    type Target: PartialEq;

    fn target(&self) -> &Self::Target;
}

#[derive(Debug)]
pub enum SensorState<H> {
    Unattached,
    Attached(H),
}

/// Keeps at most one observation alive and filters intersection entries
/// down to "load more" signals.
#[derive(Debug)]
pub struct VisibilitySensor<H> {
    state: SensorState<H>,
    threshold: f64,
}

impl<H: ObservationHandle> VisibilitySensor<H> {
    pub fn new(threshold: f64) -> Self {
        Self {
            state: SensorState::Unattached,
            threshold: threshold.clamp(0.0, FULLY_VISIBLE),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, SensorState::Attached(_))
    }

    pub fn is_observing(&self, target: &H::Target) -> bool {
        matches!(&self.state, SensorState::Attached(handle) if handle.target() == target)
    }

    /// Observes `target`, releasing whatever was observed before.
    ///
    /// Returns `Ok(true)` when a new observation was acquired and `Ok(false)`
    /// when `target` is already the observed one. If `acquire` fails the
    /// sensor is left unattached.
    pub fn attach_with<E>(
        &mut self,
        target: H::Target,
        acquire: impl FnOnce(H::Target) -> Result<H, E>,
    ) -> Result<bool, E> {
        if self.is_observing(&target) {
            return Ok(false);
        }
        self.detach();
        self.state = SensorState::Attached(acquire(target)?);
        Ok(true)
    }

    /// Returns whether an observation was released.
    pub fn detach(&mut self) -> bool {
        matches!(
            std::mem::replace(&mut self.state, SensorState::Unattached),
            SensorState::Attached(_)
        )
    }

    /// Follows the current marker reference: attaches to a new target,
    /// detaches when the reference is gone.
    pub fn sync_with<E>(
        &mut self,
        target: Option<H::Target>,
        acquire: impl FnOnce(H::Target) -> Result<H, E>,
    ) -> Result<bool, E> {
        match target {
            Some(target) => self.attach_with(target, acquire),
            None => {
                self.detach();
                Ok(false)
            }
        }
    }

    /// Whether an entry for `target` should emit one "load more" signal.
    ///
    /// Entries for anything but the currently observed target are stale and
    /// never signal.
    pub fn should_signal(&self, target: &H::Target, visibility: Visibility) -> bool {
        self.is_observing(target) && visibility.meets(self.threshold)
    }

    /// Number of "load more" signals one batch of intersection entries
    /// yields: one per entry that passes [`Self::should_signal`].
    pub fn count_signals(
        &self,
        entries: impl IntoIterator<Item = (H::Target, Visibility)>,
    ) -> usize {
        entries
            .into_iter()
            .filter(|(target, visibility)| self.should_signal(target, *visibility))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, convert::Infallible, rc::Rc};

    use super::*;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct FakeHandle {
        target: &'static str,
        released: Log,
    }

    impl ObservationHandle for FakeHandle {
        type Target = &'static str;

        fn target(&self) -> &&'static str {
            &self.target
        }
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.released.borrow_mut().push(self.target);
        }
    }

    fn observer(released: &Log) -> impl Fn(&'static str) -> Result<FakeHandle, Infallible> + '_ {
        move |target| {
            Ok(FakeHandle {
                target,
                released: released.clone(),
            })
        }
    }

    const VISIBLE: Visibility = Visibility {
        ratio: 1.0,
        is_intersecting: true,
    };

    #[test]
    fn unattached_sensor_never_signals() {
        let sensor = VisibilitySensor::<FakeHandle>::new(FULLY_VISIBLE);
        assert!(!sensor.is_attached());
        assert!(!sensor.should_signal(&"marker", VISIBLE));
    }

    #[test]
    fn fully_visible_marker_signals() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        assert_eq!(sensor.attach_with("marker", observer(&released)), Ok(true));
        assert!(sensor.should_signal(&"marker", VISIBLE));
    }

    #[test]
    fn partially_visible_marker_does_not_signal() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("marker", observer(&released)).unwrap();
        assert!(!sensor.should_signal(&"marker", Visibility::new(0.99, true)));
        assert!(!sensor.should_signal(&"marker", Visibility::new(0.5, true)));
        assert!(!sensor.should_signal(&"marker", Visibility::new(0.0, false)));
    }

    #[test]
    fn leaving_the_viewport_does_not_signal() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("marker", observer(&released)).unwrap();
        assert!(!sensor.should_signal(&"marker", Visibility::new(1.0, false)));
    }

    #[test]
    fn reattaching_releases_old_marker_and_ignores_its_entries() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("old", observer(&released)).unwrap();
        assert_eq!(sensor.attach_with("new", observer(&released)), Ok(true));

        assert_eq!(*released.borrow(), vec!["old"]);
        assert!(sensor.is_observing(&"new"));
        assert!(!sensor.should_signal(&"old", VISIBLE));
        assert!(sensor.should_signal(&"new", VISIBLE));
    }

    #[test]
    fn same_marker_is_not_reacquired() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("marker", observer(&released)).unwrap();
        assert_eq!(sensor.attach_with("marker", observer(&released)), Ok(false));
        assert!(released.borrow().is_empty());
    }

    #[test]
    fn cleared_reference_detaches() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.sync_with(Some("marker"), observer(&released)).unwrap();
        assert!(sensor.is_attached());

        assert_eq!(sensor.sync_with(None, observer(&released)), Ok(false));
        assert!(!sensor.is_attached());
        assert_eq!(*released.borrow(), vec!["marker"]);
        assert!(!sensor.should_signal(&"marker", VISIBLE));
    }

    #[test]
    fn dropping_the_sensor_releases_its_marker() {
        let released = Log::default();
        {
            let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
            sensor.attach_with("marker", observer(&released)).unwrap();
        }
        assert_eq!(*released.borrow(), vec!["marker"]);
    }

    #[test]
    fn failed_acquire_leaves_sensor_unattached() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("old", observer(&released)).unwrap();

        let result = sensor.attach_with("new", |_| Err::<FakeHandle, _>("observe threw"));
        assert_eq!(result, Err("observe threw"));
        assert!(!sensor.is_attached());
        assert_eq!(*released.borrow(), vec!["old"]);
    }

    #[test]
    fn lower_threshold_accepts_partial_visibility() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(0.5);
        sensor.attach_with("marker", observer(&released)).unwrap();
        assert!(sensor.should_signal(&"marker", Visibility::new(0.5, true)));
        assert!(!sensor.should_signal(&"marker", Visibility::new(0.25, true)));
    }

    #[test]
    fn stale_entries_in_a_batch_are_not_counted() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("old", observer(&released)).unwrap();
        sensor.attach_with("new", observer(&released)).unwrap();

        let batch = [
            ("old", VISIBLE),
            ("new", Visibility::new(0.4, true)),
            ("other", VISIBLE),
        ];
        assert_eq!(sensor.count_signals(batch), 0);
    }

    #[test]
    fn each_qualifying_entry_counts_once() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(FULLY_VISIBLE);
        sensor.attach_with("marker", observer(&released)).unwrap();

        let batch = [
            ("marker", VISIBLE),
            ("old", VISIBLE),
            ("marker", Visibility::new(0.5, true)),
            ("marker", VISIBLE),
        ];
        assert_eq!(sensor.count_signals(batch), 2);
        assert_eq!(sensor.count_signals(std::iter::empty()), 0);
    }

    #[test]
    fn out_of_range_threshold_still_signals_when_fully_visible() {
        let released = Log::default();
        let mut sensor = VisibilitySensor::new(1.5);
        assert_eq!(sensor.threshold(), FULLY_VISIBLE);
        sensor.attach_with("marker", observer(&released)).unwrap();
        assert_eq!(sensor.count_signals([("marker", VISIBLE)]), 1);
        assert_eq!(sensor.count_signals([("marker", Visibility::new(0.99, true))]), 0);
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(VisibilitySensor::<FakeHandle>::new(3.0).threshold(), FULLY_VISIBLE);
        assert_eq!(VisibilitySensor::<FakeHandle>::new(-1.0).threshold(), 0.0);
    }
}
