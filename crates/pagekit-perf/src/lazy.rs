//! Lazy mounting
//!
//! Defers building a heavy fragment until its placeholder element first
//! becomes visible.

use std::cell::RefCell;
use std::rc::Rc;

use pagekit_dom::NodeId;

use crate::{PerfError, VisibilityDetector, VisibilityHandle, VisibilityOptions};

enum MountState<T> {
    Waiting(Box<dyn FnOnce() -> T>),
    /// Factory is running
    Building,
    Mounted(T),
    Taken,
}

impl<T> MountState<T> {
    /// Run the factory if it has not run yet
    fn mount(state: &RefCell<Self>) {
        let factory = {
            let mut current = state.borrow_mut();
            match std::mem::replace(&mut *current, MountState::Building) {
                MountState::Waiting(factory) => factory,
                other => {
                    *current = other;
                    return;
                }
            }
        };
        let value = factory();
        *state.borrow_mut() = MountState::Mounted(value);
    }
}

/// A value built on first visibility of its element
pub struct LazyMount<T> {
    state: Rc<RefCell<MountState<T>>>,
    handle: Rc<RefCell<Option<VisibilityHandle>>>,
}

impl<T: 'static> LazyMount<T> {
    pub fn new(
        detector: &VisibilityDetector,
        element: Option<NodeId>,
        options: &VisibilityOptions,
        factory: impl FnOnce() -> T + 'static,
    ) -> Result<Self, PerfError> {
        let state: Rc<RefCell<MountState<T>>> =
            Rc::new(RefCell::new(MountState::Waiting(Box::new(factory))));
        let handle: Rc<RefCell<Option<VisibilityHandle>>> = Rc::new(RefCell::new(None));

        let cb_state = Rc::clone(&state);
        let cb_handle = Rc::clone(&handle);
        let observer = detector.observe_element_visibility(
            element,
            move |visible| {
                if !visible {
                    return;
                }
                MountState::mount(&cb_state);
                if let Some(handle) = cb_handle.borrow().as_ref() {
                    handle.disconnect();
                }
            },
            options,
        )?;

        let mount = Self { state, handle };
        if mount.is_mounted() {
            // Fail-open mounted synchronously
            observer.disconnect();
        } else {
            *mount.handle.borrow_mut() = Some(observer);
        }
        Ok(mount)
    }

    pub fn is_mounted(&self) -> bool {
        matches!(*self.state.borrow(), MountState::Mounted(_))
    }

    /// Build now regardless of visibility
    pub fn mount_now(&self) {
        MountState::mount(&self.state);
        self.disconnect();
    }

    /// Borrow the built value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        match &*self.state.borrow() {
            MountState::Mounted(value) => Some(f(value)),
            _ => None,
        }
    }

    /// Move the built value out
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.borrow_mut();
        match std::mem::replace(&mut *state, MountState::Taken) {
            MountState::Mounted(value) => Some(value),
            other => {
                *state = other;
                None
            }
        }
    }

    fn disconnect(&self) {
        if let Some(handle) = self.handle.borrow_mut().take() {
            handle.disconnect();
        }
    }
}

impl<T> Drop for LazyMount<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.borrow_mut().take() {
            handle.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use pagekit_dom::DomRect;

    #[test]
    fn test_mounts_on_first_visibility() {
        let detector = VisibilityDetector::new();
        let node = NodeId::from_raw(7);
        let builds = Rc::new(Cell::new(0));
        let b = Rc::clone(&builds);

        let lazy = LazyMount::new(&detector, Some(node), &VisibilityOptions::default(), move || {
            b.set(b.get() + 1);
            "pricing table"
        })
        .unwrap();
        assert!(!lazy.is_mounted());

        let viewport = DomRect::new(0.0, 0.0, 800.0, 600.0);
        let mut rects = HashMap::new();
        rects.insert(node, DomRect::new(0.0, 900.0, 100.0, 100.0));
        detector.update(viewport, &rects);
        assert!(!lazy.is_mounted());

        rects.insert(node, DomRect::new(0.0, 100.0, 100.0, 100.0));
        detector.update(viewport, &rects);
        assert!(lazy.is_mounted());
        assert_eq!(lazy.with(|s| s.len()), Some(13));
        assert_eq!(detector.observer_count(), 0);

        rects.insert(node, DomRect::new(0.0, 900.0, 100.0, 100.0));
        detector.update(viewport, &rects);
        rects.insert(node, DomRect::new(0.0, 100.0, 100.0, 100.0));
        detector.update(viewport, &rects);
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_fail_open_mounts_immediately() {
        let detector = VisibilityDetector::unsupported();
        let lazy = LazyMount::new(&detector, Some(NodeId::from_raw(1)), &VisibilityOptions::default(), || 42)
            .unwrap();

        assert!(lazy.is_mounted());
        assert_eq!(lazy.take(), Some(42));
        assert_eq!(lazy.take(), None);
        assert!(!lazy.is_mounted());
    }

    #[test]
    fn test_drop_disconnects() {
        let detector = VisibilityDetector::new();
        let lazy = LazyMount::new(&detector, Some(NodeId::from_raw(1)), &VisibilityOptions::default(), || ())
            .unwrap();
        assert_eq!(detector.observer_count(), 1);

        drop(lazy);
        assert_eq!(detector.observer_count(), 0);
    }

    #[test]
    fn test_mount_now() {
        let detector = VisibilityDetector::new();
        let lazy = LazyMount::new(&detector, Some(NodeId::from_raw(1)), &VisibilityOptions::default(), || 5)
            .unwrap();
        lazy.mount_now();
        assert_eq!(lazy.with(|v| *v), Some(5));
        assert_eq!(detector.observer_count(), 0);
    }
}
