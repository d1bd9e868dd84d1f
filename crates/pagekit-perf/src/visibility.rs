//! Visibility Detector
//!
//! Reports when observed elements enter or leave the viewport. Layout is
//! external: the embedder calls [`VisibilityDetector::update`] with the
//! current viewport and element rectangles after scrolling or relayout.
//!
//! When intersection observation is unavailable, or there is no element to
//! observe, the callback is told "visible" once and nothing is tracked.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use pagekit_dom::{DomRect, NodeId, RootMargin};

use crate::PerfError;

/// Default visibility threshold (10% of the element)
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Intersection configuration
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityOptions {
    /// CSS-style margin around the viewport, e.g. `"200px 0px"`
    pub root_margin: String,
    /// Ratios whose crossing triggers a report
    pub threshold: Vec<f32>,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            root_margin: "0px".to_string(),
            threshold: vec![DEFAULT_THRESHOLD],
        }
    }
}

impl VisibilityOptions {
    pub fn with_root_margin(mut self, margin: &str) -> Self {
        self.root_margin = margin.to_string();
        self
    }

    pub fn with_threshold(mut self, threshold: Vec<f32>) -> Self {
        self.threshold = threshold;
        self
    }
}

type Callback = Rc<RefCell<dyn FnMut(bool)>>;

struct Observation {
    id: u64,
    target: NodeId,
    margin: RootMargin,
    thresholds: Vec<f32>,
    last_ratio: Option<f32>,
    callback: Callback,
    active: Rc<Cell<bool>>,
}

impl Observation {
    /// First evaluation, a threshold crossing, or a flip of the intersecting state
    fn crossed(&self, ratio: f32) -> bool {
        match self.last_ratio {
            None => true,
            Some(last) => {
                (last > 0.0) != (ratio > 0.0)
                    || self
                        .thresholds
                        .iter()
                        .any(|&t| (last < t && ratio >= t) || (last >= t && ratio < t))
            }
        }
    }
}

type Layout = (DomRect, HashMap<NodeId, DomRect>);

#[derive(Default)]
struct ObserverRegistry {
    next_id: u64,
    observations: Vec<Observation>,
    /// An `update` pass is delivering callbacks
    delivering: bool,
    /// Latest layout passed to `update` from inside a callback
    queued: Option<Layout>,
}

/// Clears the delivering flag, even if a callback panics
struct Delivery<'a>(&'a RefCell<ObserverRegistry>);

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.0.try_borrow_mut() {
            registry.delivering = false;
            registry.queued = None;
        }
    }
}

/// Viewport intersection tracker
#[derive(Clone)]
pub struct VisibilityDetector {
    supported: bool,
    registry: Rc<RefCell<ObserverRegistry>>,
}

impl VisibilityDetector {
    pub fn new() -> Self {
        Self {
            supported: true,
            registry: Rc::new(RefCell::new(ObserverRegistry::default())),
        }
    }

    /// A detector for runtimes without intersection observation
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    /// Number of live observations
    pub fn observer_count(&self) -> usize {
        self.registry.borrow().observations.len()
    }

    /// Call `callback` with the element's intersection state whenever it
    /// crosses one of the thresholds.
    pub fn observe_element_visibility(
        &self,
        element: Option<NodeId>,
        callback: impl FnMut(bool) + 'static,
        options: &VisibilityOptions,
    ) -> Result<VisibilityHandle, PerfError> {
        let target = match element {
            Some(target) if self.supported => target,
            _ => {
                tracing::debug!(supported = self.supported, "visibility fail-open");
                let mut callback = callback;
                callback(true);
                return Ok(VisibilityHandle::detached());
            }
        };

        let margin = RootMargin::parse(&options.root_margin)?;
        let mut thresholds = options.threshold.clone();
        if let Some(&bad) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(PerfError::InvalidThreshold(bad));
        }
        if thresholds.is_empty() {
            thresholds.push(0.0);
        }

        let active = Rc::new(Cell::new(true));
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observations.push(Observation {
            id,
            target,
            margin,
            thresholds,
            last_ratio: None,
            callback: Rc::new(RefCell::new(callback)),
            active: Rc::clone(&active),
        });

        Ok(VisibilityHandle {
            id,
            active,
            registry: Rc::downgrade(&self.registry),
        })
    }

    /// Re-evaluate every observation. Returns the number of reports made.
    ///
    /// Called from inside a visibility callback, the pass is deferred until
    /// the current delivery finishes and this returns 0. Only the latest
    /// deferred layout is evaluated.
    pub fn update(&self, viewport: DomRect, rects: &HashMap<NodeId, DomRect>) -> usize {
        {
            let mut registry = self.registry.borrow_mut();
            if registry.delivering {
                registry.queued = Some((viewport, rects.clone()));
                return 0;
            }
            registry.delivering = true;
        }
        let _delivery = Delivery(&self.registry);

        let mut delivered = self.deliver(viewport, rects);
        loop {
            let queued = self.registry.borrow_mut().queued.take();
            let Some((viewport, rects)) = queued else {
                break;
            };
            delivered += self.deliver(viewport, &rects);
        }
        delivered
    }

    fn deliver(&self, viewport: DomRect, rects: &HashMap<NodeId, DomRect>) -> usize {
        let mut reports: Vec<(Callback, Rc<Cell<bool>>, bool)> = Vec::new();
        {
            let mut registry = self.registry.borrow_mut();
            for obs in registry.observations.iter_mut() {
                let Some(rect) = rects.get(&obs.target) else {
                    continue;
                };
                let root = obs.margin.apply(viewport);
                let ratio = rect.visible_ratio(&root);
                if obs.crossed(ratio) {
                    obs.last_ratio = Some(ratio);
                    reports.push((Rc::clone(&obs.callback), Rc::clone(&obs.active), ratio > 0.0));
                }
            }
        }

        let mut delivered = 0;
        for (callback, active, is_intersecting) in reports {
            // An earlier callback may have disconnected this one
            if active.get() {
                let mut callback = callback.borrow_mut();
                (&mut *callback)(is_intersecting);
                delivered += 1;
            }
        }
        delivered
    }
}

impl Default for VisibilityDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Cleanup for one observation
pub struct VisibilityHandle {
    id: u64,
    active: Rc<Cell<bool>>,
    registry: Weak<RefCell<ObserverRegistry>>,
}

impl VisibilityHandle {
    fn detached() -> Self {
        Self {
            id: 0,
            active: Rc::new(Cell::new(false)),
            registry: Weak::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stop observing. Safe to call more than once.
    pub fn disconnect(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().observations.retain(|o| o.id != self.id);
        }
    }
}
