//! Scroll sentinel that signals when the list end comes into view.

/// Edge-triggered "near bottom" detector for a scrolled list.
///
/// The sentinel is the virtual row just past the last loaded item. It counts
/// as intersecting when it lies within the viewport or within `margin` rows
/// below it.
#[derive(Debug, Clone)]
pub struct ScrollSentinel {
    margin: usize,
    intersecting: bool,
    active: bool,
}

impl ScrollSentinel {
    pub fn new(margin: usize) -> Self {
        Self {
            margin,
            intersecting: false,
            active: true,
        }
    }

    /// Update with the current viewport. Returns true exactly once per
    /// not-intersecting to intersecting transition.
    pub fn observe(&mut self, viewport_offset: usize, viewport_height: usize, content_len: usize) -> bool {
        if !self.active {
            return false;
        }
        let reach = viewport_offset
            .saturating_add(viewport_height)
            .saturating_add(self.margin);
        let now = content_len < reach;
        let fired = now && !self.intersecting;
        self.intersecting = now;
        fired
    }

    /// Forget the last observation so the next intersecting view fires again.
    pub fn rearm(&mut self) {
        self.intersecting = false;
    }

    /// Stop observing. No signal fires afterwards.
    pub fn teardown(&mut self) {
        self.active = false;
        self.intersecting = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
