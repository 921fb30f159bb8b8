//! Edge auto-scroll while a drag selection is in progress.
//!
//! Scrolling runs on its own frame loop so it keeps going while the pointer
//! rests near an edge and no move events arrive.

use std::rc::Rc;

use serde::Deserialize;

use crate::scheduler::{FrameLoop, Scheduler};
use crate::types::{Point, Rect};

/// The scrollable element that hosts the grid.
pub trait ScrollContainer {
    /// Visible box of the container in viewport pixels.
    fn bounds(&self) -> Rect;

    /// Scroll by a pixel delta. Returns true if the scroll position moved.
    fn scroll_by(&self, dx: f64, dy: f64, smooth: bool) -> bool;
}

/// Tuning for edge auto-scroll.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoScrollConfig {
    /// Distance from an edge (px) at which scrolling starts.
    pub edge_threshold: f64,
    /// Pixels scrolled per frame at 1x speed.
    pub base_step: f64,
    /// Speed multiplier once the pointer is outside the container.
    pub max_multiplier: f64,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        Self {
            edge_threshold: 50.0,
            base_step: 20.0,
            max_multiplier: 2.0,
        }
    }
}

/// Per-frame scroll delta for a pointer at `pointer` over a container at `bounds`.
///
/// Inside the threshold band the multiplier climbs linearly from 1x to
/// `max_multiplier` at the edge; past the edge it stays at `max_multiplier`.
pub fn scroll_velocity(pointer: Point, bounds: &Rect, config: &AutoScrollConfig) -> (f64, f64) {
    let dx = edge_speed(pointer.x - bounds.left(), config)
        .map(|s| -s)
        .or_else(|| edge_speed(bounds.right() - pointer.x, config))
        .unwrap_or(0.0);
    let dy = edge_speed(pointer.y - bounds.top(), config)
        .map(|s| -s)
        .or_else(|| edge_speed(bounds.bottom() - pointer.y, config))
        .unwrap_or(0.0);
    (dx, dy)
}

/// Scroll speed toward an edge the pointer is `distance` px inside of
/// (negative when outside), or `None` when outside the threshold band.
fn edge_speed(distance: f64, config: &AutoScrollConfig) -> Option<f64> {
    if config.edge_threshold <= 0.0 || distance >= config.edge_threshold {
        return None;
    }
    let multiplier = if distance < 0.0 {
        config.max_multiplier
    } else {
        let closeness = (config.edge_threshold - distance) / config.edge_threshold;
        1.0 + (config.max_multiplier - 1.0) * closeness
    };
    Some(config.base_step * multiplier)
}

/// Drives the scroll container for the length of one drag session.
pub struct AutoScroller {
    frame_loop: Option<FrameLoop>,
}

impl AutoScroller {
    pub fn new() -> Self {
        Self { frame_loop: None }
    }

    /// Start the loop. Each frame reads the last pointer position through
    /// `pointer`, scrolls `container`, and calls `on_scrolled` when the
    /// container actually moved. `pointer` returning `None` ends the loop.
    pub fn start(
        &mut self,
        scheduler: Rc<dyn Scheduler>,
        container: Rc<dyn ScrollContainer>,
        config: AutoScrollConfig,
        pointer: impl Fn() -> Option<Point> + 'static,
        on_scrolled: impl Fn() + 'static,
    ) {
        self.stop();
        log::debug!("auto-scroll started");
        self.frame_loop = Some(FrameLoop::start(scheduler, move || {
            let Some(point) = pointer() else {
                return false;
            };
            let (dx, dy) = scroll_velocity(point, &container.bounds(), &config);
            if (dx != 0.0 || dy != 0.0) && container.scroll_by(dx, dy, false) {
                on_scrolled();
            }
            true
        }));
    }

    pub fn stop(&mut self) {
        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
            log::debug!("auto-scroll stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.as_ref().is_some_and(FrameLoop::is_running)
    }
}

impl Default for AutoScroller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;
    use std::cell::Cell;

    struct FakeContainer {
        bounds: Rect,
        offset: Cell<(f64, f64)>,
        max_y: f64,
    }

    impl ScrollContainer for FakeContainer {
        fn bounds(&self) -> Rect {
            self.bounds
        }

        fn scroll_by(&self, dx: f64, dy: f64, _smooth: bool) -> bool {
            let (x, y) = self.offset.get();
            let ny = (y + dy).clamp(0.0, self.max_y);
            let nx = (x + dx).max(0.0);
            self.offset.set((nx, ny));
            (nx - x).abs() > f64::EPSILON || (ny - y).abs() > f64::EPSILON
        }
    }

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 400.0, 300.0)
    }

    #[test]
    fn test_no_scroll_in_the_middle() {
        let config = AutoScrollConfig::default();
        assert_eq!(scroll_velocity(Point::new(200.0, 150.0), &bounds(), &config), (0.0, 0.0));
    }

    #[test]
    fn test_speed_grows_toward_edge() {
        let config = AutoScrollConfig::default();
        let (_, at_threshold_edge) = scroll_velocity(Point::new(200.0, 299.0), &bounds(), &config);
        let (_, mid_band) = scroll_velocity(Point::new(200.0, 275.0), &bounds(), &config);
        assert!(at_threshold_edge > mid_band);
        assert!(mid_band >= 20.0);
        assert!(at_threshold_edge < 40.0);
    }

    #[test]
    fn test_outside_uses_max_multiplier() {
        let config = AutoScrollConfig::default();
        assert_eq!(scroll_velocity(Point::new(200.0, 320.0), &bounds(), &config), (0.0, 40.0));
        assert_eq!(scroll_velocity(Point::new(-5.0, 150.0), &bounds(), &config), (-40.0, 0.0));
        assert_eq!(scroll_velocity(Point::new(200.0, -1.0), &bounds(), &config), (0.0, -40.0));
    }

    #[test]
    fn test_corner_scrolls_both_axes() {
        let config = AutoScrollConfig::default();
        let (dx, dy) = scroll_velocity(Point::new(410.0, 310.0), &bounds(), &config);
        assert_eq!((dx, dy), (40.0, 40.0));
    }

    #[test]
    fn test_loop_scrolls_and_notifies_until_stopped() {
        let scheduler = ManualScheduler::new();
        let container = Rc::new(FakeContainer {
            bounds: bounds(),
            offset: Cell::new((0.0, 0.0)),
            max_y: 100.0,
        });
        let notified = Rc::new(Cell::new(0));
        let n = Rc::clone(&notified);
        let mut scroller = AutoScroller::new();
        scroller.start(
            scheduler.clone(),
            container.clone(),
            AutoScrollConfig::default(),
            || Some(Point::new(200.0, 350.0)),
            move || n.set(n.get() + 1),
        );

        scheduler.run_frames(4);
        // 40 px per frame, clamped at 100: three real scrolls then none.
        assert_eq!(container.offset.get().1, 100.0);
        assert_eq!(notified.get(), 3);
        assert!(scroller.is_running());

        scroller.stop();
        assert!(!scroller.is_running());
        assert_eq!(scheduler.pending_frames(), 0);
    }

    #[test]
    fn test_loop_ends_when_pointer_is_gone() {
        let scheduler = ManualScheduler::new();
        let container = Rc::new(FakeContainer {
            bounds: bounds(),
            offset: Cell::new((0.0, 0.0)),
            max_y: 100.0,
        });
        let mut scroller = AutoScroller::new();
        scroller.start(
            scheduler.clone(),
            container,
            AutoScrollConfig::default(),
            || None,
            || {},
        );
        scheduler.run_frame();
        assert!(!scroller.is_running());
        assert_eq!(scheduler.pending_frames(), 0);
    }
}
