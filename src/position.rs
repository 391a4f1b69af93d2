//! Scan position state machine.
//!
//! [`AnimationPosition`] tracks which line is lit and which one to turn off
//! next. Each call to [`advance`](AnimationPosition::advance) yields the
//! [`Frame`] for one tick and moves the position one step, holding for one
//! extra tick at either end before reversing.
//!
//! ```rust
//! use rs_cylon::position::AnimationPosition;
//!
//! let mut pos = AnimationPosition::new(3);
//! let lit: Vec<usize> = (0..8).map(|_| pos.advance().on).collect();
//! assert_eq!(lit, vec![0, 1, 2, 2, 1, 0, 0, 1]);
//! ```

use crate::bounce::{Endpoint, Heading, Sweep};

/// Line changes for one tick: turn `off` off (if any), then `on` on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Line lit by the previous tick.
    pub off: Option<usize>,
    /// Line to light this tick.
    pub on: usize,
}

/// Position of the lit line within the array.
///
/// Owned by the animation engine alone; never shared across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationPosition {
    sweep: Sweep,
    previous: Option<usize>,
}

impl AnimationPosition {
    /// Start at line 0, ascending, with nothing lit yet.
    ///
    /// A `line_count` of zero is treated as one line.
    pub fn new(line_count: usize) -> Self {
        let last = i32::try_from(line_count.saturating_sub(1)).unwrap_or(i32::MAX);
        Self {
            sweep: Sweep::new(0, Heading::Up, 0, last, Endpoint::Hold),
            previous: None,
        }
    }

    /// Line that the next tick will light.
    #[inline]
    pub fn current(&self) -> usize {
        // The sweep is bounded to [0, last], never negative.
        self.sweep.value() as usize
    }

    /// Line lit by the last tick, if any tick has run.
    #[inline]
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Whether the sweep is moving towards the last line.
    #[inline]
    pub fn ascending(&self) -> bool {
        self.sweep.heading() == Heading::Up
    }

    /// Produce this tick's frame and step to the next position.
    pub fn advance(&mut self) -> Frame {
        let frame = Frame {
            off: self.previous,
            on: self.current(),
        };
        self.previous = Some(frame.on);
        self.sweep.step();
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn initial_state() {
        let pos = AnimationPosition::new(10);
        assert_eq!(pos.current(), 0);
        assert_eq!(pos.previous(), None);
        assert!(pos.ascending());
    }

    #[test]
    fn first_frame_turns_nothing_off() {
        let mut pos = AnimationPosition::new(10);
        assert_eq!(pos.advance(), Frame { off: None, on: 0 });
        assert_eq!(pos.advance(), Frame { off: Some(0), on: 1 });
    }

    #[test]
    fn ten_lines_full_cycle() {
        let mut pos = AnimationPosition::new(10);
        let lit: Vec<usize> = (0..23).map(|_| pos.advance().on).collect();
        assert_eq!(
            lit,
            [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2]
        );
    }

    #[test]
    fn off_always_trails_on() {
        let mut pos = AnimationPosition::new(4);
        let mut last_on = None;
        for _ in 0..50 {
            let frame = pos.advance();
            assert_eq!(frame.off, last_on);
            last_on = Some(frame.on);
        }
    }

    #[test]
    fn direction_flips_after_clamp() {
        let mut pos = AnimationPosition::new(2);
        pos.advance(); // lights 0, moves to 1
        assert!(pos.ascending());
        pos.advance(); // lights 1, clamps at 1
        assert!(!pos.ascending());
        assert_eq!(pos.current(), 1);
    }

    #[test]
    fn single_line_stays_lit() {
        let mut pos = AnimationPosition::new(1);
        for _ in 0..5 {
            assert_eq!(pos.advance().on, 0);
        }
    }

    #[test]
    fn zero_lines_behaves_as_one() {
        let mut pos = AnimationPosition::new(0);
        assert_eq!(pos.advance().on, 0);
        assert_eq!(pos.advance().on, 0);
    }
}
