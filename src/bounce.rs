//! Bounded back-and-forth stepping shared by the rate level and the scan
//! position.
//!
//! A [`Sweep`] walks an integer between two inclusive bounds one step at a
//! time and reverses at the ends. Two endpoint policies exist because the two
//! users disagree on what "reaching the end" means:
//!
//! - [`Endpoint::Reflect`]: the step that lands on a bound flips the
//!   direction, so the next step leaves it. The rate level uses this: edges
//!   walk `0, -1, ..., -10, -9, ...` and never repeat a value at the ends.
//! - [`Endpoint::Hold`]: a step that would leave the range is clamped back
//!   onto the bound and the direction flips. The scan position uses this, so
//!   the end index is reported on two consecutive steps
//!   (`..., 8, 9, 9, 8, ...`).
//!
//! # Example
//!
//! ```rust
//! use rs_cylon::bounce::{Endpoint, Heading, Sweep};
//!
//! let mut level = Sweep::new(0, Heading::Down, -2, 2, Endpoint::Reflect);
//! let walk: Vec<i32> = (0..5).map(|_| level.step().value).collect();
//! assert_eq!(walk, vec![-1, -2, -1, 0, 1]);
//!
//! let mut pos = Sweep::new(0, Heading::Up, 0, 2, Endpoint::Hold);
//! let walk: Vec<i32> = (0..6).map(|_| pos.step().value).collect();
//! assert_eq!(walk, vec![1, 2, 2, 1, 0, 0]);
//! ```

/// Direction of travel within a [`Sweep`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Heading {
    /// Towards the upper bound (`+1`).
    Up,
    /// Towards the lower bound (`-1`).
    Down,
}

impl Heading {
    /// Signed unit step: `+1` for [`Up`](Self::Up), `-1` for
    /// [`Down`](Self::Down).
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_cylon::bounce::Heading;
    ///
    /// assert_eq!(Heading::Up.sign(), 1);
    /// assert_eq!(Heading::Down.sign(), -1);
    /// ```
    #[inline]
    pub const fn sign(&self) -> i32 {
        match self {
            Heading::Up => 1,
            Heading::Down => -1,
        }
    }

    /// The opposite heading.
    #[inline]
    pub const fn reversed(&self) -> Self {
        match self {
            Heading::Up => Heading::Down,
            Heading::Down => Heading::Up,
        }
    }
}

/// What happens when a [`Sweep`] meets one of its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Reverse on the step that lands exactly on a bound.
    Reflect,
    /// Clamp an overshooting step onto the bound, then reverse.
    Hold,
}

/// Outcome of a single [`Sweep::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stepped {
    /// Value after the step.
    pub value: i32,
    /// Heading after the step (already reversed if a bound was hit).
    pub heading: Heading,
    /// Whether this step turned around at a bound.
    pub bounced: bool,
}

/// Integer walking between `min` and `max` (inclusive), reversing at the ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sweep {
    value: i32,
    heading: Heading,
    min: i32,
    max: i32,
    endpoint: Endpoint,
}

impl Sweep {
    /// Create a sweep at `value`, moving towards `heading`.
    ///
    /// `value` is clamped into `[min, max]`. If `min > max` the bounds are
    /// swapped.
    pub fn new(value: i32, heading: Heading, min: i32, max: i32, endpoint: Endpoint) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            value: value.clamp(min, max),
            heading,
            min,
            max,
            endpoint,
        }
    }

    /// Current value.
    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Current heading.
    #[inline]
    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Lower bound.
    #[inline]
    pub fn min(&self) -> i32 {
        self.min
    }

    /// Upper bound.
    #[inline]
    pub fn max(&self) -> i32 {
        self.max
    }

    /// Advance by one step in the current heading.
    pub fn step(&mut self) -> Stepped {
        if self.min == self.max {
            return Stepped {
                value: self.value,
                heading: self.heading,
                bounced: false,
            };
        }

        let next = self.value.saturating_add(self.heading.sign());
        let mut bounced = false;

        match self.endpoint {
            Endpoint::Reflect => {
                // A reflecting sweep can start on a bound facing outwards
                // (e.g. constructed at max heading Up); turn first.
                let next = if next > self.max || next < self.min {
                    self.heading = self.heading.reversed();
                    self.value.saturating_add(self.heading.sign())
                } else {
                    next
                };
                self.value = next;
                if (next == self.max && self.heading == Heading::Up)
                    || (next == self.min && self.heading == Heading::Down)
                {
                    self.heading = self.heading.reversed();
                    bounced = true;
                }
            }
            Endpoint::Hold => {
                if next > self.max {
                    self.value = self.max;
                    self.heading = Heading::Down;
                    bounced = true;
                } else if next < self.min {
                    self.value = self.min;
                    self.heading = Heading::Up;
                    bounced = true;
                } else {
                    self.value = next;
                }
            }
        }

        Stepped {
            value: self.value,
            heading: self.heading,
            bounced,
        }
    }
}
