// src/adjustment/locate.rs

use crate::frame::YearSet;

/// Which way the safe-year walk moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    pub fn step(self) -> i32 {
        match self {
            Direction::Backward => -1,
            Direction::Forward => 1,
        }
    }

    fn passed(self, year: i32, bound: i32) -> bool {
        match self {
            Direction::Backward => year <= bound,
            Direction::Forward => year >= bound,
        }
    }
}

/// Nearest year from `start_year` in `direction` that is not flagged.
///
/// The first candidate is `start_year + step`. The walk stops at `bound`
/// and returns it whether or not it is flagged; whether a value exists there
/// is the caller's concern.
pub fn find_safe_year(start_year: i32, flagged_years: &YearSet, direction: Direction, bound: i32) -> i32 {
    let mut year = start_year + direction.step();
    loop {
        if direction.passed(year, bound) {
            return bound;
        }
        if !flagged_years.contains(&year) {
            return year;
        }
        year += direction.step();
    }
}
