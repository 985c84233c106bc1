use std::ops::RangeInclusive;

use chrono::{Days, NaiveDate};
use thiserror::Error;

pub const WHITE_PICK: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub date: NaiveDate,
    pub white_balls: [u8; WHITE_PICK],
    pub powerball: u8,
    pub multiplier: Option<u8>,
}

impl Draw {
    /// Builds a validated draw. `white_balls` is a slice so that callers
    /// parsing free-form input get a count error instead of a panic.
    pub fn new(
        date: NaiveDate,
        white_balls: &[u8],
        powerball: u8,
        multiplier: Option<u8>,
    ) -> Result<Self, DrawError> {
        validate_draw(white_balls, powerball)?;
        let mut balls = [0u8; WHITE_PICK];
        balls.copy_from_slice(white_balls);
        Ok(Self {
            date,
            white_balls: balls,
            powerball,
            multiplier,
        })
    }

    pub fn sorted_white_balls(&self) -> [u8; WHITE_PICK] {
        let mut sorted = self.white_balls;
        sorted.sort_unstable();
        sorted
    }

    pub fn validate(&self) -> Result<(), DrawError> {
        validate_draw(&self.white_balls, self.powerball)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    WhiteBalls,
    Powerball,
}

impl Domain {
    pub fn size(&self) -> usize {
        match self {
            Domain::WhiteBalls => 69,
            Domain::Powerball => 26,
        }
    }

    pub fn pick_count(&self) -> usize {
        match self {
            Domain::WhiteBalls => WHITE_PICK,
            Domain::Powerball => 1,
        }
    }

    pub fn numbers(&self) -> RangeInclusive<u8> {
        1..=self.size() as u8
    }

    pub fn contains(&self, number: u8) -> bool {
        number >= 1 && number as usize <= self.size()
    }

    pub fn numbers_from<'a>(&self, draw: &'a Draw) -> &'a [u8] {
        match self {
            Domain::WhiteBalls => &draw.white_balls,
            Domain::Powerball => std::slice::from_ref(&draw.powerball),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::WhiteBalls => write!(f, "white ball"),
            Domain::Powerball => write!(f, "powerball"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("expected {expected} white balls, got {got}")]
    WrongCount { expected: usize, got: usize },
    #[error("{domain} {value} out of range (1-{max})")]
    OutOfRange { domain: Domain, value: u8, max: usize },
    #[error("duplicate white ball: {0}")]
    Duplicate(u8),
}

pub fn validate_draw(white_balls: &[u8], powerball: u8) -> Result<(), DrawError> {
    if white_balls.len() != WHITE_PICK {
        return Err(DrawError::WrongCount {
            expected: WHITE_PICK,
            got: white_balls.len(),
        });
    }
    for &b in white_balls {
        if !Domain::WhiteBalls.contains(b) {
            return Err(DrawError::OutOfRange {
                domain: Domain::WhiteBalls,
                value: b,
                max: Domain::WhiteBalls.size(),
            });
        }
    }
    if !Domain::Powerball.contains(powerball) {
        return Err(DrawError::OutOfRange {
            domain: Domain::Powerball,
            value: powerball,
            max: Domain::Powerball.size(),
        });
    }
    for i in 0..white_balls.len() {
        for j in (i + 1)..white_balls.len() {
            if white_balls[i] == white_balls[j] {
                return Err(DrawError::Duplicate(white_balls[i]));
            }
        }
    }
    Ok(())
}

/// Deterministic, chronologically ascending draws for tests.
/// Dates alternate Wednesday / Saturday starting 2020-01-01.
pub fn make_test_draws(n: usize) -> Vec<Draw> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
    (0..n)
        .map(|i| {
            let offset = (i / 2) * 7 + if i % 2 == 0 { 0 } else { 3 };
            let date = start + Days::new(offset as u64);

            let seed = i * 31 + 7;
            let step = (i % 9 + 5) * 3;
            let mut balls = [0u8; WHITE_PICK];
            for j in 0..WHITE_PICK {
                let mut n = ((seed + j * step) % 69) as u8 + 1;
                while balls[..j].contains(&n) {
                    n = n % 69 + 1;
                }
                balls[j] = n;
            }

            Draw {
                date,
                white_balls: balls,
                powerball: ((i * 5) % 26) as u8 + 1,
                multiplier: if i % 3 == 0 { Some(2) } else { None },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_draw_ok() {
        assert!(validate_draw(&[1, 2, 3, 4, 5], 1).is_ok());
        assert!(validate_draw(&[69, 68, 67, 66, 65], 26).is_ok());
    }

    #[test]
    fn test_validate_draw_wrong_count() {
        assert_eq!(
            validate_draw(&[1, 2, 3, 4], 1),
            Err(DrawError::WrongCount { expected: 5, got: 4 })
        );
        assert!(validate_draw(&[1, 2, 3, 4, 5, 6], 1).is_err());
    }

    #[test]
    fn test_validate_draw_white_out_of_range() {
        assert!(validate_draw(&[0, 2, 3, 4, 5], 1).is_err());
        assert!(validate_draw(&[1, 2, 3, 4, 70], 1).is_err());
    }

    #[test]
    fn test_validate_draw_powerball_out_of_range() {
        assert!(validate_draw(&[1, 2, 3, 4, 5], 0).is_err());
        assert!(matches!(
            validate_draw(&[1, 2, 3, 4, 5], 27),
            Err(DrawError::OutOfRange { domain: Domain::Powerball, value: 27, .. })
        ));
    }

    #[test]
    fn test_validate_draw_duplicate_white() {
        assert_eq!(validate_draw(&[1, 1, 3, 4, 5], 1), Err(DrawError::Duplicate(1)));
    }

    #[test]
    fn test_domain_size() {
        assert_eq!(Domain::WhiteBalls.size(), 69);
        assert_eq!(Domain::Powerball.size(), 26);
        assert_eq!(Domain::WhiteBalls.numbers().count(), 69);
    }

    #[test]
    fn test_domain_numbers_from() {
        let draw = Draw::new(
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            &[10, 20, 30, 40, 50],
            7,
            None,
        )
        .unwrap();
        assert_eq!(Domain::WhiteBalls.numbers_from(&draw), &[10, 20, 30, 40, 50]);
        assert_eq!(Domain::Powerball.numbers_from(&draw), &[7]);
    }

    #[test]
    fn test_sorted_white_balls() {
        let draw = Draw::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), &[50, 3, 27, 1, 9], 4, Some(3))
            .unwrap();
        assert_eq!(draw.sorted_white_balls(), [1, 3, 9, 27, 50]);
        assert_eq!(draw.white_balls, [50, 3, 27, 1, 9]);
    }

    #[test]
    fn test_make_test_draws_valid_and_ordered() {
        let draws = make_test_draws(120);
        assert_eq!(draws.len(), 120);
        for d in &draws {
            assert!(d.validate().is_ok(), "invalid test draw {:?}", d);
        }
        assert!(draws.windows(2).all(|w| w[0].date < w[1].date));
    }
}
