use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Classifies a signed delta. Only an exact zero is flat.
    pub fn of(delta: f64) -> Self {
        if delta > 0.0 {
            Direction::Up
        } else if delta < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Flat => "FLAT",
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
            Direction::Flat => "→",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Direction::Up => "🟢",
            Direction::Down => "🔴",
            Direction::Flat => "⚪",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChangeResult {
    pub absolute_change: f64,
    /// `None` when the previous value is zero.
    pub percent_change: Option<f64>,
    pub direction: Direction,
}

/// Day-over-day change between two observations. Values are kept at full
/// precision; rounding happens when rendering.
pub fn compute(latest: f64, previous: f64) -> ChangeResult {
    let absolute_change = latest - previous;

    let percent_change = if previous == 0.0 {
        None
    } else {
        let pct = absolute_change / previous * 100.0;
        pct.is_finite().then_some(pct)
    };

    ChangeResult {
        absolute_change,
        percent_change,
        direction: Direction::of(absolute_change),
    }
}
