use std::fmt;
use std::time::Duration;

/// Work done on one level during a run
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStats {
    pub zoom: u32,
    /// Tiles written
    pub tiles: usize,
    /// Tiles rebuilt but dropped because they came out blank
    pub blank: usize,
    pub elapsed: Duration,
}

impl LevelStats {
    pub fn new(zoom: u32, tiles: usize, blank: usize, elapsed: Duration) -> Self {
        Self {
            zoom,
            tiles,
            blank,
            elapsed,
        }
    }

    pub fn tiles_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.tiles as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for LevelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{}: {} tiles ({} blank) in {:.2}s, {:.1} tiles/s",
            self.zoom,
            self.tiles,
            self.blank,
            self.elapsed.as_secs_f64(),
            self.tiles_per_second()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate() {
        let stats = LevelStats::new(3, 50, 2, Duration::from_millis(500));
        assert_eq!(stats.tiles_per_second(), 100.0);
        assert!(stats.to_string().starts_with("z3: 50 tiles (2 blank)"));
        assert_eq!(LevelStats::new(1, 5, 0, Duration::ZERO).tiles_per_second(), 0.0);
    }
}
