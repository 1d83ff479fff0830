//! Small helpers shared by the library and the CLI: value parsing, digit
//! grouping, wall-clock progress reporting.

use crate::Ratiof32;
use crate::system_matrix::LOR;

/// Parse a whitespace-separated `t1 t2 x1 y1 z1 x2 y2 z2` LOR record
/// (times in ps, positions in mm).
pub fn parse_lor(s: &str) -> Result<LOR, String> {
    let n = s.split_whitespace().collect::<Vec<_>>();
    if n.len() != 8 {
        return Err(format!("expected 8 values, found {}", n.len()));
    }
    let v = |i: usize| n[i].parse::<f32>().map_err(|e| format!("`{}`: {e}", n[i]));
    let (t1, t2) = (v(0)?, v(1)?);
    let (x1, y1, z1) = (v(2)?, v(3)?, v(4)?);
    let (x2, y2, z2) = (v(5)?, v(6)?, v(7)?);
    Ok(LOR::from_components((t1, t2), (x1, y1, z1), (x2, y2, z2)))
}

// Alias to disable clap's Option-flag magic
pub type CutoffOption<T> = Option<T>;

pub fn parse_maybe_cutoff(s: &str) -> Result<CutoffOption<Ratiof32>, String> {
    Ok(if s == "no" { None } else { Some(s.parse().map_err(|e| format!("{e}"))?) })
}

/// Group numeric digits to facilitate reading long numbers
pub fn group_digits<F: std::fmt::Display>(n: F) -> String {
    use numsep::{separate, Locale};
    separate(n, Locale::English)
}

pub mod timing {

    use super::group_digits;
    use std::time::Instant;
    use std::io::Write;

    pub struct Progress {
        previous: Instant,
    }

    impl Progress {

        #[allow(clippy::new_without_default)]
        pub fn new() -> Self { Self { previous: Instant::now() } }

        /// Print message, append ellipsis, flush stdout, stay on same line, start timer.
        pub fn start(&mut self, message: &str) {
            print!("{message} ... ");
            std::io::stdout().flush().unwrap();
            self.start_timer();
        }

        /// Print message, go to next line, start timer
        pub fn startln(&mut self, message: &str) {
            self.start(message);
            println!();
            self.start_timer();
        }

        // Print time elapsed since last start or done
        pub fn done(&mut self) {
            println!("{} ms", group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        // Print message followed by time elapsed since last start or done
        pub fn done_with_message(&mut self, message: &str) {
            println!("{message}: {} ms",
                     group_digits(self.previous.elapsed().as_millis()));
            self.start_timer();
        }

        fn start_timer(&mut self) { self.previous = Instant::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn parse_lor_roundtrip() {
        let lor = parse_lor("10.0 30.0  -100.0 1.0 2.0  100.0 -1.0 -2.0").unwrap();
        assert_float_eq!(lor.dt, 20.0, ulps <= 1);
        assert_float_eq!(lor.p1.x, -100.0, ulps <= 1);
        assert_float_eq!(lor.p2.z, -2.0, ulps <= 1);
    }

    #[test]
    fn parse_lor_rejects_wrong_arity() {
        assert!(parse_lor("1 2 3").is_err());
        assert!(parse_lor("1 2 3 4 5 6 7 8 9").is_err());
    }

    #[test]
    fn parse_lor_rejects_non_numbers() {
        assert!(parse_lor("a b c d e f g h").is_err());
    }

    #[test]
    fn cutoff_option() {
        assert_eq!(parse_maybe_cutoff("no"), Ok(None));
        assert_eq!(parse_maybe_cutoff("2.5"), Ok(Some(2.5)));
        assert!(parse_maybe_cutoff("nope").is_err());
    }
}
