use std::fmt;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
use std::time::Duration;

// spell-checker:ignore subsec

/// Print every [`HDuration`] as floating point seconds
pub static DURATIONS_AS_SECS: AtomicBool = AtomicBool::new(false);

/// Human-readable durations
pub struct HDuration(pub Duration);

impl fmt::Display for HDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.0;
        if DURATIONS_AS_SECS.load(Relaxed) {
            return write!(f, "{:.6} s", d.as_secs_f64());
        }
        let s = d.as_secs();
        if s >= 60 {
            let (m, s) = (s / 60, s % 60);
            let (h, m) = (m / 60, m % 60);
            if h == 0 {
                return write!(f, "{m} m {s} s");
            }
            let (d, h) = (h / 24, h % 24);
            if d == 0 {
                return write!(f, "{h} h {m} m {s} s");
            }
            return write!(f, "{d} d {h} h {m} m {s} s");
        }
        if s != 0 {
            return write!(f, "{:.3} s", d.as_secs_f32());
        }
        let ms = d.subsec_millis();
        if ms != 0 {
            return write!(f, "{ms} ms");
        }
        let us = d.subsec_micros();
        if us != 0 {
            return write!(f, "{us} us");
        }
        write!(f, "{} ns", d.subsec_nanos())
    }
}

/// Unwrap `value` or report the error and terminate with status 1
pub fn or_exit<T, E: Display>(value: Result<T, E>) -> T {
    match value {
        Ok(v) => v,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_readable() {
        let fmt = |d| HDuration(d).to_string();
        assert_eq!(fmt(Duration::from_nanos(17)), "17 ns");
        assert_eq!(fmt(Duration::from_micros(5)), "5 us");
        assert_eq!(fmt(Duration::from_millis(250)), "250 ms");
        assert_eq!(fmt(Duration::from_millis(2500)), "2.500 s");
        assert_eq!(fmt(Duration::from_secs(61)), "1 m 1 s");
        assert_eq!(fmt(Duration::from_secs(3 * 3600 + 2)), "3 h 0 m 2 s");
        assert_eq!(fmt(Duration::from_secs(25 * 3600)), "1 d 1 h 0 m 0 s");
    }
}
